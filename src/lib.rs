pub mod advisory;
pub mod config;
pub mod locator;
pub mod matcher;
pub mod model;
pub mod output;
pub mod provider;
pub mod scan;

pub use advisory::{VulnerabilitySpec, VulnerableVersions};
pub use config::Config;
pub use matcher::{MatchMode, Matcher};
pub use model::{DependencyGraph, Match, ScanResult};
pub use scan::Sweep;
