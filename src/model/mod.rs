//! Core data types for dependency graphs and scan results.
//!
//! - [`DependencyGraph`] - The resolved dependency tree of one project
//! - [`DependencyMap`] / [`DependencyNode`] - Nested package occurrences
//! - [`Match`] - A dependency found on the advisory list
//! - [`ScanResult`] - Aggregate outcome of a sweep
//!
//! # Example
//!
//! ```
//! use pkgsweep::model::{DependencyMap, DependencyNode, ScanResult};
//! use std::path::Path;
//!
//! let deps: DependencyMap = [("chalk", DependencyNode::new("5.6.1"))].into_iter().collect();
//! assert_eq!(deps.len(), 1);
//!
//! let mut result = ScanResult::new();
//! result.record_project(Path::new("/work/app"), Some("app"), Vec::new());
//! assert_eq!(result.scanned_projects, 1);
//! ```

mod graph;
mod report;

pub use graph::*;
pub use report::*;
