//! Dependency graph providers.
//!
//! A [`GraphProvider`] turns a project directory into the resolved
//! [`DependencyGraph`] of that project. Resolution itself is always
//! delegated: the production provider asks npm, tests hand in closures.
//!
//! | Provider | Backing |
//! |----------|---------|
//! | [`NpmLsProvider`] | `npm ls --json` run in the project directory |
//! | [`FnProvider`] | Any `Fn(&Path) -> Result<DependencyGraph, ProviderError>` |
//!
//! # Example
//!
//! ```
//! use pkgsweep::model::{DependencyGraph, DependencyNode};
//! use pkgsweep::provider::{FnProvider, GraphProvider};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() {
//!     let provider = FnProvider::new(|_project: &Path| {
//!         Ok(DependencyGraph {
//!             dependencies: Some([("chalk", DependencyNode::new("5.6.1"))].into_iter().collect()),
//!             ..DependencyGraph::default()
//!         })
//!     });
//!
//!     let graph = provider.dependency_graph(Path::new("/work/app")).await.unwrap();
//!     assert!(graph.dependencies.is_some());
//! }
//! ```

mod npm;

pub use npm::{parse_npm_ls_output, NpmLsProvider};

use crate::model::DependencyGraph;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status} and no output: {stderr}")]
    Command {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Failed to parse npm ls output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Produces the dependency graph of one project.
#[async_trait]
pub trait GraphProvider: Send + Sync {
    /// Human-readable name, used in logs.
    fn name(&self) -> &'static str;

    /// Resolves the dependency graph of the project rooted at `project`.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph cannot be produced, e.g. the external
    /// tool is missing or its output is not valid JSON.
    async fn dependency_graph(&self, project: &Path) -> Result<DependencyGraph, ProviderError>;
}

/// Adapts a closure into a [`GraphProvider`].
pub struct FnProvider<F> {
    resolve: F,
}

impl<F> FnProvider<F>
where
    F: Fn(&Path) -> Result<DependencyGraph, ProviderError> + Send + Sync,
{
    pub fn new(resolve: F) -> Self {
        Self { resolve }
    }
}

#[async_trait]
impl<F> GraphProvider for FnProvider<F>
where
    F: Fn(&Path) -> Result<DependencyGraph, ProviderError> + Send + Sync,
{
    fn name(&self) -> &'static str {
        "function"
    }

    async fn dependency_graph(&self, project: &Path) -> Result<DependencyGraph, ProviderError> {
        (self.resolve)(project)
    }
}
