//! Sweeping a directory tree: locate projects, resolve, match, aggregate.

use crate::config::IgnoreConfig;
use crate::locator::{locate_projects, LocatorOptions};
use crate::matcher::Matcher;
use crate::model::{ErrorKind, ScanError, ScanResult};
use crate::provider::GraphProvider;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Runs one sweep over a tree of projects.
///
/// Projects are scanned one after another. A project whose dependency
/// graph cannot be resolved is recorded as an error and skipped; the sweep
/// itself always completes with a [`ScanResult`].
pub struct Sweep {
    matcher: Matcher,
    provider: Box<dyn GraphProvider>,
    locator: LocatorOptions,
    ignore: IgnoreConfig,
    progress: bool,
}

impl Sweep {
    pub fn new(matcher: Matcher, provider: impl GraphProvider + 'static) -> Self {
        Self {
            matcher,
            provider: Box::new(provider),
            locator: LocatorOptions::default(),
            ignore: IgnoreConfig::default(),
            progress: false,
        }
    }

    pub fn with_locator(mut self, locator: LocatorOptions) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_ignore(mut self, ignore: IgnoreConfig) -> Self {
        self.ignore = ignore;
        self
    }

    /// Shows a progress bar on stderr while projects are scanned.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    pub async fn run(&self, root: &Path) -> ScanResult {
        info!(root = %root.display(), "starting vulnerability scan");
        info!(
            provider = self.provider.name(),
            "looking for vulnerable packages: {}",
            self.matcher.spec().describe()
        );

        let mut result = ScanResult::new();

        let located = locate_projects(root, &self.locator);
        for error in located.errors {
            result.record_error(error);
        }
        info!("found {} projects", located.projects.len());

        let progress = self.progress_bar(located.projects.len());

        for project in &located.projects {
            if let Some(pb) = &progress {
                pb.set_message(project.display().to_string());
            }

            self.scan_project(project, &mut result).await;

            if let Some(pb) = &progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        result
    }

    /// Scans a single project and folds the outcome into `result`.
    pub async fn scan_project(&self, project: &Path, result: &mut ScanResult) {
        info!(project = %project.display(), "scanning");

        let graph = match self.provider.dependency_graph(project).await {
            Ok(graph) => graph,
            Err(err) => {
                warn!(project = %project.display(), error = %err, "dependency resolution failed");
                result.record_error(ScanError::new(
                    ErrorKind::DependencyResolution,
                    project,
                    err.to_string(),
                ));
                return;
            }
        };

        let matches: Vec<_> = self
            .matcher
            .scan_graph(&graph, project)
            .into_iter()
            .filter(|m| !self.ignore.should_ignore_package(&m.package))
            .collect();

        result.record_project(project, graph.name.as_deref(), matches);
    }

    fn progress_bar(&self, len: usize) -> Option<ProgressBar> {
        if !self.progress || len == 0 {
            return None;
        }

        let pb = ProgressBar::new(len as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {wide_msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}
