//! Finding project roots below a directory.
//!
//! A project root is any directory holding a manifest file (`package.json`
//! by default). Nested projects are reported independently of the project
//! that contains them. Dependency caches such as `node_modules` are never
//! entered, since their contents already show up in the dependency graph.

use crate::model::{ErrorKind, ScanError};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct LocatorOptions {
    /// File whose presence marks a project root.
    pub manifest_file: String,
    /// Directory names that are never descended into.
    pub skip_dirs: Vec<String>,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            manifest_file: "package.json".to_string(),
            skip_dirs: vec!["node_modules".to_string()],
        }
    }
}

impl LocatorOptions {
    fn is_skipped(&self, name: &str) -> bool {
        self.skip_dirs.iter().any(|skip| skip == name)
    }
}

/// Project roots and the errors hit while looking for them.
#[derive(Debug, Default)]
pub struct Located {
    pub projects: Vec<PathBuf>,
    pub errors: Vec<ScanError>,
}

/// Walks `root` and returns every project root beneath it, `root` included.
///
/// Directories are visited in file-name order, parents before children, so
/// the result is stable between runs. Symlinks are not followed. A directory
/// that cannot be read is recorded as an error and its siblings are still
/// visited.
pub fn locate_projects(root: &Path, options: &LocatorOptions) -> Located {
    let mut located = Located::default();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !options.is_skipped(&entry.file_name().to_string_lossy())
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                warn!(path = %path.display(), error = %err, "cannot read directory");
                located
                    .errors
                    .push(ScanError::new(ErrorKind::DirectoryScan, path, err.to_string()));
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        if entry.path().join(&options.manifest_file).is_file() {
            info!(path = %entry.path().display(), "found project");
            located.projects.push(entry.into_path());
        }
    }

    located
}
