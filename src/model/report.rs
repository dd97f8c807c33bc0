use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Separator used when rendering a dependency path.
pub const PATH_SEPARATOR: &str = " > ";

/// A dependency whose installed version is on the advisory list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub package: String,
    pub version: String,
    pub path: PathBuf,
    pub dependency_path: String,
}

impl Match {
    /// True when the package is listed directly by the project rather than
    /// pulled in through another dependency.
    pub fn is_direct(&self) -> bool {
        !self.dependency_path.contains(PATH_SEPARATOR)
    }
}

/// All matches found in a single project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMatches {
    pub path: PathBuf,
    pub package_name: String,
    pub vulnerabilities: Vec<Match>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A directory could not be read while locating projects.
    DirectoryScan,
    /// The dependency graph of a project could not be produced.
    DependencyResolution,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::DirectoryScan => "directory_scan",
            ErrorKind::DependencyResolution => "dependency_resolution",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub path: PathBuf,
    pub message: String,
}

impl ScanError {
    pub fn new(kind: ErrorKind, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Aggregate outcome of one sweep over a directory tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub scanned_projects: usize,
    pub vulnerable_projects: Vec<ProjectMatches>,
    pub errors: Vec<ScanError>,
}

impl ScanResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successfully scanned project. Projects without matches only
    /// bump the counter.
    pub fn record_project(
        &mut self,
        path: &Path,
        package_name: Option<&str>,
        vulnerabilities: Vec<Match>,
    ) {
        self.scanned_projects += 1;
        if vulnerabilities.is_empty() {
            return;
        }
        self.vulnerable_projects.push(ProjectMatches {
            path: path.to_path_buf(),
            package_name: package_name.unwrap_or("unknown").to_string(),
            vulnerabilities,
        });
    }

    pub fn record_error(&mut self, error: ScanError) {
        self.errors.push(error);
    }

    pub fn total_matches(&self) -> usize {
        self.vulnerable_projects
            .iter()
            .map(|p| p.vulnerabilities.len())
            .sum()
    }

    pub fn is_clean(&self) -> bool {
        self.vulnerable_projects.is_empty() && self.errors.is_empty()
    }
}
