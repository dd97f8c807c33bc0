//! Matching dependency trees against an advisory table.
//!
//! The [`Matcher`] walks a project's dependency tree depth-first and reports
//! every occurrence of a tracked package whose installed version is listed
//! as vulnerable. The same package may appear at several depths (diamond
//! dependencies); each occurrence is matched and reported on its own.
//!
//! Trees are assumed to be acyclic, which holds for anything produced by
//! `npm ls`. There is no cycle detection.

use crate::advisory::{NpmRange, VulnerabilitySpec, VulnerableVersions};
use crate::model::{DependencyGraph, DependencyMap, Match, PATH_SEPARATOR};
use clap::ValueEnum;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Characters stripped from the front of an installed version string.
const RANGE_PREFIX: &[char] = &['^', '~', '>', '=', '<'];

/// How installed version strings are compared against exact-version lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Strip range operators and compare strings. `^5.6.1` is treated as
    /// `5.6.1`, and `1.2` never equals `1.2.0`.
    #[default]
    Exact,
    /// Compare parsed versions. A declared range such as `^5.6.0` matches
    /// when it admits one of the listed versions.
    Semantic,
}

/// Strips leading range operators, e.g. `^1.2.3` becomes `1.2.3`.
pub fn clean_version(version: &str) -> &str {
    version.trim_start_matches(RANGE_PREFIX)
}

#[derive(Debug, Clone)]
pub struct Matcher {
    spec: Arc<VulnerabilitySpec>,
    mode: MatchMode,
    include_dev: bool,
}

impl Matcher {
    pub fn new(spec: Arc<VulnerabilitySpec>) -> Self {
        Self {
            spec,
            mode: MatchMode::default(),
            include_dev: true,
        }
    }

    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Whether `devDependencies` are scanned as well. Defaults to true.
    pub fn with_dev_dependencies(mut self, include_dev: bool) -> Self {
        self.include_dev = include_dev;
        self
    }

    pub fn spec(&self) -> &VulnerabilitySpec {
        &self.spec
    }

    /// Returns true if `installed` is a vulnerable version of `package`.
    ///
    /// Packages missing from the table are never vulnerable.
    ///
    /// # Example
    ///
    /// ```
    /// use pkgsweep::advisory::VulnerabilitySpec;
    /// use pkgsweep::matcher::Matcher;
    /// use std::sync::Arc;
    ///
    /// let matcher = Matcher::new(Arc::new(VulnerabilitySpec::builtin()));
    /// assert!(matcher.is_vulnerable("chalk", "5.6.1"));
    /// assert!(matcher.is_vulnerable("chalk", "^5.6.1"));
    /// assert!(!matcher.is_vulnerable("chalk", "5.6.2"));
    /// ```
    pub fn is_vulnerable(&self, package: &str, installed: &str) -> bool {
        let Some(rule) = self.spec.get(package) else {
            return false;
        };
        let clean = clean_version(installed);

        match rule {
            VulnerableVersions::Any => true,
            VulnerableVersions::Exact(versions) => match self.mode {
                MatchMode::Exact => versions.iter().any(|v| v == clean),
                MatchMode::Semantic => semantic_exact_match(installed, clean, versions),
            },
            VulnerableVersions::Ranges(ranges) => satisfies_any(clean, ranges),
        }
    }

    /// Finds vulnerable packages in `dependencies` and everything below it.
    ///
    /// `ancestors` is the chain of package names leading to `dependencies`
    /// and is empty at the top of a project. Matches come back in pre-order:
    /// a package's own match precedes those of its dependencies, and
    /// siblings keep the order of the source document.
    pub fn scan_dependencies(
        &self,
        dependencies: Option<&DependencyMap>,
        project: &Path,
        ancestors: &[&str],
    ) -> Vec<Match> {
        let mut matches = Vec::new();
        if let Some(dependencies) = dependencies {
            let mut chain = ancestors.to_vec();
            self.walk(dependencies, project, &mut chain, &mut matches);
        }
        matches
    }

    /// Scans runtime dependencies followed by development dependencies.
    pub fn scan_graph(&self, graph: &DependencyGraph, project: &Path) -> Vec<Match> {
        let mut matches = self.scan_dependencies(graph.dependencies.as_ref(), project, &[]);
        if self.include_dev {
            matches.extend(self.scan_dependencies(graph.dev_dependencies.as_ref(), project, &[]));
        }
        matches
    }

    fn walk<'a>(
        &self,
        dependencies: &'a DependencyMap,
        project: &Path,
        chain: &mut Vec<&'a str>,
        matches: &mut Vec<Match>,
    ) {
        for (name, node) in dependencies.iter() {
            // Entries npm could not resolve carry no version; skip them whole.
            let Some(version) = node.version.as_deref().filter(|v| !v.is_empty()) else {
                debug!(package = name, "skipping dependency without a resolved version");
                continue;
            };

            chain.push(name);

            if self.is_vulnerable(name, version) {
                debug!(package = name, version, project = %project.display(), "vulnerable version found");
                matches.push(Match {
                    package: name.to_string(),
                    version: version.to_string(),
                    path: project.to_path_buf(),
                    dependency_path: chain.join(PATH_SEPARATOR),
                });
            }

            if let Some(nested) = &node.dependencies {
                self.walk(nested, project, chain, matches);
            }

            chain.pop();
        }
    }
}

fn satisfies_any(clean: &str, ranges: &[NpmRange]) -> bool {
    match Version::parse(clean) {
        Ok(version) => ranges.iter().any(|range| range.matches(&version)),
        Err(_) => {
            debug!(version = clean, "installed version is not valid semver");
            false
        }
    }
}

fn semantic_exact_match(installed: &str, clean: &str, listed: &[String]) -> bool {
    if let Ok(version) = Version::parse(clean) {
        if installed.len() == clean.len() {
            return listed
                .iter()
                .any(|v| Version::parse(v).map(|l| l == version).unwrap_or(v == clean));
        }
    }

    // A declared range rather than a resolved version.
    if let Ok(declared) = NpmRange::parse(installed) {
        return listed
            .iter()
            .filter_map(|v| Version::parse(v).ok())
            .any(|v| declared.matches(&v));
    }

    listed.iter().any(|v| v == clean)
}
