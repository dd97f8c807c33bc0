//! Advisory tables: which package versions are known to be compromised.
//!
//! A [`VulnerabilitySpec`] maps package names to a [`VulnerableVersions`]
//! rule. Tables are built once (from the built-in list or a file) and then
//! only read, so a single table can be shared across any number of scans.
//!
//! # File Format
//!
//! Advisory files are TOML, or JSON when the file extension is `.json`:
//!
//! ```toml
//! [packages]
//! chalk = ["5.6.1"]                                   # exact versions
//! debug = ">=4.4.2 <4.4.3"                            # one npm range
//! lodash = { ranges = ["<4.17.21", "5.0.0 - 5.0.3"] } # several ranges
//! evil-pkg = "*"                                      # every version
//! ```

use semver::{Version, VersionReq};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Packages published in the September 2025 npm account takeover.
const BUILTIN_ADVISORIES: &[(&str, &str)] = &[
    ("backslash", "0.2.1"),
    ("chalk", "5.6.1"),
    ("chalk-template", "1.1.1"),
    ("color-convert", "3.1.1"),
    ("color-name", "2.0.1"),
    ("color-string", "2.1.1"),
    ("wrap-ansi", "9.0.1"),
    ("supports-hyperlinks", "4.1.1"),
    ("strip-ansi", "7.1.1"),
    ("slice-ansi", "7.1.1"),
    ("simple-swizzle", "0.2.3"),
    ("is-arrayish", "0.3.3"),
    ("error-ex", "1.3.3"),
    ("has-ansi", "6.0.1"),
    ("ansi-regex", "6.2.1"),
    ("ansi-styles", "6.2.2"),
    ("supports-color", "10.2.1"),
    ("proto-tinker-wc", "1.8.7"),
    ("debug", "4.4.2"),
];

const WILDCARD: &str = "*";

#[derive(Debug, Error)]
pub enum AdvisoryError {
    #[error("failed to read advisory file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse advisory file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid version range for '{package}': {source}")]
    InvalidRange {
        package: String,
        #[source]
        source: semver::Error,
    },
}

/// An npm-style range expression.
///
/// Whitespace-separated comparators are ANDed, `||` separates alternatives,
/// `a - b` is an inclusive hyphen range and a bare version means exactly
/// that version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmRange {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl NpmRange {
    pub fn parse(expr: &str) -> Result<Self, semver::Error> {
        let alternatives = expr
            .split("||")
            .map(|alt| VersionReq::parse(&to_semver_req(alt)))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: expr.trim().to_string(),
            alternatives,
        })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for NpmRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Rewrites one `||` alternative of an npm range into `semver` crate syntax.
fn to_semver_req(alternative: &str) -> String {
    let tokens: Vec<&str> = alternative.split_whitespace().collect();
    let mut comparators = Vec::new();
    let mut pending_op = String::new();
    let mut i = 0;

    while i < tokens.len() {
        if tokens.get(i + 1) == Some(&"-") && pending_op.is_empty() {
            if let Some(high) = tokens.get(i + 2) {
                push_comparator(&mut comparators, ">=", tokens[i]);
                push_comparator(&mut comparators, "<=", high);
                i += 3;
                continue;
            }
        }

        let token = tokens[i];
        i += 1;

        let op_len = token
            .find(|c: char| !matches!(c, '<' | '>' | '=' | '^' | '~'))
            .unwrap_or(token.len());
        let (op, version) = token.split_at(op_len);

        if version.is_empty() {
            // Operator separated from its version, e.g. ">= 1.2.3".
            pending_op.push_str(op);
            continue;
        }

        let op = std::mem::take(&mut pending_op) + op;
        // npm treats a bare version as exact, the semver crate as caret.
        let op = if op.is_empty() { "=" } else { op.as_str() };
        push_comparator(&mut comparators, op, version);
    }

    if !pending_op.is_empty() {
        // A trailing operator with nothing after it; let `VersionReq` reject it.
        comparators.push(pending_op);
    }

    if comparators.is_empty() {
        WILDCARD.to_string()
    } else {
        comparators.join(", ")
    }
}

/// Appends `op version`, turning npm x-ranges (`1.x`, `1.2.*`) into the
/// partial versions the semver crate understands. A comparator whose major
/// part is a wildcard admits everything and is left out.
fn push_comparator(comparators: &mut Vec<String>, op: &str, version: &str) {
    let version = strip_v(version);
    let parts: Vec<&str> = version.split('.').collect();
    let kept = parts
        .iter()
        .take(3)
        .position(|part| is_wildcard(part))
        .unwrap_or(parts.len());

    if kept == 0 {
        return;
    }
    comparators.push(format!("{}{}", op, parts[..kept].join(".")));
}

fn is_wildcard(part: &str) -> bool {
    part == WILDCARD || part.eq_ignore_ascii_case("x")
}

fn strip_v(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version)
}

/// The version rule for one tracked package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VulnerableVersions {
    /// Every installed version is vulnerable.
    Any,
    /// Exactly these version strings.
    Exact(Vec<String>),
    /// Any version satisfying one of these ranges.
    Ranges(Vec<NpmRange>),
}

impl fmt::Display for VulnerableVersions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VulnerableVersions::Any => f.write_str(WILDCARD),
            VulnerableVersions::Exact(versions) => f.write_str(&versions.join(", ")),
            VulnerableVersions::Ranges(ranges) => {
                let joined: Vec<&str> = ranges.iter().map(NpmRange::as_str).collect();
                f.write_str(&joined.join(" || "))
            }
        }
    }
}

#[derive(Deserialize)]
struct AdvisoryFile {
    #[serde(default)]
    packages: BTreeMap<String, RawEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Expression(String),
    Versions(Vec<String>),
    Ranges { ranges: Vec<String> },
}

impl RawEntry {
    fn into_versions(self, package: &str) -> Result<VulnerableVersions, AdvisoryError> {
        let parse_ranges = |exprs: Vec<String>| {
            exprs
                .iter()
                .map(|expr| NpmRange::parse(expr))
                .collect::<Result<Vec<_>, _>>()
                .map(VulnerableVersions::Ranges)
                .map_err(|source| AdvisoryError::InvalidRange {
                    package: package.to_string(),
                    source,
                })
        };

        match self {
            RawEntry::Expression(expr) if expr.trim() == WILDCARD => Ok(VulnerableVersions::Any),
            RawEntry::Expression(expr) => parse_ranges(vec![expr]),
            RawEntry::Versions(versions) => Ok(VulnerableVersions::Exact(versions)),
            RawEntry::Ranges { ranges } => parse_ranges(ranges),
        }
    }
}

/// Immutable table of tracked packages.
///
/// # Example
///
/// ```
/// use pkgsweep::advisory::{VulnerabilitySpec, VulnerableVersions};
///
/// let spec = VulnerabilitySpec::from_entries([
///     ("chalk", VulnerableVersions::Exact(vec!["5.6.1".to_string()])),
/// ]);
/// assert!(spec.get("chalk").is_some());
/// assert!(spec.get("lodash").is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VulnerabilitySpec {
    entries: BTreeMap<String, VulnerableVersions>,
}

impl VulnerabilitySpec {
    /// The table compiled into the binary.
    pub fn builtin() -> Self {
        Self::from_entries(BUILTIN_ADVISORIES.iter().map(|(name, version)| {
            (*name, VulnerableVersions::Exact(vec![version.to_string()]))
        }))
    }

    pub fn from_entries<N, I>(entries: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, VulnerableVersions)>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(name, versions)| (name.into(), versions))
                .collect(),
        }
    }

    /// Parses a TOML advisory document.
    pub fn from_toml_str(content: &str) -> Result<Self, AdvisoryError> {
        let file: AdvisoryFile = toml::from_str(content).map_err(|e| AdvisoryError::Parse {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        Self::from_file_model(file)
    }

    /// Loads an advisory file, choosing the parser by extension.
    pub fn load(path: &Path) -> Result<Self, AdvisoryError> {
        let content = fs::read_to_string(path).map_err(|source| AdvisoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let parsed = if is_json {
            serde_json::from_str::<AdvisoryFile>(&content).map_err(|e| e.to_string())
        } else {
            toml::from_str::<AdvisoryFile>(&content).map_err(|e| e.to_string())
        };

        let file = parsed.map_err(|message| AdvisoryError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        Self::from_file_model(file)
    }

    fn from_file_model(file: AdvisoryFile) -> Result<Self, AdvisoryError> {
        let mut entries = BTreeMap::new();
        for (package, raw) in file.packages {
            let versions = raw.into_versions(&package)?;
            entries.insert(package, versions);
        }
        Ok(Self { entries })
    }

    pub fn get(&self, package: &str) -> Option<&VulnerableVersions> {
        self.entries.get(package)
    }

    /// Tracked package names, sorted.
    pub fn package_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VulnerableVersions)> {
        self.entries.iter().map(|(name, versions)| (name.as_str(), versions))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One-line summary such as `chalk@5.6.1, debug@4.4.2`.
    pub fn describe(&self) -> String {
        self.iter()
            .map(|(name, versions)| format!("{}@{}", name, versions))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
