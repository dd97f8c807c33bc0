//! Configuration file handling.
//!
//! This module provides loading and saving of pkgsweep configuration
//! from a TOML file.
//!
//! # Configuration Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/pkgsweep/config.toml`
//! - macOS: `~/Library/Application Support/pkgsweep/config.toml`
//! - Windows: `%APPDATA%\pkgsweep\config.toml`
//!
//! # Example Configuration
//!
//! ```toml
//! advisories = "/etc/pkgsweep/advisories.toml"
//! default_format = "text"
//! match_mode = "exact"
//! include_dev = true
//! manifest_file = "package.json"
//! skip_dirs = ["node_modules", ".git"]
//!
//! [ignore]
//! packages = ["debug", "@internal/*"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::locator::LocatorOptions;
use crate::matcher::MatchMode;

/// Application configuration.
///
/// Every field has a default, so a partial file is fine and a missing
/// file means "all defaults". Command line flags take precedence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Advisory table to load instead of the built-in one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisories: Option<PathBuf>,

    /// Report format when no `--format` flag is given.
    ///
    /// Valid values: "text", "json", "table"
    /// Default: "text"
    pub default_format: String,

    /// How installed versions are compared with exact-version lists.
    ///
    /// Default: "exact"
    pub match_mode: MatchMode,

    /// Whether `devDependencies` are scanned.
    ///
    /// Default: true
    pub include_dev: bool,

    /// File whose presence marks a project root.
    ///
    /// Default: "package.json"
    pub manifest_file: String,

    /// Directory names never descended into while locating projects.
    ///
    /// Default: ["node_modules"]
    pub skip_dirs: Vec<String>,

    /// npm executable to run instead of the one on `PATH`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub npm_command: Option<String>,

    /// Ignore list for suppressing accepted findings.
    #[serde(default)]
    pub ignore: IgnoreConfig,
}

/// Packages whose matches are dropped from the report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IgnoreConfig {
    /// Package names to suppress. Supports `*` globs (e.g. "@types/*").
    pub packages: Vec<String>,
}

impl IgnoreConfig {
    /// Check if matches for a package should be suppressed.
    pub fn should_ignore_package(&self, package: &str) -> bool {
        self.packages.iter().any(|pattern| {
            if pattern.contains('*') {
                glob_match(pattern, package)
            } else {
                pattern == package
            }
        })
    }
}

/// Simple glob matching (supports * as wildcard).
fn glob_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();

    if parts.len() == 1 {
        return pattern == text;
    }

    let mut remaining = text;

    let first = parts[0];
    if !first.is_empty() {
        let Some(rest) = remaining.strip_prefix(first) else {
            return false;
        };
        remaining = rest;
    }

    let last = parts[parts.len() - 1];
    if !last.is_empty() {
        let Some(rest) = remaining.strip_suffix(last) else {
            return false;
        };
        remaining = rest;
    }

    for part in &parts[1..parts.len() - 1] {
        if part.is_empty() {
            continue;
        }
        match remaining.find(part) {
            Some(pos) => remaining = &remaining[pos + part.len()..],
            None => return false,
        }
    }

    true
}

impl Default for Config {
    fn default() -> Self {
        let locator = LocatorOptions::default();
        Self {
            advisories: None,
            default_format: "text".to_string(),
            match_mode: MatchMode::Exact,
            include_dev: true,
            manifest_file: locator.manifest_file,
            skip_dirs: locator.skip_dirs,
            npm_command: None,
            ignore: IgnoreConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path`.
    ///
    /// If the file doesn't exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Saves the configuration, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Returns the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pkgsweep")
            .join("config.toml")
    }

    pub fn locator_options(&self) -> LocatorOptions {
        LocatorOptions {
            manifest_file: self.manifest_file.clone(),
            skip_dirs: self.skip_dirs.clone(),
        }
    }

    /// Generates a string containing the default configuration.
    pub fn generate_default_config() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_glob_match_exact() {
        assert!(glob_match("chalk", "chalk"));
        assert!(!glob_match("chalk", "debug"));
    }

    #[test]
    fn test_glob_match_prefix() {
        assert!(glob_match("chalk*", "chalk"));
        assert!(glob_match("chalk*", "chalk-template"));
        assert!(!glob_match("chalk*", "debug"));
    }

    #[test]
    fn test_glob_match_suffix() {
        assert!(glob_match("*-ansi", "strip-ansi"));
        assert!(glob_match("*-ansi", "slice-ansi"));
        assert!(!glob_match("*-ansi", "ansi-regex"));
    }

    #[test]
    fn test_glob_match_contains() {
        assert!(glob_match("*color*", "color-name"));
        assert!(glob_match("*color*", "supports-color"));
        assert!(!glob_match("*color*", "chalk"));
    }

    #[test]
    fn test_glob_match_scoped() {
        assert!(glob_match("@internal/*", "@internal/logger"));
        assert!(!glob_match("@internal/*", "@babel/core"));
    }

    #[test]
    fn test_ignore_config_packages() {
        let ignore = IgnoreConfig {
            packages: vec!["debug".to_string(), "color-*".to_string()],
        };

        assert!(ignore.should_ignore_package("debug"));
        assert!(ignore.should_ignore_package("color-name"));
        assert!(!ignore.should_ignore_package("chalk"));
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.default_format, "text");
        assert_eq!(config.match_mode, MatchMode::Exact);
        assert!(config.include_dev);
        assert_eq!(config.manifest_file, "package.json");
        assert_eq!(config.skip_dirs, vec!["node_modules".to_string()]);
        assert!(config.advisories.is_none());
        assert!(config.ignore.packages.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r#"
match_mode = "semantic"
skip_dirs = ["node_modules", ".git"]

[ignore]
packages = ["debug"]
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.match_mode, MatchMode::Semantic);
        assert_eq!(config.skip_dirs.len(), 2);
        assert_eq!(config.default_format, "text");
        assert!(config.ignore.should_ignore_package("debug"));
    }

    #[test]
    fn test_missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_from(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.manifest_file, "package.json");
    }

    #[test]
    fn test_invalid_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "match_mode = 42").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.include_dev = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert!(!loaded.include_dev);
    }

    #[test]
    fn test_generate_default_config() {
        let text = Config::generate_default_config();
        assert!(text.contains("default_format = \"text\""));
        assert!(text.contains("match_mode = \"exact\""));
    }
}
