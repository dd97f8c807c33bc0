use super::{GraphProvider, ProviderError};
use crate::model::DependencyGraph;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Resolves dependency graphs with `npm ls --json`.
///
/// Only the tracked package names are requested, which keeps the output
/// down to the branches that lead to them.
pub struct NpmLsProvider {
    program: String,
    packages: Vec<String>,
}

impl NpmLsProvider {
    pub fn new<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let program = if cfg!(target_os = "windows") { "npm.cmd" } else { "npm" };
        Self {
            program: program.to_string(),
            packages: packages.into_iter().map(Into::into).collect(),
        }
    }

    /// Uses a different npm executable, e.g. a pinned install.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn args(&self) -> Vec<&str> {
        let mut args = vec!["ls", "--json"];
        args.extend(self.packages.iter().map(String::as_str));
        args
    }
}

#[async_trait]
impl GraphProvider for NpmLsProvider {
    fn name(&self) -> &'static str {
        "npm ls"
    }

    async fn dependency_graph(&self, project: &Path) -> Result<DependencyGraph, ProviderError> {
        debug!(project = %project.display(), program = %self.program, "running npm ls");

        let output = Command::new(&self.program)
            .args(self.args())
            .current_dir(project)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|source| ProviderError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // npm ls exits non-zero on missing or invalid peers but still prints
        // the tree, so only fail outright when there is nothing to parse.
        if !output.status.success() && output.stdout.is_empty() {
            return Err(ProviderError::Command {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_npm_ls_output(&output.stdout)
    }
}

/// Parses the JSON document printed by `npm ls --json`.
pub fn parse_npm_ls_output(stdout: &[u8]) -> Result<DependencyGraph, ProviderError> {
    let stdout = String::from_utf8_lossy(stdout);
    Ok(serde_json::from_str(&stdout)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_request_tracked_packages() {
        let provider = NpmLsProvider::new(["chalk", "debug"]);
        assert_eq!(provider.args(), vec!["ls", "--json", "chalk", "debug"]);
    }

    #[test]
    fn test_parse_npm_ls_output() {
        let stdout = br#"{
            "version": "1.0.0",
            "name": "web-app",
            "dependencies": {
                "ink": {
                    "version": "4.4.1",
                    "dependencies": { "chalk": { "version": "5.6.1" } }
                }
            }
        }"#;

        let graph = parse_npm_ls_output(stdout).unwrap();
        assert_eq!(graph.name.as_deref(), Some("web-app"));
        assert!(graph.dev_dependencies.is_none());
    }

    #[test]
    fn test_parse_npm_ls_output_empty_tree() {
        let graph = parse_npm_ls_output(br#"{ "name": "empty" }"#).unwrap();
        assert!(graph.dependencies.is_none());
    }

    #[test]
    fn test_parse_npm_ls_output_garbage() {
        let err = parse_npm_ls_output(b"npm ERR! code ELSPROBLEMS").unwrap_err();

        assert!(matches!(err, ProviderError::Parse(_)));
        assert!(err.to_string().starts_with("Failed to parse npm ls output"));
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let provider = NpmLsProvider::new(["chalk"]).with_program("pkgsweep-no-such-npm");

        let err = provider
            .dependency_graph(Path::new("."))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Spawn { .. }));
    }

    /// Runs `sh ls --json ...` inside a project whose `ls` file is a shell
    /// script standing in for npm.
    #[cfg(unix)]
    async fn run_fake_npm(script: &str) -> Result<DependencyGraph, ProviderError> {
        let project = tempfile::TempDir::new().unwrap();
        std::fs::write(project.path().join("ls"), script).unwrap();

        NpmLsProvider::new(["chalk"])
            .with_program("sh")
            .dependency_graph(project.path())
            .await
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_with_tree_is_parsed() {
        let graph = run_fake_npm(
            r#"printf '{"name":"peer-trouble","dependencies":{"chalk":{"version":"5.6.1"}}}'
echo "npm ERR! invalid peer" >&2
exit 1
"#,
        )
        .await
        .unwrap();

        assert_eq!(graph.name.as_deref(), Some("peer-trouble"));
        let deps = graph.dependencies.unwrap();
        assert_eq!(deps.get("chalk").unwrap().version.as_deref(), Some("5.6.1"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_without_output_is_command_error() {
        let err = run_fake_npm("echo '  boom  ' >&2\nexit 3\n")
            .await
            .unwrap_err();

        match &err {
            ProviderError::Command { program, stderr, .. } => {
                assert_eq!(program, "sh");
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected a command error, got {other:?}"),
        }
        assert!(err.to_string().contains("boom"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_exit_with_garbage_is_parse_error() {
        let err = run_fake_npm("echo 'not json'\n").await.unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }
}
