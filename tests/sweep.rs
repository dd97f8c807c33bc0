use pkgsweep::advisory::{VulnerabilitySpec, VulnerableVersions};
use pkgsweep::matcher::{MatchMode, Matcher};
use pkgsweep::model::{DependencyGraph, ErrorKind};
use pkgsweep::output::render_text;
use pkgsweep::provider::{parse_npm_ls_output, FnProvider, ProviderError};
use pkgsweep::scan::Sweep;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn make_project(root: &Path, name: &str, npm_ls: &str) {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("package.json"), format!(r#"{{ "name": "{}" }}"#, name)).unwrap();
    fs::write(dir.join("npm-ls.json"), npm_ls).unwrap();
}

/// Reads a canned `npm ls --json` document stored next to the manifest.
fn canned_provider() -> FnProvider<impl Fn(&Path) -> Result<DependencyGraph, ProviderError>> {
    FnProvider::new(|project: &Path| {
        let stdout = fs::read(project.join("npm-ls.json"))
            .map_err(|e| ProviderError::Other(e.to_string()))?;
        parse_npm_ls_output(&stdout)
    })
}

fn chalk_matcher() -> Matcher {
    Matcher::new(Arc::new(VulnerabilitySpec::from_entries([(
        "chalk",
        VulnerableVersions::Exact(vec!["5.6.1".to_string()]),
    )])))
}

#[tokio::test]
async fn test_direct_dependency_end_to_end() {
    let tmp = TempDir::new().unwrap();
    make_project(
        tmp.path(),
        "P",
        r#"{ "name": "P", "dependencies": { "chalk": { "version": "5.6.1", "dependencies": {} } } }"#,
    );

    let result = Sweep::new(chalk_matcher(), canned_provider())
        .run(tmp.path())
        .await;

    assert_eq!(result.scanned_projects, 1);
    assert_eq!(result.vulnerable_projects.len(), 1);
    assert!(result.errors.is_empty());

    let project = &result.vulnerable_projects[0];
    assert_eq!(project.package_name, "P");
    assert_eq!(project.path, tmp.path().join("P"));
    assert_eq!(project.vulnerabilities[0].dependency_path, "chalk");

    let report = render_text(&result);
    assert!(report.contains("Scanned Projects: 1"));
    assert!(report.contains("Vulnerable Projects: 1"));
    assert!(report.contains("chalk@5.6.1 (direct dependency)"));
}

#[tokio::test]
async fn test_unparseable_output_is_resolution_error() {
    let tmp = TempDir::new().unwrap();
    make_project(tmp.path(), "broken", "npm ERR! this is not json");

    let result = Sweep::new(chalk_matcher(), canned_provider())
        .run(tmp.path())
        .await;

    assert_eq!(result.scanned_projects, 0);
    assert!(result.vulnerable_projects.is_empty());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ErrorKind::DependencyResolution);

    let report = render_text(&result);
    assert!(report.contains("Vulnerable Projects: 0"));
    assert!(report.contains("Errors: 1"));
    assert!(report.contains("dependency_resolution - "));
}

#[tokio::test]
async fn test_transitive_and_dev_matches_across_projects() {
    let tmp = TempDir::new().unwrap();
    make_project(
        tmp.path(),
        "api",
        r#"{
            "name": "api",
            "dependencies": {
                "express": {
                    "version": "4.19.2",
                    "dependencies": { "debug": { "version": "4.4.2" } }
                }
            },
            "devDependencies": {
                "jest": {
                    "version": "29.7.0",
                    "dependencies": {
                        "chalk": {
                            "version": "4.1.2",
                            "dependencies": { "supports-color": { "version": "10.2.1" } }
                        }
                    }
                }
            }
        }"#,
    );
    make_project(
        tmp.path(),
        "site",
        r#"{ "name": "site", "dependencies": { "react": { "version": "18.3.1" } } }"#,
    );

    let matcher = Matcher::new(Arc::new(VulnerabilitySpec::builtin()));
    let result = Sweep::new(matcher, canned_provider()).run(tmp.path()).await;

    assert_eq!(result.scanned_projects, 2);
    assert_eq!(result.vulnerable_projects.len(), 1);

    let paths: Vec<&str> = result.vulnerable_projects[0]
        .vulnerabilities
        .iter()
        .map(|m| m.dependency_path.as_str())
        .collect();
    assert_eq!(paths, vec!["express > debug", "jest > chalk > supports-color"]);

    let report = render_text(&result);
    assert!(report.contains("debug@4.4.2 (via: express > debug)"));
}

#[tokio::test]
async fn test_node_modules_projects_are_not_scanned() {
    let tmp = TempDir::new().unwrap();
    make_project(
        tmp.path(),
        "app",
        r#"{ "name": "app", "dependencies": {} }"#,
    );
    make_project(
        &tmp.path().join("app").join("node_modules"),
        "chalk",
        r#"{ "name": "chalk", "dependencies": { "chalk": { "version": "5.6.1" } } }"#,
    );

    let result = Sweep::new(chalk_matcher(), canned_provider())
        .run(tmp.path())
        .await;

    assert_eq!(result.scanned_projects, 1);
    assert!(result.vulnerable_projects.is_empty());
}

#[tokio::test]
async fn test_semantic_mode_flags_declared_ranges() {
    let tmp = TempDir::new().unwrap();
    make_project(
        tmp.path(),
        "app",
        r#"{ "name": "app", "dependencies": { "chalk": { "version": "^5.6.0" } } }"#,
    );

    let exact = Sweep::new(chalk_matcher(), canned_provider())
        .run(tmp.path())
        .await;
    let semantic = Sweep::new(chalk_matcher().with_mode(MatchMode::Semantic), canned_provider())
        .run(tmp.path())
        .await;

    assert!(exact.vulnerable_projects.is_empty());
    assert_eq!(semantic.vulnerable_projects.len(), 1);
}

#[tokio::test]
async fn test_repeated_scans_render_identically() {
    let tmp = TempDir::new().unwrap();
    make_project(
        tmp.path(),
        "one",
        r#"{ "name": "one", "dependencies": { "chalk": { "version": "5.6.1" } } }"#,
    );
    make_project(tmp.path(), "two", "garbage");

    let sweep = Sweep::new(chalk_matcher(), canned_provider());
    let first = sweep.run(tmp.path()).await;
    let second = sweep.run(tmp.path()).await;

    assert_eq!(first, second);
    assert_eq!(render_text(&first), render_text(&second));
}

#[tokio::test]
async fn test_unresolved_entries_do_not_fail_the_project() {
    let tmp = TempDir::new().unwrap();
    make_project(
        tmp.path(),
        "app",
        r#"{
            "name": "app",
            "dependencies": {
                "ghost": null,
                "odd": { "version": 5 },
                "blank": { "version": "", "dependencies": { "chalk": { "version": "5.6.1" } } },
                "chalk": { "version": "5.6.1" }
            }
        }"#,
    );

    let matcher = Matcher::new(Arc::new(VulnerabilitySpec::from_entries([
        ("chalk", VulnerableVersions::Exact(vec!["5.6.1".to_string()])),
        ("odd", VulnerableVersions::Any),
        ("blank", VulnerableVersions::Any),
    ])));
    let result = Sweep::new(matcher, canned_provider()).run(tmp.path()).await;

    assert!(result.errors.is_empty());
    assert_eq!(result.scanned_projects, 1);
    assert_eq!(result.total_matches(), 1);
    assert_eq!(result.vulnerable_projects[0].vulnerabilities[0].dependency_path, "chalk");
}
