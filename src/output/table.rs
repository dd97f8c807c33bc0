use crate::model::ScanResult;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct MatchRow {
    #[tabled(rename = "Project")]
    project: String,
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Path")]
    dependency_path: String,
}

pub fn render_table(result: &ScanResult) -> String {
    let mut out = format!(
        "Scanned {} projects, {} vulnerable, {} errors",
        result.scanned_projects,
        result.vulnerable_projects.len(),
        result.errors.len()
    );

    let rows: Vec<MatchRow> = result
        .vulnerable_projects
        .iter()
        .flat_map(|project| {
            project.vulnerabilities.iter().map(move |m| MatchRow {
                project: project.path.display().to_string(),
                package: m.package.clone(),
                version: m.version.clone(),
                dependency_path: if m.is_direct() {
                    "-".to_string()
                } else {
                    m.dependency_path.clone()
                },
            })
        })
        .collect();

    if !rows.is_empty() {
        out.push_str("\n\n");
        out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
    }

    for error in &result.errors {
        out.push_str(&format!(
            "\n{} - {}: {}",
            error.kind,
            error.path.display(),
            error.message
        ));
    }

    out
}
