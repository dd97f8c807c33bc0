use crate::model::ScanResult;
use std::fmt::Write;

const BANNER_WIDTH: usize = 60;
const SECTION_WIDTH: usize = 40;

/// Renders the human-readable report.
///
/// The output depends only on `result`, so identical scans produce
/// byte-identical reports.
pub fn render_text(result: &ScanResult) -> String {
    let mut out = String::new();
    let banner = "=".repeat(BANNER_WIDTH);

    // Writing into a String cannot fail.
    let _ = writeln!(out, "{}", banner);
    let _ = writeln!(out, "VULNERABILITY SCAN RESULTS");
    let _ = writeln!(out, "{}", banner);
    let _ = writeln!(out);
    let _ = writeln!(out, "Scanned Projects: {}", result.scanned_projects);
    let _ = writeln!(out, "Vulnerable Projects: {}", result.vulnerable_projects.len());
    let _ = write!(out, "Errors: {}", result.errors.len());

    if !result.vulnerable_projects.is_empty() {
        section(&mut out, "VULNERABLE PROJECTS:");
        for (index, project) in result.vulnerable_projects.iter().enumerate() {
            let _ = write!(
                out,
                "\n\n{}. {} ({})",
                index + 1,
                project.package_name,
                project.path.display()
            );
            for m in &project.vulnerabilities {
                if m.is_direct() {
                    let _ = write!(out, "\n   ⚠️  {}@{} (direct dependency)", m.package, m.version);
                } else {
                    let _ = write!(
                        out,
                        "\n   ⚠️  {}@{} (via: {})",
                        m.package, m.version, m.dependency_path
                    );
                }
            }
        }
    }

    if !result.errors.is_empty() {
        section(&mut out, "ERRORS:");
        for (index, error) in result.errors.iter().enumerate() {
            let _ = write!(
                out,
                "\n\n{}. {} - {}\n   Error: {}",
                index + 1,
                error.kind,
                error.path.display(),
                error.message
            );
        }
    }

    if result.is_clean() {
        let _ = write!(out, "\n\n✅ No vulnerable packages found!");
    }

    out
}

fn section(out: &mut String, title: &str) {
    let rule = "-".repeat(SECTION_WIDTH);
    let _ = write!(out, "\n\n{}\n{}\n{}", rule, title, rule);
}
