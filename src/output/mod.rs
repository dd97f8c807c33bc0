mod json;
mod table;
mod text;

pub use json::render_json;
pub use table::render_table;
pub use text::render_text;

use crate::model::ScanResult;
use anyhow::Result;

/// Output format for scan reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON format for programmatic use
    Json,
    /// One table row per finding
    Table,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "table" => Ok(OutputFormat::Table),
            _ => Err(format!(
                "Unknown format: {}. Use 'text', 'json', or 'table'",
                s
            )),
        }
    }
}

pub fn render(result: &ScanResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(result)),
        OutputFormat::Json => render_json(result),
        OutputFormat::Table => Ok(render_table(result)),
    }
}

pub fn print_result(result: &ScanResult, format: OutputFormat) -> Result<()> {
    let rendered = render(result, format)?;
    println!("{}", rendered);
    Ok(())
}
