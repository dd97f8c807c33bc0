use crate::model::ScanResult;
use anyhow::Result;

pub fn render_json(result: &ScanResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ErrorKind, ScanError};

    #[test]
    fn test_render_json_keys() {
        let mut result = ScanResult::new();
        result.record_error(ScanError::new(ErrorKind::DirectoryScan, "/work", "denied"));

        let value: serde_json::Value = serde_json::from_str(&render_json(&result).unwrap()).unwrap();

        assert_eq!(value["scannedProjects"], 0);
        assert_eq!(value["vulnerableProjects"].as_array().unwrap().len(), 0);
        assert_eq!(value["errors"][0]["type"], "directory_scan");
    }
}
