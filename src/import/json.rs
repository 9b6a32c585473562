use anyhow::{Context, Result};
use std::path::Path;

use crate::import::{has_extension, TestImporter};
use crate::models::{IntensityUnit, LactateTest};

/// Test records serialized as JSON, optionally with stored zones
pub struct JsonTestImporter;

impl TestImporter for JsonTestImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        has_extension(file_path, "json")
    }

    fn import_file(&self, file_path: &Path, unit: Option<IntensityUnit>) -> Result<LactateTest> {
        let content = std::fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read {}", file_path.display()))?;
        let mut test: LactateTest = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse lactate test JSON: {}", file_path.display()))?;
        if let Some(unit) = unit {
            test.unit = unit;
        }
        Ok(test)
    }

    fn format_name(&self) -> &'static str {
        "JSON"
    }
}
