use crate::models::{IntensityUnit, LactateTest};
use anyhow::Result;
use std::path::Path;
use tracing::info;

pub mod csv;
pub mod json;

/// Reads incremental test records from one file format
pub trait TestImporter {
    /// Check if this importer can handle the given file
    fn can_import(&self, file_path: &Path) -> bool;

    /// Read a test. `unit` overrides whatever the file declares or implies.
    fn import_file(&self, file_path: &Path, unit: Option<IntensityUnit>) -> Result<LactateTest>;

    fn format_name(&self) -> &'static str;
}

/// Picks an importer by file extension
pub struct ImportManager {
    importers: Vec<Box<dyn TestImporter>>,
}

impl Default for ImportManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportManager {
    pub fn new() -> Self {
        let importers: Vec<Box<dyn TestImporter>> = vec![
            Box::new(csv::CsvTestImporter::new()),
            Box::new(json::JsonTestImporter),
        ];
        Self { importers }
    }

    /// Import a single file, auto-detecting the format
    pub fn import_file(&self, file_path: &Path, unit: Option<IntensityUnit>) -> Result<LactateTest> {
        for importer in &self.importers {
            if importer.can_import(file_path) {
                info!(
                    file = %file_path.display(),
                    format = importer.format_name(),
                    "importing lactate test"
                );
                return importer.import_file(file_path, unit);
            }
        }

        anyhow::bail!("No importer found for file: {}", file_path.display());
    }
}

pub(crate) fn has_extension(file_path: &Path, extension: &str) -> bool {
    file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case(extension))
}
