use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::Path;

use crate::import::{has_extension, TestImporter};
use crate::models::{IntensityUnit, LactateTest};

/// One stage per row; headers are matched loosely
pub struct CsvTestImporter {
    column_mapping: HashMap<String, String>,
}

impl Default for CsvTestImporter {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvTestImporter {
    pub fn new() -> Self {
        let mut column_mapping = HashMap::new();

        Self::add_mapping(&mut column_mapping, "intensity", &["intensity", "stage_intensity", "load"]);
        Self::add_mapping(&mut column_mapping, "power", &["power", "watts", "power_watts", "w"]);
        Self::add_mapping(&mut column_mapping, "speed", &["speed", "velocity", "speed_kmh", "kmh"]);
        Self::add_mapping(&mut column_mapping, "pace", &["pace", "min_per_km", "pace_min_km"]);
        Self::add_mapping(
            &mut column_mapping,
            "lactate",
            &["lactate", "la", "blood_lactate", "lactate_mmol", "mmol"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "heart_rate",
            &["heart_rate", "hr", "heartrate", "bpm"],
        );

        Self { column_mapping }
    }

    fn add_mapping(mapping: &mut HashMap<String, String>, standard: &str, variations: &[&str]) {
        for variation in variations {
            mapping.insert(variation.to_lowercase(), standard.to_string());
        }
    }

    fn normalize_column_name(&self, name: &str) -> String {
        let normalized = name.trim().to_lowercase().replace([' ', '-'], "_");

        self.column_mapping
            .get(&normalized)
            .cloned()
            .unwrap_or(normalized)
    }

    /// Column index and implied unit of the intensity column
    fn intensity_column(columns: &HashMap<String, usize>) -> Option<(usize, Option<IntensityUnit>)> {
        [
            ("power", Some(IntensityUnit::Power)),
            ("speed", Some(IntensityUnit::Speed)),
            ("pace", Some(IntensityUnit::Pace)),
            ("intensity", None),
        ]
        .into_iter()
        .find_map(|(name, unit)| columns.get(name).map(|&i| (i, unit)))
    }

    /// Parse CSV text into a test record
    pub fn parse(&self, content: &str, unit: Option<IntensityUnit>) -> Result<LactateTest> {
        let mut reader = ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(false)
            .from_reader(content.as_bytes());

        let columns: HashMap<String, usize> = reader
            .headers()
            .context("Failed to read CSV headers")?
            .iter()
            .enumerate()
            .map(|(i, name)| (self.normalize_column_name(name), i))
            .collect();

        let (intensity_idx, implied_unit) = Self::intensity_column(&columns)
            .context("CSV needs an intensity column (power, speed, pace or intensity)")?;
        let lactate_idx = *columns.get("lactate").context("CSV needs a lactate column")?;
        let hr_idx = *columns.get("heart_rate").context("CSV needs a heart rate column")?;

        let unit = unit
            .or(implied_unit)
            .context("Intensity unit not implied by the headers; pass it explicitly")?;

        let mut intensity = Vec::new();
        let mut lactate = Vec::new();
        let mut heart_rate = Vec::new();

        for (row, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Malformed CSV row {}", row + 1))?;
            let field = |idx: usize, name: &str| -> Result<f64> {
                let raw = record.get(idx).unwrap_or_default();
                raw.parse::<f64>()
                    .with_context(|| format!("Row {}: invalid {} value '{}'", row + 1, name, raw))
            };
            intensity.push(field(intensity_idx, "intensity")?);
            lactate.push(field(lactate_idx, "lactate")?);
            heart_rate.push(field(hr_idx, "heart rate")?);
        }

        Ok(LactateTest::new(intensity, lactate, heart_rate, unit))
    }
}

impl TestImporter for CsvTestImporter {
    fn can_import(&self, file_path: &Path) -> bool {
        has_extension(file_path, "csv")
    }

    fn import_file(&self, file_path: &Path, unit: Option<IntensityUnit>) -> Result<LactateTest> {
        let content = std::fs::read_to_string(file_path)
            .with_context(|| format!("Failed to read {}", file_path.display()))?;
        self.parse(&content, unit)
    }

    fn format_name(&self) -> &'static str {
        "CSV"
    }
}
