use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::assembler::DEFAULT_PACE_TOLERANCE;
use crate::deload::DeloadPolicy;
use crate::logging::{LogConfig, LogFormat, LogLevel};
use crate::methodology::MethodologyRequest;
use crate::models::EquipmentFlags;
use crate::threshold_policy::ThresholdPolicy;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application metadata
    pub metadata: ConfigMetadata,

    /// Threshold detection constants
    #[serde(default)]
    pub threshold: ThresholdPolicy,

    /// Deload cadence and depth
    #[serde(default)]
    pub deload: DeloadPolicy,

    /// Defaults applied to generation requests
    #[serde(default)]
    pub planning: PlanningSettings,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

/// Configuration metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigMetadata {
    /// Configuration format version
    pub version: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

/// Generation defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanningSettings {
    /// Methodology used when the request does not name one: "auto" or a methodology name
    pub methodology: String,

    /// Training days per week
    pub training_days: u8,

    /// Allowed relative gap between race-predicted and tested threshold
    pub pace_tolerance: f64,

    /// Equipment assumed when the request does not say
    pub equipment: EquipmentFlags,
}

impl Default for PlanningSettings {
    fn default() -> Self {
        Self {
            methodology: "auto".to_string(),
            training_days: 5,
            pace_tolerance: DEFAULT_PACE_TOLERANCE,
            equipment: EquipmentFlags::default(),
        }
    }
}

impl PlanningSettings {
    pub fn methodology_request(&self) -> MethodologyRequest {
        match self.methodology.parse() {
            Ok(request) => request,
            Err(never) => match never {},
        }
    }
}

/// Logging settings, mirrored into [`LogConfig`] at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
    pub log_file: Option<PathBuf>,
    pub include_location: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            log_file: None,
            include_location: false,
        }
    }
}

impl LoggingSettings {
    /// Logging config with the CLI overrides applied on top
    pub fn to_log_config(&self, level: Option<&str>, format: Option<&str>) -> Result<LogConfig> {
        let level = level.unwrap_or(&self.level);
        let format = format.unwrap_or(&self.format);
        Ok(LogConfig {
            level: level
                .parse::<LogLevel>()
                .map_err(|e| anyhow::anyhow!(e))
                .with_context(|| format!("Invalid log level in configuration: {}", level))?,
            format: format
                .parse::<LogFormat>()
                .map_err(|e| anyhow::anyhow!(e))
                .with_context(|| format!("Invalid log format in configuration: {}", format))?,
            log_file: self.log_file.clone(),
            include_location: self.include_location,
            ..LogConfig::default()
        })
    }
}

/// Persistence settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Save generated programs to SQLite
    pub enabled: bool,
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            path: AppConfig::config_dir().join("lactateplan.db"),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let now = Utc::now();
        AppConfig {
            metadata: ConfigMetadata {
                version: "1.0".to_string(),
                created_at: now,
                updated_at: now,
            },
            threshold: ThresholdPolicy::default(),
            deload: DeloadPolicy::default(),
            planning: PlanningSettings::default(),
            logging: LoggingSettings::default(),
            database: DatabaseSettings::default(),
        }
    }
}

/// Configuration management implementation
impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.metadata.updated_at = Utc::now();

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Directory holding the configuration and default database
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lactateplan")
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration with fallback to defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        if !config_path.exists() {
            tracing::debug!(path = %config_path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_file(&config_path)
    }

    /// Reject values the planner cannot work with
    pub fn validate(&self) -> Result<()> {
        self.threshold
            .validate()
            .map_err(|e| anyhow::anyhow!(e))
            .context("Invalid [threshold] section")?;
        self.deload
            .validate()
            .map_err(|e| anyhow::anyhow!(e))
            .context("Invalid [deload] section")?;

        if !(2..=7).contains(&self.planning.training_days) {
            anyhow::bail!(
                "planning.training_days must be between 2 and 7, got {}",
                self.planning.training_days
            );
        }
        if !(self.planning.pace_tolerance > 0.0 && self.planning.pace_tolerance < 1.0) {
            anyhow::bail!(
                "planning.pace_tolerance must be in (0, 1), got {}",
                self.planning.pace_tolerance
            );
        }
        Ok(())
    }
}
