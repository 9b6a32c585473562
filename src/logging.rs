//! Structured logging for lactateplan
//!
//! Console output goes to stderr so program JSON on stdout stays clean.
//! An optional JSON file layer rotates daily.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Dependencies whose events are only wanted at warn and above
const QUIET_TARGETS: [&str; 2] = ["rusqlite", "tokio"];

const DEFAULT_LOG_FILE: &str = "lactateplan.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// JSON log file; console only when unset
    pub log_file: Option<PathBuf>,
    /// Roll the log file over daily
    pub rotation: bool,
    /// Source file and line on console events
    pub include_location: bool,
    /// Span enter/close events and span context
    pub include_spans: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            log_file: None,
            rotation: true,
            include_location: false,
            include_spans: false,
        }
    }
}

/// Verbosity of the crate's own events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

const LEVELS: [(LogLevel, &str, Level); 5] = [
    (LogLevel::Error, "error", Level::ERROR),
    (LogLevel::Warn, "warn", Level::WARN),
    (LogLevel::Info, "info", Level::INFO),
    (LogLevel::Debug, "debug", Level::DEBUG),
    (LogLevel::Trace, "trace", Level::TRACE),
];

impl LogLevel {
    fn entry(&self) -> (LogLevel, &'static str, Level) {
        LEVELS
            .into_iter()
            .find(|(level, _, _)| level == self)
            .unwrap_or(LEVELS[1])
    }

    pub fn to_tracing_level(&self) -> Level {
        self.entry().2
    }

    pub fn as_str(&self) -> &'static str {
        self.entry().1
    }

    /// Level for a `-v` count on top of the configured one
    pub fn from_verbosity(count: u8) -> Option<Self> {
        match count {
            0 => None,
            1 => Some(LogLevel::Info),
            2 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = match s.trim().to_lowercase().as_str() {
            "warning" => "warn".to_string(),
            other => other.to_string(),
        };
        LEVELS
            .into_iter()
            .find(|(_, name, _)| *name == wanted)
            .map(|(level, _, _)| level)
            .ok_or_else(|| format!("unknown log level '{}' (error, warn, info, debug, trace)", s))
    }
}

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, colored
    Pretty,
    /// One JSON object per event
    Json,
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [LogFormat::Pretty, LogFormat::Json, LogFormat::Compact]
            .into_iter()
            .find(|f| format!("{:?}", f).eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown log format '{}' (pretty, json, compact)", s))
    }
}

/// Filter directive: the crate at the configured level, noisy dependencies at warn
pub fn filter_directive(config: &LogConfig) -> String {
    let mut directive = format!("lactateplan={}", config.level.as_str());
    for target in QUIET_TARGETS {
        directive.push_str(&format!(",{}=warn", target));
    }
    directive
}

fn console_layer(config: &LogConfig) -> BoxedLayer {
    let span_events = if config.include_spans {
        FmtSpan::ENTER | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };
    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    match config.format {
        LogFormat::Pretty => base.pretty().with_span_events(span_events).boxed(),
        LogFormat::Compact => base.compact().with_span_events(span_events).boxed(),
        LogFormat::Json => base
            .json()
            .with_current_span(config.include_spans)
            .with_span_list(config.include_spans)
            .boxed(),
    }
}

fn file_layer(path: &Path, rotation: bool) -> anyhow::Result<BoxedLayer> {
    let directory = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(directory)?;

    let layer = if rotation {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(DEFAULT_LOG_FILE);
        fmt::layer()
            .json()
            .with_writer(tracing_appender::rolling::daily(directory, file_name))
            .boxed()
    } else {
        let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        fmt::layer()
            .json()
            .with_writer(std::sync::Mutex::new(file))
            .boxed()
    };
    Ok(layer)
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

    let mut layers = vec![console_layer(config)];
    if let Some(path) = &config.log_file {
        layers.push(file_layer(path, config.rotation)?);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()?;

    tracing::debug!(
        level = config.level.as_str(),
        format = ?config.format,
        file = ?config.log_file,
        "logging initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_level_names() {
        assert_eq!("Debug".parse::<LogLevel>().unwrap(), LogLevel::Debug);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("verbose".parse::<LogLevel>().is_err());
        for (level, name, tracing_level) in LEVELS {
            assert_eq!(level.as_str(), name);
            assert_eq!(level.to_tracing_level(), tracing_level);
        }
    }

    #[test]
    fn test_format_names() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" compact ".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(LogLevel::from_verbosity(0), None);
        assert_eq!(LogLevel::from_verbosity(2), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_verbosity(9), Some(LogLevel::Trace));
    }

    #[test]
    fn test_filter_directive_quiets_dependencies() {
        let config = LogConfig {
            level: LogLevel::Debug,
            ..LogConfig::default()
        };
        assert_eq!(
            filter_directive(&config),
            "lactateplan=debug,rusqlite=warn,tokio=warn"
        );
    }

    #[test]
    fn test_file_layer_creates_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("plan.log");
        assert!(file_layer(&path, false).is_ok());
        assert!(path.exists());
    }
}
