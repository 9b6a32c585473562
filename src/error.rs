//! Unified error hierarchy for lactateplan
//!
//! Validation and fatal generation failures surface as errors. Degraded
//! outcomes (poor curve fit, implausible thresholds, empty exercise lookups)
//! never do: they travel as warnings on the result instead.

use thiserror::Error;

/// Top-level error type for all planner operations
#[derive(Debug, Error)]
pub enum PlannerError {
    /// Malformed test input or generation parameters
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Not enough points to fit a curve
    #[error("Insufficient data: {0}")]
    InsufficientData(#[from] InsufficientDataError),

    /// Numerical failure inside a calculation
    #[error("Calculation error: {0}")]
    Calculation(String),

    /// Fatal invariant violation while assembling a program
    #[error("Program generation failed: {0}")]
    ProgramGeneration(#[from] ProgramGenerationError),

    /// Persistence adapter errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Input validation errors. Nothing is computed when one of these is raised.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Fewer test stages than the detector needs
    #[error("Too few test stages: found {found}, need at least {required}")]
    TooFewStages { found: usize, required: usize },

    /// Stage sequences of different lengths
    #[error(
        "Mismatched stage arrays: intensity={intensity}, lactate={lactate}, heart_rate={heart_rate}"
    )]
    MismatchedLengths {
        intensity: usize,
        lactate: usize,
        heart_rate: usize,
    },

    /// Effort does not increase from one stage to the next
    #[error("Stage {stage} does not increase in intensity over the previous stage")]
    NonIncreasingIntensity { stage: usize },

    /// A measurement outside its physical range
    #[error("Invalid value for {field} at stage {stage}: {value}")]
    InvalidMeasurement {
        field: String,
        stage: usize,
        value: f64,
    },

    /// Generation parameter out of range
    #[error("Invalid parameter {parameter}={value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    /// Neither test stages nor stored zones are available
    #[error("No usable threshold data: {0}")]
    NoThresholdData(String),
}

/// Raised by the curve fitter when fewer than the required points are given
#[derive(Debug, Clone, PartialEq, Error)]
#[error("need at least {required} points to fit a cubic curve, got {points}")]
pub struct InsufficientDataError {
    pub points: usize,
    pub required: usize,
}

/// Fatal errors that abort program generation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgramGenerationError {
    /// The volume progression has no entry for a scheduled week
    #[error("volume progression has no entry for week {week} (only {available} weeks planned)")]
    MissingWeek { week: u32, available: usize },

    /// Phase list and volume progression disagree
    #[error("week {week} is {expected} in the phase plan but {actual} in the volume progression")]
    PhaseMismatch {
        week: u32,
        expected: String,
        actual: String,
    },

    /// Phase counts do not add up to the requested duration
    #[error("phase weeks sum to {actual}, expected {expected}")]
    PhaseSum { expected: u32, actual: u32 },
}

/// Failures reported by the external data collaborator.
/// These are logged and degraded, never propagated out of generation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    /// Backend failed to answer
    #[error("{source_name} lookup failed: {reason}")]
    Backend { source_name: String, reason: String },

    /// Stored record could not be decoded
    #[error("{source_name} returned malformed data: {reason}")]
    Malformed { source_name: String, reason: String },
}

/// Persistence adapter errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Compression error: {0}")]
    Compression(#[from] std::io::Error),
    #[error("Record not found: {table}.{id}")]
    NotFound { table: String, id: String },
}

/// Result type alias for planner operations
pub type Result<T> = std::result::Result<T, PlannerError>;

impl PlannerError {
    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PlannerError::Validation(_) => ErrorSeverity::Warning,
            PlannerError::InsufficientData(_) => ErrorSeverity::Warning,
            PlannerError::Database(DatabaseError::NotFound { .. }) => ErrorSeverity::Warning,
            PlannerError::ProgramGeneration(_) => ErrorSeverity::Critical,
            PlannerError::Calculation(_) => ErrorSeverity::Error,
            _ => ErrorSeverity::Error,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            PlannerError::Validation(ValidationError::TooFewStages { found, required }) => {
                format!(
                    "The test has {} stages; at least {} are needed to locate a threshold.",
                    found, required
                )
            }
            PlannerError::Validation(ValidationError::MismatchedLengths { .. }) => {
                "Every test stage needs an intensity, a lactate and a heart-rate value.".to_string()
            }
            PlannerError::ProgramGeneration(ProgramGenerationError::MissingWeek { week, .. }) => {
                format!(
                    "The plan could not be generated: week {} has no volume target.",
                    week
                )
            }
            PlannerError::ProgramGeneration(_) => {
                "The plan could not be generated because its week structure is inconsistent."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Internal inconsistency, output must not be used
    Critical,
    /// Error that prevents the operation
    Error,
    /// Bad input the caller can correct
    Warning,
}

impl ErrorSeverity {
    /// Convert to tracing level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            ErrorSeverity::Critical => tracing::Level::ERROR,
            ErrorSeverity::Error => tracing::Level::ERROR,
            ErrorSeverity::Warning => tracing::Level::WARN,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        let err = PlannerError::Validation(ValidationError::TooFewStages {
            found: 3,
            required: 4,
        });
        assert_eq!(err.severity(), ErrorSeverity::Warning);

        let err = PlannerError::ProgramGeneration(ProgramGenerationError::MissingWeek {
            week: 12,
            available: 11,
        });
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.severity().to_tracing_level(), tracing::Level::ERROR);
    }

    #[test]
    fn test_user_messages() {
        let err = PlannerError::from(ValidationError::TooFewStages {
            found: 2,
            required: 4,
        });
        assert!(err.user_message().contains("at least 4"));

        let err = PlannerError::from(ProgramGenerationError::MissingWeek {
            week: 9,
            available: 8,
        });
        assert!(err.user_message().contains("week 9"));
    }

    #[test]
    fn test_missing_week_names_the_week() {
        let err = ProgramGenerationError::MissingWeek {
            week: 16,
            available: 15,
        };
        assert!(err.to_string().contains("week 16"));
    }
}
