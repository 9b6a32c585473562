// Library interface for lactateplan modules
// This allows integration tests and benches to access the core functionality

pub mod assembler;
pub mod catalog;
pub mod config;
pub mod curve_fit;
pub mod database;
pub mod deload;
pub mod distribution;
pub mod error;
pub mod import;
pub mod logging;
pub mod methodology;
pub mod models;
pub mod periodization;
pub mod threshold;
pub mod threshold_policy;
pub mod workouts;
pub mod zones;

// Re-export commonly used types for convenience
pub use assembler::{ProgramAssembler, ResolvedInputs};
pub use catalog::{AthleteDataSource, ExerciseFilter, InMemoryDataSource};
pub use database::Database;
pub use deload::{DeloadPolicy, DeloadScheduler};
pub use error::{PlannerError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use methodology::{Methodology, MethodologyRequest, MethodologySelector};
pub use models::*;
pub use periodization::PeriodizationPlanner;
pub use threshold::ThresholdDetector;
pub use threshold_policy::ThresholdPolicy;
pub use workouts::WorkoutBuilder;
pub use zones::ZoneCalculator;
