//! Training methodologies and automatic methodology selection

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::models::{AthleteClassification, ExperienceLevel, Phase, TrainingGoal, WorkoutCategory};

/// Implemented intensity-distribution methodologies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Methodology {
    /// Mostly easy, a little hard, very little moderate
    Polarized,
    /// Volume decreasing with intensity
    Pyramidal,
    /// Frequent controlled threshold sessions (double-threshold style)
    ThresholdConcentrated,
    /// One weekly threshold-focused session on an easy base
    SingleThreshold,
}

impl Methodology {
    pub const ALL: [Methodology; 4] = [
        Methodology::Polarized,
        Methodology::Pyramidal,
        Methodology::ThresholdConcentrated,
        Methodology::SingleThreshold,
    ];

    /// Map any requested name onto an implemented methodology
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().replace('_', "-").as_str() {
            "polarized" | "polarised" | "80/20" | "hiit" => Methodology::Polarized,
            "pyramidal" | "traditional" | "linear" => Methodology::Pyramidal,
            "threshold-concentrated" | "threshold" | "norwegian" | "double-threshold" => {
                Methodology::ThresholdConcentrated
            }
            "single-threshold" | "sweet-spot" | "sweetspot" => Methodology::SingleThreshold,
            other => {
                debug!(requested = other, "unknown methodology, using polarized");
                Methodology::Polarized
            }
        }
    }

    /// Target share of endurance time per effort class
    pub fn target_distribution(&self) -> TargetDistribution {
        let (easy, moderate, hard) = match self {
            Methodology::Polarized => (dec!(80), dec!(5), dec!(15)),
            Methodology::Pyramidal => (dec!(77), dec!(18), dec!(5)),
            Methodology::ThresholdConcentrated => (dec!(70), dec!(25), dec!(5)),
            Methodology::SingleThreshold => (dec!(85), dec!(10), dec!(5)),
        };
        TargetDistribution {
            easy,
            moderate,
            hard,
        }
    }

    /// Quality sessions per week in each phase
    pub fn quality_sessions(&self) -> QualitySessions {
        match self {
            Methodology::Polarized => QualitySessions { base: 1, build: 2, peak: 2, taper: 1 },
            Methodology::Pyramidal => QualitySessions { base: 1, build: 2, peak: 2, taper: 1 },
            Methodology::ThresholdConcentrated => {
                QualitySessions { base: 2, build: 2, peak: 3, taper: 1 }
            }
            Methodology::SingleThreshold => QualitySessions { base: 1, build: 1, peak: 2, taper: 1 },
        }
    }

    /// Quality session rotation for a phase; repeated when more sessions are needed
    pub fn quality_categories(&self, phase: Phase) -> &'static [WorkoutCategory] {
        use WorkoutCategory::*;
        match (self, phase) {
            (Methodology::Polarized, Phase::Base) => &[HillSprint, Interval],
            (Methodology::Polarized, Phase::Build) => &[Interval, HillSprint],
            (Methodology::Polarized, Phase::Peak) => &[Interval, Interval],
            (Methodology::Polarized, Phase::Taper) => &[Interval],

            (Methodology::Pyramidal, Phase::Base) => &[Tempo, HillSprint],
            (Methodology::Pyramidal, Phase::Build) => &[Tempo, Interval],
            (Methodology::Pyramidal, Phase::Peak) => &[Interval, Tempo],
            (Methodology::Pyramidal, Phase::Taper) => &[Tempo],

            (Methodology::ThresholdConcentrated, Phase::Base) => &[MethodologyInterval, Tempo],
            (Methodology::ThresholdConcentrated, Phase::Build) => {
                &[MethodologyInterval, MethodologyInterval]
            }
            (Methodology::ThresholdConcentrated, Phase::Peak) => {
                &[MethodologyInterval, Interval, MethodologyInterval]
            }
            (Methodology::ThresholdConcentrated, Phase::Taper) => &[MethodologyInterval],

            (Methodology::SingleThreshold, Phase::Base) => &[Tempo],
            (Methodology::SingleThreshold, Phase::Build) => &[MethodologyInterval],
            (Methodology::SingleThreshold, Phase::Peak) => &[MethodologyInterval, Interval],
            (Methodology::SingleThreshold, Phase::Taper) => &[Tempo],
        }
    }

    /// Shape of the methodology-specific interval session
    pub fn interval_shape(&self) -> IntervalShape {
        match self {
            Methodology::Polarized => IntervalShape { reps: 4, work_seconds: 240, rest_seconds: 180, zone: 5 },
            Methodology::Pyramidal => IntervalShape { reps: 5, work_seconds: 300, rest_seconds: 120, zone: 4 },
            Methodology::ThresholdConcentrated => {
                IntervalShape { reps: 5, work_seconds: 360, rest_seconds: 60, zone: 4 }
            }
            Methodology::SingleThreshold => {
                IntervalShape { reps: 2, work_seconds: 900, rest_seconds: 180, zone: 3 }
            }
        }
    }

    /// Share of weekly volume given to the long session
    pub fn long_session_share(&self) -> Decimal {
        match self {
            Methodology::ThresholdConcentrated => dec!(0.22),
            _ => dec!(0.25),
        }
    }

    /// Shift of phase weeks from BUILD to BASE (negative moves weeks into BUILD)
    pub fn base_shift(&self) -> Decimal {
        match self {
            Methodology::Polarized => dec!(0.05),
            Methodology::Pyramidal => dec!(0),
            Methodology::ThresholdConcentrated => dec!(-0.05),
            Methodology::SingleThreshold => dec!(0.05),
        }
    }

    pub fn config(&self) -> MethodologyConfig {
        MethodologyConfig {
            methodology: *self,
            distribution: self.target_distribution(),
            quality_sessions: self.quality_sessions(),
            long_session_share: self.long_session_share(),
        }
    }
}

impl fmt::Display for Methodology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Methodology::Polarized => write!(f, "Polarized"),
            Methodology::Pyramidal => write!(f, "Pyramidal"),
            Methodology::ThresholdConcentrated => write!(f, "Threshold-concentrated"),
            Methodology::SingleThreshold => write!(f, "Single-threshold"),
        }
    }
}

/// Requested methodology, before automatic selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MethodologyRequest {
    #[default]
    Auto,
    Explicit(Methodology),
}

impl FromStr for MethodologyRequest {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            Ok(MethodologyRequest::Auto)
        } else {
            Ok(MethodologyRequest::Explicit(Methodology::from_name(trimmed)))
        }
    }
}

/// Easy / moderate / hard percentages, summing to 100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDistribution {
    pub easy: Decimal,
    pub moderate: Decimal,
    pub hard: Decimal,
}

/// Quality sessions per week by phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySessions {
    pub base: u8,
    pub build: u8,
    pub peak: u8,
    pub taper: u8,
}

impl QualitySessions {
    pub fn for_phase(&self, phase: Phase) -> u8 {
        match phase {
            Phase::Base => self.base,
            Phase::Build => self.build,
            Phase::Peak => self.peak,
            Phase::Taper => self.taper,
        }
    }
}

/// Repetition structure of an interval session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalShape {
    pub reps: u32,
    pub work_seconds: u32,
    pub rest_seconds: u32,
    pub zone: u8,
}

/// Resolved methodology with its shaping parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodologyConfig {
    pub methodology: Methodology,
    pub distribution: TargetDistribution,
    pub quality_sessions: QualitySessions,
    pub long_session_share: Decimal,
}

/// Automatic methodology selection
pub struct MethodologySelector;

impl MethodologySelector {
    /// Resolve a request into a concrete methodology
    pub fn select(
        request: MethodologyRequest,
        level: ExperienceLevel,
        goal: TrainingGoal,
        classification: Option<&AthleteClassification>,
    ) -> Methodology {
        let methodology = match request {
            MethodologyRequest::Explicit(m) => m,
            MethodologyRequest::Auto => match classification {
                Some(c) => Self::from_classification(c),
                None => Self::from_profile(level, goal),
            },
        };
        debug!(?request, %methodology, "methodology selected");
        methodology
    }

    fn from_classification(classification: &AthleteClassification) -> Methodology {
        let goal = classification.goal;
        let general_fitness = matches!(
            goal,
            TrainingGoal::Maintenance | TrainingGoal::BaseBuilding | TrainingGoal::ReturnFromBreak
        );

        match classification.level {
            ExperienceLevel::Beginner => Methodology::Pyramidal,
            _ if general_fitness => Methodology::SingleThreshold,
            ExperienceLevel::Intermediate if goal.is_long_distance() => Methodology::Pyramidal,
            ExperienceLevel::Intermediate => Methodology::Polarized,
            ExperienceLevel::Advanced | ExperienceLevel::Elite if goal.is_long_distance() => {
                Methodology::ThresholdConcentrated
            }
            ExperienceLevel::Advanced | ExperienceLevel::Elite => Methodology::Polarized,
        }
    }

    fn from_profile(level: ExperienceLevel, goal: TrainingGoal) -> Methodology {
        match level {
            ExperienceLevel::Advanced | ExperienceLevel::Elite if goal.is_long_distance() => {
                Methodology::ThresholdConcentrated
            }
            _ => Methodology::Polarized,
        }
    }
}
