//! Recovery (deload) week placement
//!
//! Deloads scale the nominal volume of a week. The nominal progression is
//! never modified; the effective volume is carried on each [`WeekPlan`].

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::methodology::Methodology;
use crate::models::{DeloadSchedule, DeloadWeek, ExperienceLevel, Phase, VolumeProgressionEntry, WeekPlan};
use crate::periodization::PhaseTrainingDays;

/// Cadence and depth for one experience level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDeload {
    /// A deload every `cadence` weeks
    pub cadence: u32,
    /// Multiplier applied to the nominal volume
    pub reduction_factor: Decimal,
}

/// Tunable deload policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeloadPolicy {
    pub beginner: LevelDeload,
    pub intermediate: LevelDeload,
    pub advanced: LevelDeload,
    pub elite: LevelDeload,
    /// Extra reduction for threshold-concentrated training
    pub threshold_concentrated_extra_depth: Decimal,
    /// Peak weekly minutes from which cadence is tightened
    pub high_volume_minutes: Decimal,
    /// Longest cadence allowed for high-volume plans
    pub high_volume_max_cadence: u32,
    /// Lowest effective volume percentage a deload may produce
    pub volume_floor: Decimal,
}

impl Default for DeloadPolicy {
    fn default() -> Self {
        Self {
            beginner: LevelDeload { cadence: 4, reduction_factor: dec!(0.80) },
            intermediate: LevelDeload { cadence: 4, reduction_factor: dec!(0.75) },
            advanced: LevelDeload { cadence: 3, reduction_factor: dec!(0.70) },
            elite: LevelDeload { cadence: 3, reduction_factor: dec!(0.65) },
            threshold_concentrated_extra_depth: dec!(0.05),
            high_volume_minutes: dec!(480),
            high_volume_max_cadence: 3,
            volume_floor: dec!(40),
        }
    }
}

impl DeloadPolicy {
    pub fn for_level(&self, level: ExperienceLevel) -> LevelDeload {
        match level {
            ExperienceLevel::Beginner => self.beginner,
            ExperienceLevel::Intermediate => self.intermediate,
            ExperienceLevel::Advanced => self.advanced,
            ExperienceLevel::Elite => self.elite,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, level) in [
            ("beginner", self.beginner),
            ("intermediate", self.intermediate),
            ("advanced", self.advanced),
            ("elite", self.elite),
        ] {
            if level.cadence < 2 {
                return Err(format!("{} deload cadence must be at least 2 weeks", name));
            }
            if level.reduction_factor <= Decimal::ZERO || level.reduction_factor > Decimal::ONE {
                return Err(format!("{} reduction factor must be in (0, 1]", name));
            }
        }
        if self.high_volume_max_cadence < 2 {
            return Err("high_volume_max_cadence must be at least 2".to_string());
        }
        if self.volume_floor < Decimal::ZERO || self.volume_floor > dec!(100) {
            return Err("volume_floor must be a percentage".to_string());
        }
        Ok(())
    }
}

/// Places deload weeks and derives effective weekly volume
#[derive(Debug, Clone, Default)]
pub struct DeloadScheduler {
    policy: DeloadPolicy,
}

impl DeloadScheduler {
    pub fn new(policy: DeloadPolicy) -> Self {
        Self { policy }
    }

    /// Cadence and reduction factor after methodology and volume adjustments
    pub fn effective_policy(
        &self,
        level: ExperienceLevel,
        methodology: Methodology,
        peak_minutes: Decimal,
    ) -> LevelDeload {
        let mut deload = self.policy.for_level(level);
        if methodology == Methodology::ThresholdConcentrated {
            deload.reduction_factor -= self.policy.threshold_concentrated_extra_depth;
        }
        if peak_minutes >= self.policy.high_volume_minutes {
            deload.cadence = deload.cadence.min(self.policy.high_volume_max_cadence);
        }
        deload.cadence = deload.cadence.max(2);
        deload
    }

    /// Deload weeks for a progression. Never week 1, never in TAPER.
    pub fn schedule(
        &self,
        level: ExperienceLevel,
        methodology: Methodology,
        peak_minutes: Decimal,
        progression: &[VolumeProgressionEntry],
    ) -> DeloadSchedule {
        let LevelDeload { cadence, reduction_factor } =
            self.effective_policy(level, methodology, peak_minutes);

        let weeks: Vec<DeloadWeek> = progression
            .iter()
            .filter(|e| e.week > 1 && e.week % cadence == 0 && e.phase != Phase::Taper)
            .map(|e| DeloadWeek {
                week: e.week,
                reduction_factor: self.floored_factor(e.volume_percentage, reduction_factor),
            })
            .collect();

        info!(cadence, count = weeks.len(), "deload weeks scheduled");
        DeloadSchedule { cadence, weeks }
    }

    /// Raise a factor so the effective volume does not drop below the floor
    fn floored_factor(&self, nominal: Decimal, factor: Decimal) -> Decimal {
        if nominal <= Decimal::ZERO {
            return factor;
        }
        let minimum = (self.policy.volume_floor / nominal).min(Decimal::ONE);
        if factor < minimum {
            debug!(%nominal, %factor, %minimum, "deload factor raised to volume floor");
            minimum.round_dp_with_strategy(4, RoundingStrategy::AwayFromZero)
        } else {
            factor
        }
    }

    /// Week-by-week table with effective volume and training days
    pub fn apply(
        &self,
        schedule: &DeloadSchedule,
        progression: &[VolumeProgressionEntry],
        peak_minutes: Decimal,
        training_days: &PhaseTrainingDays,
    ) -> Vec<WeekPlan> {
        progression
            .iter()
            .map(|entry| {
                let deload = schedule.get(entry.week).copied();
                let effective = match deload {
                    Some(d) => (entry.volume_percentage * d.reduction_factor)
                        .max(self.policy.volume_floor.min(entry.volume_percentage))
                        .round_dp(1),
                    None => entry.volume_percentage,
                };
                WeekPlan {
                    week: entry.week,
                    phase: entry.phase,
                    nominal_percentage: entry.volume_percentage,
                    effective_percentage: effective,
                    volume_minutes: (peak_minutes * effective / dec!(100)).round(),
                    training_days: training_days.for_phase(entry.phase),
                    deload,
                    focus: entry.focus.clone(),
                }
            })
            .collect()
    }
}
