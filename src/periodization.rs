use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, ValidationError};
use crate::methodology::Methodology;
use crate::models::{
    ExperienceLevel, GenerationParams, Phase, PhaseDistribution, TrainingGoal,
    VolumeProgressionEntry,
};

/// Shortest plan accepted, in weeks
pub const MIN_DURATION_WEEKS: u32 = 4;
/// Longest plan accepted, in weeks
pub const MAX_DURATION_WEEKS: u32 = 52;

/// Taper starts at this share of peak volume
const TAPER_START: Decimal = dec!(75);
/// Taper ends at this share of peak volume
const TAPER_END: Decimal = dec!(45);
/// Reported weekly volume is clamped to this band around the level default
const REPORTED_VOLUME_BAND: (Decimal, Decimal) = (dec!(0.6), dec!(1.5));

/// Phase structure and volume table for a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodizationPlan {
    pub distribution: PhaseDistribution,
    /// Week-ordered phase tags
    pub phases: Vec<Phase>,
    /// Weekly minutes at the start of BASE
    pub base_volume_minutes: Decimal,
    /// Weekly minutes at PEAK (100 %)
    pub peak_volume_minutes: Decimal,
    pub progression: Vec<VolumeProgressionEntry>,
    /// Training days per week, by phase
    pub training_days: PhaseTrainingDays,
}

/// Training days per week in each phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTrainingDays {
    pub base: u8,
    pub build: u8,
    pub peak: u8,
    pub taper: u8,
}

impl PhaseTrainingDays {
    pub fn for_phase(&self, phase: Phase) -> u8 {
        match phase {
            Phase::Base => self.base,
            Phase::Build => self.build,
            Phase::Peak => self.peak,
            Phase::Taper => self.taper,
        }
    }
}

/// Periodization planner
pub struct PeriodizationPlanner;

impl PeriodizationPlanner {
    /// Build the full periodization for a request
    pub fn plan(params: &GenerationParams, methodology: Methodology) -> Result<PeriodizationPlan> {
        let distribution = Self::phase_distribution(params.duration_weeks, methodology)?;
        let (base_volume_minutes, peak_volume_minutes) =
            Self::weekly_volume(params.level, params.goal, params.current_weekly_minutes);
        let progression = Self::volume_progression(&distribution, base_volume_minutes, peak_volume_minutes);

        let days = params.training_days;
        let training_days = PhaseTrainingDays {
            base: Self::training_days(Phase::Base, days),
            build: Self::training_days(Phase::Build, days),
            peak: Self::training_days(Phase::Peak, days),
            taper: Self::training_days(Phase::Taper, days),
        };

        info!(
            base = distribution.base,
            build = distribution.build,
            peak = distribution.peak,
            taper = distribution.taper,
            peak_minutes = %peak_volume_minutes,
            "periodization planned"
        );

        Ok(PeriodizationPlan {
            phases: distribution.phases(),
            distribution,
            base_volume_minutes,
            peak_volume_minutes,
            progression,
            training_days,
        })
    }

    /// Split a duration into phase week counts that sum exactly to it
    pub fn phase_distribution(total_weeks: u32, methodology: Methodology) -> Result<PhaseDistribution> {
        if !(MIN_DURATION_WEEKS..=MAX_DURATION_WEEKS).contains(&total_weeks) {
            return Err(ValidationError::InvalidParameter {
                parameter: "duration_weeks".to_string(),
                value: total_weeks.to_string(),
                reason: format!(
                    "must be between {} and {} weeks",
                    MIN_DURATION_WEEKS, MAX_DURATION_WEEKS
                ),
            }
            .into());
        }

        let taper = match total_weeks {
            w if w >= 20 => 3,
            w if w >= 10 => 2,
            _ => 1,
        };
        let remaining = total_weeks - taper;

        // Longer plans spend proportionally more time in BASE
        let (base_frac, build_frac, peak_frac) = match total_weeks {
            w if w >= 20 => (dec!(0.50), dec!(0.32), dec!(0.18)),
            w if w >= 12 => (dec!(0.45), dec!(0.35), dec!(0.20)),
            _ => (dec!(0.40), dec!(0.35), dec!(0.25)),
        };
        let shift = methodology.base_shift();
        let base_frac = base_frac + shift;
        let build_frac = build_frac - shift;
        debug!(%base_frac, %build_frac, %peak_frac, "phase fractions");

        let share = |fraction: Decimal| -> u32 {
            (Decimal::from(remaining) * fraction)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                .to_u32()
                .unwrap_or(1)
                .max(1)
        };
        let mut peak = share(peak_frac);
        let mut build = share(build_frac);
        while peak + build >= remaining {
            if build > 1 && build >= peak {
                build -= 1;
            } else if peak > 1 {
                peak -= 1;
            } else {
                break;
            }
        }
        let base = remaining.saturating_sub(peak + build);

        Ok(PhaseDistribution {
            base,
            build,
            peak,
            taper,
        })
    }

    /// Starting and peak weekly minutes for an athlete
    pub fn weekly_volume(
        level: ExperienceLevel,
        goal: TrainingGoal,
        current_weekly_minutes: Option<Decimal>,
    ) -> (Decimal, Decimal) {
        let default_base = Self::level_base_minutes(level) * goal.volume_multiplier();

        let base = match current_weekly_minutes {
            Some(current) if current > Decimal::ZERO => {
                let (low, high) = REPORTED_VOLUME_BAND;
                current.clamp(default_base * low, default_base * high)
            }
            _ => default_base,
        }
        .round();

        let peak = (base * Self::peak_ratio(level)).round();
        (base, peak)
    }

    fn level_base_minutes(level: ExperienceLevel) -> Decimal {
        match level {
            ExperienceLevel::Beginner => dec!(150),
            ExperienceLevel::Intermediate => dec!(240),
            ExperienceLevel::Advanced => dec!(360),
            ExperienceLevel::Elite => dec!(480),
        }
    }

    fn peak_ratio(level: ExperienceLevel) -> Decimal {
        match level {
            ExperienceLevel::Beginner => dec!(1.4),
            ExperienceLevel::Intermediate | ExperienceLevel::Advanced => dec!(1.5),
            ExperienceLevel::Elite => dec!(1.6),
        }
    }

    /// Nominal volume percentages of peak, one entry per week
    pub fn volume_progression(
        distribution: &PhaseDistribution,
        base_minutes: Decimal,
        peak_minutes: Decimal,
    ) -> Vec<VolumeProgressionEntry> {
        let start = if peak_minutes > Decimal::ZERO {
            (base_minutes / peak_minutes * dec!(100)).min(dec!(100))
        } else {
            dec!(100)
        };

        let ramp_weeks = distribution.base + distribution.build;
        let mut entries = Vec::with_capacity(distribution.total() as usize);
        let mut taper_index = 0;

        for (i, phase) in distribution.phases().into_iter().enumerate() {
            let week = i as u32 + 1;
            let percentage = match phase {
                Phase::Base | Phase::Build => {
                    start + (dec!(100) - start) * Decimal::from(i as u32) / Decimal::from(ramp_weeks.max(1))
                }
                Phase::Peak => dec!(100),
                Phase::Taper => {
                    let pct = Self::taper_percentage(taper_index, distribution.taper);
                    taper_index += 1;
                    pct
                }
            };

            entries.push(VolumeProgressionEntry {
                week,
                phase,
                volume_percentage: percentage.round_dp(1),
                focus: phase.focus().to_string(),
            });
        }
        entries
    }

    fn taper_percentage(index: u32, taper_weeks: u32) -> Decimal {
        if taper_weeks <= 1 {
            return (TAPER_START + TAPER_END) / dec!(2);
        }
        TAPER_START - (TAPER_START - TAPER_END) * Decimal::from(index) / Decimal::from(taper_weeks - 1)
    }

    /// Training days for a phase: one fewer during taper, never below two
    pub fn training_days(phase: Phase, requested: u8) -> u8 {
        match phase {
            Phase::Taper => requested.saturating_sub(1).max(2),
            _ => requested,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlannerError;
    use proptest::prelude::*;

    #[test]
    fn test_sixteen_week_split() {
        let dist = PeriodizationPlanner::phase_distribution(16, Methodology::Pyramidal).unwrap();
        assert_eq!(dist.taper, 2);
        assert_eq!(dist.total(), 16);
        assert_eq!((dist.base, dist.build, dist.peak), (6, 5, 3));

        let polarized = PeriodizationPlanner::phase_distribution(16, Methodology::Polarized).unwrap();
        assert_eq!((polarized.base, polarized.build, polarized.peak), (7, 4, 3));
    }

    #[test]
    fn test_minimum_duration_split() {
        for m in Methodology::ALL {
            let dist = PeriodizationPlanner::phase_distribution(4, m).unwrap();
            assert_eq!((dist.base, dist.build, dist.peak, dist.taper), (1, 1, 1, 1));
        }
    }

    #[test]
    fn test_taper_length_grows_with_plan() {
        let taper = |w| PeriodizationPlanner::phase_distribution(w, Methodology::Polarized).unwrap().taper;
        assert_eq!(taper(9), 1);
        assert_eq!(taper(10), 2);
        assert_eq!(taper(19), 2);
        assert_eq!(taper(20), 3);
        assert_eq!(taper(52), 3);
    }

    #[test]
    fn test_duration_out_of_range() {
        for weeks in [0, 3, 53] {
            let err = PeriodizationPlanner::phase_distribution(weeks, Methodology::Polarized).unwrap_err();
            assert!(matches!(err, PlannerError::Validation(ValidationError::InvalidParameter { .. })));
        }
    }

    #[test]
    fn test_weekly_volume_by_level() {
        let (base, peak) = PeriodizationPlanner::weekly_volume(
            ExperienceLevel::Intermediate,
            TrainingGoal::Marathon,
            None,
        );
        assert_eq!(base, dec!(300));
        assert_eq!(peak, dec!(450));
    }

    #[test]
    fn test_reported_volume_is_clamped() {
        let (base, _) = PeriodizationPlanner::weekly_volume(
            ExperienceLevel::Beginner,
            TrainingGoal::TenK,
            Some(dec!(600)),
        );
        assert_eq!(base, dec!(225));

        let (base, _) = PeriodizationPlanner::weekly_volume(
            ExperienceLevel::Beginner,
            TrainingGoal::TenK,
            Some(dec!(30)),
        );
        assert_eq!(base, dec!(90));

        let (base, _) = PeriodizationPlanner::weekly_volume(
            ExperienceLevel::Beginner,
            TrainingGoal::TenK,
            Some(dec!(180)),
        );
        assert_eq!(base, dec!(180));
    }

    #[test]
    fn test_progression_shape() {
        let dist = PeriodizationPlanner::phase_distribution(16, Methodology::Polarized).unwrap();
        let progression = PeriodizationPlanner::volume_progression(&dist, dec!(300), dec!(450));

        assert_eq!(progression.len(), 16);
        assert_eq!(progression[0].volume_percentage, dec!(66.7));
        let peak: Vec<_> = progression.iter().filter(|e| e.phase == Phase::Peak).collect();
        assert!(peak.iter().all(|e| e.volume_percentage == dec!(100)));
        let taper: Vec<_> = progression.iter().filter(|e| e.phase == Phase::Taper).collect();
        assert_eq!(taper[0].volume_percentage, dec!(75));
        assert_eq!(taper[1].volume_percentage, dec!(45));
    }

    #[test]
    fn test_single_week_taper() {
        let dist = PeriodizationPlanner::phase_distribution(8, Methodology::Pyramidal).unwrap();
        let progression = PeriodizationPlanner::volume_progression(&dist, dec!(200), dec!(300));
        assert_eq!(progression.last().unwrap().volume_percentage, dec!(60));
    }

    #[test]
    fn test_training_days() {
        assert_eq!(PeriodizationPlanner::training_days(Phase::Base, 4), 4);
        assert_eq!(PeriodizationPlanner::training_days(Phase::Taper, 4), 3);
        assert_eq!(PeriodizationPlanner::training_days(Phase::Taper, 2), 2);
    }

    fn any_methodology() -> impl Strategy<Value = Methodology> {
        prop::sample::select(Methodology::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_phases_sum_to_duration(weeks in 4u32..=52, m in any_methodology()) {
            let dist = PeriodizationPlanner::phase_distribution(weeks, m).unwrap();
            prop_assert_eq!(dist.total(), weeks);
            prop_assert!(dist.base >= 1 && dist.build >= 1 && dist.peak >= 1 && dist.taper >= 1);
        }

        #[test]
        fn prop_progression_ramps_then_tapers(weeks in 4u32..=52, m in any_methodology()) {
            let dist = PeriodizationPlanner::phase_distribution(weeks, m).unwrap();
            let progression = PeriodizationPlanner::volume_progression(&dist, dec!(240), dec!(360));
            prop_assert_eq!(progression.len() as u32, weeks);

            let mut previous = Decimal::ZERO;
            for entry in progression.iter().filter(|e| e.phase != Phase::Taper) {
                prop_assert!(entry.volume_percentage >= previous);
                prop_assert!(entry.volume_percentage <= dec!(100));
                previous = entry.volume_percentage;
            }
            let mut previous = dec!(100);
            for entry in progression.iter().filter(|e| e.phase == Phase::Taper) {
                prop_assert!(entry.volume_percentage < previous);
                previous = entry.volume_percentage;
            }
        }
    }
}
