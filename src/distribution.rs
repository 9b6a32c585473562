//! Weekly workout distribution
//!
//! Turns one [`WeekPlan`] into abstract [`WorkoutPlanEntry`]s: a long session,
//! quality sessions spaced across the week, easy or recovery fill, and
//! secondary strength/core/plyometric sessions on easy days.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::methodology::MethodologyConfig;
use crate::models::{
    BodyRegion, EquipmentFlags, IntensityUnit, Phase, RaceResult, SessionCounts, Sport,
    TrainingGoal, WeekPlan, WorkoutCategory, WorkoutParams, WorkoutPlanEntry, ZoneTable,
};

/// Day of the week holding the long session
pub const LONG_SESSION_DAY: u8 = 6;

/// Preferred quality days, most preferred first
const QUALITY_DAY_PREFERENCE: [u8; 6] = [2, 4, 3, 5, 1, 7];

/// Easy sessions shorter than this become recovery sessions
const MIN_EASY_MINUTES: u32 = 20;
const MIN_LONG_MINUTES: u32 = 30;
const QUALITY_WARMUP_MINUTES: u32 = 15;
const QUALITY_COOLDOWN_MINUTES: u32 = 10;
/// Bounds on the work portion of one quality session, minutes
const QUALITY_WORK_RANGE: (u32, u32) = (10, 40);

/// Training days used for each weekly day count
pub fn day_template(training_days: u8) -> &'static [u8] {
    match training_days {
        0 => &[],
        1 => &[6],
        2 => &[3, 6],
        3 => &[2, 4, 6],
        4 => &[2, 4, 6, 7],
        5 => &[2, 3, 4, 6, 7],
        6 => &[1, 2, 3, 4, 6, 7],
        _ => &[1, 2, 3, 4, 5, 6, 7],
    }
}

/// Agreement between a recent race and the zone table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaceCheck {
    /// Average race speed, km/h
    pub race_speed: f64,
    /// Threshold speed predicted from the race
    pub predicted_threshold: f64,
    /// Threshold speed the zones are anchored on
    pub zone_threshold: f64,
    /// Relative difference between predicted and zone threshold
    pub deviation: f64,
    pub passed: bool,
}

impl PaceCheck {
    /// Compare a running race with speed zones. Other combinations are not checked.
    pub fn evaluate(race: &RaceResult, zones: &ZoneTable, tolerance: f64) -> Option<Self> {
        if race.sport != Sport::Running || zones.unit != IntensityUnit::Speed {
            return None;
        }
        let race_speed = race.average_speed()?;
        let zone_threshold = zones.threshold_intensity;
        if zone_threshold <= 0.0 {
            return None;
        }

        // Threshold pace relative to race pace by event length
        let factor = match race.distance_m {
            d if d <= 5_000 => 0.93,
            d if d <= 10_000 => 0.96,
            d if d <= 21_100 => 0.99,
            _ => 1.04,
        };
        let predicted_threshold = race_speed * factor;
        let deviation = (predicted_threshold - zone_threshold).abs() / zone_threshold;
        let passed = deviation <= tolerance;

        debug!(race_speed, predicted_threshold, zone_threshold, deviation, passed, "race pace check");
        Some(Self {
            race_speed,
            predicted_threshold,
            zone_threshold,
            deviation,
            passed,
        })
    }
}

/// Everything the engine needs to lay out one week
#[derive(Debug, Clone)]
pub struct WeekContext<'a> {
    pub plan: &'a WeekPlan,
    pub methodology: &'a MethodologyConfig,
    pub goal: TrainingGoal,
    pub sessions: SessionCounts,
    pub equipment: EquipmentFlags,
    pub pace_check: Option<&'a PaceCheck>,
}

/// Abstract sessions for one week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekDistribution {
    pub week: u32,
    /// Ordered by day, primary session before secondary sessions
    pub entries: Vec<WorkoutPlanEntry>,
    pub quality_days: Vec<u8>,
    pub notes: Vec<String>,
}

impl WeekDistribution {
    pub fn entries_for_day(&self, day: u8) -> impl Iterator<Item = &WorkoutPlanEntry> {
        self.entries.iter().filter(move |e| e.day_number == day)
    }
}

/// Workout distribution engine
pub struct DistributionEngine;

impl DistributionEngine {
    pub fn distribute_week(ctx: &WeekContext<'_>) -> WeekDistribution {
        let plan = ctx.plan;
        let mut notes = Vec::new();
        let template = day_template(plan.training_days);
        let volume = plan.volume_minutes.max(Decimal::ZERO);

        let quality_count = Self::quality_count(ctx, template.len(), &mut notes);
        let quality_days = Self::select_quality_days(template, quality_count);
        let has_long = template.contains(&LONG_SESSION_DAY);

        // Long session
        let long_minutes = if has_long {
            to_minutes(volume * ctx.methodology.long_session_share).max(MIN_LONG_MINUTES)
        } else {
            0
        };

        // Quality sessions sized from the moderate + hard share of the week
        let distribution = &ctx.methodology.distribution;
        let work_budget = volume * (distribution.moderate + distribution.hard) / dec!(100);
        let work_per_session = if quality_days.is_empty() {
            0
        } else {
            let (lo, hi) = QUALITY_WORK_RANGE;
            to_minutes(work_budget / Decimal::from(quality_days.len() as u32)).clamp(lo, hi)
        };

        let categories = ctx.methodology.methodology.quality_categories(plan.phase);
        let mut entries = Vec::new();
        let mut quality_minutes = 0;
        for (i, &day) in quality_days.iter().enumerate() {
            let category = categories[i % categories.len()];
            let params = Self::quality_params(ctx, category, work_per_session);
            quality_minutes += approximate_minutes(&params);
            entries.push(WorkoutPlanEntry::new(day, params));
        }

        if has_long {
            let finish_minutes = Self::long_finish_minutes(ctx);
            entries.push(WorkoutPlanEntry::new(
                LONG_SESSION_DAY,
                WorkoutParams::LongSession {
                    minutes: long_minutes,
                    finish_minutes,
                },
            ));
        }

        // Easy fill
        let easy_days: Vec<u8> = template
            .iter()
            .copied()
            .filter(|d| *d != LONG_SESSION_DAY && !quality_days.contains(d))
            .collect();
        if !easy_days.is_empty() {
            let remaining = to_minutes(volume).saturating_sub(long_minutes + quality_minutes);
            let per_day = remaining / easy_days.len() as u32;
            for &day in &easy_days {
                let after_long = has_long && day == LONG_SESSION_DAY + 1;
                let params = if plan.is_deload() || after_long || per_day < MIN_EASY_MINUTES {
                    WorkoutParams::Recovery {
                        minutes: per_day.clamp(MIN_EASY_MINUTES, 45),
                    }
                } else {
                    WorkoutParams::Easy { minutes: per_day }
                };
                entries.push(WorkoutPlanEntry::new(day, params));
            }
        }

        Self::place_secondary(ctx, &easy_days, &mut entries, &mut notes);

        entries.sort_by_key(|e| (e.day_number, e.category.is_secondary()));

        info!(
            week = plan.week,
            phase = %plan.phase,
            sessions = entries.len(),
            quality = quality_days.len(),
            "week distributed"
        );

        WeekDistribution {
            week: plan.week,
            entries,
            quality_days,
            notes,
        }
    }

    /// Quality sessions this week after phase, deload, pace-check and day caps
    fn quality_count(ctx: &WeekContext<'_>, days: usize, notes: &mut Vec<String>) -> usize {
        let plan = ctx.plan;
        let mut count = ctx
            .sessions
            .quality
            .unwrap_or_else(|| ctx.methodology.quality_sessions.for_phase(plan.phase))
            as usize;

        if plan.phase == Phase::Taper {
            count = count.min(1);
        }
        if plan.is_deload() && count > 1 {
            count -= 1;
            notes.push("Deload week: one quality session removed".to_string());
        }
        if let Some(check) = ctx.pace_check.filter(|c| !c.passed) {
            if count > 0 {
                count -= 1;
                notes.push(format!(
                    "Recent race suggests a threshold {:.0}% away from the tested zones; one quality session removed",
                    check.deviation * 100.0
                ));
            }
        }

        let cap = if days <= 2 {
            days.saturating_sub(1)
        } else {
            days - 2
        };
        if count > cap {
            debug!(requested = count, cap, "quality sessions capped by training days");
            count = cap;
        }
        count
    }

    /// Quality days spaced at least two days from each other and the long session,
    /// relaxed to any free day when the week is too short
    fn select_quality_days(template: &[u8], count: usize) -> Vec<u8> {
        let mut chosen: Vec<u8> = Vec::with_capacity(count);
        let candidates: Vec<u8> = QUALITY_DAY_PREFERENCE
            .iter()
            .copied()
            .filter(|d| template.contains(d) && *d != LONG_SESSION_DAY)
            .collect();
        let anchors_long = template.contains(&LONG_SESSION_DAY);

        for min_gap in [2u8, 1] {
            for &day in &candidates {
                if chosen.len() >= count {
                    break;
                }
                if chosen.contains(&day) {
                    continue;
                }
                let far_from_long = !anchors_long || day.abs_diff(LONG_SESSION_DAY) >= min_gap;
                let far_from_quality = chosen.iter().all(|c| c.abs_diff(day) >= min_gap);
                if far_from_long && far_from_quality {
                    chosen.push(day);
                }
            }
        }
        chosen.sort_unstable();
        chosen
    }

    fn quality_params(ctx: &WeekContext<'_>, category: WorkoutCategory, work_minutes: u32) -> WorkoutParams {
        let phase = ctx.plan.phase;
        let work_seconds_budget = work_minutes * 60;
        match category {
            WorkoutCategory::Tempo => WorkoutParams::Tempo {
                work_minutes: if phase == Phase::Taper {
                    work_minutes.min(15)
                } else {
                    work_minutes
                },
            },
            WorkoutCategory::HillSprint => {
                let reps = match phase {
                    Phase::Base => 6,
                    Phase::Build => 8,
                    Phase::Peak => 10,
                    Phase::Taper => 6,
                };
                WorkoutParams::HillSprint {
                    reps,
                    work_seconds: 30,
                    rest_seconds: 150,
                }
            }
            WorkoutCategory::MethodologyInterval => {
                let shape = ctx.methodology.methodology.interval_shape();
                let reps = (work_seconds_budget / shape.work_seconds.max(1))
                    .clamp(2, shape.reps + 2);
                let reps = if phase == Phase::Taper { reps.min(shape.reps - 1).max(2) } else { reps };
                WorkoutParams::MethodologyInterval {
                    methodology: ctx.methodology.methodology,
                    reps,
                    work_seconds: shape.work_seconds,
                    rest_seconds: shape.rest_seconds,
                    zone: shape.zone,
                }
            }
            // Remaining quality categories are classic VO2max intervals
            _ => {
                let work_seconds = if phase == Phase::Peak { 240 } else { 180 };
                let reps = (work_seconds_budget / work_seconds).clamp(3, 8);
                let reps = if phase == Phase::Taper { reps.min(4) } else { reps };
                WorkoutParams::Interval {
                    reps,
                    work_seconds,
                    rest_seconds: work_seconds / 2 + 60,
                    zone: 5,
                }
            }
        }
    }

    /// Closing tempo block on long sessions for long-distance goals
    fn long_finish_minutes(ctx: &WeekContext<'_>) -> u32 {
        if !ctx.goal.is_long_distance() || ctx.plan.is_deload() {
            return 0;
        }
        match ctx.plan.phase {
            Phase::Build => 10,
            Phase::Peak => 20,
            _ => 0,
        }
    }

    fn place_secondary(
        ctx: &WeekContext<'_>,
        easy_days: &[u8],
        entries: &mut Vec<WorkoutPlanEntry>,
        notes: &mut Vec<String>,
    ) {
        let phase = ctx.plan.phase;
        let deload = ctx.plan.is_deload();
        let plyometric = if phase == Phase::Taper { 0 } else { ctx.sessions.plyometric };
        let requested = ctx.sessions.strength + ctx.sessions.core + plyometric;
        if requested == 0 {
            return;
        }
        if easy_days.is_empty() {
            notes.push(format!(
                "No easy days available for {} strength/core/plyometric sessions",
                requested
            ));
            return;
        }

        let regions: &[BodyRegion] = if ctx.equipment.gym_access {
            &[BodyRegion::LowerBody, BodyRegion::UpperBody, BodyRegion::FullBody]
        } else {
            &[BodyRegion::LowerBody, BodyRegion::FullBody]
        };

        let mut slot = 0usize;
        let mut next_day = || {
            let day = easy_days[slot % easy_days.len()];
            slot += 1;
            day
        };

        for i in 0..ctx.sessions.strength as usize {
            let minutes = if deload || phase == Phase::Taper { 20 } else { 30 };
            entries.push(WorkoutPlanEntry::new(
                next_day(),
                WorkoutParams::Strength {
                    minutes,
                    region: regions[i % regions.len()],
                    exercise_count: if deload { 4 } else { 5 },
                },
            ));
        }
        for _ in 0..ctx.sessions.core {
            entries.push(WorkoutPlanEntry::new(
                next_day(),
                WorkoutParams::Core {
                    minutes: 20,
                    exercise_count: 4,
                },
            ));
        }
        for _ in 0..plyometric {
            let contacts = match (phase, deload) {
                (_, true) => 40,
                (Phase::Base, _) => 60,
                (Phase::Build, _) => 80,
                _ => 100,
            };
            entries.push(WorkoutPlanEntry::new(
                next_day(),
                WorkoutParams::Plyometric {
                    minutes: 20,
                    contacts,
                    exercise_count: 3,
                },
            ));
        }
    }
}

fn to_minutes(value: Decimal) -> u32 {
    value.round().to_u32().unwrap_or(0)
}

/// Rough session length used to budget the easy fill
fn approximate_minutes(params: &WorkoutParams) -> u32 {
    let framed = |work_seconds: u32| {
        QUALITY_WARMUP_MINUTES + QUALITY_COOLDOWN_MINUTES + (work_seconds + 59) / 60
    };
    match params {
        WorkoutParams::Tempo { work_minutes } => framed(work_minutes * 60),
        WorkoutParams::Interval { reps, work_seconds, rest_seconds, .. }
        | WorkoutParams::HillSprint { reps, work_seconds, rest_seconds }
        | WorkoutParams::MethodologyInterval { reps, work_seconds, rest_seconds, .. } => {
            framed(reps * work_seconds + reps.saturating_sub(1) * rest_seconds)
        }
        WorkoutParams::LongSession { minutes, .. }
        | WorkoutParams::Easy { minutes }
        | WorkoutParams::Recovery { minutes }
        | WorkoutParams::Strength { minutes, .. }
        | WorkoutParams::Core { minutes, .. }
        | WorkoutParams::Plyometric { minutes, .. } => *minutes,
    }
}
