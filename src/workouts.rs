//! Concrete workout construction
//!
//! Each category maps its parameters and the zone table to a [`Workout`]
//! with ordered segments. Targets carry an effort band only when the zone
//! unit matches the sport and the athlete can measure it; heart-rate bands
//! are attached whenever a monitor is available.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

use crate::methodology::Methodology;
use crate::models::{
    BodyRegion, EquipmentFlags, IntensityUnit, SegmentKind, Sport, TargetIntensity, Workout,
    WorkoutCategory, WorkoutParams, WorkoutPlanEntry, WorkoutSegment, ZoneTable,
};

/// Intensity factor (fraction of threshold) assumed for each zone, Z1 to Z5
const ZONE_INTENSITY_FACTOR: [f64; 5] = [0.55, 0.70, 0.83, 0.95, 1.10];

/// Intensity factors for gym sessions
const STRENGTH_IF: f64 = 0.60;
const CORE_IF: f64 = 0.50;
const PLYOMETRIC_IF: f64 = 0.70;

const WARMUP_SECONDS: u32 = 15 * 60;
const COOLDOWN_SECONDS: u32 = 10 * 60;

/// Builds workouts against one zone table
#[derive(Debug, Clone)]
pub struct WorkoutBuilder<'a> {
    zones: &'a ZoneTable,
    sport: Sport,
    equipment: EquipmentFlags,
}

impl<'a> WorkoutBuilder<'a> {
    pub fn new(zones: &'a ZoneTable, sport: Sport, equipment: EquipmentFlags) -> Self {
        Self {
            zones,
            sport,
            equipment,
        }
    }

    /// Build the workout for a plan entry. `exercises` is used by gym sessions only.
    pub fn build(&self, entry: &WorkoutPlanEntry, exercises: Vec<String>) -> Workout {
        match &entry.params {
            WorkoutParams::LongSession { minutes, finish_minutes } => {
                self.long_session(*minutes, *finish_minutes)
            }
            WorkoutParams::Tempo { work_minutes } => self.tempo(*work_minutes),
            WorkoutParams::Interval { reps, work_seconds, rest_seconds, zone } => {
                self.interval(*reps, *work_seconds, *rest_seconds, *zone)
            }
            WorkoutParams::HillSprint { reps, work_seconds, rest_seconds } => {
                self.hill_sprint(*reps, *work_seconds, *rest_seconds)
            }
            WorkoutParams::MethodologyInterval { methodology, reps, work_seconds, rest_seconds, zone } => {
                self.methodology_interval(*methodology, *reps, *work_seconds, *rest_seconds, *zone)
            }
            WorkoutParams::Easy { minutes } => self.easy(*minutes),
            WorkoutParams::Recovery { minutes } => self.recovery(*minutes),
            WorkoutParams::Strength { minutes, region, .. } => self.strength(*minutes, *region, exercises),
            WorkoutParams::Core { minutes, .. } => self.core(*minutes, exercises),
            WorkoutParams::Plyometric { minutes, contacts, .. } => {
                self.plyometric(*minutes, *contacts, exercises)
            }
        }
    }

    pub fn long_session(&self, minutes: u32, finish_minutes: u32) -> Workout {
        let total = minutes * 60;
        let warmup = (10 * 60).min(total / 4);
        let cooldown = (5 * 60).min(total / 8);
        let finish = (finish_minutes * 60).min(total.saturating_sub(warmup + cooldown) / 2);
        let steady = total.saturating_sub(warmup + cooldown + finish);

        let mut segments = vec![
            self.segment(SegmentKind::WarmUp, warmup, 1, 1, "Build into the session gradually"),
            self.segment(SegmentKind::Work, steady, 1, 2, "Steady aerobic effort"),
        ];
        if finish > 0 {
            segments.push(self.segment(SegmentKind::Work, finish, 1, 3, "Finish at tempo effort"));
        }
        segments.push(self.segment(SegmentKind::CoolDown, cooldown, 1, 1, "Ease down"));

        let description = if finish > 0 {
            format!(
                "{} minutes aerobic, closing {} minutes at tempo",
                minutes,
                finish / 60
            )
        } else {
            format!("{} minutes at conversational effort", minutes)
        };
        self.assemble(
            WorkoutCategory::LongSession,
            format!("Long {}", self.sport.session_noun()),
            description,
            2,
            segments,
        )
    }

    pub fn tempo(&self, work_minutes: u32) -> Workout {
        let segments = vec![
            self.segment(SegmentKind::WarmUp, WARMUP_SECONDS, 1, 1, "Easy warm-up"),
            self.segment(SegmentKind::Work, work_minutes * 60, 1, 3, "Continuous tempo effort"),
            self.segment(SegmentKind::CoolDown, COOLDOWN_SECONDS, 1, 1, "Easy cool-down"),
        ];
        self.assemble(
            WorkoutCategory::Tempo,
            format!("Tempo {}", self.sport.session_noun()),
            format!("{} minutes continuous at tempo", work_minutes),
            3,
            segments,
        )
    }

    pub fn interval(&self, reps: u32, work_seconds: u32, rest_seconds: u32, zone: u8) -> Workout {
        let segments = self.repeats(reps, work_seconds, rest_seconds, zone, "Hard, controlled effort");
        self.assemble(
            WorkoutCategory::Interval,
            format!("{} × {} Intervals", reps, format_duration(work_seconds)),
            format!(
                "{} × {} in Z{} with {} easy recovery",
                reps,
                format_duration(work_seconds),
                zone,
                format_duration(rest_seconds)
            ),
            zone,
            segments,
        )
    }

    pub fn hill_sprint(&self, reps: u32, work_seconds: u32, rest_seconds: u32) -> Workout {
        let segments = self.repeats(reps, work_seconds, rest_seconds, 5, "Sprint uphill, walk or spin back down");
        self.assemble(
            WorkoutCategory::HillSprint,
            "Hill Sprints".to_string(),
            format!(
                "{} × {} maximal hill efforts, full recovery",
                reps,
                format_duration(work_seconds)
            ),
            5,
            segments,
        )
    }

    pub fn methodology_interval(
        &self,
        methodology: Methodology,
        reps: u32,
        work_seconds: u32,
        rest_seconds: u32,
        zone: u8,
    ) -> Workout {
        let (title, cue) = match methodology {
            Methodology::ThresholdConcentrated => (
                "Controlled Threshold Intervals",
                "Just below threshold, never above",
            ),
            Methodology::SingleThreshold => ("Sweet Spot Intervals", "Upper tempo, sustainable"),
            Methodology::Polarized => ("VO2max Intervals", "Hard, near maximal aerobic effort"),
            Methodology::Pyramidal => ("Threshold Intervals", "At threshold effort"),
        };
        let segments = self.repeats(reps, work_seconds, rest_seconds, zone, cue);
        self.assemble(
            WorkoutCategory::MethodologyInterval,
            title.to_string(),
            format!(
                "{}: {} × {} in Z{}, {} recovery",
                methodology,
                reps,
                format_duration(work_seconds),
                zone,
                format_duration(rest_seconds)
            ),
            zone,
            segments,
        )
    }

    pub fn easy(&self, minutes: u32) -> Workout {
        let segments = vec![self.segment(SegmentKind::Work, minutes * 60, 1, 2, "Relaxed aerobic effort")];
        self.assemble(
            WorkoutCategory::Easy,
            format!("Easy {}", self.sport.session_noun()),
            format!("{} minutes easy", minutes),
            2,
            segments,
        )
    }

    pub fn recovery(&self, minutes: u32) -> Workout {
        let segments = vec![self.segment(SegmentKind::Work, minutes * 60, 1, 1, "Very easy, shorten if tired")];
        self.assemble(
            WorkoutCategory::Recovery,
            format!("Recovery {}", self.sport.session_noun()),
            format!("{} minutes very easy", minutes),
            1,
            segments,
        )
    }

    pub fn strength(&self, minutes: u32, region: BodyRegion, exercises: Vec<String>) -> Workout {
        let label = match region {
            BodyRegion::LowerBody => "Lower Body",
            BodyRegion::UpperBody => "Upper Body",
            BodyRegion::Core => "Core",
            BodyRegion::FullBody => "Full Body",
        };
        self.gym_session(
            WorkoutCategory::Strength,
            format!("{} Strength", label),
            format!("{} minutes, 3 sets of 6-10 reps", minutes),
            minutes,
            STRENGTH_IF,
            exercises,
        )
    }

    pub fn core(&self, minutes: u32, exercises: Vec<String>) -> Workout {
        self.gym_session(
            WorkoutCategory::Core,
            "Core Stability".to_string(),
            format!("{} minutes, 3 rounds of 30-45 s holds", minutes),
            minutes,
            CORE_IF,
            exercises,
        )
    }

    pub fn plyometric(&self, minutes: u32, contacts: u32, exercises: Vec<String>) -> Workout {
        self.gym_session(
            WorkoutCategory::Plyometric,
            "Plyometrics".to_string(),
            format!("{} minutes, about {} ground contacts", minutes, contacts),
            minutes,
            PLYOMETRIC_IF,
            exercises,
        )
    }

    fn gym_session(
        &self,
        category: WorkoutCategory,
        title: String,
        description: String,
        minutes: u32,
        intensity_factor: f64,
        exercises: Vec<String>,
    ) -> Workout {
        let seconds = minutes * 60;
        let detail = if exercises.is_empty() {
            "Exercises unavailable; use your usual routine".to_string()
        } else {
            exercises.join(", ")
        };
        Workout {
            category,
            title,
            description,
            duration_minutes: minutes,
            distance_km: None,
            target: None,
            segments: vec![WorkoutSegment {
                kind: SegmentKind::Work,
                duration_seconds: seconds,
                repeat: 1,
                target: None,
                description: detail,
            }],
            exercises,
            estimated_tss: tss(seconds, intensity_factor),
        }
    }

    /// Warm-up, repeated work and rest, cool-down
    fn repeats(&self, reps: u32, work_seconds: u32, rest_seconds: u32, zone: u8, cue: &str) -> Vec<WorkoutSegment> {
        let mut segments = vec![
            self.segment(SegmentKind::WarmUp, WARMUP_SECONDS, 1, 1, "Easy warm-up with strides"),
            self.segment(SegmentKind::Work, work_seconds, reps, zone, cue),
        ];
        if reps > 1 && rest_seconds > 0 {
            segments.push(self.segment(SegmentKind::Rest, rest_seconds, reps - 1, 1, "Easy recovery"));
        }
        segments.push(self.segment(SegmentKind::CoolDown, COOLDOWN_SECONDS, 1, 1, "Easy cool-down"));
        segments
    }

    fn segment(&self, kind: SegmentKind, seconds: u32, repeat: u32, zone: u8, description: &str) -> WorkoutSegment {
        WorkoutSegment {
            kind,
            duration_seconds: seconds,
            repeat,
            target: self.target(zone),
            description: description.to_string(),
        }
    }

    /// Effort band measurable for this sport and equipment
    fn effort_band(&self) -> bool {
        match (self.sport, self.zones.unit) {
            (Sport::Running, IntensityUnit::Speed) => true,
            (Sport::Cycling, IntensityUnit::Power) => self.equipment.power_meter,
            _ => false,
        }
    }

    /// Target for a zone number
    pub fn target(&self, zone: u8) -> Option<TargetIntensity> {
        let z = self.zones.zone(zone)?;
        let (low, high) = if self.effort_band() {
            let low = if z.low <= 0.0 { z.high * 0.8 } else { z.low };
            (Some(low), Some(z.high))
        } else {
            (None, None)
        };
        let (hr_low, hr_high) = if self.equipment.heart_rate_monitor {
            (z.hr_low, z.hr_high)
        } else {
            (None, None)
        };
        Some(TargetIntensity {
            zone,
            low,
            high,
            unit: self.zones.unit,
            hr_low,
            hr_high,
        })
    }

    fn assemble(
        &self,
        category: WorkoutCategory,
        title: String,
        description: String,
        zone: u8,
        segments: Vec<WorkoutSegment>,
    ) -> Workout {
        let seconds: u32 = segments.iter().map(|s| s.total_seconds()).sum();
        let estimated_tss = segments
            .iter()
            .map(|s| {
                let zone = s.target.as_ref().map(|t| t.zone).unwrap_or(1);
                tss(s.total_seconds(), zone_intensity_factor(zone))
            })
            .sum::<Decimal>();

        Workout {
            category,
            title,
            description,
            duration_minutes: seconds.div_ceil(60),
            distance_km: self.estimate_distance(&segments),
            target: self.target(zone),
            segments,
            exercises: Vec::new(),
            estimated_tss,
        }
    }

    /// Distance from segment durations and zone midpoint speeds
    fn estimate_distance(&self, segments: &[WorkoutSegment]) -> Option<Decimal> {
        if self.zones.unit != IntensityUnit::Speed || self.sport != Sport::Running {
            return None;
        }
        let km: f64 = segments
            .iter()
            .map(|s| {
                let zone = s.target.as_ref().map(|t| t.zone).unwrap_or(1);
                let speed = self
                    .zones
                    .zone(zone)
                    .map(|z| {
                        let low = if z.low <= 0.0 { z.high * 0.8 } else { z.low };
                        (low + z.high) / 2.0
                    })
                    .unwrap_or(0.0);
                speed * s.total_seconds() as f64 / 3600.0
            })
            .sum();
        Decimal::from_f64(km).map(|d| d.round_dp(1))
    }
}

fn zone_intensity_factor(zone: u8) -> f64 {
    let index = (zone.clamp(1, 5) - 1) as usize;
    ZONE_INTENSITY_FACTOR[index]
}

/// Training stress: hours × IF² × 100
pub fn tss(seconds: u32, intensity_factor: f64) -> Decimal {
    let hours = seconds as f64 / 3600.0;
    Decimal::from_f64(hours * intensity_factor * intensity_factor * 100.0)
        .unwrap_or(Decimal::ZERO)
        .round_dp(1)
}

/// m:ss for durations under an hour
pub fn format_duration(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
