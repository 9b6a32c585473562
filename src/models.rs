use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::methodology::{Methodology, MethodologyConfig, MethodologyRequest};

/// Sports the planner can program for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sport {
    Running,
    Cycling,
}

impl Sport {
    /// Noun used in workout titles ("Long Run", "Easy Ride")
    pub fn session_noun(&self) -> &'static str {
        match self {
            Sport::Running => "Run",
            Sport::Cycling => "Ride",
        }
    }
}

/// Unit in which test stage intensity was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntensityUnit {
    /// Speed in km/h
    Speed,
    /// Power in watts
    Power,
    /// Pace in minutes per km (lower is harder)
    Pace,
}

impl IntensityUnit {
    /// Unit used for computation. Pace is handled as speed so that larger always means harder.
    pub fn effort_unit(&self) -> IntensityUnit {
        match self {
            IntensityUnit::Pace => IntensityUnit::Speed,
            other => *other,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            IntensityUnit::Speed => "km/h",
            IntensityUnit::Power => "W",
            IntensityUnit::Pace => "min/km",
        }
    }

    /// Sport implied by the test protocol
    pub fn default_sport(&self) -> Sport {
        match self {
            IntensityUnit::Power => Sport::Cycling,
            IntensityUnit::Speed | IntensityUnit::Pace => Sport::Running,
        }
    }
}

impl FromStr for IntensityUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "speed" | "kmh" | "km/h" => Ok(IntensityUnit::Speed),
            "power" | "watts" | "w" => Ok(IntensityUnit::Power),
            "pace" | "min/km" => Ok(IntensityUnit::Pace),
            _ => Err(format!("Unknown intensity unit: {}", s)),
        }
    }
}

/// Convert a pace in min/km to speed in km/h (and back; the mapping is its own inverse)
pub fn pace_speed_convert(value: f64) -> f64 {
    if value > 0.0 {
        60.0 / value
    } else {
        0.0
    }
}

/// Incremental exercise test: parallel, stage-ordered measurements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LactateTest {
    /// Stage intensity in `unit`
    pub intensity: Vec<f64>,

    /// Blood lactate in mmol/L
    pub lactate: Vec<f64>,

    /// Heart rate in beats per minute
    pub heart_rate: Vec<f64>,

    pub unit: IntensityUnit,

    #[serde(default)]
    pub tested_on: Option<NaiveDate>,

    /// Zones computed from an earlier test, used when this record has no usable stages
    #[serde(default)]
    pub previous_zones: Option<ZoneTable>,
}

impl LactateTest {
    pub fn new(
        intensity: Vec<f64>,
        lactate: Vec<f64>,
        heart_rate: Vec<f64>,
        unit: IntensityUnit,
    ) -> Self {
        Self {
            intensity,
            lactate,
            heart_rate,
            unit,
            tested_on: None,
            previous_zones: None,
        }
    }

    pub fn stage_count(&self) -> usize {
        self.intensity.len()
    }

    /// Stage intensities in effort space (pace converted to speed)
    pub fn effort_intensities(&self) -> Vec<f64> {
        match self.unit {
            IntensityUnit::Pace => self.intensity.iter().map(|&p| pace_speed_convert(p)).collect(),
            _ => self.intensity.clone(),
        }
    }
}

/// How a threshold was located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdMethod {
    /// Maximal distance between the fitted curve and its endpoint chord
    Dmax,
    /// D-max bounded to a physiological lactate range
    ModDmax,
    /// Fixed 4.0 mmol/L crossing after a poor curve fit
    Fallback,
    /// Fixed 2.0 mmol/L crossing used as the aerobic threshold
    AerobicCrossing,
}

impl fmt::Display for ThresholdMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThresholdMethod::Dmax => write!(f, "D-max"),
            ThresholdMethod::ModDmax => write!(f, "Modified D-max"),
            ThresholdMethod::Fallback => write!(f, "4.0 mmol/L fallback"),
            ThresholdMethod::AerobicCrossing => write!(f, "2.0 mmol/L crossing"),
        }
    }
}

/// Confidence attached to a detected threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "LOW"),
            Confidence::Medium => write!(f, "MEDIUM"),
            Confidence::High => write!(f, "HIGH"),
        }
    }
}

/// Detected threshold. Computed once per test and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdResult {
    /// Intensity at threshold, in effort units (speed or power)
    pub intensity: f64,
    pub lactate: f64,
    pub heart_rate: f64,
    pub unit: IntensityUnit,
    pub method: ThresholdMethod,
    /// Goodness of the cubic fit, 0-1
    pub r_squared: f64,
    pub confidence: Confidence,
    pub warning: Option<String>,
    /// Cubic coefficients `[a, b, c, d]` of `a·x³ + b·x² + c·x + d`
    pub coefficients: [f64; 4],
    /// Maximal perpendicular distance between curve and baseline
    pub distance: f64,
}

impl ThresholdResult {
    /// Threshold pace in min/km for speed-based tests
    pub fn pace(&self) -> Option<f64> {
        match self.unit {
            IntensityUnit::Speed => Some(pace_speed_convert(self.intensity)),
            _ => None,
        }
    }
}

/// Where a zone table came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneSource {
    LactateTest,
    EliteReference,
    Stored,
}

/// One training-intensity band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingZone {
    /// Zone number (1-based)
    pub number: u8,
    pub name: String,
    /// Lower effort bound (inclusive)
    pub low: f64,
    /// Upper effort bound (exclusive)
    pub high: f64,
    pub hr_low: Option<u16>,
    pub hr_high: Option<u16>,
}

impl TrainingZone {
    pub fn contains(&self, effort: f64) -> bool {
        effort >= self.low && effort < self.high
    }

    pub fn midpoint(&self) -> f64 {
        (self.low + self.high) / 2.0
    }
}

/// Ordered zone table. Test-derived and elite-reference tables share this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneTable {
    pub source: ZoneSource,
    /// Effort unit of the bounds (speed or power)
    pub unit: IntensityUnit,
    /// Anaerobic threshold intensity the table is anchored on
    pub threshold_intensity: f64,
    pub threshold_heart_rate: Option<u16>,
    pub zones: Vec<TrainingZone>,
}

impl ZoneTable {
    pub fn zone(&self, number: u8) -> Option<&TrainingZone> {
        self.zones.iter().find(|z| z.number == number)
    }

    /// Zone number containing the given effort, clamped to the table
    pub fn zone_for(&self, effort: f64) -> u8 {
        let first = self.zones.first().map(|z| z.number).unwrap_or(1);
        let last = self.zones.last().map(|z| z.number).unwrap_or(1);
        if let Some(zone) = self.zones.iter().find(|z| z.contains(effort)) {
            return zone.number;
        }
        match self.zones.first() {
            Some(z) if effort < z.low => first,
            _ => last,
        }
    }

    /// Pace range (slowest, fastest) in min/km for speed-based tables
    pub fn pace_range(&self, number: u8) -> Option<(Decimal, Decimal)> {
        if self.unit != IntensityUnit::Speed {
            return None;
        }
        let zone = self.zone(number)?;
        let slow = Decimal::from_f64(pace_speed_convert(zone.low))?.round_dp(2);
        let fast = Decimal::from_f64(pace_speed_convert(zone.high))?.round_dp(2);
        Some((slow, fast))
    }
}

/// Reference paces supplied for elite athletes, min/km
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElitePaces {
    pub easy: Option<Decimal>,
    pub marathon: Option<Decimal>,
    pub threshold: Option<Decimal>,
    pub interval: Option<Decimal>,
    pub repetition: Option<Decimal>,
}

/// Most recent race performance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub sport: Sport,
    pub distance_m: u32,
    pub time_seconds: u32,
    pub date: NaiveDate,
}

impl RaceResult {
    /// Average race speed in km/h
    pub fn average_speed(&self) -> Option<f64> {
        if self.time_seconds == 0 {
            return None;
        }
        Some(self.distance_m as f64 / 1000.0 / (self.time_seconds as f64 / 3600.0))
    }
}

/// Athlete experience level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
    Elite,
}

impl FromStr for ExperienceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" | "novice" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            "elite" => Ok(Self::Elite),
            _ => Err(format!("Unknown experience level: {}", s)),
        }
    }
}

/// Training goal types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainingGoal {
    Marathon,
    HalfMarathon,
    TenK,
    FiveK,
    Century,       // 100 mile bike ride
    MetricCentury, // 100 km bike ride
    Maintenance,
    BaseBuilding,
    ReturnFromBreak,
}

impl FromStr for TrainingGoal {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "marathon" => Ok(Self::Marathon),
            "half" | "halfmarathon" | "half-marathon" => Ok(Self::HalfMarathon),
            "10k" => Ok(Self::TenK),
            "5k" => Ok(Self::FiveK),
            "century" => Ok(Self::Century),
            "metric" | "metric-century" => Ok(Self::MetricCentury),
            "maintenance" => Ok(Self::Maintenance),
            "base" | "base-building" => Ok(Self::BaseBuilding),
            "return" | "return-from-break" => Ok(Self::ReturnFromBreak),
            _ => Err(format!("Unknown training goal: {}", s)),
        }
    }
}

impl TrainingGoal {
    /// Primary sport for this goal; open goals follow the test protocol
    pub fn primary_sport(&self, test_unit: IntensityUnit) -> Sport {
        match self {
            Self::Marathon | Self::HalfMarathon | Self::TenK | Self::FiveK => Sport::Running,
            Self::Century | Self::MetricCentury => Sport::Cycling,
            _ => test_unit.default_sport(),
        }
    }

    /// Endurance events where threshold work dominates race demands
    pub fn is_long_distance(&self) -> bool {
        matches!(
            self,
            Self::Marathon | Self::HalfMarathon | Self::Century | Self::MetricCentury
        )
    }

    /// Get typical training duration in weeks
    pub fn typical_duration_weeks(&self) -> u32 {
        match self {
            Self::Marathon => 16,
            Self::HalfMarathon => 12,
            Self::FiveK | Self::TenK => 8,
            Self::Century => 12,
            Self::MetricCentury => 10,
            Self::Maintenance => 4,
            Self::BaseBuilding => 8,
            Self::ReturnFromBreak => 6,
        }
    }

    /// Weekly volume multiplier relative to a 10K build
    pub fn volume_multiplier(&self) -> Decimal {
        match self {
            Self::Marathon => dec!(1.25),
            Self::HalfMarathon => dec!(1.10),
            Self::TenK => dec!(1.00),
            Self::FiveK => dec!(0.90),
            Self::Century => dec!(1.30),
            Self::MetricCentury => dec!(1.15),
            Self::Maintenance => dec!(0.85),
            Self::BaseBuilding => dec!(1.00),
            Self::ReturnFromBreak => dec!(0.70),
        }
    }
}

/// Prior classification of the athlete, when the caller has one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AthleteClassification {
    pub level: ExperienceLevel,
    pub goal: TrainingGoal,
}

/// Periodization phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Base,
    Build,
    Peak,
    Taper,
}

impl Phase {
    pub fn focus(&self) -> &'static str {
        match self {
            Phase::Base => "Aerobic Development",
            Phase::Build => "Threshold Development",
            Phase::Peak => "Race Specific",
            Phase::Taper => "Race Preparation",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Base => write!(f, "BASE"),
            Phase::Build => write!(f, "BUILD"),
            Phase::Peak => write!(f, "PEAK"),
            Phase::Taper => write!(f, "TAPER"),
        }
    }
}

/// Week counts per phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseDistribution {
    pub base: u32,
    pub build: u32,
    pub peak: u32,
    pub taper: u32,
}

impl PhaseDistribution {
    pub fn total(&self) -> u32 {
        self.base + self.build + self.peak + self.taper
    }

    /// Week-ordered phase tags, one per week
    pub fn phases(&self) -> Vec<Phase> {
        let mut phases = Vec::with_capacity(self.total() as usize);
        phases.extend(std::iter::repeat(Phase::Base).take(self.base as usize));
        phases.extend(std::iter::repeat(Phase::Build).take(self.build as usize));
        phases.extend(std::iter::repeat(Phase::Peak).take(self.peak as usize));
        phases.extend(std::iter::repeat(Phase::Taper).take(self.taper as usize));
        phases
    }

    /// Phase of a 1-based week number
    pub fn phase_for_week(&self, week: u32) -> Option<Phase> {
        if week == 0 {
            return None;
        }
        self.phases().get(week as usize - 1).copied()
    }
}

/// Nominal volume target for one week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeProgressionEntry {
    pub week: u32,
    pub phase: Phase,
    /// Percentage of peak weekly volume
    pub volume_percentage: Decimal,
    pub focus: String,
}

/// A reduced-load week
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeloadWeek {
    pub week: u32,
    /// Multiplier applied to the nominal volume percentage
    pub reduction_factor: Decimal,
}

/// Deload weeks for a plan
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeloadSchedule {
    pub cadence: u32,
    pub weeks: Vec<DeloadWeek>,
}

impl DeloadSchedule {
    pub fn get(&self, week: u32) -> Option<&DeloadWeek> {
        self.weeks.iter().find(|d| d.week == week)
    }

    pub fn is_deload(&self, week: u32) -> bool {
        self.get(week).is_some()
    }
}

/// Week-by-week volume and phase table consumed by the distribution engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekPlan {
    pub week: u32,
    pub phase: Phase,
    pub nominal_percentage: Decimal,
    pub effective_percentage: Decimal,
    /// Planned weekly training time in minutes
    pub volume_minutes: Decimal,
    pub training_days: u8,
    pub deload: Option<DeloadWeek>,
    pub focus: String,
}

impl WeekPlan {
    pub fn is_deload(&self) -> bool {
        self.deload.is_some()
    }
}

/// Workout categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkoutCategory {
    LongSession,
    Tempo,
    Interval,
    HillSprint,
    MethodologyInterval,
    Easy,
    Strength,
    Core,
    Plyometric,
    Recovery,
    Rest,
}

impl WorkoutCategory {
    /// Sessions that carry moderate or hard work
    pub fn is_quality(&self) -> bool {
        matches!(
            self,
            Self::Tempo | Self::Interval | Self::HillSprint | Self::MethodologyInterval
        )
    }

    /// Sessions placed alongside an endurance session on the same day
    pub fn is_secondary(&self) -> bool {
        matches!(self, Self::Strength | Self::Core | Self::Plyometric)
    }
}

impl fmt::Display for WorkoutCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LongSession => "long",
            Self::Tempo => "tempo",
            Self::Interval => "interval",
            Self::HillSprint => "hill sprint",
            Self::MethodologyInterval => "methodology interval",
            Self::Easy => "easy",
            Self::Strength => "strength",
            Self::Core => "core",
            Self::Plyometric => "plyometric",
            Self::Recovery => "recovery",
            Self::Rest => "rest",
        };
        write!(f, "{}", label)
    }
}

/// Body region tag used to filter the exercise catalogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BodyRegion {
    UpperBody,
    LowerBody,
    Core,
    FullBody,
}

impl BodyRegion {
    pub fn as_str(&self) -> &'static str {
        match self {
            BodyRegion::UpperBody => "upper_body",
            BodyRegion::LowerBody => "lower_body",
            BodyRegion::Core => "core",
            BodyRegion::FullBody => "full_body",
        }
    }
}

impl FromStr for BodyRegion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "upper_body" => Ok(BodyRegion::UpperBody),
            "lower_body" => Ok(BodyRegion::LowerBody),
            "core" => Ok(BodyRegion::Core),
            "full_body" => Ok(BodyRegion::FullBody),
            _ => Err(format!("Unknown body region: {}", s)),
        }
    }
}

/// Exercise catalogue category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExerciseCategory {
    Strength,
    Core,
    Plyometric,
}

impl ExerciseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseCategory::Strength => "strength",
            ExerciseCategory::Core => "core",
            ExerciseCategory::Plyometric => "plyometric",
        }
    }
}

impl FromStr for ExerciseCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strength" => Ok(ExerciseCategory::Strength),
            "core" => Ok(ExerciseCategory::Core),
            "plyometric" => Ok(ExerciseCategory::Plyometric),
            _ => Err(format!("Unknown exercise category: {}", s)),
        }
    }
}

/// Equipment an exercise needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Equipment {
    Bodyweight,
    Gym,
}

impl Equipment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Equipment::Bodyweight => "bodyweight",
            Equipment::Gym => "gym",
        }
    }
}

impl FromStr for Equipment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bodyweight" => Ok(Equipment::Bodyweight),
            "gym" => Ok(Equipment::Gym),
            _ => Err(format!("Unknown equipment: {}", s)),
        }
    }
}

/// Exercise catalogue entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub category: ExerciseCategory,
    pub body_region: BodyRegion,
    pub equipment: Equipment,
}

/// Category-specific workout parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkoutParams {
    LongSession {
        minutes: u32,
        /// Closing block at tempo effort, 0 for a fully aerobic session
        finish_minutes: u32,
    },
    Tempo {
        work_minutes: u32,
    },
    Interval {
        reps: u32,
        work_seconds: u32,
        rest_seconds: u32,
        zone: u8,
    },
    HillSprint {
        reps: u32,
        work_seconds: u32,
        rest_seconds: u32,
    },
    MethodologyInterval {
        methodology: Methodology,
        reps: u32,
        work_seconds: u32,
        rest_seconds: u32,
        zone: u8,
    },
    Easy {
        minutes: u32,
    },
    Strength {
        minutes: u32,
        region: BodyRegion,
        exercise_count: u32,
    },
    Core {
        minutes: u32,
        exercise_count: u32,
    },
    Plyometric {
        minutes: u32,
        contacts: u32,
        exercise_count: u32,
    },
    Recovery {
        minutes: u32,
    },
}

impl WorkoutParams {
    pub fn category(&self) -> WorkoutCategory {
        match self {
            WorkoutParams::LongSession { .. } => WorkoutCategory::LongSession,
            WorkoutParams::Tempo { .. } => WorkoutCategory::Tempo,
            WorkoutParams::Interval { .. } => WorkoutCategory::Interval,
            WorkoutParams::HillSprint { .. } => WorkoutCategory::HillSprint,
            WorkoutParams::MethodologyInterval { .. } => WorkoutCategory::MethodologyInterval,
            WorkoutParams::Easy { .. } => WorkoutCategory::Easy,
            WorkoutParams::Strength { .. } => WorkoutCategory::Strength,
            WorkoutParams::Core { .. } => WorkoutCategory::Core,
            WorkoutParams::Plyometric { .. } => WorkoutCategory::Plyometric,
            WorkoutParams::Recovery { .. } => WorkoutCategory::Recovery,
        }
    }
}

/// One abstract session placed on a day of the week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutPlanEntry {
    /// Day of week, 1-7
    pub day_number: u8,
    pub category: WorkoutCategory,
    pub params: WorkoutParams,
}

impl WorkoutPlanEntry {
    pub fn new(day_number: u8, params: WorkoutParams) -> Self {
        Self {
            day_number,
            category: params.category(),
            params,
        }
    }
}

/// Segment role inside a workout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    WarmUp,
    Work,
    Rest,
    CoolDown,
}

/// Target effort for a workout or segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetIntensity {
    pub zone: u8,
    /// Effort band in `unit`; `None` when the athlete trains by heart rate only
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub unit: IntensityUnit,
    pub hr_low: Option<u16>,
    pub hr_high: Option<u16>,
}

impl TargetIntensity {
    /// Human-readable band, e.g. "Z4 4:05-4:15 min/km 158-165 bpm"
    pub fn describe(&self) -> String {
        let mut parts = vec![format!("Z{}", self.zone)];
        if let (Some(low), Some(high)) = (self.low, self.high) {
            match self.unit {
                IntensityUnit::Speed => parts.push(format!(
                    "{}-{} min/km",
                    format_pace(pace_speed_convert(low)),
                    format_pace(pace_speed_convert(high))
                )),
                unit => parts.push(format!("{:.0}-{:.0} {}", low, high, unit.symbol())),
            }
        }
        if let (Some(low), Some(high)) = (self.hr_low, self.hr_high) {
            parts.push(format!("{}-{} bpm", low, high));
        }
        parts.join(" ")
    }
}

/// Format a decimal min/km pace as m:ss
pub fn format_pace(pace: f64) -> String {
    if !pace.is_finite() || pace <= 0.0 {
        return "--:--".to_string();
    }
    let total_seconds = (pace * 60.0).round() as u32;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Structured part of a workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSegment {
    pub kind: SegmentKind,
    pub duration_seconds: u32,
    /// Number of times the segment is performed
    pub repeat: u32,
    pub target: Option<TargetIntensity>,
    pub description: String,
}

impl WorkoutSegment {
    pub fn total_seconds(&self) -> u32 {
        self.duration_seconds * self.repeat.max(1)
    }
}

/// Concrete prescribed workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub category: WorkoutCategory,
    pub title: String,
    pub description: String,
    pub duration_minutes: u32,
    pub distance_km: Option<Decimal>,
    pub target: Option<TargetIntensity>,
    pub segments: Vec<WorkoutSegment>,
    /// Exercise identifiers for strength, core and plyometric sessions
    pub exercises: Vec<String>,
    pub estimated_tss: Decimal,
}

/// One day of a program week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramDay {
    pub day_number: u8,
    pub date: Option<NaiveDate>,
    pub workouts: Vec<Workout>,
}

impl ProgramDay {
    pub fn is_rest(&self) -> bool {
        self.workouts.is_empty()
    }

    /// Main session category, `Rest` for an empty day
    pub fn primary_category(&self) -> WorkoutCategory {
        self.workouts
            .iter()
            .find(|w| !w.category.is_secondary())
            .or_else(|| self.workouts.first())
            .map(|w| w.category)
            .unwrap_or(WorkoutCategory::Rest)
    }
}

/// One program week
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramWeek {
    pub week_number: u32,
    pub phase: Phase,
    pub focus: String,
    pub is_deload: bool,
    /// Effective volume as a percentage of peak
    pub volume_percentage: Decimal,
    pub planned_minutes: Decimal,
    pub training_days: u8,
    pub start_date: Option<NaiveDate>,
    pub days: Vec<ProgramDay>,
    pub notes: Vec<String>,
}

impl ProgramWeek {
    pub fn workouts(&self) -> impl Iterator<Item = &Workout> {
        self.days.iter().flat_map(|d| d.workouts.iter())
    }

    pub fn scheduled_minutes(&self) -> u32 {
        self.workouts().map(|w| w.duration_minutes).sum()
    }
}

/// Share of training time in easy / moderate / hard effort, percent
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IntensityDistribution {
    pub easy: Decimal,
    pub moderate: Decimal,
    pub hard: Decimal,
}

/// Program totals
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgramSummary {
    pub total_minutes: u32,
    pub total_tss: Decimal,
    pub deload_weeks: usize,
    /// Achieved split of endurance time across effort classes
    pub distribution: IntensityDistribution,
}

/// Assembled training program: weeks -> days -> workouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingProgram {
    pub id: String,
    pub name: String,
    pub athlete_id: Option<String>,
    pub sport: Sport,
    pub goal: TrainingGoal,
    pub level: ExperienceLevel,
    pub methodology: MethodologyConfig,
    pub threshold: Option<ThresholdResult>,
    pub aerobic_threshold: Option<ThresholdResult>,
    pub zones: ZoneTable,
    pub phase_distribution: PhaseDistribution,
    pub progression: Vec<VolumeProgressionEntry>,
    pub deloads: DeloadSchedule,
    pub weeks: Vec<ProgramWeek>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub warnings: Vec<String>,
    pub summary: ProgramSummary,
    /// SHA-256 over the program structure, stable across identical inputs
    pub fingerprint: String,
    pub created_at: DateTime<Utc>,
}

/// Weekly counts of secondary sessions, plus an optional quality override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionCounts {
    pub strength: u8,
    pub core: u8,
    pub plyometric: u8,
    /// Quality sessions per week, replacing the methodology default
    pub quality: Option<u8>,
}

/// Equipment and monitoring available to the athlete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquipmentFlags {
    pub power_meter: bool,
    pub heart_rate_monitor: bool,
    pub gym_access: bool,
}

impl Default for EquipmentFlags {
    fn default() -> Self {
        Self {
            power_meter: false,
            heart_rate_monitor: true,
            gym_access: false,
        }
    }
}

/// Validated request parameters supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub athlete_id: Option<String>,
    pub goal: TrainingGoal,
    pub target_date: Option<NaiveDate>,
    pub duration_weeks: u32,
    pub training_days: u8,
    pub level: ExperienceLevel,
    pub methodology: MethodologyRequest,
    #[serde(default)]
    pub sessions: SessionCounts,
    #[serde(default)]
    pub equipment: EquipmentFlags,
    #[serde(default)]
    pub classification: Option<AthleteClassification>,
    /// Athlete's current weekly training time in minutes
    #[serde(default)]
    pub current_weekly_minutes: Option<Decimal>,
}

impl GenerationParams {
    pub fn new(
        goal: TrainingGoal,
        duration_weeks: u32,
        training_days: u8,
        level: ExperienceLevel,
    ) -> Self {
        Self {
            athlete_id: None,
            goal,
            target_date: None,
            duration_weeks,
            training_days,
            level,
            methodology: MethodologyRequest::Auto,
            sessions: SessionCounts::default(),
            equipment: EquipmentFlags::default(),
            classification: None,
            current_weekly_minutes: None,
        }
    }

    /// Program start date when a target date is known
    pub fn start_date(&self) -> Option<NaiveDate> {
        self.target_date
            .map(|td| td - chrono::Duration::weeks(self.duration_weeks as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_zones() -> ZoneTable {
        ZoneTable {
            source: ZoneSource::LactateTest,
            unit: IntensityUnit::Speed,
            threshold_intensity: 15.0,
            threshold_heart_rate: Some(170),
            zones: vec![
                TrainingZone { number: 1, name: "Recovery".into(), low: 0.0, high: 11.0, hr_low: None, hr_high: None },
                TrainingZone { number: 2, name: "Endurance".into(), low: 11.0, high: 13.0, hr_low: None, hr_high: None },
                TrainingZone { number: 3, name: "Tempo".into(), low: 13.0, high: 15.0, hr_low: None, hr_high: None },
            ],
        }
    }

    #[test]
    fn test_pace_speed_conversion() {
        assert_eq!(pace_speed_convert(5.0), 12.0);
        assert_eq!(pace_speed_convert(12.0), 5.0);
        assert_eq!(pace_speed_convert(0.0), 0.0);
    }

    #[test]
    fn test_effort_intensities_for_pace_tests() {
        let test = LactateTest::new(
            vec![6.0, 5.0, 4.0, 3.0],
            vec![1.0, 1.5, 3.0, 7.0],
            vec![130.0, 145.0, 160.0, 178.0],
            IntensityUnit::Pace,
        );
        assert_eq!(test.effort_intensities(), vec![10.0, 12.0, 15.0, 20.0]);
        assert_eq!(test.unit.effort_unit(), IntensityUnit::Speed);
    }

    #[test]
    fn test_zone_lookup() {
        let zones = sample_zones();
        assert_eq!(zones.zone_for(12.0), 2);
        assert_eq!(zones.zone_for(14.0), 3);
        assert_eq!(zones.zone_for(-1.0), 1);
        assert_eq!(zones.zone_for(20.0), 3);
    }

    #[test]
    fn test_pace_range_only_for_speed_tables() {
        let mut zones = sample_zones();
        let (slow, fast) = zones.pace_range(3).unwrap();
        assert_eq!(slow, dec!(4.62));
        assert_eq!(fast, dec!(4.00));

        zones.unit = IntensityUnit::Power;
        assert!(zones.pace_range(3).is_none());
    }

    #[test]
    fn test_phase_distribution_phases() {
        let dist = PhaseDistribution { base: 2, build: 1, peak: 1, taper: 1 };
        assert_eq!(dist.total(), 5);
        assert_eq!(
            dist.phases(),
            vec![Phase::Base, Phase::Base, Phase::Build, Phase::Peak, Phase::Taper]
        );
        assert_eq!(dist.phase_for_week(3), Some(Phase::Build));
        assert_eq!(dist.phase_for_week(0), None);
        assert_eq!(dist.phase_for_week(6), None);
    }

    #[test]
    fn test_goal_parsing() {
        assert_eq!("marathon".parse::<TrainingGoal>().unwrap(), TrainingGoal::Marathon);
        assert_eq!("5k".parse::<TrainingGoal>().unwrap(), TrainingGoal::FiveK);
        assert_eq!("century".parse::<TrainingGoal>().unwrap(), TrainingGoal::Century);
        assert!("triathlon".parse::<TrainingGoal>().is_err());
    }

    #[test]
    fn test_goal_sport() {
        assert_eq!(TrainingGoal::Marathon.primary_sport(IntensityUnit::Power), Sport::Running);
        assert_eq!(TrainingGoal::BaseBuilding.primary_sport(IntensityUnit::Power), Sport::Cycling);
        assert_eq!(TrainingGoal::BaseBuilding.primary_sport(IntensityUnit::Pace), Sport::Running);
    }

    #[test]
    fn test_params_round_trip_json() {
        let params = GenerationParams::new(TrainingGoal::Marathon, 16, 4, ExperienceLevel::Intermediate);
        let json = serde_json::to_string(&params).unwrap();
        let back: GenerationParams = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }

    #[test]
    fn test_format_pace() {
        assert_eq!(format_pace(4.5), "4:30");
        assert_eq!(format_pace(0.0), "--:--");
    }

    #[test]
    fn test_rest_day_category() {
        let day = ProgramDay { day_number: 1, date: None, workouts: vec![] };
        assert!(day.is_rest());
        assert_eq!(day.primary_category(), WorkoutCategory::Rest);
    }

    #[test]
    fn test_race_speed() {
        let race = RaceResult {
            sport: Sport::Running,
            distance_m: 10_000,
            time_seconds: 2400,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        };
        assert!((race.average_speed().unwrap() - 15.0).abs() < 1e-9);
    }
}
