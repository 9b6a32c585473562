//! Program assembly
//!
//! Resolves thresholds, zones and methodology for a request, then walks the
//! weeks in order: distribute, build workouts, look up exercises, collect.

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::{AthleteDataSource, ExerciseFilter};
use crate::deload::{DeloadPolicy, DeloadScheduler};
use crate::distribution::{DistributionEngine, PaceCheck, WeekContext};
use crate::error::{ProgramGenerationError, Result, ValidationError};
use crate::methodology::{MethodologyConfig, MethodologySelector};
use crate::models::{
    BodyRegion, DeloadSchedule, Equipment, ExerciseCategory, GenerationParams, IntensityDistribution,
    LactateTest, Phase, PhaseDistribution, ProgramDay, ProgramSummary, ProgramWeek, RaceResult,
    SegmentKind, Sport, ThresholdResult, TrainingProgram, VolumeProgressionEntry, WeekPlan,
    WorkoutParams, WorkoutPlanEntry, ZoneSource, ZoneTable,
};
use crate::periodization::{PeriodizationPlan, PeriodizationPlanner};
use crate::threshold::ThresholdDetector;
use crate::threshold_policy::ThresholdPolicy;
use crate::workouts::WorkoutBuilder;
use crate::zones::ZoneCalculator;

/// Default relative tolerance between race-predicted and tested threshold
pub const DEFAULT_PACE_TOLERANCE: f64 = 0.10;

/// Accepted training days per week
const TRAINING_DAYS_RANGE: (u8, u8) = (2, 7);

/// Inputs resolved before the week loop
#[derive(Debug, Clone)]
pub struct ResolvedInputs {
    pub threshold: Option<ThresholdResult>,
    pub aerobic_threshold: Option<ThresholdResult>,
    pub zones: ZoneTable,
    pub race: Option<RaceResult>,
    pub methodology: MethodologyConfig,
    pub sport: Sport,
    pub warnings: Vec<String>,
}

/// Generates training programs against an athlete data source
pub struct ProgramAssembler<S> {
    source: S,
    detector: ThresholdDetector,
    deloads: DeloadScheduler,
    pace_tolerance: f64,
}

impl<S: AthleteDataSource> ProgramAssembler<S> {
    pub fn new(source: S) -> Self {
        Self::with_policies(
            source,
            ThresholdPolicy::default(),
            DeloadPolicy::default(),
            DEFAULT_PACE_TOLERANCE,
        )
    }

    pub fn with_policies(
        source: S,
        threshold_policy: ThresholdPolicy,
        deload_policy: DeloadPolicy,
        pace_tolerance: f64,
    ) -> Self {
        Self {
            source,
            detector: ThresholdDetector::new(threshold_policy),
            deloads: DeloadScheduler::new(deload_policy),
            pace_tolerance,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Hand the data source back, e.g. to persist the generated program
    pub fn into_source(self) -> S {
        self.source
    }

    /// Generate a complete program from a test and request parameters
    pub async fn generate(&self, test: &LactateTest, params: &GenerationParams) -> Result<TrainingProgram> {
        validate_params(params)?;
        let inputs = self.resolve_inputs(test, params).await?;
        let periodization = PeriodizationPlanner::plan(params, inputs.methodology.methodology)?;
        self.assemble(params, inputs, periodization).await
    }

    /// Thresholds, zones, race result and methodology for a request
    pub async fn resolve_inputs(&self, test: &LactateTest, params: &GenerationParams) -> Result<ResolvedInputs> {
        let mut warnings = Vec::new();

        let (threshold, aerobic_threshold, test_zones) = if test.stage_count() == 0 {
            match &test.previous_zones {
                Some(stored) => {
                    info!("test has no stages, using stored zones");
                    warnings.push("No test stages supplied; using previously stored zones".to_string());
                    let zones = ZoneTable {
                        source: ZoneSource::Stored,
                        ..stored.clone()
                    };
                    (None, None, Some(zones))
                }
                None => {
                    return Err(ValidationError::NoThresholdData(
                        "test has no stages and no stored zones".to_string(),
                    )
                    .into())
                }
            }
        } else {
            let threshold = self.detector.detect_mod_dmax(test)?;
            let aerobic = self.detector.detect_aerobic(test)?;
            if let Some(w) = &threshold.warning {
                warnings.push(w.clone());
            }
            if let Some(w) = &aerobic.warning {
                warnings.push(w.clone());
            }
            let zones = ZoneCalculator::from_thresholds(&threshold, Some(&aerobic), Some(test))?;
            (Some(threshold), Some(aerobic), Some(zones))
        };

        // Race result and elite paces are independent lookups
        let athlete_id = params.athlete_id.as_deref();
        let (race, elite) = tokio::join!(
            self.source.most_recent_race(athlete_id),
            self.source.elite_paces(athlete_id)
        );
        let race = race.unwrap_or_else(|e| {
            warn!(error = %e, "race lookup failed, continuing without race validation");
            None
        });
        let elite = elite.unwrap_or_else(|e| {
            warn!(error = %e, "elite pace lookup failed, using test zones");
            None
        });

        let test_ref = (test.stage_count() > 0).then_some(test);
        let (zones, note) = ZoneCalculator::resolve(test_zones, elite.as_ref(), test_ref);
        warnings.extend(note);
        let zones = zones.ok_or_else(|| ValidationError::NoThresholdData("no zone table could be built".to_string()))?;

        let methodology = MethodologySelector::select(
            params.methodology,
            params.level,
            params.goal,
            params.classification.as_ref(),
        )
        .config();

        Ok(ResolvedInputs {
            threshold,
            aerobic_threshold,
            zones,
            race,
            methodology,
            sport: params.goal.primary_sport(test.unit),
            warnings,
        })
    }

    /// Run the week loop over a periodization
    pub async fn assemble(
        &self,
        params: &GenerationParams,
        inputs: ResolvedInputs,
        periodization: PeriodizationPlan,
    ) -> Result<TrainingProgram> {
        check_progression(
            params.duration_weeks,
            &periodization.distribution,
            &periodization.phases,
            &periodization.progression,
        )?;

        let ResolvedInputs {
            threshold,
            aerobic_threshold,
            zones,
            race,
            methodology,
            sport,
            mut warnings,
        } = inputs;

        let deloads = self.deloads.schedule(
            params.level,
            methodology.methodology,
            periodization.peak_volume_minutes,
            &periodization.progression,
        );
        let week_plans = self.deloads.apply(
            &deloads,
            &periodization.progression,
            periodization.peak_volume_minutes,
            &periodization.training_days,
        );

        let pace_check = race
            .as_ref()
            .and_then(|r| PaceCheck::evaluate(r, &zones, self.pace_tolerance));
        if let Some(check) = pace_check.as_ref().filter(|c| !c.passed) {
            warnings.push(format!(
                "Most recent race predicts a threshold of {:.2} km/h against {:.2} km/h from the test",
                check.predicted_threshold, check.zone_threshold
            ));
        }

        let start_date = params.start_date();
        let builder = WorkoutBuilder::new(&zones, sport, params.equipment);
        let mut weeks = Vec::with_capacity(week_plans.len());
        let mut lookups = CatalogueLookups::default();

        for plan in &week_plans {
            let week = self
                .build_week(plan, params, &methodology, &builder, pace_check.as_ref(), start_date, &mut lookups)
                .await;
            weeks.push(week);
        }
        if lookups.failed {
            warnings.push("Exercise catalogue unavailable; some gym sessions have no exercises".to_string());
        }
        if lookups.unmatched > 0 {
            warnings.push(format!(
                "Exercise catalogue had no matches for {} gym sessions",
                lookups.unmatched
            ));
        }

        let summary = summarize(&weeks, &deloads);
        let name = format!(
            "{}-week {:?} plan ({})",
            params.duration_weeks, params.goal, methodology.methodology
        );

        let mut program = TrainingProgram {
            id: Uuid::new_v4().to_string(),
            name,
            athlete_id: params.athlete_id.clone(),
            sport,
            goal: params.goal,
            level: params.level,
            methodology,
            threshold,
            aerobic_threshold,
            zones,
            phase_distribution: periodization.distribution,
            progression: periodization.progression,
            deloads,
            weeks,
            start_date,
            target_date: params.target_date,
            warnings,
            summary,
            fingerprint: String::new(),
            created_at: Utc::now(),
        };
        program.fingerprint = fingerprint(&program)?;

        info!(
            id = %program.id,
            weeks = program.weeks.len(),
            total_minutes = program.summary.total_minutes,
            fingerprint = %program.fingerprint,
            "program generated"
        );
        Ok(program)
    }

    #[allow(clippy::too_many_arguments)]
    async fn build_week(
        &self,
        plan: &WeekPlan,
        params: &GenerationParams,
        methodology: &MethodologyConfig,
        builder: &WorkoutBuilder<'_>,
        pace_check: Option<&PaceCheck>,
        start_date: Option<NaiveDate>,
        lookups: &mut CatalogueLookups,
    ) -> ProgramWeek {
        let ctx = WeekContext {
            plan,
            methodology,
            goal: params.goal,
            sessions: params.sessions,
            equipment: params.equipment,
            pace_check,
        };
        let distribution = DistributionEngine::distribute_week(&ctx);
        let week_start = start_date.map(|d| d + Duration::weeks(plan.week as i64 - 1));

        let mut days: Vec<ProgramDay> = (1..=7u8)
            .map(|day_number| ProgramDay {
                day_number,
                date: week_start.map(|d| d + Duration::days(day_number as i64 - 1)),
                workouts: Vec::new(),
            })
            .collect();

        // Entries are day-ordered; lookups run one at a time in that order
        for entry in &distribution.entries {
            let exercises = match exercise_filter(entry, params) {
                Some(filter) => match self.source.exercises(&filter).await {
                    Ok(found) => {
                        if found.is_empty() {
                            lookups.unmatched += 1;
                            warn!(
                                week = plan.week,
                                day = entry.day_number,
                                category = ?filter.category,
                                "exercise catalogue returned no matches"
                            );
                        }
                        found.into_iter().map(|e| e.id).collect()
                    }
                    Err(e) => {
                        warn!(week = plan.week, day = entry.day_number, error = %e, "exercise lookup failed");
                        lookups.failed = true;
                        Vec::new()
                    }
                },
                None => Vec::new(),
            };
            let workout = builder.build(entry, exercises);
            if let Some(day) = days.get_mut(entry.day_number as usize - 1) {
                day.workouts.push(workout);
            }
        }

        debug!(week = plan.week, notes = distribution.notes.len(), "week assembled");
        ProgramWeek {
            week_number: plan.week,
            phase: plan.phase,
            focus: plan.focus.clone(),
            is_deload: plan.is_deload(),
            volume_percentage: plan.effective_percentage,
            planned_minutes: plan.volume_minutes,
            training_days: plan.training_days,
            start_date: week_start,
            days,
            notes: distribution.notes,
        }
    }
}

/// Reject out-of-range request parameters before anything is computed
pub fn validate_params(params: &GenerationParams) -> std::result::Result<(), ValidationError> {
    use crate::periodization::{MAX_DURATION_WEEKS, MIN_DURATION_WEEKS};

    if !(MIN_DURATION_WEEKS..=MAX_DURATION_WEEKS).contains(&params.duration_weeks) {
        return Err(ValidationError::InvalidParameter {
            parameter: "duration_weeks".to_string(),
            value: params.duration_weeks.to_string(),
            reason: format!("must be between {} and {}", MIN_DURATION_WEEKS, MAX_DURATION_WEEKS),
        });
    }
    let (min_days, max_days) = TRAINING_DAYS_RANGE;
    if !(min_days..=max_days).contains(&params.training_days) {
        return Err(ValidationError::InvalidParameter {
            parameter: "training_days".to_string(),
            value: params.training_days.to_string(),
            reason: format!("must be between {} and {}", min_days, max_days),
        });
    }
    if let Some(minutes) = params.current_weekly_minutes {
        if minutes < Decimal::ZERO {
            return Err(ValidationError::InvalidParameter {
                parameter: "current_weekly_minutes".to_string(),
                value: minutes.to_string(),
                reason: "must not be negative".to_string(),
            });
        }
    }
    Ok(())
}

/// Verify the phase plan and volume progression cover every week consistently
pub fn check_progression(
    duration_weeks: u32,
    distribution: &PhaseDistribution,
    phases: &[Phase],
    progression: &[VolumeProgressionEntry],
) -> std::result::Result<(), ProgramGenerationError> {
    if distribution.total() != duration_weeks {
        return Err(ProgramGenerationError::PhaseSum {
            expected: duration_weeks,
            actual: distribution.total(),
        });
    }
    for week in 1..=duration_weeks {
        let index = week as usize - 1;
        let entry = progression.get(index).ok_or(ProgramGenerationError::MissingWeek {
            week,
            available: progression.len(),
        })?;
        if let Some(expected) = phases.get(index) {
            if *expected != entry.phase {
                return Err(ProgramGenerationError::PhaseMismatch {
                    week,
                    expected: expected.to_string(),
                    actual: entry.phase.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Exercise lookup outcomes across the whole program
#[derive(Debug, Default)]
struct CatalogueLookups {
    failed: bool,
    unmatched: usize,
}

fn exercise_filter(entry: &WorkoutPlanEntry, params: &GenerationParams) -> Option<ExerciseFilter> {
    let equipment = if params.equipment.gym_access {
        Equipment::Gym
    } else {
        Equipment::Bodyweight
    };
    let filter = match &entry.params {
        WorkoutParams::Strength { region, exercise_count, .. } => {
            ExerciseFilter::new(ExerciseCategory::Strength, equipment, *exercise_count as usize)
                .with_region(*region)
        }
        WorkoutParams::Core { exercise_count, .. } => {
            ExerciseFilter::new(ExerciseCategory::Core, equipment, *exercise_count as usize)
                .with_region(BodyRegion::Core)
        }
        WorkoutParams::Plyometric { exercise_count, .. } => {
            ExerciseFilter::new(ExerciseCategory::Plyometric, equipment, *exercise_count as usize)
        }
        _ => return None,
    };
    Some(filter)
}

/// Totals and achieved intensity split over endurance sessions
fn summarize(weeks: &[ProgramWeek], deloads: &DeloadSchedule) -> ProgramSummary {
    let mut total_minutes = 0;
    let mut total_tss = Decimal::ZERO;
    let (mut easy, mut moderate, mut hard) = (0u64, 0u64, 0u64);

    for workout in weeks.iter().flat_map(|w| w.workouts()) {
        total_minutes += workout.duration_minutes;
        total_tss += workout.estimated_tss;
        if workout.category.is_secondary() {
            continue;
        }
        for segment in &workout.segments {
            let seconds = segment.total_seconds() as u64;
            let zone = segment.target.as_ref().map(|t| t.zone).unwrap_or(1);
            match (segment.kind, zone) {
                (SegmentKind::Work, 5) => hard += seconds,
                (SegmentKind::Work, 3 | 4) => moderate += seconds,
                _ => easy += seconds,
            }
        }
    }

    let total = easy + moderate + hard;
    let share = |part: u64| {
        if total == 0 {
            Decimal::ZERO
        } else {
            (Decimal::from(part) * dec!(100) / Decimal::from(total)).round_dp(1)
        }
    };

    ProgramSummary {
        total_minutes,
        total_tss,
        deload_weeks: deloads.weeks.len(),
        distribution: IntensityDistribution {
            easy: share(easy),
            moderate: share(moderate),
            hard: share(hard),
        },
    }
}

/// Program structure covered by the fingerprint; id and timestamp are excluded
#[derive(Serialize)]
struct FingerprintView<'a> {
    athlete_id: &'a Option<String>,
    sport: Sport,
    goal: crate::models::TrainingGoal,
    level: crate::models::ExperienceLevel,
    methodology: &'a MethodologyConfig,
    threshold: &'a Option<ThresholdResult>,
    aerobic_threshold: &'a Option<ThresholdResult>,
    zones: &'a ZoneTable,
    phase_distribution: &'a PhaseDistribution,
    progression: &'a [VolumeProgressionEntry],
    deloads: &'a DeloadSchedule,
    weeks: &'a [ProgramWeek],
    start_date: Option<NaiveDate>,
    warnings: &'a [String],
}

/// SHA-256 over the program structure, hex encoded
pub fn fingerprint(program: &TrainingProgram) -> Result<String> {
    let view = FingerprintView {
        athlete_id: &program.athlete_id,
        sport: program.sport,
        goal: program.goal,
        level: program.level,
        methodology: &program.methodology,
        threshold: &program.threshold,
        aerobic_threshold: &program.aerobic_threshold,
        zones: &program.zones,
        phase_distribution: &program.phase_distribution,
        progression: &program.progression,
        deloads: &program.deloads,
        weeks: &program.weeks,
        start_date: program.start_date,
        warnings: &program.warnings,
    };
    let bytes = serde_json::to_vec(&view)
        .map_err(|e| crate::error::PlannerError::Calculation(format!("fingerprint serialization: {}", e)))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryDataSource;
    use crate::error::{LookupError, PlannerError};
    use crate::models::{
        ElitePaces, Exercise, ExperienceLevel, IntensityUnit, SessionCounts, TrainingGoal,
        WorkoutCategory,
    };

    fn cycling_test() -> LactateTest {
        LactateTest::new(
            vec![100.0, 130.0, 160.0, 190.0, 220.0, 250.0],
            vec![1.5, 1.8, 2.2, 3.0, 4.9, 12.5],
            vec![125.0, 137.0, 149.0, 161.0, 174.0, 186.0],
            IntensityUnit::Power,
        )
    }

    fn running_test() -> LactateTest {
        LactateTest::new(
            vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0],
            vec![1.1, 1.2, 1.5, 2.0, 3.1, 5.0, 8.2],
            vec![130.0, 140.0, 149.0, 158.0, 167.0, 176.0, 184.0],
            IntensityUnit::Speed,
        )
    }

    /// Source whose every lookup fails
    struct FailingSource;

    #[async_trait::async_trait(?Send)]
    impl AthleteDataSource for FailingSource {
        async fn most_recent_race(&self, _: Option<&str>) -> std::result::Result<Option<RaceResult>, LookupError> {
            Err(LookupError::Backend { source_name: "test".into(), reason: "offline".into() })
        }

        async fn elite_paces(&self, _: Option<&str>) -> std::result::Result<Option<ElitePaces>, LookupError> {
            Err(LookupError::Backend { source_name: "test".into(), reason: "offline".into() })
        }

        async fn exercises(&self, _: &ExerciseFilter) -> std::result::Result<Vec<Exercise>, LookupError> {
            Err(LookupError::Backend { source_name: "test".into(), reason: "offline".into() })
        }
    }

    #[tokio::test]
    async fn test_generate_cycling_program() {
        let assembler = ProgramAssembler::new(InMemoryDataSource::with_default_catalogue());
        let params = GenerationParams::new(TrainingGoal::Century, 12, 5, ExperienceLevel::Intermediate);
        let program = assembler.generate(&cycling_test(), &params).await.unwrap();

        assert_eq!(program.weeks.len(), 12);
        assert_eq!(program.sport, Sport::Cycling);
        assert_eq!(program.zones.source, ZoneSource::LactateTest);
        assert!(program.weeks.iter().all(|w| w.days.len() == 7));
        assert_eq!(program.fingerprint.len(), 64);
        assert!(program.summary.total_minutes > 0);
    }

    #[tokio::test]
    async fn test_lookup_failures_degrade() {
        let assembler = ProgramAssembler::new(FailingSource);
        let mut params = GenerationParams::new(TrainingGoal::TenK, 8, 4, ExperienceLevel::Beginner);
        params.athlete_id = Some("ath-1".into());
        params.sessions = SessionCounts { strength: 1, core: 1, plyometric: 0, quality: None };

        let program = assembler.generate(&running_test(), &params).await.unwrap();
        let gym: Vec<_> = program
            .weeks
            .iter()
            .flat_map(|w| w.workouts())
            .filter(|w| w.category == WorkoutCategory::Strength || w.category == WorkoutCategory::Core)
            .collect();
        assert!(!gym.is_empty());
        assert!(gym.iter().all(|w| w.exercises.is_empty()));
        assert!(program.warnings.iter().any(|w| w.contains("catalogue")));
    }

    #[tokio::test]
    async fn test_empty_catalogue_is_reported() {
        let assembler = ProgramAssembler::new(InMemoryDataSource::new());
        let mut params = GenerationParams::new(TrainingGoal::TenK, 6, 4, ExperienceLevel::Beginner);
        params.sessions = SessionCounts { strength: 1, core: 0, plyometric: 0, quality: None };

        let program = assembler.generate(&running_test(), &params).await.unwrap();
        let strength: Vec<_> = program
            .weeks
            .iter()
            .flat_map(|w| w.workouts())
            .filter(|w| w.category == WorkoutCategory::Strength)
            .collect();
        assert!(!strength.is_empty());
        assert!(strength.iter().all(|w| w.exercises.is_empty()));
        assert!(program.warnings.iter().any(|w| w.contains("no matches")));
        assert!(!program.warnings.iter().any(|w| w.contains("unavailable")));
    }

    #[tokio::test]
    async fn test_exercises_attached_from_catalogue() {
        let assembler = ProgramAssembler::new(InMemoryDataSource::with_default_catalogue());
        let mut params = GenerationParams::new(TrainingGoal::HalfMarathon, 10, 5, ExperienceLevel::Intermediate);
        params.sessions = SessionCounts { strength: 1, core: 1, plyometric: 1, quality: None };

        let program = assembler.generate(&running_test(), &params).await.unwrap();
        let core = program
            .weeks
            .iter()
            .flat_map(|w| w.workouts())
            .find(|w| w.category == WorkoutCategory::Core)
            .unwrap();
        assert_eq!(core.exercises.len(), 4);
    }

    #[tokio::test]
    async fn test_stored_zones_used_without_stages() {
        let assembler = ProgramAssembler::new(InMemoryDataSource::new());
        let params = GenerationParams::new(TrainingGoal::TenK, 6, 4, ExperienceLevel::Beginner);
        let previous = assembler.generate(&running_test(), &params).await.unwrap().zones;

        let mut test = LactateTest::new(vec![], vec![], vec![], IntensityUnit::Speed);
        test.previous_zones = Some(previous.clone());
        let program = assembler.generate(&test, &params).await.unwrap();
        assert_eq!(program.zones.source, ZoneSource::Stored);
        assert_eq!(program.zones.zones, previous.zones);
        assert!(program.threshold.is_none());
    }

    #[tokio::test]
    async fn test_no_threshold_data() {
        let assembler = ProgramAssembler::new(InMemoryDataSource::new());
        let params = GenerationParams::new(TrainingGoal::TenK, 6, 4, ExperienceLevel::Beginner);
        let test = LactateTest::new(vec![], vec![], vec![], IntensityUnit::Speed);
        let err = assembler.generate(&test, &params).await.unwrap_err();
        assert!(matches!(err, PlannerError::Validation(ValidationError::NoThresholdData(_))));
    }

    #[tokio::test]
    async fn test_elite_paces_supersede_test_zones() {
        let mut source = InMemoryDataSource::new();
        source.set_elite_paces(
            "elite-1",
            ElitePaces {
                easy: Some(dec!(4.5)),
                marathon: Some(dec!(3.4)),
                threshold: Some(dec!(3.2)),
                interval: Some(dec!(3.0)),
                repetition: Some(dec!(2.8)),
            },
        );
        let assembler = ProgramAssembler::new(source);
        let mut params = GenerationParams::new(TrainingGoal::Marathon, 12, 6, ExperienceLevel::Elite);
        params.athlete_id = Some("elite-1".into());

        let program = assembler.generate(&running_test(), &params).await.unwrap();
        assert_eq!(program.zones.source, ZoneSource::EliteReference);
    }

    #[test]
    fn test_params_validation() {
        let mut params = GenerationParams::new(TrainingGoal::Marathon, 3, 4, ExperienceLevel::Advanced);
        assert!(validate_params(&params).is_err());
        params.duration_weeks = 16;
        params.training_days = 1;
        assert!(validate_params(&params).is_err());
        params.training_days = 7;
        assert!(validate_params(&params).is_ok());
        params.current_weekly_minutes = Some(dec!(-5));
        assert!(validate_params(&params).is_err());
    }

    #[test]
    fn test_check_progression_missing_week() {
        let dist = PhaseDistribution { base: 2, build: 1, peak: 1, taper: 1 };
        let mut progression = PeriodizationPlanner::volume_progression(&dist, dec!(200), dec!(300));
        progression.pop();
        let err = check_progression(5, &dist, &dist.phases(), &progression).unwrap_err();
        assert_eq!(err, ProgramGenerationError::MissingWeek { week: 5, available: 4 });
    }

    #[test]
    fn test_check_progression_phase_mismatch() {
        let dist = PhaseDistribution { base: 2, build: 1, peak: 1, taper: 1 };
        let mut progression = PeriodizationPlanner::volume_progression(&dist, dec!(200), dec!(300));
        progression[2].phase = Phase::Peak;
        let err = check_progression(5, &dist, &dist.phases(), &progression).unwrap_err();
        assert!(matches!(err, ProgramGenerationError::PhaseMismatch { week: 3, .. }));
    }
}
