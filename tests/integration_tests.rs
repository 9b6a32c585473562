use chrono::NaiveDate;
use lactateplan::error::ProgramGenerationError;
use lactateplan::periodization::PeriodizationPlanner;
use lactateplan::{
    Confidence, ExperienceLevel, GenerationParams, InMemoryDataSource, IntensityUnit, LactateTest,
    Methodology, MethodologyRequest, Phase, PlannerError, ProgramAssembler, RaceResult, Sport,
    ThresholdDetector, TrainingGoal, WorkoutCategory, ZoneCalculator,
};

/// Integration tests that exercise complete workflows through the public API

#[cfg(test)]
mod integration_tests {
    use super::*;

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

    fn marathon_params() -> GenerationParams {
        GenerationParams::new(TrainingGoal::Marathon, 16, 4, ExperienceLevel::Intermediate)
    }

    #[test]
    fn test_cycling_threshold_and_zones() {
        let detector = ThresholdDetector::default();
        let test = cycling_test();

        let threshold = detector.detect_mod_dmax(&test).unwrap();
        assert!(
            threshold.intensity >= 195.0 && threshold.intensity <= 215.0,
            "threshold {}",
            threshold.intensity
        );
        assert!(matches!(threshold.confidence, Confidence::High | Confidence::Medium));

        let aerobic = detector.detect_aerobic(&test).unwrap();
        let zones = ZoneCalculator::from_thresholds(&threshold, Some(&aerobic), Some(&test)).unwrap();
        assert_eq!(zones.zones.len(), 5);
        for pair in zones.zones.windows(2) {
            assert_eq!(pair[0].high, pair[1].low);
        }
        // Aerobic threshold becomes the Z2/Z3 boundary
        assert!((zones.zones[1].high - 145.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_sixteen_week_marathon() {
        let assembler = ProgramAssembler::new(InMemoryDataSource::with_default_catalogue());
        let program = assembler.generate(&running_test(), &marathon_params()).await.unwrap();

        assert_eq!(program.sport, Sport::Running);
        assert_eq!(program.progression.len(), 16);
        assert_eq!(program.weeks.len(), 16);
        assert_eq!(program.phase_distribution.total(), 16);

        let through_build: Vec<_> = program
            .progression
            .iter()
            .filter(|e| matches!(e.phase, Phase::Base | Phase::Build))
            .collect();
        for pair in through_build.windows(2) {
            assert!(pair[1].volume_percentage >= pair[0].volume_percentage);
        }

        let base_days = program.weeks.iter().find(|w| w.phase == Phase::Base).unwrap().training_days;
        let taper_days = program.weeks.iter().find(|w| w.phase == Phase::Taper).unwrap().training_days;
        assert!(taper_days <= base_days);

        for week in &program.weeks {
            assert_eq!(week.days.len(), 7);
            let sessions = week.days.iter().filter(|d| !d.is_rest()).count();
            assert!(sessions <= week.training_days as usize, "week {}", week.week_number);
            assert!(week.workouts().any(|w| w.category == WorkoutCategory::LongSession));
        }
        assert!(program.summary.total_tss > rust_decimal::Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_identical_inputs_share_fingerprint() {
        let assembler = ProgramAssembler::new(InMemoryDataSource::with_default_catalogue());
        let mut params = marathon_params();
        params.target_date = NaiveDate::from_ymd_opt(2025, 4, 27);
        params.sessions.strength = 1;

        let first = assembler.generate(&running_test(), &params).await.unwrap();
        let second = assembler.generate(&running_test(), &params).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.fingerprint, second.fingerprint);
        assert_eq!(first.weeks, second.weeks);

        params.training_days = 5;
        let third = assembler.generate(&running_test(), &params).await.unwrap();
        assert_ne!(first.fingerprint, third.fingerprint);
    }

    #[tokio::test]
    async fn test_dates_follow_target() {
        let assembler = ProgramAssembler::new(InMemoryDataSource::new());
        let mut params = marathon_params();
        let race_day = NaiveDate::from_ymd_opt(2025, 4, 27).unwrap();
        params.target_date = Some(race_day);

        let program = assembler.generate(&running_test(), &params).await.unwrap();
        let first_day = program.weeks[0].days[0].date.unwrap();
        let last_day = program.weeks[15].days[6].date.unwrap();

        assert_eq!(Some(first_day), program.start_date);
        assert_eq!(last_day, race_day - chrono::Duration::days(1));
    }

    #[tokio::test]
    async fn test_missing_week_aborts_generation() {
        let assembler = ProgramAssembler::new(InMemoryDataSource::new());
        let params = marathon_params();
        let inputs = assembler.resolve_inputs(&running_test(), &params).await.unwrap();
        let mut plan = PeriodizationPlanner::plan(&params, inputs.methodology.methodology).unwrap();
        plan.progression.pop();

        let err = assembler.assemble(&params, inputs, plan).await.unwrap_err();
        match err {
            PlannerError::ProgramGeneration(ProgramGenerationError::MissingWeek { week, available }) => {
                assert_eq!(week, 16);
                assert_eq!(available, 15);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_slow_race_flags_pace_check() {
        let mut source = InMemoryDataSource::new();
        source.add_race(
            "runner",
            RaceResult {
                sport: Sport::Running,
                distance_m: 10_000,
                time_seconds: 3_000,
                date: NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(),
            },
        );
        let assembler = ProgramAssembler::new(source);
        let mut params = GenerationParams::new(TrainingGoal::TenK, 8, 5, ExperienceLevel::Intermediate);
        params.athlete_id = Some("runner".into());

        let program = assembler.generate(&running_test(), &params).await.unwrap();
        assert!(program.warnings.iter().any(|w| w.contains("Most recent race")));
    }

    #[tokio::test]
    async fn test_explicit_methodology_is_kept() {
        let assembler = ProgramAssembler::new(InMemoryDataSource::new());
        let mut params = GenerationParams::new(TrainingGoal::Century, 12, 5, ExperienceLevel::Advanced);
        params.methodology = MethodologyRequest::Explicit(Methodology::ThresholdConcentrated);
        params.equipment.power_meter = true;

        let program = assembler.generate(&cycling_test(), &params).await.unwrap();
        assert_eq!(program.sport, Sport::Cycling);
        assert_eq!(program.methodology.methodology, Methodology::ThresholdConcentrated);

        let tempo = program
            .weeks
            .iter()
            .flat_map(|w| w.workouts())
            .find(|w| w.category.is_quality())
            .unwrap();
        let target = tempo.segments.iter().find_map(|s| s.target.clone()).unwrap();
        assert_eq!(target.unit, IntensityUnit::Power);
        assert!(target.high.is_some());
    }

    #[tokio::test]
    async fn test_invalid_test_is_rejected() {
        let assembler = ProgramAssembler::new(InMemoryDataSource::new());
        let test = LactateTest::new(
            vec![100.0, 150.0, 200.0],
            vec![1.0, 2.0, 4.0],
            vec![120.0, 140.0, 160.0],
            IntensityUnit::Power,
        );
        let err = assembler.generate(&test, &marathon_params()).await.unwrap_err();
        assert!(matches!(err, PlannerError::Validation(_)));
    }
}
