//! Athlete data lookups
//!
//! [`AthleteDataSource`] is the seam to the external store holding race
//! results, elite reference paces and the exercise catalogue. The SQLite
//! adapter in [`crate::database`] implements it, as does the in-memory
//! source below.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::LookupError;
use crate::models::{BodyRegion, ElitePaces, Equipment, Exercise, ExerciseCategory, RaceResult};

/// Exercise catalogue query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseFilter {
    pub category: ExerciseCategory,
    /// `None` matches every region
    pub body_region: Option<BodyRegion>,
    /// Equipment available to the athlete; gym access includes bodyweight work
    pub equipment: Equipment,
    pub limit: usize,
}

impl ExerciseFilter {
    pub fn new(category: ExerciseCategory, equipment: Equipment, limit: usize) -> Self {
        Self {
            category,
            body_region: None,
            equipment,
            limit,
        }
    }

    pub fn with_region(mut self, region: BodyRegion) -> Self {
        self.body_region = Some(region);
        self
    }

    pub fn matches(&self, exercise: &Exercise) -> bool {
        exercise.category == self.category
            && self.body_region.map_or(true, |r| r == exercise.body_region)
            && (self.equipment == Equipment::Gym || exercise.equipment == Equipment::Bodyweight)
    }
}

/// Read-only lookups used during program generation. Futures are not `Send`.
#[async_trait(?Send)]
pub trait AthleteDataSource {
    /// Most recent race result for the athlete
    async fn most_recent_race(&self, athlete_id: Option<&str>) -> Result<Option<RaceResult>, LookupError>;

    /// Elite reference paces for the athlete, if any were recorded
    async fn elite_paces(&self, athlete_id: Option<&str>) -> Result<Option<ElitePaces>, LookupError>;

    /// Exercises matching a filter, most recently added first
    async fn exercises(&self, filter: &ExerciseFilter) -> Result<Vec<Exercise>, LookupError>;
}

/// Race result stored for an athlete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteRace {
    pub athlete_id: String,
    pub race: RaceResult,
}

/// In-memory data source
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataSource {
    races: Vec<AthleteRace>,
    elite_paces: Vec<(String, ElitePaces)>,
    /// Insertion order
    exercises: Vec<Exercise>,
}

impl InMemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Source preloaded with the built-in exercise catalogue
    pub fn with_default_catalogue() -> Self {
        Self {
            exercises: default_exercises(),
            ..Self::default()
        }
    }

    pub fn add_race(&mut self, athlete_id: &str, race: RaceResult) {
        self.races.push(AthleteRace {
            athlete_id: athlete_id.to_string(),
            race,
        });
    }

    pub fn set_elite_paces(&mut self, athlete_id: &str, paces: ElitePaces) {
        self.elite_paces.retain(|(id, _)| id != athlete_id);
        self.elite_paces.push((athlete_id.to_string(), paces));
    }

    pub fn add_exercise(&mut self, exercise: Exercise) {
        self.exercises.push(exercise);
    }
}

#[async_trait(?Send)]
impl AthleteDataSource for InMemoryDataSource {
    async fn most_recent_race(&self, athlete_id: Option<&str>) -> Result<Option<RaceResult>, LookupError> {
        let Some(id) = athlete_id else {
            return Ok(None);
        };
        Ok(self
            .races
            .iter()
            .filter(|r| r.athlete_id == id)
            .max_by_key(|r| r.race.date)
            .map(|r| r.race.clone()))
    }

    async fn elite_paces(&self, athlete_id: Option<&str>) -> Result<Option<ElitePaces>, LookupError> {
        let Some(id) = athlete_id else {
            return Ok(None);
        };
        Ok(self
            .elite_paces
            .iter()
            .find(|(athlete, _)| athlete == id)
            .map(|(_, paces)| paces.clone()))
    }

    async fn exercises(&self, filter: &ExerciseFilter) -> Result<Vec<Exercise>, LookupError> {
        Ok(self
            .exercises
            .iter()
            .rev()
            .filter(|e| filter.matches(e))
            .take(filter.limit)
            .cloned()
            .collect())
    }
}

fn exercise(
    id: &str,
    name: &str,
    category: ExerciseCategory,
    body_region: BodyRegion,
    equipment: Equipment,
) -> Exercise {
    Exercise {
        id: id.to_string(),
        name: name.to_string(),
        category,
        body_region,
        equipment,
    }
}

/// Built-in exercise catalogue
pub fn default_exercises() -> Vec<Exercise> {
    use BodyRegion::*;
    use Equipment::*;
    use ExerciseCategory::{Core as CoreWork, Plyometric, Strength};

    vec![
        exercise("back-squat", "Back Squat", Strength, LowerBody, Gym),
        exercise("romanian-deadlift", "Romanian Deadlift", Strength, LowerBody, Gym),
        exercise("split-squat", "Bulgarian Split Squat", Strength, LowerBody, Bodyweight),
        exercise("single-leg-rdl", "Single-Leg Romanian Deadlift", Strength, LowerBody, Bodyweight),
        exercise("step-up", "Step-Up", Strength, LowerBody, Bodyweight),
        exercise("calf-raise", "Single-Leg Calf Raise", Strength, LowerBody, Bodyweight),
        exercise("glute-bridge", "Single-Leg Glute Bridge", Strength, LowerBody, Bodyweight),
        exercise("push-up", "Push-Up", Strength, UpperBody, Bodyweight),
        exercise("inverted-row", "Inverted Row", Strength, UpperBody, Bodyweight),
        exercise("bench-press", "Bench Press", Strength, UpperBody, Gym),
        exercise("seated-row", "Seated Cable Row", Strength, UpperBody, Gym),
        exercise("kettlebell-swing", "Kettlebell Swing", Strength, FullBody, Gym),
        exercise("walking-lunge", "Walking Lunge", Strength, FullBody, Bodyweight),
        exercise("burpee", "Burpee", Strength, FullBody, Bodyweight),
        exercise("plank", "Front Plank", CoreWork, Core, Bodyweight),
        exercise("side-plank", "Side Plank", CoreWork, Core, Bodyweight),
        exercise("dead-bug", "Dead Bug", CoreWork, Core, Bodyweight),
        exercise("bird-dog", "Bird Dog", CoreWork, Core, Bodyweight),
        exercise("pallof-press", "Pallof Press", CoreWork, Core, Gym),
        exercise("pogo-jumps", "Pogo Jumps", Plyometric, LowerBody, Bodyweight),
        exercise("skipping-a", "A-Skips", Plyometric, LowerBody, Bodyweight),
        exercise("bounding", "Bounding", Plyometric, LowerBody, Bodyweight),
        exercise("box-jump", "Box Jump", Plyometric, LowerBody, Gym),
    ]
}

/// 10 km running race in 42:30
pub fn sample_race(date: NaiveDate) -> RaceResult {
    RaceResult {
        sport: crate::models::Sport::Running,
        distance_m: 10_000,
        time_seconds: 2_550,
        date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sport;

    #[tokio::test]
    async fn test_exercises_most_recent_first() {
        let source = InMemoryDataSource::with_default_catalogue();
        let filter = ExerciseFilter::new(ExerciseCategory::Core, Equipment::Bodyweight, 10);
        let exercises = source.exercises(&filter).await.unwrap();

        let ids: Vec<&str> = exercises.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["bird-dog", "dead-bug", "side-plank", "plank"]);
    }

    #[tokio::test]
    async fn test_gym_access_includes_bodyweight() {
        let source = InMemoryDataSource::with_default_catalogue();
        let filter = ExerciseFilter::new(ExerciseCategory::Strength, Equipment::Gym, 50)
            .with_region(BodyRegion::UpperBody);
        let exercises = source.exercises(&filter).await.unwrap();
        assert_eq!(exercises.len(), 4);
        assert!(exercises.iter().any(|e| e.equipment == Equipment::Bodyweight));

        let filter = ExerciseFilter::new(ExerciseCategory::Strength, Equipment::Bodyweight, 50)
            .with_region(BodyRegion::UpperBody);
        let exercises = source.exercises(&filter).await.unwrap();
        assert!(exercises.iter().all(|e| e.equipment == Equipment::Bodyweight));
    }

    #[tokio::test]
    async fn test_limit_is_respected() {
        let source = InMemoryDataSource::with_default_catalogue();
        let filter = ExerciseFilter::new(ExerciseCategory::Strength, Equipment::Gym, 3);
        assert_eq!(source.exercises(&filter).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_most_recent_race() {
        let mut source = InMemoryDataSource::new();
        let older = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let newer = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        source.add_race("ath-1", sample_race(newer));
        source.add_race("ath-1", RaceResult { distance_m: 5_000, ..sample_race(older) });
        source.add_race("ath-2", sample_race(older));

        let race = source.most_recent_race(Some("ath-1")).await.unwrap().unwrap();
        assert_eq!(race.date, newer);
        assert_eq!(race.sport, Sport::Running);
        assert!(source.most_recent_race(None).await.unwrap().is_none());
        assert!(source.most_recent_race(Some("nobody")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_elite_paces_replace_previous() {
        let mut source = InMemoryDataSource::new();
        source.set_elite_paces("ath-1", ElitePaces::default());
        let paces = ElitePaces {
            threshold: Some(rust_decimal_macros::dec!(3.2)),
            ..ElitePaces::default()
        };
        source.set_elite_paces("ath-1", paces.clone());
        assert_eq!(source.elite_paces(Some("ath-1")).await.unwrap(), Some(paces));
    }
}
