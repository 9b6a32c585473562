//! SQLite persistence
//!
//! Stores the exercise catalogue, race results, elite reference paces and
//! generated programs. Programs are kept as gzip-compressed JSON next to
//! their fingerprint. [`Database`] also serves as an [`AthleteDataSource`].

use async_trait::async_trait;
use chrono::NaiveDate;
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::{default_exercises, AthleteDataSource, ExerciseFilter};
use crate::error::{DatabaseError, LookupError};
use crate::models::{ElitePaces, Equipment, Exercise, RaceResult, Sport, TrainingProgram};

type DbResult<T> = std::result::Result<T, DatabaseError>;

/// Gzip-compressed JSON document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressedDocument {
    pub compressed_data: Vec<u8>,
    pub original_size: usize,
}

impl CompressedDocument {
    pub fn compress<T: Serialize>(value: &T) -> DbResult<Self> {
        let serialized =
            serde_json::to_vec(value).map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let original_size = serialized.len();

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&serialized)?;
        let compressed_data = encoder.finish()?;

        Ok(Self {
            compressed_data,
            original_size,
        })
    }

    pub fn decompress<T: for<'de> Deserialize<'de>>(&self) -> DbResult<T> {
        let mut decoder = GzDecoder::new(self.compressed_data.as_slice());
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)?;

        serde_json::from_slice(&decompressed).map_err(|e| DatabaseError::Serialization(e.to_string()))
    }

    /// Original size / compressed size
    pub fn compression_ratio(&self) -> f64 {
        if self.compressed_data.is_empty() {
            return 0.0;
        }
        self.original_size as f64 / self.compressed_data.len() as f64
    }
}

/// Stored program listing entry
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramRecord {
    pub id: String,
    pub athlete_id: Option<String>,
    pub name: String,
    pub fingerprint: String,
    pub created_at: String,
}

/// Database statistics
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseStats {
    pub exercise_count: usize,
    pub race_count: usize,
    pub elite_pace_count: usize,
    pub program_count: usize,
    pub compression_ratio: f64,
}

/// Database connection
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create or open a database at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> DbResult<Self> {
        let conn = Connection::open(db_path.as_ref())?;
        let db = Self { conn };
        db.init_schema(true)?;
        info!(path = %db_path.as_ref().display(), "database opened");
        Ok(db)
    }

    /// Private in-memory database
    pub fn in_memory() -> DbResult<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema(false)?;
        Ok(db)
    }

    fn init_schema(&self, on_disk: bool) -> DbResult<()> {
        if on_disk {
            self.conn.pragma_update(None, "journal_mode", "WAL")?;
            self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        }

        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS exercises (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                body_region TEXT NOT NULL,
                equipment TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS race_results (
                id TEXT PRIMARY KEY,
                athlete_id TEXT NOT NULL,
                sport TEXT NOT NULL,
                distance_m INTEGER NOT NULL,
                time_seconds INTEGER NOT NULL,
                race_date DATE NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS elite_paces (
                athlete_id TEXT PRIMARY KEY,
                easy TEXT,
                marathon TEXT,
                threshold TEXT,
                interval TEXT,
                repetition TEXT,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS programs (
                id TEXT PRIMARY KEY,
                athlete_id TEXT,
                name TEXT NOT NULL,
                fingerprint TEXT NOT NULL,
                compressed_data BLOB NOT NULL,
                original_size INTEGER NOT NULL,
                created_at DATETIME NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_exercises_category ON exercises (category, body_region);
            CREATE INDEX IF NOT EXISTS idx_races_athlete_date ON race_results (athlete_id, race_date);
            CREATE INDEX IF NOT EXISTS idx_programs_athlete ON programs (athlete_id, created_at);
            CREATE INDEX IF NOT EXISTS idx_programs_fingerprint ON programs (fingerprint);
            "#,
        )?;
        Ok(())
    }

    /// Insert or replace a catalogue exercise. Replacing moves it to most recent.
    pub fn insert_exercise(&mut self, exercise: &Exercise) -> DbResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM exercises WHERE id = ?1", params![exercise.id])?;
        tx.execute(
            "INSERT INTO exercises (id, name, category, body_region, equipment) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                exercise.id,
                exercise.name,
                exercise.category.as_str(),
                exercise.body_region.as_str(),
                exercise.equipment.as_str(),
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Load the built-in catalogue when the table is empty. Returns the number inserted.
    pub fn seed_default_exercises(&mut self) -> DbResult<usize> {
        let count: i64 = self.conn.query_row("SELECT COUNT(*) FROM exercises", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(0);
        }
        let exercises = default_exercises();
        for exercise in &exercises {
            self.insert_exercise(exercise)?;
        }
        info!(count = exercises.len(), "exercise catalogue seeded");
        Ok(exercises.len())
    }

    /// Exercises matching a filter, most recently added first
    pub fn query_exercises(&self, filter: &ExerciseFilter) -> DbResult<Vec<Exercise>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, category, body_region, equipment
            FROM exercises
            WHERE category = ?1
              AND (?2 IS NULL OR body_region = ?2)
              AND (?3 = 'gym' OR equipment = 'bodyweight')
            ORDER BY seq DESC
            LIMIT ?4
            "#,
        )?;
        let rows = stmt.query_map(
            params![
                filter.category.as_str(),
                filter.body_region.map(|r| r.as_str()),
                filter.equipment.as_str(),
                filter.limit as i64,
            ],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            },
        )?;

        let mut exercises = Vec::new();
        for row in rows {
            let (id, name, category, region, equipment) = row?;
            exercises.push(Exercise {
                id,
                name,
                category: category.parse().map_err(DatabaseError::Serialization)?,
                body_region: region.parse().map_err(DatabaseError::Serialization)?,
                equipment: Equipment::from_str(&equipment).map_err(DatabaseError::Serialization)?,
            });
        }
        Ok(exercises)
    }

    /// Record a race result and return its id
    pub fn store_race(&mut self, athlete_id: &str, race: &RaceResult) -> DbResult<String> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            r#"
            INSERT INTO race_results (id, athlete_id, sport, distance_m, time_seconds, race_date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                id,
                athlete_id,
                sport_to_str(race.sport),
                race.distance_m,
                race.time_seconds,
                race.date.to_string(),
            ],
        )?;
        debug!(athlete_id, race_id = %id, "race stored");
        Ok(id)
    }

    pub fn latest_race(&self, athlete_id: &str) -> DbResult<Option<RaceResult>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT sport, distance_m, time_seconds, race_date
                FROM race_results
                WHERE athlete_id = ?1
                ORDER BY race_date DESC, created_at DESC
                LIMIT 1
                "#,
                params![athlete_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, u32>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        row.map(|(sport, distance_m, time_seconds, date)| {
            Ok(RaceResult {
                sport: parse_sport(&sport)?,
                distance_m,
                time_seconds,
                date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                    .map_err(|e| DatabaseError::Serialization(format!("race date {}: {}", date, e)))?,
            })
        })
        .transpose()
    }

    pub fn set_elite_paces(&mut self, athlete_id: &str, paces: &ElitePaces) -> DbResult<()> {
        let text = |d: &Option<Decimal>| d.map(|v| v.to_string());
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO elite_paces (athlete_id, easy, marathon, threshold, interval, repetition, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, CURRENT_TIMESTAMP)
            "#,
            params![
                athlete_id,
                text(&paces.easy),
                text(&paces.marathon),
                text(&paces.threshold),
                text(&paces.interval),
                text(&paces.repetition),
            ],
        )?;
        Ok(())
    }

    pub fn elite_paces_for(&self, athlete_id: &str) -> DbResult<Option<ElitePaces>> {
        self.conn
            .query_row(
                "SELECT easy, marathon, threshold, interval, repetition FROM elite_paces WHERE athlete_id = ?1",
                params![athlete_id],
                |row| {
                    Ok(ElitePaces {
                        easy: decimal_column(row, 0)?,
                        marathon: decimal_column(row, 1)?,
                        threshold: decimal_column(row, 2)?,
                        interval: decimal_column(row, 3)?,
                        repetition: decimal_column(row, 4)?,
                    })
                },
            )
            .optional()
            .map_err(DatabaseError::from)
    }

    /// Store a generated program, replacing any program with the same id
    pub fn save_program(&mut self, program: &TrainingProgram) -> DbResult<()> {
        let compressed = CompressedDocument::compress(program)?;
        self.conn.execute(
            r#"
            INSERT OR REPLACE INTO programs (
                id, athlete_id, name, fingerprint, compressed_data, original_size, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                program.id,
                program.athlete_id,
                program.name,
                program.fingerprint,
                compressed.compressed_data,
                compressed.original_size as i64,
                program.created_at.to_rfc3339(),
            ],
        )?;
        info!(
            id = %program.id,
            ratio = format!("{:.1}", compressed.compression_ratio()),
            "program saved"
        );
        Ok(())
    }

    pub fn load_program(&self, id: &str) -> DbResult<Option<TrainingProgram>> {
        let stored = self
            .conn
            .query_row(
                "SELECT compressed_data, original_size FROM programs WHERE id = ?1",
                params![id],
                |row| {
                    Ok(CompressedDocument {
                        compressed_data: row.get(0)?,
                        original_size: row.get::<_, i64>(1)? as usize,
                    })
                },
            )
            .optional()?;

        stored.map(|doc| doc.decompress()).transpose()
    }

    /// Program listing, newest first
    pub fn list_programs(&self, athlete_id: Option<&str>) -> DbResult<Vec<ProgramRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, athlete_id, name, fingerprint, created_at
            FROM programs
            WHERE ?1 IS NULL OR athlete_id = ?1
            ORDER BY created_at DESC
            "#,
        )?;
        let records = stmt
            .query_map(params![athlete_id], |row| {
                Ok(ProgramRecord {
                    id: row.get(0)?,
                    athlete_id: row.get(1)?,
                    name: row.get(2)?,
                    fingerprint: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn delete_program(&mut self, id: &str) -> DbResult<()> {
        let removed = self.conn.execute("DELETE FROM programs WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(DatabaseError::NotFound {
                table: "programs".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    pub fn get_stats(&self) -> DbResult<DatabaseStats> {
        let count = |table: &str| -> DbResult<usize> {
            let n: i64 = self
                .conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            Ok(n as usize)
        };

        let (original, compressed): (Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT SUM(original_size), SUM(LENGTH(compressed_data)) FROM programs",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let compression_ratio = match (original, compressed) {
            (Some(o), Some(c)) if c > 0 => o as f64 / c as f64,
            _ => 0.0,
        };

        Ok(DatabaseStats {
            exercise_count: count("exercises")?,
            race_count: count("race_results")?,
            elite_pace_count: count("elite_paces")?,
            program_count: count("programs")?,
            compression_ratio,
        })
    }
}

#[async_trait(?Send)]
impl AthleteDataSource for Database {
    async fn most_recent_race(&self, athlete_id: Option<&str>) -> Result<Option<RaceResult>, LookupError> {
        match athlete_id {
            Some(id) => self.latest_race(id).map_err(|e| lookup_error("race_results", e)),
            None => Ok(None),
        }
    }

    async fn elite_paces(&self, athlete_id: Option<&str>) -> Result<Option<ElitePaces>, LookupError> {
        match athlete_id {
            Some(id) => self.elite_paces_for(id).map_err(|e| lookup_error("elite_paces", e)),
            None => Ok(None),
        }
    }

    async fn exercises(&self, filter: &ExerciseFilter) -> Result<Vec<Exercise>, LookupError> {
        self.query_exercises(filter).map_err(|e| lookup_error("exercises", e))
    }
}

fn lookup_error(table: &str, error: DatabaseError) -> LookupError {
    match error {
        DatabaseError::Serialization(reason) => LookupError::Malformed {
            source_name: table.to_string(),
            reason,
        },
        other => LookupError::Backend {
            source_name: table.to_string(),
            reason: other.to_string(),
        },
    }
}

fn decimal_column(row: &Row, index: usize) -> rusqlite::Result<Option<Decimal>> {
    row.get::<_, Option<String>>(index)?
        .map(|s| {
            s.parse::<Decimal>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
            })
        })
        .transpose()
}

fn sport_to_str(sport: Sport) -> &'static str {
    match sport {
        Sport::Running => "running",
        Sport::Cycling => "cycling",
    }
}

fn parse_sport(s: &str) -> DbResult<Sport> {
    match s {
        "running" => Ok(Sport::Running),
        "cycling" => Ok(Sport::Cycling),
        _ => Err(DatabaseError::Serialization(format!("Unknown sport: {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::ProgramAssembler;
    use crate::catalog::sample_race;
    use crate::models::{
        BodyRegion, ExerciseCategory, ExperienceLevel, GenerationParams, IntensityUnit, LactateTest,
        TrainingGoal,
    };
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_seed_and_query_exercises() {
        let mut db = Database::in_memory().unwrap();
        assert_eq!(db.seed_default_exercises().unwrap(), default_exercises().len());
        assert_eq!(db.seed_default_exercises().unwrap(), 0);

        let filter = ExerciseFilter::new(ExerciseCategory::Core, Equipment::Bodyweight, 10);
        let ids: Vec<String> = db.query_exercises(&filter).unwrap().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["bird-dog", "dead-bug", "side-plank", "plank"]);

        let filter = ExerciseFilter::new(ExerciseCategory::Strength, Equipment::Gym, 2)
            .with_region(BodyRegion::UpperBody);
        assert_eq!(db.query_exercises(&filter).unwrap().len(), 2);
    }

    #[test]
    fn test_latest_race() {
        let mut db = Database::in_memory().unwrap();
        db.store_race("ath-1", &sample_race(date(2024, 3, 1))).unwrap();
        db.store_race("ath-1", &sample_race(date(2024, 5, 12))).unwrap();
        db.store_race("ath-2", &sample_race(date(2024, 6, 1))).unwrap();

        let race = db.latest_race("ath-1").unwrap().unwrap();
        assert_eq!(race.date, date(2024, 5, 12));
        assert_eq!(race.sport, Sport::Running);
        assert!(db.latest_race("nobody").unwrap().is_none());
    }

    #[test]
    fn test_elite_paces_round_trip() {
        let mut db = Database::in_memory().unwrap();
        let paces = ElitePaces {
            easy: Some(dec!(4.50)),
            threshold: Some(dec!(3.20)),
            ..ElitePaces::default()
        };
        db.set_elite_paces("ath-1", &paces).unwrap();
        assert_eq!(db.elite_paces_for("ath-1").unwrap(), Some(paces));
        assert!(db.elite_paces_for("ath-2").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_program_persistence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plans.db");

        let mut db = Database::new(&path).unwrap();
        db.seed_default_exercises().unwrap();

        let test = LactateTest::new(
            vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0],
            vec![1.1, 1.2, 1.5, 2.0, 3.1, 5.0, 8.2],
            vec![130.0, 140.0, 149.0, 158.0, 167.0, 176.0, 184.0],
            IntensityUnit::Speed,
        );
        let mut params = GenerationParams::new(TrainingGoal::TenK, 8, 4, ExperienceLevel::Intermediate);
        params.athlete_id = Some("ath-1".into());
        params.sessions.core = 1;

        let program = ProgramAssembler::new(Database::new(&path).unwrap())
            .generate(&test, &params)
            .await
            .unwrap();
        db.save_program(&program).unwrap();

        let reopened = Database::new(&path).unwrap();
        let loaded = reopened.load_program(&program.id).unwrap().unwrap();
        assert_eq!(loaded.id, program.id);
        assert_eq!(loaded.weeks.len(), program.weeks.len());
        assert_eq!(
            loaded.threshold.as_ref().map(|t| t.coefficients),
            program.threshold.as_ref().map(|t| t.coefficients)
        );
        assert_eq!(loaded.zones, program.zones);
        assert_eq!(crate::assembler::fingerprint(&loaded).unwrap(), program.fingerprint);

        let listing = reopened.list_programs(Some("ath-1")).unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].fingerprint, program.fingerprint);

        let stats = reopened.get_stats().unwrap();
        assert_eq!(stats.program_count, 1);
        assert!(stats.compression_ratio > 1.0);
    }

    #[test]
    fn test_delete_missing_program() {
        let mut db = Database::in_memory().unwrap();
        let err = db.delete_program("missing").unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_data_source_without_athlete() {
        let db = Database::in_memory().unwrap();
        assert!(db.most_recent_race(None).await.unwrap().is_none());
        assert!(db.elite_paces(None).await.unwrap().is_none());
    }
}
