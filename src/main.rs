use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use lactateplan::config::AppConfig;
use lactateplan::import::ImportManager;
use lactateplan::logging::{init_logging, LogLevel};
use lactateplan::models::format_pace;
use lactateplan::{
    AthleteDataSource, Confidence, Database, EquipmentFlags, ExperienceLevel, GenerationParams,
    InMemoryDataSource, IntensityUnit, LactateTest, MethodologyRequest, PlannerError,
    ProgramAssembler, SessionCounts, ThresholdDetector, ThresholdResult, TrainingGoal,
    TrainingProgram, ZoneCalculator, ZoneTable,
};

/// lactateplan - Lactate threshold and training plan CLI
///
/// Detects lactate thresholds from incremental test data, derives training
/// zones and generates periodized training programs.
#[derive(Parser)]
#[command(name = "lactateplan")]
#[command(version)]
#[command(about = "Lactate threshold detection and periodized training plans", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log format (pretty, json, compact)
    #[arg(long, global = true)]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Unit of the test intensity column
#[derive(Debug, Clone, Copy, ValueEnum)]
enum UnitArg {
    Power,
    Speed,
    Pace,
}

impl From<UnitArg> for IntensityUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Power => IntensityUnit::Power,
            UnitArg::Speed => IntensityUnit::Speed,
            UnitArg::Pace => IntensityUnit::Pace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MethodArg {
    Dmax,
    ModDmax,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the lactate threshold from a test file
    Threshold {
        /// Test file (CSV or JSON)
        #[arg(short, long)]
        file: PathBuf,

        /// Intensity unit when the file does not imply one
        #[arg(short, long, value_enum)]
        unit: Option<UnitArg>,

        /// Detection method
        #[arg(short, long, value_enum, default_value = "mod-dmax")]
        method: MethodArg,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Derive training zones from a test file
    Zones {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long, value_enum)]
        unit: Option<UnitArg>,

        /// Use elite reference paces stored for this athlete
        #[arg(short, long)]
        athlete: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Generate a periodized training program
    Generate(GenerateArgs),

    /// Configure application settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args)]
struct GenerateArgs {
    /// Test file (CSV or JSON)
    #[arg(short, long)]
    file: PathBuf,

    #[arg(short, long, value_enum)]
    unit: Option<UnitArg>,

    /// Goal (marathon, half, 10k, 5k, century, metric, maintenance, base, return)
    #[arg(short, long)]
    goal: String,

    /// Program length in weeks (goal default if omitted)
    #[arg(short, long)]
    weeks: Option<u32>,

    /// Training days per week
    #[arg(short, long)]
    days: Option<u8>,

    /// Experience level (beginner, intermediate, advanced, elite)
    #[arg(short, long, default_value = "intermediate")]
    level: String,

    /// Methodology (auto, polarized, pyramidal, threshold-concentrated, single-threshold)
    #[arg(short, long)]
    methodology: Option<String>,

    /// Event date (YYYY-MM-DD); the program ends the day before
    #[arg(long)]
    target_date: Option<String>,

    #[arg(short, long)]
    athlete: Option<String>,

    /// Current weekly training time in minutes
    #[arg(long)]
    current_minutes: Option<u32>,

    #[arg(long, default_value = "0")]
    strength: u8,

    #[arg(long, default_value = "0")]
    core: u8,

    #[arg(long, default_value = "0")]
    plyometric: u8,

    /// Quality sessions per week, replacing the methodology default
    #[arg(long)]
    quality: Option<u8>,

    #[arg(long)]
    power_meter: bool,

    /// Athlete trains without a heart-rate monitor
    #[arg(long)]
    no_hr: bool,

    #[arg(long)]
    gym: bool,

    /// Write the full program as JSON
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Save the program to the configured database
    #[arg(long)]
    save: bool,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the configuration file path
    Path,
}

#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Range")]
    range: String,
    #[tabled(rename = "Pace")]
    pace: String,
    #[tabled(rename = "Heart rate")]
    heart_rate: String,
}

#[derive(Tabled)]
struct WeekRow {
    #[tabled(rename = "Week")]
    week: u32,
    #[tabled(rename = "Phase")]
    phase: String,
    #[tabled(rename = "Volume %")]
    volume: String,
    #[tabled(rename = "Minutes")]
    minutes: String,
    #[tabled(rename = "Days")]
    days: u8,
    #[tabled(rename = "Sessions")]
    sessions: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);
    let config = AppConfig::load_or_default(Some(config_path.as_path()))?;

    let level = LogLevel::from_verbosity(cli.verbose).map(|l| l.as_str());
    let log_config = config.logging.to_log_config(level, cli.log_format.as_deref())?;
    init_logging(&log_config)?;

    let outcome = match cli.command {
        Commands::Threshold { file, unit, method, json } => {
            run_threshold(&config, &file, unit, method, json)
        }
        Commands::Zones { file, unit, athlete, json } => {
            run_zones(&config, &file, unit, athlete.as_deref(), json).await
        }
        Commands::Generate(args) => run_generate(&config, args).await,
        Commands::Config { action } => run_config(config, &config_path, action),
    };

    if let Err(error) = &outcome {
        if let Some(planner) = error.downcast_ref::<PlannerError>() {
            eprintln!("{} {}", "✗".red().bold(), planner.user_message().red());
        }
    }
    outcome
}

fn load_test(path: &Path, unit: Option<UnitArg>) -> Result<LactateTest> {
    ImportManager::new().import_file(path, unit.map(IntensityUnit::from))
}

fn run_threshold(
    config: &AppConfig,
    file: &Path,
    unit: Option<UnitArg>,
    method: MethodArg,
    json: bool,
) -> Result<()> {
    let test = load_test(file, unit)?;
    let detector = ThresholdDetector::new(config.threshold.clone());

    let threshold = match method {
        MethodArg::Dmax => detector.detect_dmax(&test)?,
        MethodArg::ModDmax => detector.detect_mod_dmax(&test)?,
    };
    let aerobic = detector.detect_aerobic(&test)?;

    if json {
        let value = serde_json::json!({ "threshold": threshold, "aerobic_threshold": aerobic });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("{}", "Lactate threshold".green().bold());
    print_threshold(&threshold);
    println!();
    println!("{}", "Aerobic threshold (2.0 mmol/L)".green().bold());
    print_threshold(&aerobic);
    Ok(())
}

fn print_threshold(result: &ThresholdResult) {
    println!(
        "  Intensity:  {:.2} {}",
        result.intensity,
        result.unit.symbol()
    );
    if let Some(pace) = result.pace() {
        println!("  Pace:       {} /km", format_pace(pace));
    }
    println!("  Lactate:    {:.2} mmol/L", result.lactate);
    println!("  Heart rate: {:.0} bpm", result.heart_rate);
    println!("  Method:     {}", result.method);
    println!("  R²:         {:.3}", result.r_squared);
    let confidence = match result.confidence {
        Confidence::High => result.confidence.to_string().green(),
        Confidence::Medium => result.confidence.to_string().yellow(),
        Confidence::Low => result.confidence.to_string().red(),
    };
    println!("  Confidence: {}", confidence);
    if let Some(warning) = &result.warning {
        println!("  {} {}", "⚠".yellow(), warning.yellow());
    }
}

async fn run_zones(
    config: &AppConfig,
    file: &Path,
    unit: Option<UnitArg>,
    athlete: Option<&str>,
    json: bool,
) -> Result<()> {
    let test = load_test(file, unit)?;
    let detector = ThresholdDetector::new(config.threshold.clone());
    let threshold = detector.detect_mod_dmax(&test)?;
    let aerobic = detector.detect_aerobic(&test)?;
    let test_zones = ZoneCalculator::from_thresholds(&threshold, Some(&aerobic), Some(&test))?;

    let elite = match (athlete, config.database.enabled) {
        (Some(id), true) => Database::new(&config.database.path)?
            .elite_paces(Some(id))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "elite pace lookup failed");
                None
            }),
        _ => None,
    };
    let (zones, note) = ZoneCalculator::resolve(Some(test_zones), elite.as_ref(), Some(&test));
    let zones = zones.context("no zone table could be built")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&zones)?);
        return Ok(());
    }
    if let Some(note) = note {
        println!("{} {}", "⚠".yellow(), note.yellow());
    }
    print_zones(&zones);
    Ok(())
}

fn print_zones(zones: &ZoneTable) {
    let rows: Vec<ZoneRow> = zones
        .zones
        .iter()
        .map(|z| ZoneRow {
            zone: format!("Z{}", z.number),
            name: z.name.clone(),
            range: format!("{:.1}–{:.1} {}", z.low, z.high, zones.unit.symbol()),
            pace: zones
                .pace_range(z.number)
                .map(|(slow, fast)| format!("{}–{}", slow, fast))
                .unwrap_or_default(),
            heart_rate: match (z.hr_low, z.hr_high) {
                (Some(lo), Some(hi)) => format!("{}–{}", lo, hi),
                (None, Some(hi)) => format!("< {}", hi),
                _ => String::new(),
            },
        })
        .collect();

    println!(
        "{} ({:?}, threshold {:.1} {})",
        "Training zones".green().bold(),
        zones.source,
        zones.threshold_intensity,
        zones.unit.symbol()
    );
    println!("{}", Table::new(rows).with(Style::rounded()));
}

async fn run_generate(config: &AppConfig, args: GenerateArgs) -> Result<()> {
    let test = load_test(&args.file, args.unit)?;

    let goal: TrainingGoal = args.goal.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let level: ExperienceLevel = args.level.parse().map_err(|e: String| anyhow::anyhow!(e))?;
    let weeks = args.weeks.unwrap_or_else(|| goal.typical_duration_weeks());
    let days = args.days.unwrap_or(config.planning.training_days);

    let mut params = GenerationParams::new(goal, weeks, days, level);
    params.athlete_id = args.athlete.clone();
    params.methodology = match &args.methodology {
        Some(name) => name.parse().unwrap_or(MethodologyRequest::Auto),
        None => config.planning.methodology_request(),
    };
    params.target_date = args
        .target_date
        .as_deref()
        .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
        .transpose()
        .context("target date must be YYYY-MM-DD")?;
    params.current_weekly_minutes = args.current_minutes.map(rust_decimal::Decimal::from);
    params.sessions = SessionCounts {
        strength: args.strength,
        core: args.core,
        plyometric: args.plyometric,
        quality: args.quality,
    };
    params.equipment = EquipmentFlags {
        power_meter: args.power_meter || config.planning.equipment.power_meter,
        heart_rate_monitor: !args.no_hr && config.planning.equipment.heart_rate_monitor,
        gym_access: args.gym || config.planning.equipment.gym_access,
    };

    let use_database = args.save || config.database.enabled;
    let program = if use_database {
        let mut db = Database::new(&config.database.path)?;
        db.seed_default_exercises()?;
        let assembler = build_assembler(config, db);
        let program = assembler.generate(&test, &params).await?;
        if args.save {
            assembler.into_source().save_program(&program)?;
            println!("{} saved as {}", "✓".green(), program.id);
        }
        program
    } else {
        build_assembler(config, InMemoryDataSource::with_default_catalogue())
            .generate(&test, &params)
            .await?
    };

    if let Some(output) = &args.output {
        let json = serde_json::to_string_pretty(&program)?;
        std::fs::write(output, json)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("{} program written to {}", "✓".green(), output.display());
    }

    print_program(&program);
    Ok(())
}

fn build_assembler<S: AthleteDataSource>(config: &AppConfig, source: S) -> ProgramAssembler<S> {
    ProgramAssembler::with_policies(
        source,
        config.threshold.clone(),
        config.deload.clone(),
        config.planning.pace_tolerance,
    )
}

fn print_program(program: &TrainingProgram) {
    println!("{}", program.name.green().bold());
    println!(
        "  Methodology: {}  Phases: base {} / build {} / peak {} / taper {}",
        program.methodology.methodology,
        program.phase_distribution.base,
        program.phase_distribution.build,
        program.phase_distribution.peak,
        program.phase_distribution.taper
    );

    let rows: Vec<WeekRow> = program
        .weeks
        .iter()
        .map(|w| WeekRow {
            week: w.week_number,
            phase: if w.is_deload {
                format!("{} (deload)", w.phase)
            } else {
                w.phase.to_string()
            },
            volume: w.volume_percentage.to_string(),
            minutes: w.planned_minutes.to_string(),
            days: w.training_days,
            sessions: w
                .days
                .iter()
                .map(|d| d.primary_category().to_string())
                .collect::<Vec<_>>()
                .join(" · "),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));

    let summary = &program.summary;
    println!(
        "  Total: {} min, {} TSS, {} deload weeks",
        summary.total_minutes, summary.total_tss, summary.deload_weeks
    );
    println!(
        "  Intensity: {}% easy / {}% moderate / {}% hard",
        summary.distribution.easy, summary.distribution.moderate, summary.distribution.hard
    );
    for warning in &program.warnings {
        println!("  {} {}", "⚠".yellow(), warning.yellow());
    }
    println!("  {}", format!("fingerprint {}", program.fingerprint).dimmed());
}

fn run_config(mut config: AppConfig, path: &Path, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists; pass --force to overwrite",
                    path.display()
                );
            }
            config.save_to_file(path)?;
            println!("{} configuration written to {}", "✓".green(), path.display());
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
    }
    Ok(())
}
