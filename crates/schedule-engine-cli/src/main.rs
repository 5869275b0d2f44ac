//! `schedule` CLI: resolve availability, suggest slots and audit bookings from a
//! JSON schedule snapshot.
//!
//! ## Usage
//!
//! ```sh
//! # Free intervals for a doctor on one day
//! schedule resolve -i practice.json --subject staff:1 --date 2026-03-16
//!
//! # First three 30-minute slots for a doctor, starting today
//! schedule suggest -i practice.json --subject staff:1 --duration 30 --limit 3
//!
//! # Surgeon and operating room free at the same time
//! schedule suggest -i practice.json --subject staff:1 --with resource:50 --duration 90
//!
//! # Would this slot be bookable?
//! schedule check -i practice.json --subject staff:1 \
//!     --start 2026-03-16T14:00:00Z --end 2026-03-16T14:30:00Z
//!
//! # Audit every stored booking, with aggregates
//! cat practice.json | schedule audit --metrics
//! ```
//!
//! Configuration is layered: defaults, then `--config <file.toml>`, then
//! `SCHEDULE_*` environment variables (e.g. `SCHEDULE_TIMEZONE=Europe/Berlin`).

mod config;

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use schedule_engine::{
    no_show_count, ConflictDetector, ConflictMetrics, EngineConfig, Interval, IntervalKind,
    Resolver, ScheduleSnapshot, Subject, SuggestRequest, Suggester,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "schedule",
    version,
    about = "Availability, slot suggestion and conflict audit for practice schedules"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML file with engine settings (timezone, slot step, edge hours, ...)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log engine decisions to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Free intervals for one subject on one date
    Resolve {
        /// Schedule snapshot JSON (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// `staff:<id>` or `resource:<id>`
        #[arg(long)]
        subject: Subject,
        /// Local date, YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
    },
    /// Suggest bookable slots, earliest first
    Suggest {
        /// Schedule snapshot JSON (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// `staff:<id>` or `resource:<id>`
        #[arg(long)]
        subject: Subject,
        /// Further subjects that must be free at the same time
        #[arg(long = "with")]
        with: Vec<Subject>,
        /// Slot length in minutes
        #[arg(long)]
        duration: i64,
        /// First local date to scan (defaults to today)
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Maximum number of slots (defaults to the configured limit)
        #[arg(long)]
        limit: Option<usize>,
        /// Days to scan (defaults to the configured horizon)
        #[arg(long)]
        horizon: Option<u32>,
        /// Reference instant, RFC 3339 (defaults to the current time)
        #[arg(long)]
        now: Option<DateTime<Utc>>,
    },
    /// Classify a proposed slot as bookable or not
    Check {
        /// Schedule snapshot JSON (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// `staff:<id>` or `resource:<id>`
        #[arg(long)]
        subject: Subject,
        /// Slot start, RFC 3339
        #[arg(long)]
        start: DateTime<Utc>,
        /// Slot end, RFC 3339
        #[arg(long)]
        end: DateTime<Utc>,
    },
    /// Detect conflicts across every stored booking
    Audit {
        /// Schedule snapshot JSON (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
        /// Include aggregate metrics next to the conflict list
        #[arg(long)]
        metrics: bool,
        /// Number of owners to keep in the metrics ranking
        #[arg(long, default_value_t = 10, requires = "metrics")]
        top: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let config = load_config(&cli)?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Commands::Resolve {
            input,
            output,
            subject,
            date,
        } => {
            let snapshot = read_snapshot(input.as_deref())?;
            let resolver = Resolver::new(&snapshot, &config)?;
            let day = resolver.resolve(&subject, date);
            write_json(output.as_deref(), &serde_json::to_value(&day)?)?;
        }
        Commands::Suggest {
            input,
            output,
            subject,
            with,
            duration,
            from,
            limit,
            horizon,
            now,
        } => {
            let snapshot = read_snapshot(input.as_deref())?;
            let resolver = Resolver::new(&snapshot, &config)?;
            let suggester = Suggester::new(&resolver, config.slot_step_minutes)?;

            let now = now.unwrap_or_else(Utc::now);
            let request = SuggestRequest::new(
                from.unwrap_or_else(|| resolver.calendar().local_date(now)),
                duration,
                limit.unwrap_or(config.default_limit),
                horizon.unwrap_or(config.default_horizon_days),
            );

            let mut subjects = vec![subject];
            subjects.extend(with);
            let slots = suggester.suggest_joint(&subjects, &request, now)?;

            let value = json!({
                "subjects": subjects,
                "request": request,
                "slots": slots,
            });
            write_json(output.as_deref(), &value)?;
        }
        Commands::Check {
            input,
            subject,
            start,
            end,
        } => {
            let snapshot = read_snapshot(input.as_deref())?;
            let resolver = Resolver::new(&snapshot, &config)?;
            let slot = Interval::new(start, end, IntervalKind::Free)?;
            let verdict = resolver.check_slot(&subject, &slot);

            let value = json!({
                "subject": subject,
                "start": start,
                "end": end,
                "result": verdict,
            });
            write_json(None, &value)?;
        }
        Commands::Audit {
            input,
            output,
            metrics,
            top,
        } => {
            let snapshot = read_snapshot(input.as_deref())?;
            let detector = ConflictDetector::new(&config)?;
            let conflicts =
                detector.detect(&snapshot.bookings, &snapshot.absences, &snapshot.opening_hours);

            let value = if metrics {
                let mut summary = ConflictMetrics::from_conflicts(&conflicts, snapshot.plannings());
                summary.ranking.truncate(top);
                let no_shows =
                    no_show_count(&snapshot.bookings, Utc::now(), config.presume_stale_no_shows);
                json!({ "conflicts": conflicts, "metrics": summary, "no_shows": no_shows })
            } else {
                json!({ "conflicts": conflicts })
            };
            write_json(output.as_deref(), &value)?;
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    if let Some(path) = &cli.config {
        anyhow::ensure!(path.exists(), "Config file not found: {}", path.display());
    }
    let config = config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn read_snapshot(path: Option<&str>) -> Result<ScheduleSnapshot> {
    let json = read_input(path)?;
    ScheduleSnapshot::from_json(&json).context("Failed to parse schedule snapshot")
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_json(path: Option<&str>, value: &serde_json::Value) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => {
            std::fs::write(path, content + "\n")
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
