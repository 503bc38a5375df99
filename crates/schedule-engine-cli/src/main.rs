//! `schedule` CLI — run the schedule engine over JSON task and time-block
//! records from the command line.
//!
//! ## Usage
//!
//! ```sh
//! # Compute a schedule (stdin → stdout)
//! cat week.json | schedule run
//!
//! # Pin the reference time and pick an overload strategy
//! schedule run -i week.json --now 2026-03-15T12:00:00Z --strategy prioritize
//!
//! # Make room for one urgent task
//! schedule run -i week.json --sacrifice exam-prep -o result.json
//!
//! # Show the free intervals the time blocks expand to
//! schedule expand -i week.json
//!
//! # Check a manually chosen slot against existing placements
//! schedule check -i week.json --task essay --start 2026-03-16T09:00:00Z --end 2026-03-16T11:00:00Z
//! ```
//!
//! Input is one JSON object: `{"tasks": [...], "timeBlocks": [...], "options": {...}}`.
//! Flags override the matching `options` fields. When no reference time is
//! given anywhere, the current time is used.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::io::{self, Read};
use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use schedule_engine::{
    check_manual_placement, compute_schedule, expand_availability, Interval, OverloadStrategy,
    ScheduleOptions, Task, TimeBlock,
};

#[derive(Parser)]
#[command(
    name = "schedule",
    version,
    about = "Place pending tasks onto declared free time"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log engine decisions to stderr (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a schedule and print it as JSON
    Run {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        overrides: OptionOverrides,
        /// Overload strategy to apply when work exceeds free time
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
        /// Evict lower-priority tasks to place this one
        #[arg(long)]
        sacrifice: Option<String>,
    },
    /// Print the free intervals the time blocks expand to
    Expand {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        overrides: OptionOverrides,
    },
    /// List placed tasks a manually chosen window would clash with
    Check {
        #[command(flatten)]
        io: IoArgs,
        /// Task being moved; its own current slot is ignored
        #[arg(long)]
        task: String,
        /// Window start (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,
        /// Window end (RFC 3339)
        #[arg(long)]
        end: DateTime<Utc>,
    },
}

#[derive(Args)]
struct IoArgs {
    /// Input file (reads from stdin if omitted)
    #[arg(short, long)]
    input: Option<String>,
    /// Output file (writes to stdout if omitted)
    #[arg(short, long)]
    output: Option<String>,
}

#[derive(Args)]
struct OptionOverrides {
    /// Reference time (RFC 3339); defaults to options.now, then the wall clock
    #[arg(long)]
    now: Option<DateTime<Utc>>,
    /// Days of free time to consider
    #[arg(long)]
    horizon_days: Option<u32>,
    /// IANA timezone weekly templates are anchored in
    #[arg(long)]
    timezone: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Compress,
    Prioritize,
}

impl From<StrategyArg> for OverloadStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Compress => OverloadStrategy::Compress,
            StrategyArg::Prioritize => OverloadStrategy::Prioritize,
        }
    }
}

/// The records one run works on.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Input {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    time_blocks: Vec<TimeBlock>,
    #[serde(default)]
    options: Map<String, Value>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Run {
            io,
            overrides,
            strategy,
            sacrifice,
        } => {
            let input = read_records(io.input.as_deref())?;
            let mut options = build_options(input.options, &overrides)?;
            if let Some(strategy) = strategy {
                options = options.with_strategy(strategy.into());
            }
            if let Some(task_id) = sacrifice {
                options = options.with_sacrifice(task_id);
            }

            let result = compute_schedule(&input.tasks, &input.time_blocks, &options)
                .context("Failed to compute schedule")?;
            write_json(io.output.as_deref(), &result)?;
        }
        Commands::Expand { io, overrides } => {
            let input = read_records(io.input.as_deref())?;
            let options = build_options(input.options, &overrides)?;
            let pool = expand_availability(&input.time_blocks, &options)
                .context("Failed to expand time blocks")?;
            write_json(io.output.as_deref(), &pool.into_intervals())?;
        }
        Commands::Check {
            io,
            task,
            start,
            end,
        } => {
            if end <= start {
                anyhow::bail!("--end {} must be after --start {}", end, start);
            }
            let input = read_records(io.input.as_deref())?;
            let conflicts = check_manual_placement(&task, Interval::new(start, end), &input.tasks);
            write_json(io.output.as_deref(), &conflicts)?;
        }
    }

    Ok(())
}

/// Log to stderr so stdout stays clean JSON. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) -> Result<()> {
    let default_directive = match verbose {
        0 => "warn",
        1 => "schedule_engine=debug,info",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .context("Failed to parse log filter")?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .try_init()
        .context("Failed to initialise logging")?;
    Ok(())
}

/// Layer command-line overrides over the input's `options` object.
fn build_options(
    mut raw: Map<String, Value>,
    overrides: &OptionOverrides,
) -> Result<ScheduleOptions> {
    if let Some(now) = overrides.now {
        raw.insert("now".to_string(), Value::String(now.to_rfc3339()));
    } else if !raw.contains_key("now") {
        let now = Utc::now();
        debug!(%now, "no reference time given; using the current time");
        raw.insert("now".to_string(), Value::String(now.to_rfc3339()));
    }
    if let Some(days) = overrides.horizon_days {
        raw.insert("horizonDays".to_string(), Value::from(days));
    }
    if let Some(tz) = &overrides.timezone {
        raw.insert("timezone".to_string(), Value::String(tz.clone()));
    }

    serde_json::from_value(Value::Object(raw)).context("Invalid options")
}

fn read_records(path: Option<&str>) -> Result<Input> {
    let json = read_input(path)?;
    serde_json::from_str(&json).context("Failed to parse input JSON")
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

fn write_json<T: serde::Serialize>(path: Option<&str>, value: &T) -> Result<()> {
    let mut content = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    content.push('\n');
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
