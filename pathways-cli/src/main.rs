//! Pathways CLI - behavioral risk review from exported record snapshots

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input and reference time yield byte-for-byte identical output
// - Diagnostics go to stderr; stdout carries only the report

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pathways_core::batch::assess_batch_with_progress;
use pathways_core::config::{self, ResolvedConfig};
use pathways_core::input::{load_batch_snapshot, load_subject_snapshot};
use pathways_core::recommend::MAX_RECOMMENDATIONS;
use pathways_core::{
    assess_snapshot, render_batch_json, render_batch_text, render_json, render_text, ScoringClock,
};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "pathways")]
#[command(about = "Behavioral risk scoring and remediation recommendations")]
#[command(version = env!("PATHWAYS_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Output format
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Reference time for recency windows, RFC 3339 (default: now)
    #[arg(long)]
    reference_time: Option<String>,

    /// First day of the school year, YYYY-MM-DD (default: August 1)
    #[arg(long)]
    school_year_start: Option<String>,

    /// Number of recommendations, 1 to 5 (overrides config file)
    #[arg(long)]
    top: Option<usize>,

    /// Path to config file (default: auto-discover)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Score one subject and recommend interventions
    Assess {
        /// Path to a single-subject snapshot (JSON)
        path: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Score every subject in a batch snapshot
    Batch {
        /// Path to a batch snapshot (JSON)
        path: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Show a progress bar on stderr
        #[arg(long)]
        progress: bool,
    },
    /// Validate or inspect a configuration file
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without scoring anything
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Assess { path, run } => {
            let snapshot_path = normalize_path(path)?;
            let (resolved, clock) = prepare(&run)?;
            let snapshot = load_subject_snapshot(&snapshot_path)?;

            let report = assess_snapshot(&snapshot, &clock, &resolved);
            match run.format {
                OutputFormat::Text => print!("{}", render_text(&report)),
                OutputFormat::Json => println!("{}", render_json(&report)),
            }
        }
        Commands::Batch {
            path,
            run,
            progress,
        } => {
            let snapshot_path = normalize_path(path)?;
            let (resolved, clock) = prepare(&run)?;
            let snapshot = load_batch_snapshot(&snapshot_path)?;

            let bar = if progress {
                let (groups, _) = pathways_core::batch::group_by_subject(&snapshot);
                create_progress_bar(groups.len())?
            } else {
                ProgressBar::hidden()
            };
            let report = assess_batch_with_progress(&snapshot, &clock, &resolved, || bar.inc(1));
            bar.finish_and_clear();

            if report.skipped_records > 0 {
                tracing::warn!(
                    skipped = report.skipped_records,
                    "records without a subject_id were skipped"
                );
            }
            match run.format {
                OutputFormat::Text => print!("{}", render_batch_text(&report)),
                OutputFormat::Json => println!("{}", render_batch_json(&report)),
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let project_root = std::env::current_dir()?;
                match config::load_and_resolve(&project_root, path.as_deref()) {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let project_root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&project_root, path.as_deref())
                    .context("failed to load configuration")?;
                print_config(&resolved);
            }
        },
    }

    Ok(())
}

/// Load config and build the scoring clock; CLI flags override config values
fn prepare(run: &RunArgs) -> anyhow::Result<(ResolvedConfig, ScoringClock)> {
    let project_root = std::env::current_dir()?;
    let mut resolved = config::load_and_resolve(&project_root, run.config.as_deref())
        .context("failed to load configuration")?;

    if let Some(ref config_path) = resolved.config_path {
        tracing::info!(path = %config_path.display(), "using config");
    }

    if let Some(top) = run.top {
        if top == 0 || top > MAX_RECOMMENDATIONS {
            anyhow::bail!(
                "--top must be between 1 and {} (got {})",
                MAX_RECOMMENDATIONS,
                top
            );
        }
        resolved.top_n = top;
    }

    let reference_time = match run.reference_time.as_deref() {
        Some(raw) => Some(parse_reference_time(raw)?),
        None => resolved.reference_time,
    };
    let school_year_start = match run.school_year_start.as_deref() {
        Some(raw) => Some(parse_date(raw)?),
        None => resolved.school_year_start,
    };

    let clock = ScoringClock::new(reference_time.unwrap_or_else(Utc::now), school_year_start);
    tracing::debug!(
        reference_time = %clock.reference_time,
        school_year_start = %clock.school_year_start,
        "scoring clock"
    );
    Ok((resolved, clock))
}

fn parse_reference_time(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(raw)
        .with_context(|| format!("invalid --reference-time (expected RFC 3339): {}", raw))?;
    Ok(parsed.with_timezone(&Utc))
}

fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid --school-year-start (expected YYYY-MM-DD): {}", raw))
}

/// Normalize to an absolute path and check it exists
fn normalize_path(path: PathBuf) -> anyhow::Result<PathBuf> {
    let normalized = if path.is_relative() {
        std::env::current_dir()?.join(&path)
    } else {
        path
    };
    if !normalized.exists() {
        anyhow::bail!("Path does not exist: {}", normalized.display());
    }
    Ok(normalized)
}

fn create_progress_bar(total: usize) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} subjects")
            .context("invalid progress bar template")?
            .progress_chars("=> "),
    );
    Ok(pb)
}

fn print_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    match resolved.config_path {
        Some(ref p) => println!("  Source: {}", p.display()),
        None => println!("  Source: defaults (no config file found)"),
    }
    println!();
    println!("Scoring:");
    println!(
        "  extended placement consequences: {}",
        resolved.policy.extended_placement_consequences.join(", ")
    );
    println!(
        "  reference_time: {}",
        resolved
            .reference_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "now".to_string())
    );
    println!(
        "  school_year_start: {}",
        resolved
            .school_year_start
            .map(|d| d.to_string())
            .unwrap_or_else(|| "August 1 of the current school year".to_string())
    );
    println!();
    println!("Recommendations:");
    println!("  top: {}", resolved.top_n);
    println!(
        "  category map: {} offense categories",
        resolved.category_map.len()
    );
    println!(
        "  fallback categories: {}",
        resolved.category_map.fallback().join(", ")
    );
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn"))
        .context("Failed to create tracing filter")?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing")?;

    Ok(())
}
