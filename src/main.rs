//! Grid Guardian - power-grid predictive maintenance data pipeline
//!
//! # Usage
//!
//! ```bash
//! # Full run: generate → preprocess → label → features
//! grid-guardian run
//!
//! # Individual stages
//! grid-guardian generate
//! grid-guardian preprocess --input data/raw/grid_telemetry.ggt
//! grid-guardian label --input data/processed/cleaned_data.csv --output data/processed/labeled.csv
//! grid-guardian features --input data/processed/labeled.csv
//!
//! # Configuration
//! grid-guardian config init grid_guardian.toml
//! grid-guardian --config grid_guardian.toml config validate
//! ```
//!
//! # Environment Variables
//!
//! - `GRID_GUARDIAN_CONFIG`: Path to the TOML configuration
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use grid_guardian::config::GuardianConfig;
use grid_guardian::pipeline::PipelineRunner;
use grid_guardian::storage::columnar::read_telemetry;
use grid_guardian::storage::tables::{read_telemetry_csv, write_telemetry_csv};
use grid_guardian::types::TelemetryTable;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "grid-guardian")]
#[command(about = "Grid Guardian predictive-maintenance data pipeline")]
#[command(version)]
struct CliArgs {
    /// Path to the TOML configuration (default: GRID_GUARDIAN_CONFIG, then
    /// ./grid_guardian.toml, then built-in defaults)
    #[arg(long, global = true, env = "GRID_GUARDIAN_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every stage in order
    Run,

    /// Generate the raw telemetry artifact and location table
    Generate,

    /// Clean a raw telemetry table (.ggt artifact or CSV)
    Preprocess {
        #[arg(long)]
        input: PathBuf,
    },

    /// Attach risk labels to a cleaned table
    Label {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },

    /// Engineer features from a cleaned (labeled here if needed) or labeled table
    Features {
        #[arg(long)]
        input: PathBuf,
    },

    /// Inspect or create configuration files
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
    /// Validate the effective configuration
    Validate,
    /// Write the default configuration to a file
    Init { path: PathBuf },
}

// ============================================================================
// Helpers
// ============================================================================

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> Result<GuardianConfig> {
    match path {
        Some(path) => GuardianConfig::load_from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => GuardianConfig::load().context("loading configuration"),
    }
}

/// Read a telemetry table, choosing the reader by file extension.
fn load_table(path: &Path) -> Result<TelemetryTable> {
    let table = if path.extension().is_some_and(|ext| ext == "ggt") {
        read_telemetry(path)
    } else {
        read_telemetry_csv(path)
    };
    table.with_context(|| format!("reading telemetry from {}", path.display()))
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.log_json);

    // Init must work even when the existing configuration does not load
    if let Command::Config(ConfigCommand::Init { path }) = &args.command {
        GuardianConfig::default()
            .save_to_file(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "Default configuration written");
        return Ok(());
    }

    let config = load_config(args.config.as_deref())?;

    if let Command::Config(command) = &args.command {
        return match command {
            ConfigCommand::Show => {
                print!("{}", config.to_toml()?);
                Ok(())
            }
            ConfigCommand::Validate => {
                config.validate()?;
                info!("Configuration is valid");
                Ok(())
            }
            ConfigCommand::Init { .. } => Ok(()),
        };
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Grid Guardian - Predictive Maintenance Data Pipeline");
    info!(
        "  Fleet: {} substations x {} units | {} hours | seed {}",
        config.generation.n_substations,
        config.generation.equipment_per_substation,
        config.generation.hours,
        config.generation.seed
    );
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let runner = PipelineRunner::new(config)?;

    match args.command {
        Command::Run => {
            let report = runner.run()?;
            info!(
                low = report.distribution.low,
                medium = report.distribution.medium,
                high = report.distribution.high,
                fallback = report.fallback_used,
                "Risk distribution"
            );
            for warning in report.quality.warnings() {
                info!("data quality: {warning}");
            }
        }
        Command::Generate => {
            let output = runner.generate()?;
            info!(
                rows = output.summary.rows,
                failing = output.summary.failing_equipment,
                artifact = %output.manifest.path.display(),
                "Generation complete"
            );
        }
        Command::Preprocess { input } => {
            let raw = load_table(&input)?;
            let outcome = runner.preprocess(raw)?;
            info!(rows = outcome.table.len(), warnings = outcome.report.len(), "Preprocessing complete");
        }
        Command::Label { input, output } => {
            let cleaned = load_table(&input)?;
            let outcome = runner.label(cleaned)?;
            write_telemetry_csv(&output, &outcome.table)
                .with_context(|| format!("writing labeled table to {}", output.display()))?;
            info!(
                path = %output.display(),
                low = outcome.distribution.low,
                medium = outcome.distribution.medium,
                high = outcome.distribution.high,
                "Labeling complete"
            );
        }
        Command::Features { input } => {
            let labeled = load_table(&input)?;
            let output = runner.features(&labeled)?;
            info!(
                path = %output.features_path.display(),
                columns = output.features.summary.columns,
                "Feature engineering complete"
            );
        }
        Command::Config(_) => {}
    }

    info!("✓ Grid Guardian finished");
    Ok(())
}
