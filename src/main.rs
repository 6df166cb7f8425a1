use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use configuration::{EngineConfig, load_config};
use core_types::{ChargeRecord, Severity, StockRecord};
use detectors::{Detection, DetectorKind};
use engine::CostEngine;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod render;

/// The main entry point for the lot cost consistency tool.
fn main() -> Result<()> {
    // A missing .env file is fine; the variables may come from the shell.
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let engine = build_engine(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze(args) => handle_analyze(&engine, args),
        Commands::ChargeType(args) => handle_charge_type(&engine, args),
        Commands::Outliers(args) => handle_outliers(&engine, args),
        Commands::Lot(args) => handle_lot(&engine, args),
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Cost-per-box consistency analysis for export lots.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the exclusions file (TOML). Without it nothing is excluded.
    #[arg(long, global = true, env = "LOTCOST_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: internal issues, exporter comparison and population outliers.
    Analyze(AnalyzeArgs),
    /// Compare each lot's cost for one charge type with that charge type's average.
    ChargeType(ChargeTypeArgs),
    /// List every lot outside the population-wide 2σ band.
    Outliers(FeedArgs),
    /// Show the per-charge-type breakdown of a single lot.
    Lot(LotArgs),
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Parser)]
struct FeedArgs {
    /// JSON array of charge rows (lot_id, exporter, charge_type, amount).
    #[arg(long)]
    charges: PathBuf,

    /// JSON array of stock rows (lot_id, exporter, variety, initial_stock_boxes).
    #[arg(long)]
    stock: PathBuf,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

#[derive(Parser)]
struct AnalyzeArgs {
    #[command(flatten)]
    feeds: FeedArgs,

    /// Only show internal issues at or above this severity (low, medium, high).
    #[arg(long)]
    min_severity: Option<Severity>,
}

#[derive(Parser)]
struct ChargeTypeArgs {
    #[command(flatten)]
    feeds: FeedArgs,

    /// The charge type to inspect (e.g., "OCEAN FREIGHT"). Case-insensitive.
    #[arg(long)]
    charge_type: String,
}

#[derive(Parser)]
struct LotArgs {
    /// JSON array of charge rows.
    #[arg(long)]
    charges: PathBuf,

    /// The lot to break down.
    #[arg(long)]
    lot: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
}

// ==============================================================================
// Command Logic
// ==============================================================================

fn build_engine(config_path: Option<&Path>) -> Result<CostEngine> {
    let config = match config_path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => {
            tracing::info!("No configuration given; nothing is excluded.");
            EngineConfig::default()
        }
    };
    Ok(CostEngine::from_config(&config)?)
}

fn handle_analyze(engine: &CostEngine, args: AnalyzeArgs) -> Result<()> {
    let (charges, stock) = load_feeds(&args.feeds)?;
    let report = engine.run(&charges, &stock)?;

    match args.feeds.format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => {
            render::print_report(&report, args.min_severity);
            Ok(())
        }
    }
}

fn handle_charge_type(engine: &CostEngine, args: ChargeTypeArgs) -> Result<()> {
    let (charges, stock) = load_feeds(&args.feeds)?;
    let kind = DetectorKind::ChargeType {
        charge_type: args.charge_type,
    };
    let detection = engine.run_detector(&kind, &charges, &stock)?;
    print_detection(&detection, args.feeds.format)
}

fn handle_outliers(engine: &CostEngine, args: FeedArgs) -> Result<()> {
    let (charges, stock) = load_feeds(&args)?;
    let detection = engine.run_detector(&DetectorKind::Population, &charges, &stock)?;
    print_detection(&detection, args.format)
}

fn handle_lot(engine: &CostEngine, args: LotArgs) -> Result<()> {
    let charges: Vec<ChargeRecord> = read_json(&args.charges)?;
    let lines = engine.charge_breakdown(&charges, &args.lot);
    if lines.is_empty() {
        anyhow::bail!("Lot {} has no charges in {}", args.lot, args.charges.display());
    }

    match args.format {
        OutputFormat::Json => print_json(&lines),
        OutputFormat::Table => {
            render::print_breakdown(&args.lot, &lines);
            Ok(())
        }
    }
}

fn print_detection(detection: &Detection, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(detection),
        OutputFormat::Table => {
            render::print_detection(detection);
            Ok(())
        }
    }
}

fn load_feeds(args: &FeedArgs) -> Result<(Vec<ChargeRecord>, Vec<StockRecord>)> {
    let charges: Vec<ChargeRecord> = read_json(&args.charges)?;
    let stock: Vec<StockRecord> = read_json(&args.stock)?;
    tracing::debug!(
        charges = charges.len(),
        stock = stock.len(),
        "Loaded input feeds."
    );
    Ok((charges, stock))
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
