//! Accel Activity CLI
//!
//! Activity recognition and behavioural summaries from accelerometer recordings.

use accel_activity::{
    config::Config,
    core::FeatureTable,
    model::CandidateResult,
    pipeline::{Pipeline, PipelineOutput},
    report::RunReport,
    source::{CsvSource, DataSource, RawSeries, SyntheticSource},
    SummaryTable, VERSION,
};
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "accel-activity")]
#[command(version = VERSION)]
#[command(
    about = "Activity recognition and behavioural summaries from accelerometer data",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where the raw recording comes from.
#[derive(Args)]
struct InputArgs {
    /// CSV file with timestamp,x,y,z,label columns
    #[arg(long, short, conflicts_with = "synthetic_minutes")]
    input: Option<PathBuf>,

    /// Generate a labelled synthetic recording of this many minutes instead
    #[arg(long)]
    synthetic_minutes: Option<u64>,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract features, train the classifier and print summaries
    Run {
        #[command(flatten)]
        input: InputArgs,

        /// Print the results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the unselected feature table as CSV
    Features {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Show configuration
    Config {
        /// Write the default configuration file
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file when used with --init
        #[arg(long, requires = "init")]
        force: bool,

        /// Configuration file (defaults to the user config directory)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },
}

/// Minutes of synthetic data when neither input option is given.
const DEFAULT_SYNTHETIC_MINUTES: u64 = 60;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { input, json } => cmd_run(&input, json),
        Commands::Features { input } => cmd_features(&input),
        Commands::Config {
            init,
            force,
            config,
        } => cmd_config(init, force, config.as_deref()),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => {
            let config = Config::load().context("loading default config")?;
            config.validate().context("validating default config")?;
            config
        }
    };
    Ok(config)
}

fn load_series(args: &InputArgs, config: &Config) -> Result<RawSeries> {
    let series = match &args.input {
        Some(path) => CsvSource::new(path)
            .load()
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let minutes = args.synthetic_minutes.unwrap_or(DEFAULT_SYNTHETIC_MINUTES);
            info!(minutes, "no input file given, generating synthetic recording");
            SyntheticSource::with_minutes(config.sample_rate_hz, minutes)
                .load()
                .context("generating synthetic recording")?
        }
    };
    Ok(series)
}

/// JSON view of a run.
#[derive(Serialize)]
struct RunSummary<'a> {
    report: &'a RunReport,
    selected_features: &'a [String],
    cv_results: &'a [CandidateResult],
    hourly: &'a SummaryTable,
    daily: &'a SummaryTable,
}

impl<'a> From<&'a PipelineOutput> for RunSummary<'a> {
    fn from(output: &'a PipelineOutput) -> Self {
        Self {
            report: &output.report,
            selected_features: &output.selected.names,
            cv_results: &output.search.cv_results,
            hourly: &output.hourly,
            daily: &output.daily,
        }
    }
}

fn cmd_run(args: &InputArgs, json: bool) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let series = load_series(args, &config)?;
    let output = Pipeline::new(config)
        .run(&series)
        .context("running activity pipeline")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&RunSummary::from(&output))?);
        return Ok(());
    }

    println!("Accel Activity v{VERSION}");
    println!();
    println!("{}", output.report.summary());
    println!();
    println!("Selected features: {}", output.selected.names.join(", "));
    println!();
    println!("Hourly metrics ({})", output.hourly.timezone);
    print!("{}", output.hourly);
    println!();
    println!("Daily metrics ({})", output.daily.timezone);
    print!("{}", output.daily);
    Ok(())
}

fn cmd_features(args: &InputArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let series = load_series(args, &config)?;
    let table = Pipeline::new(config)
        .extract(&series)
        .context("extracting features")?;

    write_table(&table, std::io::stdout().lock())
}

fn write_table<W: std::io::Write>(table: &FeatureTable, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);

    let mut header = vec!["timestamp".to_string()];
    header.extend(table.columns.iter().cloned());
    header.push("label".to_string());
    writer.write_record(&header)?;

    for (row, label) in table.rows.iter().zip(&table.labels) {
        let mut record = vec![row.timestamp.to_rfc3339()];
        record.extend(row.values.iter().map(|v| v.to_string()));
        record.push(label.to_string());
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

fn cmd_config(init: bool, force: bool, path: Option<&Path>) -> Result<()> {
    let config_path = path.map_or_else(Config::config_path, Path::to_path_buf);

    if init {
        if config_path.exists() && !force {
            bail!(
                "{} already exists, pass --force to overwrite",
                config_path.display()
            );
        }
        Config::default()
            .save_to(&config_path)
            .with_context(|| format!("writing {}", config_path.display()))?;
        println!("Wrote default configuration to {}", config_path.display());
        return Ok(());
    }

    let config = if config_path.exists() {
        load_config(Some(&config_path))?
    } else {
        Config::default()
    };

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", config_path);
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
