//! POSEKF SIM: Offline replay and test-data tool for the posekf pose filter.
//!
//! The filter is meant to be embedded in a control loop. This program lets it be exercised without
//! one by working on recorded or synthetic measurement logs:
//!
//! - `run`: Replays a measurement CSV (or every CSV in a directory) through a fresh filter and writes
//!   one estimate row per measurement, including the covariance trace and whether the update was
//!   applied.
//!
//! - `generate`: Writes a measurement CSV of seeded Gaussian noise around a fixed pose.
//!
//! - `create-config`: Writes a template filter configuration holding the default noise settings.
//!
//! Filter settings come from `--config` (TOML/JSON/YAML) when given and fall back to the built-in
//! defaults otherwise.

mod common;

use clap::{Args, Parser, Subcommand};
use common::{
    ensure_parent_dir, get_csv_files, init_logger, validate_input_path, validate_output_path,
};
use log::{error, info, warn};
use posekf::STATE_SIZE;
use posekf::config::FilterConfig;
use posekf::noise::DEFAULT_MEASUREMENT_NOISE_STD;
use posekf::sim::{EstimateRecord, MeasurementRecord, replay, synthetic_measurements};
use std::error::Error;
use std::path::{Path, PathBuf};

const LONG_ABOUT: &str = "POSEKF SIM: Offline replay and test-data tool for the posekf pose filter.

Measurement files are CSV with the header `time,x,y,z,yaw,pitch,roll`; time in seconds, angles in
degrees. Estimate files add `covariance_trace` and `update_applied` columns.

Filter settings (initial state, noise standard deviations, covariance update form and logging) are
read from the file given with --config, or take their defaults when it is omitted. Use
`create-config` to write a template.";

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Offline replay and test-data tool for the posekf pose filter.", long_about = LONG_ABOUT)]
struct Cli {
    /// Filter configuration file (TOML/JSON/YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Log file path (if not specified, logs to stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

/// Top-level commands
#[derive(Subcommand, Clone, Debug)]
enum Command {
    #[command(
        name = "run",
        about = "Replay measurements through the filter",
        long_about = "Replay a measurement log through a freshly constructed filter. Each row triggers one predict with the time elapsed since the previous row followed by one update. If the input is a directory every CSV file in it is replayed independently and the output is treated as a directory."
    )]
    Run(RunArgs),
    #[command(
        name = "generate",
        about = "Generate a synthetic measurement log",
        long_about = "Generate noisy measurements of a stationary pose. Every component receives independent zero-mean Gaussian noise and angles are wrapped to [-180, 180). The same seed always reproduces the same file."
    )]
    Generate(GenerateArgs),
    #[command(name = "create-config", about = "Generate a template configuration file")]
    CreateConfig(CreateConfigArgs),
}

#[derive(Args, Clone, Debug)]
struct RunArgs {
    /// Input CSV file path or directory containing CSV files
    #[arg(short, long, value_parser)]
    input: PathBuf,

    /// Output CSV file path, or output directory when the input is a directory
    #[arg(short, long, value_parser)]
    output: PathBuf,
}

#[derive(Args, Clone, Debug)]
struct GenerateArgs {
    /// Output CSV file path
    #[arg(short, long, value_parser)]
    output: PathBuf,

    /// Number of measurements
    #[arg(long, default_value_t = 500)]
    count: usize,

    /// Measurement rate (Hz)
    #[arg(long, default_value_t = 50.0)]
    rate: f64,

    /// Random number generator seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// True pose as x,y,z,yaw,pitch,roll
    #[arg(
        long,
        value_delimiter = ',',
        allow_hyphen_values = true,
        default_values_t = [0.0; STATE_SIZE]
    )]
    truth: Vec<f64>,

    /// Noise standard deviations as x,y,z,yaw,pitch,roll (defaults to the filter's measurement noise)
    #[arg(long, value_delimiter = ',')]
    noise: Option<Vec<f64>>,
}

#[derive(Args, Clone, Debug)]
struct CreateConfigArgs {
    /// Output file path for the config file
    /// File extension determines format: .json, .yaml/.yml, or .toml (recommended)
    #[arg(short, long, value_parser)]
    output: PathBuf,
}

fn to_pose(values: &[f64], name: &str) -> Result<[f64; STATE_SIZE], Box<dyn Error>> {
    <[f64; STATE_SIZE]>::try_from(values).map_err(|_| {
        format!(
            "--{} expects {} comma-separated values, got {}",
            name,
            STATE_SIZE,
            values.len()
        )
        .into()
    })
}

/// Replay one measurement file and write its estimates.
fn process_file(
    input_file: &Path,
    output_file: &Path,
    config: &FilterConfig,
) -> Result<(), Box<dyn Error>> {
    info!("Processing file: {}", input_file.display());

    let records = MeasurementRecord::from_csv(input_file)?;
    info!(
        "Read {} records from {}",
        records.len(),
        input_file.display()
    );
    if records.is_empty() {
        warn!("{} contains no measurements", input_file.display());
    }

    let mut filter = config.build();
    let estimates = replay(&mut filter, &records);
    let skipped = estimates.iter().filter(|e| !e.update_applied).count();
    if skipped > 0 {
        warn!(
            "{} of {} updates skipped for a singular innovation covariance",
            skipped,
            estimates.len()
        );
    }
    info!("Final estimate: {}", filter);

    ensure_parent_dir(output_file)?;
    EstimateRecord::to_csv(&estimates, output_file)?;
    info!(
        "Wrote {} estimates to {}",
        estimates.len(),
        output_file.display()
    );
    Ok(())
}

fn run_replay(args: &RunArgs, config: &FilterConfig) -> Result<(), Box<dyn Error>> {
    validate_input_path(&args.input)?;
    let csv_files = get_csv_files(&args.input)?;

    if args.input.is_file() {
        return process_file(&args.input, &args.output, config);
    }

    validate_output_path(&args.output)?;
    info!(
        "Replaying {} files from {}",
        csv_files.len(),
        args.input.display()
    );
    let mut failures = 0usize;
    for input_file in &csv_files {
        let Some(file_name) = input_file.file_name() else {
            continue;
        };
        let output_file = args.output.join(file_name);
        if let Err(e) = process_file(input_file, &output_file, config) {
            error!("Error processing {}: {}", input_file.display(), e);
            failures += 1;
        }
    }
    if failures > 0 {
        return Err(format!("{} of {} files failed", failures, csv_files.len()).into());
    }
    Ok(())
}

fn run_generate(args: &GenerateArgs) -> Result<(), Box<dyn Error>> {
    let truth = to_pose(&args.truth, "truth")?;
    let noise = match &args.noise {
        Some(values) => to_pose(values, "noise")?,
        None => DEFAULT_MEASUREMENT_NOISE_STD,
    };
    if args.rate <= 0.0 {
        warn!("Non-positive rate {} Hz, using 1 Hz", args.rate);
    }

    let records = synthetic_measurements(truth, noise, args.count, args.rate, args.seed);
    ensure_parent_dir(&args.output)?;
    MeasurementRecord::to_csv(&records, &args.output)?;
    info!(
        "Wrote {} synthetic measurements to {}",
        records.len(),
        args.output.display()
    );
    Ok(())
}

fn create_config_file(args: &CreateConfigArgs) -> Result<(), Box<dyn Error>> {
    ensure_parent_dir(&args.output)?;
    FilterConfig::default().to_file(&args.output)?;
    info!("Wrote template configuration to {}", args.output.display());
    println!("Configuration written to {}", args.output.display());
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(config_path) => {
            let config = FilterConfig::from_file(config_path)?;
            // Logging settings from the config file win over the CLI defaults, an explicit
            // --log-file still takes precedence.
            let config_log_file = config.logging.file.as_ref().map(PathBuf::from);
            let log_file = cli.log_file.as_ref().or(config_log_file.as_ref());
            init_logger(config.logging.level.as_str(), log_file)?;
            info!("Loaded filter configuration from {}", config_path.display());
            config
        }
        None => {
            init_logger(&cli.log_level, cli.log_file.as_ref())?;
            FilterConfig::default()
        }
    };

    match cli.command {
        Some(Command::Run(args)) => run_replay(&args, &config),
        Some(Command::Generate(args)) => run_generate(&args),
        Some(Command::CreateConfig(args)) => create_config_file(&args),
        None => {
            eprintln!("Error: No command provided. Use -h or --help for usage information.");
            std::process::exit(1);
        }
    }
}
