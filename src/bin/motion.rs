//! Motion CLI - Command-line interface for Synheart Motion
//!
//! Commands:
//! - replay: Replay a recorded accelerometer / step counter log into metric snapshots
//! - sensors: Print the sensor report for a set of capability flags
//! - config: Print the default configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use synheart_motion::{
    available_sensor_labels, ExtraSensor, MotionConfig, MotionError, ReplayEvent, ReplayRecord,
    ReplaySession, SensorCapabilities, MOTION_VERSION,
};

/// Motion - On-device activity classification and step metrics
#[derive(Parser)]
#[command(name = "motion")]
#[command(author = "Synheart AI Inc")]
#[command(version = MOTION_VERSION)]
#[command(about = "Turn accelerometer samples into activity and step metrics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded sample log and emit one snapshot per refresh tick
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Treat the device as having a hardware step counter
        #[arg(long)]
        hardware: bool,

        /// Seed for the simulated steps and heart rate
        #[arg(long)]
        seed: Option<u64>,

        /// Load configuration from a JSON file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,
    },

    /// Print the available sensor report
    Sensors {
        /// Device has a heart rate sensor
        #[arg(long)]
        heart_rate: bool,

        /// Device has a hardware step counter
        #[arg(long)]
        step_counter: bool,

        /// Device has an accelerometer
        #[arg(long)]
        accelerometer: bool,

        /// Extra sensors, in discovery order
        #[arg(long = "extra", value_enum)]
        extras: Vec<ExtraArg>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as JSON
    Config {
        /// Defaults for a device with a hardware step counter
        #[arg(long)]
        hardware: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON, streamed as ticks are published
    Ndjson,
    /// JSON array of snapshots
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum ExtraArg {
    Gyroscope,
    Light,
    Proximity,
}

impl From<ExtraArg> for ExtraSensor {
    fn from(arg: ExtraArg) -> Self {
        match arg {
            ExtraArg::Gyroscope => ExtraSensor::Gyroscope,
            ExtraArg::Light => ExtraSensor::Light,
            ExtraArg::Proximity => ExtraSensor::Proximity,
        }
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error = CliError::from(e);
            eprintln!(
                "{}",
                serde_json::to_string(&error).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), MotionCliError> {
    match cli.command {
        Commands::Replay {
            input,
            hardware,
            seed,
            config,
            output_format,
        } => {
            let config = load_config(config.as_deref(), hardware, seed)?;
            cmd_replay(&input, &config, output_format)
        }

        Commands::Sensors {
            heart_rate,
            step_counter,
            accelerometer,
            extras,
            json,
        } => {
            let capabilities = SensorCapabilities {
                heart_rate,
                step_counter,
                accelerometer,
                extras: extras.into_iter().map(ExtraSensor::from).collect(),
            };
            cmd_sensors(&capabilities, json)
        }

        Commands::Config { hardware } => {
            println!("{}", serde_json::to_string_pretty(&MotionConfig::for_hardware(hardware))?);
            Ok(())
        }
    }
}

fn load_config(
    path: Option<&Path>,
    hardware: bool,
    seed: Option<u64>,
) -> Result<MotionConfig, MotionCliError> {
    let mut config = match path {
        Some(path) => MotionConfig::from_json(&fs::read_to_string(path)?)?,
        None => MotionConfig::for_hardware(hardware),
    };

    // Command-line flags win over the file
    if hardware {
        config.has_hardware_step_counter = true;
    }
    if seed.is_some() {
        config.random_seed = seed;
    }
    config.validate()?;

    Ok(config)
}

fn cmd_replay(
    input: &Path,
    config: &MotionConfig,
    output_format: OutputFormat,
) -> Result<(), MotionCliError> {
    let reader: Box<dyn BufRead> = if input.to_string_lossy() == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(fs::File::open(input)?))
    };

    let mut session = ReplaySession::new(config)?;
    let mut stdout = io::stdout();
    let mut collected: Vec<ReplayRecord> = Vec::new();
    let mut pending: Option<ReplayRecord> = None;
    let mut last_timestamp: Option<u64> = None;
    let mut event_count = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let event: ReplayEvent = serde_json::from_str(trimmed).map_err(|e| {
            MotionCliError::ParseError(format!("Line {}: failed to parse event: {}", index + 1, e))
        })?;

        if let Some(previous) = last_timestamp {
            if event.timestamp_ms() < previous {
                return Err(MotionCliError::ParseError(format!(
                    "Line {}: timestamp {} is earlier than {}",
                    index + 1,
                    event.timestamp_ms(),
                    previous
                )));
            }
        }
        last_timestamp = Some(event.timestamp_ms());
        event_count += 1;

        for record in session.push(&event)? {
            // Hold the latest tick back so the closing snapshot can supersede it
            if let Some(ready) = pending.replace(record) {
                emit(&ready, &output_format, &mut stdout, &mut collected)?;
            }
        }
    }

    let last_timestamp = last_timestamp.ok_or(MotionCliError::NoEvents)?;
    let closing = session.finish(last_timestamp)?;

    if let (Some(held), Some(first)) = (pending.take(), closing.first()) {
        if held.elapsed_ms != first.elapsed_ms {
            emit(&held, &output_format, &mut stdout, &mut collected)?;
        }
    }
    for record in &closing {
        emit(record, &output_format, &mut stdout, &mut collected)?;
    }

    match output_format {
        OutputFormat::Ndjson => {}
        OutputFormat::Json => writeln!(stdout, "{}", serde_json::to_string(&collected)?)?,
        OutputFormat::JsonPretty => {
            writeln!(stdout, "{}", serde_json::to_string_pretty(&collected)?)?
        }
    }
    stdout.flush()?;

    info!(
        target: "synheart_motion",
        events = event_count,
        total_steps = session.engine().total_steps(),
        "replay finished"
    );

    Ok(())
}

fn emit(
    record: &ReplayRecord,
    format: &OutputFormat,
    stdout: &mut io::Stdout,
    collected: &mut Vec<ReplayRecord>,
) -> Result<(), MotionCliError> {
    match format {
        OutputFormat::Ndjson => {
            writeln!(stdout, "{}", serde_json::to_string(record)?)?;
            stdout.flush()?;
        }
        OutputFormat::Json | OutputFormat::JsonPretty => collected.push(record.clone()),
    }
    Ok(())
}

fn cmd_sensors(capabilities: &SensorCapabilities, json: bool) -> Result<(), MotionCliError> {
    let labels = available_sensor_labels(capabilities);

    if json {
        println!("{}", serde_json::to_string_pretty(&labels)?);
    } else {
        println!("Available sensors:");
        for label in &labels {
            println!("  • {}", label);
        }
    }

    Ok(())
}

// Error handling

#[derive(Debug)]
enum MotionCliError {
    Io(io::Error),
    Motion(MotionError),
    Json(serde_json::Error),
    ParseError(String),
    NoEvents,
}

impl From<io::Error> for MotionCliError {
    fn from(e: io::Error) -> Self {
        MotionCliError::Io(e)
    }
}

impl From<MotionError> for MotionCliError {
    fn from(e: MotionError) -> Self {
        MotionCliError::Motion(e)
    }
}

impl From<serde_json::Error> for MotionCliError {
    fn from(e: serde_json::Error) -> Self {
        MotionCliError::Json(e)
    }
}

const REPLAY_LINE_HINT: &str =
    "Each line must be {timestamp_ms, x, y, z} or {timestamp_ms, step_count}";

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<MotionCliError> for CliError {
    fn from(e: MotionCliError) -> Self {
        match e {
            MotionCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            MotionCliError::Motion(e) => CliError {
                code: e.code().to_string(),
                hint: match &e {
                    MotionError::ConfigurationMismatch { .. } => {
                        Some("Pass --hardware when replaying step counter logs".to_string())
                    }
                    MotionError::InvalidConfig(_) => {
                        Some("Run 'motion config' to see a valid configuration".to_string())
                    }
                    _ => None,
                },
                message: e.to_string(),
            },
            MotionCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            MotionCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some(REPLAY_LINE_HINT.to_string()),
            },
            MotionCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
        }
    }
}
