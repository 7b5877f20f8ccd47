//! Parses the command line arguments.
//!
//! Basic usage, running the unknown key-share attack against every variant
//! with logging on:
//!
//! ```text
//! cargo run -- --scenario unknown-key-share --variant all --log
//! ```

use crate::scenarios::{self, ScenarioError, Settings};
use clap::Parser;
use futures::future::join_all;
use speke_core::{variant::GeneratorReading, AttackerMode, Variants};
use std::{
    fs::{create_dir_all, OpenOptions},
    sync::Arc,
};
use tracing_subscriber::FmtSubscriber;

/// Stores the different command line arguments.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Logging flag. Writes JSON events to ./logs when set.
    #[arg(short, long)]
    log: bool,
    /// Protocol variant to run, or `all` to run every variant side by side.
    #[arg(short, long, default_value = "jablon")]
    variant: String,
    /// Attacker mode for the honest scenario. The attacks are always active.
    #[arg(short, long, default_value_t = AttackerMode::Passive)]
    attacker: AttackerMode,
    /// One of: honest, replay, unknown-key-share, session-swap, reflection.
    #[arg(short, long, default_value = "honest")]
    scenario: String,
    /// Number of concurrent handshakes in the honest scenario.
    #[arg(short = 'n', long, default_value_t = 1)]
    sessions: usize,
    /// Read the iso-2006 generator slot as a repeated public value.
    #[arg(long)]
    repeated_public: bool,
    /// Print the registered variants and exit.
    #[arg(long)]
    list_variants: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Could not open the log file: {0}")]
    LogFile(#[from] std::io::Error),
    #[error("Could not install the log subscriber: {0}")]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

/// Parses command line arguments and runs the selected scenario.
pub async fn initialize_from_arguments() -> Result<(), CliError> {
    let cli = Args::parse();
    if cli.list_variants {
        for name in Variants::NAMES {
            println!("{name}");
        }
        return Ok(());
    }
    if cli.log {
        initialize_logging()?;
    }

    let variants: Vec<&str> = match cli.variant.as_str() {
        "all" => Variants::NAMES.to_vec(),
        one => vec![one],
    };
    let reading = if cli.repeated_public {
        GeneratorReading::RepeatedPublic
    } else {
        GeneratorReading::Generator
    };
    let settings: Vec<Settings> = variants
        .into_iter()
        .map(|variant| {
            Settings::new(variant)
                .attacker(cli.attacker)
                .sessions(cli.sessions)
                .reading(reading)
        })
        .collect();

    let runs = settings
        .iter()
        .map(|settings| scenarios::run_named(&cli.scenario, settings));
    for report in join_all(runs).await {
        println!("{}", report?);
    }
    Ok(())
}

/// Installs a global subscriber writing JSON lines to a timestamped file
/// under ./logs. Only call this once.
fn initialize_logging() -> Result<(), CliError> {
    let main_path = "./logs";
    create_dir_all(main_path)?;
    let file_path = format!(
        "{}/speke-{}.log",
        main_path,
        chrono::offset::Local::now().format("%y-%m-%d_%H-%M-%S")
    );
    let file = OpenOptions::new()
        .write(true)
        .append(true)
        .create(true)
        .open(file_path)?;
    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(Arc::new(file))
        .json()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
