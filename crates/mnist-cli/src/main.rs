//! mnist-demo: run the MNIST inference harness on the host.
//!
//! Reads `label,pixel_1,...,pixel_784` records from stdin or a file, runs
//! them through the quantized classifier and prints one report per record.

use std::io;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use mnist_cli::config::{CliOverrides, HarnessConfig, LogFormat};
use mnist_cli::engine::DenseClassifier;
use mnist_cli::exit::{EXIT_CONFIG_FAIL, EXIT_GENERIC_FAIL, EXIT_INIT_FAIL, EXIT_SUCCESS};
use mnist_cli::terminal::TerminalDisplay;
use mnist_cli::transport::ReaderSource;
use mnist_protocol::{Ingestor, SystemClock};
use mnist_session::{ConsoleFormat, Harness, NullDisplay, TextDisplay};
use tracing::{error, info};

/// MNIST inference harness
#[derive(Parser)]
#[command(name = "mnist-demo")]
#[command(about = "Feed CSV digit records to a quantized MNIST classifier")]
#[command(long_about = r#"
Feeds handwritten-digit records to an int8 classifier and reports the
ranked class probabilities for each one.

Each input line is `label,pixel_1,...,pixel_784`. Blank lines and lines
starting with `#` are skipped.

Examples:
  # Classify a CSV file
  mnist-demo run --model weights.json --input mnist_test.csv

  # Stream records from another process, one JSON report per line
  produce-records | mnist-demo --format json --no-display run --model weights.json

  # Show the effective configuration
  mnist-demo config show
"#)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directive (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Log format on stderr (pretty, compact, json)
    #[arg(long, value_name = "FORMAT", global = true)]
    log_format: Option<LogFormat>,

    /// Report format on stdout (text, json)
    #[arg(long = "format", value_name = "FORMAT", global = true)]
    console_format: Option<ConsoleFormat>,

    /// Do not draw the device screen on stderr
    #[arg(long, global = true)]
    no_display: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify records until the input ends
    Run {
        /// Read records from this file instead of stdin
        #[arg(short, long, value_name = "PATH")]
        input: Option<PathBuf>,

        /// Dense model weights (JSON)
        #[arg(short, long, value_name = "PATH")]
        model: Option<PathBuf>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        let model_path = match &self.command {
            Commands::Run { model, .. } => model.clone(),
            Commands::Config { .. } => None,
        };
        CliOverrides {
            model_path,
            log_level: self.log_level.clone(),
            log_format: self.log_format,
            console_format: self.console_format,
            no_display: self.no_display,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match HarnessConfig::load(cli.config.as_deref(), &cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {e}", style("error:").red().bold());
            process::exit(EXIT_CONFIG_FAIL);
        }
    };

    if let Err(e) = setup_logging(&config) {
        eprintln!("{} {e:#}", style("error:").red().bold());
        process::exit(EXIT_CONFIG_FAIL);
    }

    let result = match cli.command {
        Commands::Run { input, .. } => run(&config, input.as_deref()),
        Commands::Config { action: ConfigAction::Show } => show_config(&config),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Command failed: {}", e);
            for cause in e.chain().skip(1) {
                error!("  Caused by: {}", cause);
            }
            eprintln!("{} {e:#}", style("error:").red().bold());
            process::exit(EXIT_GENERIC_FAIL);
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` takes precedence over the
/// configured level.
fn setup_logging(config: &HarnessConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.log_level))
        .context("invalid log filter")?;

    let subscriber =
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).with_target(false);

    let installed = match config.log_format {
        LogFormat::Json => {
            subscriber.json().with_timer(tracing_subscriber::fmt::time::uptime()).try_init()
        }
        LogFormat::Compact => subscriber.compact().try_init(),
        LogFormat::Pretty => subscriber.pretty().try_init(),
    };
    installed.map_err(|e| anyhow::anyhow!(e)).context("failed to install log subscriber")
}

fn run(config: &HarnessConfig, input: Option<&Path>) -> Result<i32> {
    let source = match input {
        Some(path) => ReaderSource::file(path)
            .with_context(|| format!("failed to open input {}", path.display()))?,
        None => ReaderSource::stdin().context("failed to start stdin reader")?,
    };
    let ingestor = Ingestor::new(source, SystemClock, config.ingest_config());
    let classifier = DenseClassifier::new(config.model_path.clone());
    let display: Box<dyn TextDisplay> = if config.show_display {
        Box::new(TerminalDisplay::stderr())
    } else {
        Box::new(NullDisplay)
    };

    let stdout = io::stdout();
    let mut harness =
        match Harness::boot(classifier, ingestor, display, stdout.lock(), config.console_format) {
            Ok(harness) => harness,
            Err(e) => {
                error!(error = %e, "cannot start without a classifier");
                return Ok(EXIT_INIT_FAIL);
            }
        };

    let stats = harness.run_until_closed();
    info!(
        inferences = stats.inferences,
        correct = stats.correct,
        ignored = stats.ignored,
        malformed = stats.malformed,
        overflows = stats.overflows,
        timeouts = stats.timeouts,
        failures = stats.failures,
        "input finished"
    );
    if let Some(accuracy) = stats.accuracy() {
        eprintln!(
            "{} {} inferences, {} correct ({:.1}%)",
            style("done:").green().bold(),
            stats.inferences,
            stats.correct,
            accuracy * 100.0
        );
    }
    Ok(EXIT_SUCCESS)
}

fn show_config(config: &HarnessConfig) -> Result<i32> {
    let text = config.to_toml().context("failed to serialize configuration")?;
    println!("{text}");
    Ok(EXIT_SUCCESS)
}
