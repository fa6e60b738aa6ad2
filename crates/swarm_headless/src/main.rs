//! Headless swarm agent driver.
//!
//! # Usage
//!
//! ```bash
//! # Play episodes from stdin with the default config
//! cargo run -p swarm_headless
//!
//! # Load a config and override single options
//! cargo run -p swarm_headless -- run --config agent.ron --option combat=harass --option seed=4
//!
//! # Print the effective config as RON
//! cargo run -p swarm_headless -- config --option placement=hybrid-v2
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use swarm_core::config::AgentConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use swarm_headless::{load_config, verbose_options, HeadlessRunner};

#[derive(Parser)]
#[command(name = "swarm_headless")]
#[command(about = "Headless JSON-lines driver for the swarm agent")]
#[command(version)]
struct Cli {
    /// Log every subsystem at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer start/step/end messages on stdin
    Run {
        /// Agent config file (RON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override one config option, as key=value
        #[arg(short, long = "option")]
        options: Vec<String>,
    },

    /// Print the effective agent config and exit
    Config {
        /// Agent config file (RON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override one config option, as key=value
        #[arg(short, long = "option")]
        options: Vec<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (command, path, mut options) = match cli.command {
        Some(Commands::Run { config, options }) => ("run", config, options),
        Some(Commands::Config { config, options }) => ("config", config, options),
        None => ("run", None, Vec::new()),
    };

    if cli.verbose {
        options.extend(verbose_options());
    }
    let config = match load_config(path.as_deref(), &options) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config);

    match command {
        "config" => cmd_config(&config),
        _ => cmd_run(config),
    }
}

/// Logs go to stderr; stdout carries the protocol. `RUST_LOG` wins over the
/// config's verbosity when set.
fn init_logging(config: &AgentConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.log_filter()));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

fn cmd_run(config: AgentConfig) -> ExitCode {
    tracing::info!(
        combat = ?config.combat_strategy,
        production = ?config.production_strategy,
        placement = ?config.placement_strategy,
        seed = config.seed,
        "Starting headless session"
    );

    let mut runner = HeadlessRunner::with_config(config);
    match runner.run_stdio() {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "session failed");
            ExitCode::FAILURE
        }
    }
}

fn cmd_config(config: &AgentConfig) -> ExitCode {
    match config.to_ron_string() {
        Ok(ron) => {
            println!("{ron}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize config");
            ExitCode::FAILURE
        }
    }
}
