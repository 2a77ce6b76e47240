//! Wait-Die CLI
//!
//! Runs the Wait-Die transaction simulator from the command line.
//!
//! # Commands
//!
//! - `run` - Run a simulation and print a report
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Wait-Die deadlock-prevention simulator.
#[derive(Parser)]
#[command(name = "waitdie")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation and print a report
    Run {
        /// Number of concurrent transactions
        #[arg(short, long, default_value = "5")]
        transactions: usize,

        /// Resources, in acquisition order
        #[arg(short, long, value_delimiter = ',', default_value = "X,Y")]
        resources: Vec<String>,

        /// Seed for reproducible delays
        #[arg(short, long)]
        seed: Option<u64>,

        /// Give up on a transaction after this many restarts
        #[arg(short, long)]
        max_restarts: Option<u32>,

        /// Use millisecond-scale delays instead of the default pacing
        #[arg(long)]
        fast: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            transactions,
            resources,
            seed,
            max_restarts,
            fast,
            format,
        } => {
            let options = commands::run::RunOptions {
                transactions,
                resources,
                seed,
                max_restarts,
                fast,
            };
            commands::run::run(&options, &format)?;
        }
        Commands::Version => {
            println!("waitdie CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("waitdie core v{}", waitdie_core::VERSION);
        }
    }

    Ok(())
}
