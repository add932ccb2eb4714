//! Lightcone command-line interface.
//!
//! Run retarded Bloch simulations from TOML configuration files:
//! ```sh
//! lightcone run job.toml
//! lightcone run job.toml -o results/
//! lightcone validate job.toml
//! ```
//!
//! Progress is logged at `info` level: set `RUST_LOG=info` to see it.

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "lightcone")]
#[command(about = "Lightcone: time-retarded interactions between quantum dots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation from a TOML configuration file.
    Run {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output directory (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without running the simulation.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, output } => {
            println!("Lightcone Retarded Bloch Solver");
            println!("===============================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let result = runner::run_simulation(&job)?;

            let out_dir = output.unwrap_or_else(|| PathBuf::from(&job.output.directory));

            if job.output.save_populations {
                let csv_path = out_dir.join("populations.csv");
                runner::write_populations_csv(&result, &csv_path, &job)?;
            }

            if job.output.save_json {
                let json_path = out_dir.join("summary.json");
                runner::write_summary_json(&result.summary, &json_path)?;
            }

            println!(
                "Simulation complete in {:.2} s.",
                result.summary.elapsed_seconds
            );
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            let dots = runner::collect_dots(&job.dots)?;
            println!(
                "Configuration is valid: {} ({} dots, {} steps)",
                config.display(),
                dots.len(),
                job.simulation.num_steps
            );
            Ok(())
        }
    }
}
