use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use cloverlens::cli;

/// cloverlens: correlate Clover coverage reports with PHP sources.
#[derive(Parser)]
#[command(name = "cloverlens", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Attach coverage facts from a Clover report to the project's classes
    /// and methods.
    Analyze {
        /// Project root directory.
        project: PathBuf,

        /// Use an existing Clover report instead of running the tests.
        #[arg(long)]
        report: Option<PathBuf>,

        /// Config file (default: <project>/cloverlens.toml if present).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the analyzed project model as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("CLOVERLENS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let output = match cli.command {
        Commands::Analyze {
            project,
            report,
            config,
            json,
        } => cli::cmd_analyze(&project, report.as_deref(), config.as_deref(), json)?,
    };
    print!("{}", output);
    Ok(())
}
