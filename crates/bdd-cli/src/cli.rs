use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bdd", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level (overrides `[logging] level` in the config file)
    #[arg(long)]
    pub log_level: Option<tracing::Level>,

    /// Configuration file (TOML). Defaults to `~/.bdd/config/bdd.toml` when present
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Degrees of freedom of a network + measurement set
    Dof {
        /// Network document (JSON)
        #[arg(long, value_hint = ValueHint::FilePath)]
        network: PathBuf,
        /// Measurement document (JSON)
        #[arg(long, value_hint = ValueHint::FilePath)]
        measurements: PathBuf,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },
    /// Chi-squared bad-data test on a solved state estimate
    Check {
        /// Network document (JSON)
        #[arg(long, value_hint = ValueHint::FilePath)]
        network: PathBuf,
        /// Measurement document (JSON)
        #[arg(long, value_hint = ValueHint::FilePath)]
        measurements: PathBuf,
        /// Solved state document (JSON)
        #[arg(long, value_hint = ValueHint::FilePath)]
        solution: PathBuf,
        /// False-alarm probability in (0, 1)
        #[arg(long)]
        prob_false: Option<f64>,
        /// Statistics backend (statrs, series)
        #[arg(long)]
        stats: Option<String>,
        /// Write the residual-annotated solution here
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
        /// Suppress the bad-data announcement log line
        #[arg(short, long)]
        quiet: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Plain,
    Json,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
