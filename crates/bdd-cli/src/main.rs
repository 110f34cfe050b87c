use anyhow::Result;
use bdd_cli::{load_config, Cli, Commands};
use clap::Parser;
use tracing::debug;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::check::{self, CheckArgs};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let level = match cli.log_level {
        Some(level) => level,
        None => config.logging.level()?,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    debug!(?config, "configuration loaded");

    match &cli.command {
        Commands::Dof {
            network,
            measurements,
            format,
        } => commands::dof::handle(network, measurements, *format),
        Commands::Check {
            network,
            measurements,
            solution,
            prob_false,
            stats,
            out,
            format,
            quiet,
        } => {
            let options =
                check::merge_options(&config.bad_data, *prob_false, stats.as_deref(), *quiet)?;
            check::handle(
                CheckArgs {
                    network,
                    measurements,
                    solution,
                    out: out.as_ref(),
                    format: *format,
                },
                &options,
            )
        }
    }
}
