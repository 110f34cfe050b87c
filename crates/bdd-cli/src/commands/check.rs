use anyhow::Result;
use bdd_algo::{evaluate_bad_data, Chi2Options, TestOutcome};
use bdd_cli::cli::OutputFormat;
use bdd_core::StatsKind;
use std::io::Write;
use std::path::{Path, PathBuf};
use tabwriter::TabWriter;
use tracing::info;

use crate::commands::io::{load_measurements, load_network, load_solution, print_json, write_json};

/// Inputs of `bdd check`, already merged with the config file.
pub struct CheckArgs<'a> {
    pub network: &'a Path,
    pub measurements: &'a Path,
    pub solution: &'a Path,
    pub out: Option<&'a PathBuf>,
    pub format: OutputFormat,
}

/// Apply command-line overrides on top of the configured defaults.
pub fn merge_options(
    base: &Chi2Options,
    prob_false: Option<f64>,
    stats: Option<&str>,
    quiet: bool,
) -> Result<Chi2Options> {
    let mut options = base.clone();
    if let Some(p) = prob_false {
        options = options.with_prob_false(p);
    }
    if let Some(kind) = stats {
        options = options.with_stats(kind.parse::<StatsKind>()?);
    }
    if quiet {
        options = options.quiet();
    }
    options.validate()?;
    Ok(options)
}

pub fn handle(args: CheckArgs<'_>, options: &Chi2Options) -> Result<()> {
    let network = load_network(args.network)?;
    let measurements = load_measurements(args.measurements)?;
    let mut solution = load_solution(args.solution)?;
    info!(
        "Running Chi-squared bad-data test ({} measurements, backend {})",
        measurements.len(),
        options.stats.as_str()
    );

    let outcome = evaluate_bad_data(&mut solution, &network, &measurements, options)?;

    if let Some(out) = args.out {
        write_json(out, &solution)?;
    }

    match args.format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Plain => print_plain(&outcome)?,
    }
    Ok(())
}

fn print_plain(outcome: &TestOutcome) -> Result<()> {
    println!("Chi-squared bad-data test:");
    println!("  DoF            : {}", outcome.dof);
    println!("  prob_false     : {}", outcome.prob_false);
    println!("  J              : {:.6}", outcome.statistic);
    println!("  Critical value : {:.6}", outcome.critical_value);
    if let Some(gap) = outcome.objective_gap {
        println!("  J - objective  : {gap:.3e}");
    }
    println!(
        "  Result         : {}",
        if outcome.exceeds_threshold {
            "bad data detected"
        } else {
            "no bad data detected"
        }
    );

    let mut tw = TabWriter::new(std::io::stdout());
    writeln!(tw, "MEAS\tCOMPONENT\tID\tVAR\tNORMALIZED RESIDUALS\tTOTAL")?;
    for record in &outcome.residuals {
        let phases = record
            .normalized_residuals
            .iter()
            .map(|r| format!("{r:.4}"))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(
            tw,
            "{}\t{}\t{}\t{}\t{}\t{:.4}",
            record.measurement.value(),
            record.cmp,
            record.cmp_id,
            record.var,
            phases,
            record.total()
        )?;
    }
    tw.flush()?;
    Ok(())
}
