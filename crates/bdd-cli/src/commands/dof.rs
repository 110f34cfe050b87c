use anyhow::Result;
use bdd_algo::dof_breakdown;
use bdd_cli::cli::OutputFormat;
use std::path::Path;

use crate::commands::io::{load_measurements, load_network, print_json};

pub fn handle(network: &Path, measurements: &Path, format: OutputFormat) -> Result<()> {
    let net = load_network(network)?;
    let meas = load_measurements(measurements)?;
    let breakdown = dof_breakdown(&net, &meas)?;

    match format {
        OutputFormat::Json => print_json(&breakdown)?,
        OutputFormat::Plain => {
            println!("Degrees of freedom for {}:", network.display());
            println!("  Reference bus      : {}", breakdown.reference_bus.value());
            println!("  Active buses       : {}", breakdown.active_buses);
            println!("  State variables (n): {}", breakdown.state_variables);
            println!("  Measurements (m)   : {}", breakdown.measurement_phases);
            println!("  DoF (m - n)        : {}", breakdown.dof);
        }
    }
    Ok(())
}
