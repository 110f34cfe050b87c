use anyhow::{Context, Result};
use bdd_core::{MeasurementSet, Network, NetworkData, Solution};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let file = File::open(path).with_context(|| format!("opening {what} {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parsing {what} {}", path.display()))
}

pub fn load_network(path: &Path) -> Result<Network> {
    let data: NetworkData = read_json(path, "network")?;
    let network =
        Network::from_data(data).with_context(|| format!("building network {}", path.display()))?;
    debug!(path = %path.display(), stats = %network.stats(), "loaded network");
    Ok(network)
}

pub fn load_measurements(path: &Path) -> Result<MeasurementSet> {
    let measurements: MeasurementSet = read_json(path, "measurements")?;
    debug!(
        path = %path.display(),
        measurements = measurements.len(),
        phases = measurements.phase_total(),
        "loaded measurements"
    );
    Ok(measurements)
}

pub fn load_solution(path: &Path) -> Result<Solution> {
    read_json(path, "solution")
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("writing {}", path.display()))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    info!("Wrote {}", path.display());
    Ok(())
}

/// Pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    serde_json::to_writer_pretty(&mut lock, value)?;
    writeln!(lock)?;
    Ok(())
}
