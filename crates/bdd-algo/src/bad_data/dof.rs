//! Degrees of freedom of the estimation problem.
//!
//! Each terminal of a bus carries two state variables (magnitude/angle or
//! real/imaginary; only the count matters here). The reference bus has its
//! angle-type variable fixed on every terminal, so its terminal count is
//! subtracted once. Zero-injection buses (no load, no generator) are handled
//! by equality constraints in the estimator and are not free variables.
//!
//! ```text
//! n   = 2 * Σ_active terminals(bus) - terminals(reference)
//! m   = Σ_measurements phases(measurement)
//! dof = m - n                       (must be > 0)
//! ```

use bdd_core::{BddError, BddResult, Bus, BusId, MeasurementSet, Network};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Intermediate values of the degrees-of-freedom calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DofBreakdown {
    pub reference_bus: BusId,
    /// Buses referenced by at least one load or generator
    pub active_buses: usize,
    /// Free state variables `n`
    pub state_variables: i64,
    /// Scalar measurements `m`
    pub measurement_phases: usize,
    pub dof: usize,
}

/// `m - n` for the given topology and measurement inventory.
///
/// Fails with [`BddError::Config`] when the network does not have exactly
/// one reference bus, when no bus carries an injection, or when the system is
/// not overdetermined.
pub fn compute_degrees_of_freedom(
    network: &Network,
    measurements: &MeasurementSet,
) -> BddResult<usize> {
    dof_breakdown(network, measurements).map(|b| b.dof)
}

/// Same as [`compute_degrees_of_freedom`], keeping the intermediate counts.
pub fn dof_breakdown(network: &Network, measurements: &MeasurementSet) -> BddResult<DofBreakdown> {
    let reference = single_reference_bus(network)?;

    let active: BTreeSet<BusId> = network
        .loads()
        .into_iter()
        .map(|l| l.bus)
        .chain(network.generators().into_iter().map(|g| g.bus))
        .collect();
    if active.is_empty() {
        return Err(BddError::Config(
            "no active buses: every bus is zero-injection (no loads or generators)".into(),
        ));
    }

    let buses = network.bus_index();
    let mut active_terminals = 0usize;
    for bus_id in &active {
        let bus = buses.get(bus_id).ok_or_else(|| {
            BddError::Config(format!(
                "load or generator references unknown bus {}",
                bus_id.value()
            ))
        })?;
        active_terminals += bus.terminal_count();
    }

    if !active.contains(&reference.id) {
        warn!(
            reference_bus = reference.id.value(),
            "reference bus has no generator or load attached"
        );
    }

    let n = 2 * active_terminals as i64 - reference.terminal_count() as i64;
    let m = measurements.phase_total();
    let dof = m as i64 - n;
    if dof <= 0 {
        return Err(BddError::Config(format!(
            "system underdetermined: {m} measurement phase(s) for {n} state variable(s)"
        )));
    }

    let breakdown = DofBreakdown {
        reference_bus: reference.id,
        active_buses: active.len(),
        state_variables: n,
        measurement_phases: m,
        dof: dof as usize,
    };
    debug!(
        reference_bus = reference.id.value(),
        active_buses = breakdown.active_buses,
        n,
        m,
        dof = breakdown.dof,
        "degrees of freedom"
    );
    Ok(breakdown)
}

fn single_reference_bus(network: &Network) -> BddResult<&Bus> {
    let references = network.reference_buses();
    match references.as_slice() {
        [bus] => Ok(*bus),
        [] => Err(BddError::Config(
            "no reference bus: exactly one bus must have reference type".into(),
        )),
        many => Err(BddError::Config(format!(
            "multiple reference buses ({}): exactly one bus must have reference type",
            many.iter()
                .map(|b| b.id.value().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}
