//! Error types shared by the bad-data workspace
//!
//! Every fallible operation returns [`BddResult`]. The two variants callers
//! usually branch on are [`BddError::Config`] (the network or measurement set
//! cannot support a valid test) and [`BddError::Lookup`] (a measurement points
//! at something the solver never produced).
//!
//! # Example
//!
//! ```ignore
//! use bdd_core::{BddError, BddResult};
//!
//! fn check(solution: &Solution, network: &Network, meas: &MeasurementSet) -> BddResult<bool> {
//!     let outcome = chi_squared_test(solution, network, meas, &StatrsBackend, 0.05)?;
//!     Ok(outcome.exceeds_threshold)
//! }
//! ```

use crate::measurement::ComponentKind;
use thiserror::Error;

/// Unified error type for bad-data detection.
#[derive(Error, Debug)]
pub enum BddError {
    /// I/O errors (reading input documents)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Topology or measurement inventory cannot support a valid test
    #[error("Configuration error: {0}")]
    Config(String),

    /// Measurement references a value absent from the solved state
    #[error(
        "Lookup error: no solved value for {component} {id} variable '{variable}'{}",
        phase_suffix(.phase)
    )]
    Lookup {
        component: ComponentKind,
        id: usize,
        variable: String,
        phase: Option<usize>,
    },

    /// Network structure errors
    #[error("Network error: {0}")]
    Network(String),
}

fn phase_suffix(phase: &Option<usize>) -> String {
    phase.map(|p| format!(" phase {p}")).unwrap_or_default()
}

/// Convenience type alias for Results using BddError.
pub type BddResult<T> = Result<T, BddError>;

impl BddError {
    /// True for the configuration class of failures.
    pub fn is_config(&self) -> bool {
        matches!(self, BddError::Config(_))
    }

    /// True when a measurement failed to resolve against the solution.
    pub fn is_lookup(&self) -> bool {
        matches!(self, BddError::Lookup { .. })
    }
}

// JSON parsing errors
impl From<serde_json::Error> for BddError {
    fn from(err: serde_json::Error) -> Self {
        BddError::Parse(err.to_string())
    }
}
