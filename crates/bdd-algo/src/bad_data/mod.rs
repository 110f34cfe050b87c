//! Bad-data detection for solved state estimates.
//!
//! Two steps, evaluated in dependency order:
//!
//! 1. [`compute_degrees_of_freedom`] derives `m - n` from the topology and the
//!    measurement inventory.
//! 2. [`evaluate_bad_data`] sums the normalized squared residuals into `J` and
//!    compares it with the Chi-squared quantile at `1 - prob_false`.
//!
//! Which individual measurement is bad is not determined here.

pub mod chi2;
pub mod dof;

pub use chi2::{
    chi_squared_test, evaluate_bad_data, exceeds_threshold, normalized_residuals, Chi2Options,
    TestOutcome, DEFAULT_PROB_FALSE,
};
pub use dof::{compute_degrees_of_freedom, dof_breakdown, DofBreakdown};
