//! # bdd-algo: Chi-squared bad-data detection
//!
//! Decides whether the measurement set behind a solved state estimate likely
//! contains gross errors.
//!
//! | Step | Function | Output |
//! |------|----------|--------|
//! | Degrees of freedom | [`compute_degrees_of_freedom`] | `m - n` |
//! | Residuals | [`normalized_residuals`] | one [`ResidualRecord`](bdd_core::ResidualRecord) per measurement |
//! | Decision | [`evaluate_bad_data`] / [`chi_squared_test`] | [`TestOutcome`] |
//!
//! ## Example
//!
//! ```ignore
//! use bdd_algo::{evaluate_bad_data, Chi2Options};
//!
//! let outcome = evaluate_bad_data(&mut solution, &network, &measurements, &Chi2Options::default())?;
//! if outcome.exceeds_threshold {
//!     println!("J = {:.3} >= {:.3}", outcome.statistic, outcome.critical_value);
//! }
//! ```
//!
//! The computation is synchronous and holds no shared state; independent
//! evaluations may run on separate threads.

pub mod bad_data;

pub use bad_data::{
    chi_squared_test, compute_degrees_of_freedom, dof_breakdown, evaluate_bad_data,
    exceeds_threshold, normalized_residuals, Chi2Options, DofBreakdown, TestOutcome,
    DEFAULT_PROB_FALSE,
};
