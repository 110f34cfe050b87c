//! Statistical functions behind a small backend interface.

pub mod backend;
pub mod registry;

pub use backend::{SeriesBackend, StatrsBackend, StatsBackend};
pub use registry::StatsKind;
