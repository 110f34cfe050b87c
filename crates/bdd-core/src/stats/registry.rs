use super::backend::{SeriesBackend, StatrsBackend, StatsBackend};
use crate::error::{BddError, BddResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// Simple registry of available statistics backends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsKind {
    #[default]
    Statrs,
    Series,
}

impl FromStr for StatsKind {
    type Err = BddError;

    fn from_str(input: &str) -> BddResult<Self> {
        match input.to_ascii_lowercase().as_str() {
            "statrs" | "default" => Ok(StatsKind::Statrs),
            "series" => Ok(StatsKind::Series),
            other => Err(BddError::Config(format!(
                "unknown statistics backend '{}'; supported values: {}",
                other,
                StatsKind::available().join(", ")
            ))),
        }
    }
}

impl StatsKind {
    pub fn build_backend(self) -> Arc<dyn StatsBackend> {
        match self {
            StatsKind::Statrs => Arc::new(StatrsBackend),
            StatsKind::Series => Arc::new(SeriesBackend),
        }
    }

    pub fn available() -> &'static [&'static str] {
        &["statrs", "series"]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatsKind::Statrs => "statrs",
            StatsKind::Series => "series",
        }
    }
}
