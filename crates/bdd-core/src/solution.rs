//! Solved state produced by an upstream estimator.
//!
//! The estimator's result is a nested map `component kind → component id →
//! variable name → per-phase values`. The bad-data test never walks that map
//! directly; it goes through [`SolutionLookup`], so any result container can
//! be checked as long as it can answer a typed lookup.

use crate::error::{BddError, BddResult};
use crate::measurement::{ComponentKind, MeasurementId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Typed access to solved values.
pub trait SolutionLookup {
    /// Per-phase solved values of `variable` on component `id` of class
    /// `component`. Any missing path segment is a [`BddError::Lookup`].
    fn get_solution_value(
        &self,
        component: ComponentKind,
        id: usize,
        variable: &str,
    ) -> BddResult<&[f64]>;

    /// Solver objective value, when the estimator reported one.
    fn objective(&self) -> Option<f64> {
        None
    }
}

/// Normalized squared residuals of one measurement, index-aligned with its
/// `dst` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualRecord {
    pub measurement: MeasurementId,
    pub cmp: ComponentKind,
    pub cmp_id: usize,
    pub var: String,
    pub normalized_residuals: Vec<f64>,
}

impl ResidualRecord {
    /// Contribution of this measurement to the test statistic.
    pub fn total(&self) -> f64 {
        self.normalized_residuals.iter().sum()
    }
}

/// Per-measurement annotation written back into a [`Solution`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementResult {
    pub normalized_residuals: Vec<f64>,
}

type VariableMap = BTreeMap<String, Vec<f64>>;

/// Serializable estimator result.
///
/// ```json
/// { "objective": 3.1,
///   "solution": { "bus": { "1": { "vm": [1.01, 0.99, 1.0] } } },
///   "meas": {} }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Estimator objective (sum of weighted squared residuals for WLS)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<f64>,
    #[serde(default, rename = "solution")]
    pub components: BTreeMap<ComponentKind, BTreeMap<usize, VariableMap>>,
    /// Residual annotations keyed by measurement
    #[serde(default, rename = "meas")]
    pub measurements: BTreeMap<MeasurementId, MeasurementResult>,
}

impl Solution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_objective(mut self, objective: f64) -> Self {
        self.objective = Some(objective);
        self
    }

    /// Insert (or replace) the per-phase values of one variable.
    pub fn insert(
        &mut self,
        component: ComponentKind,
        id: usize,
        variable: impl Into<String>,
        values: Vec<f64>,
    ) {
        self.components
            .entry(component)
            .or_default()
            .entry(id)
            .or_default()
            .insert(variable.into(), values);
    }

    /// Attach residual records, overwriting earlier records for the same
    /// measurement.
    pub fn record_residuals(&mut self, records: &[ResidualRecord]) {
        for record in records {
            self.measurements.insert(
                record.measurement,
                MeasurementResult {
                    normalized_residuals: record.normalized_residuals.clone(),
                },
            );
        }
    }

    pub fn residuals_for(&self, measurement: MeasurementId) -> Option<&[f64]> {
        self.measurements
            .get(&measurement)
            .map(|r| r.normalized_residuals.as_slice())
    }
}

impl SolutionLookup for Solution {
    fn get_solution_value(
        &self,
        component: ComponentKind,
        id: usize,
        variable: &str,
    ) -> BddResult<&[f64]> {
        self.components
            .get(&component)
            .and_then(|by_id| by_id.get(&id))
            .and_then(|vars| vars.get(variable))
            .map(Vec::as_slice)
            .ok_or_else(|| BddError::Lookup {
                component,
                id,
                variable: variable.to_string(),
                phase: None,
            })
    }

    fn objective(&self) -> Option<f64> {
        self.objective
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Solution {
        let mut sol = Solution::new();
        sol.insert(ComponentKind::Bus, 1, "vm", vec![1.01, 0.99, 1.0]);
        sol.insert(ComponentKind::Load, 4, "pd", vec![0.3]);
        sol
    }

    #[test]
    fn lookup_hits() {
        let sol = sample();
        let values = sol.get_solution_value(ComponentKind::Bus, 1, "vm").unwrap();
        assert_eq!(values, &[1.01, 0.99, 1.0]);
    }

    #[test]
    fn every_missing_segment_is_a_lookup_error() {
        let sol = sample();
        assert!(sol
            .get_solution_value(ComponentKind::Gen, 1, "pg")
            .unwrap_err()
            .is_lookup());
        assert!(sol
            .get_solution_value(ComponentKind::Bus, 2, "vm")
            .unwrap_err()
            .is_lookup());
        assert!(sol
            .get_solution_value(ComponentKind::Bus, 1, "va")
            .unwrap_err()
            .is_lookup());
    }

    #[test]
    fn record_residuals_overwrites() {
        let mut sol = sample();
        let mut record = ResidualRecord {
            measurement: MeasurementId::new(5),
            cmp: ComponentKind::Load,
            cmp_id: 4,
            var: "pd".into(),
            normalized_residuals: vec![4.0],
        };
        sol.record_residuals(std::slice::from_ref(&record));
        record.normalized_residuals = vec![0.25];
        sol.record_residuals(&[record]);
        assert_eq!(sol.residuals_for(MeasurementId::new(5)), Some(&[0.25][..]));
        assert_eq!(sol.measurements.len(), 1);
    }

    #[test]
    fn solution_document_roundtrips_through_json() {
        let json = r#"{
            "objective": 2.5,
            "solution": { "bus": { "1": { "vm": [1.0, 0.98] } },
                          "gen": { "3": { "pg": [0.4] } } }
        }"#;
        let sol: Solution = serde_json::from_str(json).unwrap();
        assert_eq!(sol.objective(), Some(2.5));
        assert_eq!(
            sol.get_solution_value(ComponentKind::Gen, 3, "pg").unwrap(),
            &[0.4]
        );
        assert!(sol.measurements.is_empty());

        let text = serde_json::to_string(&sol).unwrap();
        let back: Solution = serde_json::from_str(&text).unwrap();
        assert_eq!(back, sol);
    }
}
