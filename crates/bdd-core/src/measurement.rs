//! Measurement inventory consumed by the bad-data test.
//!
//! A [`Measurement`] observes one variable of one network component. Each
//! phase of the observation is a probability [`Distribution`]; the mean is
//! the measured value `z` and the standard deviation is its uncertainty `σ`.
//! The phase count of a measurement is the length of its `dst` list.
//!
//! Documents use the field names of the estimation pipeline:
//!
//! ```json
//! { "id": 1, "cmp": "load", "cmp_id": 4, "var": "pd",
//!   "dst": [ { "kind": "normal", "mean": 0.31, "std": 0.003 } ] }
//! ```

use crate::error::{BddError, BddResult};
use serde::{Deserialize, Serialize};
use statrs::distribution::{Beta, Gamma, Normal, Uniform};
use statrs::statistics::Distribution as Moment;
use std::fmt;

/// Component class a measurement (or a solved value) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Bus,
    Branch,
    Load,
    #[serde(alias = "generator")]
    Gen,
    Shunt,
    Transformer,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Bus => "bus",
            ComponentKind::Branch => "branch",
            ComponentKind::Load => "load",
            ComponentKind::Gen => "gen",
            ComponentKind::Shunt => "shunt",
            ComponentKind::Transformer => "transformer",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurementId(usize);

impl MeasurementId {
    #[inline]
    pub fn new(value: usize) -> Self {
        MeasurementId(value)
    }
    #[inline]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Display for MeasurementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "meas#{}", self.0)
    }
}

/// First two moments of a per-phase measurement distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub mean: f64,
    pub std: f64,
}

/// Per-phase measurement model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    /// Gaussian noise around the measured value
    Normal { mean: f64, std: f64 },
    /// Flat uncertainty band
    Uniform { min: f64, max: f64 },
    /// Gamma with shape/rate parametrisation
    Gamma { shape: f64, rate: f64 },
    /// Beta(alpha, beta) stretched onto `[min, max]`
    ExtendedBeta {
        alpha: f64,
        beta: f64,
        min: f64,
        max: f64,
    },
}

impl Distribution {
    /// Shorthand for the common Gaussian case.
    pub fn normal(mean: f64, std: f64) -> Self {
        Distribution::Normal { mean, std }
    }

    /// Mean and standard deviation, rejecting parameters that would make the
    /// normalized residual undefined.
    pub fn moments(&self) -> BddResult<Moments> {
        let bad = |detail: String| {
            BddError::Config(format!("invalid {} distribution: {detail}", self.name()))
        };
        let (mean, std) = match *self {
            Distribution::Normal { mean, std } => {
                let d = Normal::new(mean, std).map_err(|e| bad(e.to_string()))?;
                (d.mean(), d.std_dev())
            }
            Distribution::Uniform { min, max } => {
                let d = Uniform::new(min, max).map_err(|e| bad(e.to_string()))?;
                (d.mean(), d.std_dev())
            }
            Distribution::Gamma { shape, rate } => {
                let d = Gamma::new(shape, rate).map_err(|e| bad(e.to_string()))?;
                (d.mean(), d.std_dev())
            }
            Distribution::ExtendedBeta {
                alpha,
                beta,
                min,
                max,
            } => {
                if min.is_nan() || max.is_nan() || min >= max {
                    return Err(bad(format!("support [{min}, {max}] is empty")));
                }
                let d = Beta::new(alpha, beta).map_err(|e| bad(e.to_string()))?;
                let width = max - min;
                (d.mean().map(|m| min + width * m), d.std_dev().map(|s| width * s))
            }
        };

        let mean = mean
            .filter(|m| m.is_finite())
            .ok_or_else(|| bad("mean is undefined".into()))?;
        let std = std
            .filter(|s| s.is_finite())
            .ok_or_else(|| bad("standard deviation is undefined".into()))?;
        if std <= 0.0 {
            return Err(bad(format!("standard deviation must be positive, got {std}")));
        }
        Ok(Moments { mean, std })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Distribution::Normal { .. } => "normal",
            Distribution::Uniform { .. } => "uniform",
            Distribution::Gamma { .. } => "gamma",
            Distribution::ExtendedBeta { .. } => "extended_beta",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: MeasurementId,
    /// Component class of the measured element
    pub cmp: ComponentKind,
    /// Identifier of the measured element within its class
    pub cmp_id: usize,
    /// Measured variable name (e.g. `vm`, `pd`, `qg`)
    pub var: String,
    /// One distribution per measured phase
    pub dst: Vec<Distribution>,
}

impl Measurement {
    pub fn new(
        id: MeasurementId,
        cmp: ComponentKind,
        cmp_id: usize,
        var: impl Into<String>,
        dst: Vec<Distribution>,
    ) -> Self {
        Self {
            id,
            cmp,
            cmp_id,
            var: var.into(),
            dst,
        }
    }

    #[inline]
    pub fn phase_count(&self) -> usize {
        self.dst.len()
    }

    /// Moments for every phase, in `dst` order.
    pub fn moments(&self) -> BddResult<Vec<Moments>> {
        if self.dst.is_empty() {
            return Err(BddError::Config(format!(
                "measurement {} ({} {} '{}') has no phase distributions",
                self.id, self.cmp, self.cmp_id, self.var
            )));
        }
        self.dst
            .iter()
            .enumerate()
            .map(|(phase, dst)| {
                dst.moments().map_err(|err| match err {
                    BddError::Config(msg) => BddError::Config(format!(
                        "measurement {} phase {}: {msg}",
                        self.id,
                        phase + 1
                    )),
                    other => other,
                })
            })
            .collect()
    }
}

/// Ordered collection of measurements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurementSet {
    measurements: Vec<Measurement>,
}

impl MeasurementSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, measurement: Measurement) {
        self.measurements.push(measurement);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Measurement> {
        self.measurements.iter()
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    /// Total number of scalar observations (sum of phase counts).
    pub fn phase_total(&self) -> usize {
        self.measurements.iter().map(Measurement::phase_count).sum()
    }
}

impl From<Vec<Measurement>> for MeasurementSet {
    fn from(measurements: Vec<Measurement>) -> Self {
        Self { measurements }
    }
}

impl FromIterator<Measurement> for MeasurementSet {
    fn from_iter<I: IntoIterator<Item = Measurement>>(iter: I) -> Self {
        Self {
            measurements: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MeasurementSet {
    type Item = &'a Measurement;
    type IntoIter = std::slice::Iter<'a, Measurement>;

    fn into_iter(self) -> Self::IntoIter {
        self.measurements.iter()
    }
}
