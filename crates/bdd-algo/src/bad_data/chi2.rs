//! Chi-squared test on normalized measurement residuals.
//!
//! For every measurement phase the solved value `h` is compared with the
//! measured mean `z` and scaled by the measurement's standard deviation:
//!
//! ```text
//! r_i = ((h_i - z_i) / σ_i)^2          J = Σ r_i
//! ```
//!
//! Under the no-bad-data hypothesis `J` follows a Chi-squared distribution
//! with `m - n` degrees of freedom. The hypothesis is rejected when `J`
//! reaches the quantile at `1 - prob_false`.

use super::dof::compute_degrees_of_freedom;
use bdd_core::{
    BddError, BddResult, MeasurementSet, Network, ResidualRecord, Solution, SolutionLookup,
    StatsBackend, StatsKind,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::{info, warn};

/// Default false-alarm probability.
pub const DEFAULT_PROB_FALSE: f64 = 0.05;

/// Tunables of [`evaluate_bad_data`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Chi2Options {
    /// Probability of flagging bad data when there is none, in `(0, 1)`
    pub prob_false: f64,
    /// Backend used for the Chi-squared quantile
    pub stats: StatsKind,
    /// Log a "bad data detected / not detected" line
    pub announce: bool,
    /// Relative tolerance between the recomputed statistic and the solver
    /// objective before a mismatch is reported
    pub objective_tolerance: f64,
}

impl Default for Chi2Options {
    fn default() -> Self {
        Self {
            prob_false: DEFAULT_PROB_FALSE,
            stats: StatsKind::default(),
            announce: true,
            objective_tolerance: 1e-6,
        }
    }
}

impl Chi2Options {
    pub fn with_prob_false(mut self, prob_false: f64) -> Self {
        self.prob_false = prob_false;
        self
    }

    pub fn with_stats(mut self, stats: StatsKind) -> Self {
        self.stats = stats;
        self
    }

    /// Suppress the human-readable announcement.
    pub fn quiet(mut self) -> Self {
        self.announce = false;
        self
    }

    pub fn validate(&self) -> BddResult<()> {
        validate_prob_false(self.prob_false)?;
        if !(self.objective_tolerance.is_finite() && self.objective_tolerance >= 0.0) {
            return Err(BddError::Config(format!(
                "objective_tolerance must be a non-negative number, got {}",
                self.objective_tolerance
            )));
        }
        Ok(())
    }
}

fn validate_prob_false(prob_false: f64) -> BddResult<()> {
    if !(prob_false > 0.0 && prob_false < 1.0) {
        return Err(BddError::Config(format!(
            "prob_false must lie in (0, 1), got {prob_false}"
        )));
    }
    // the quantile is taken at 1 - prob_false, which rounds to 1 below ~1.1e-16
    if 1.0 - prob_false >= 1.0 {
        return Err(BddError::Config(format!(
            "prob_false {prob_false:e} is too small: 1 - prob_false rounds to 1"
        )));
    }
    Ok(())
}

/// Result of one bad-data test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestOutcome {
    /// `statistic >= critical_value`
    pub exceeds_threshold: bool,
    /// Sum of normalized squared residuals `J`
    pub statistic: f64,
    pub critical_value: f64,
    pub dof: usize,
    pub prob_false: f64,
    /// `J - objective` when the solution carried a solver objective
    pub objective_gap: Option<f64>,
    pub residuals: Vec<ResidualRecord>,
}

impl TestOutcome {
    /// Whether the solver objective agrees with `J` within `rel_tol`.
    /// `None` when the solver reported no objective.
    pub fn objective_consistent(&self, rel_tol: f64) -> Option<bool> {
        self.objective_gap
            .map(|gap| gap.abs() <= rel_tol * (1.0 + self.statistic.abs()))
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let verdict = if self.exceeds_threshold {
            "bad data detected"
        } else {
            "no bad data detected"
        };
        write!(
            f,
            "{verdict}: J = {:.6} {} critical value {:.6} (dof {}, prob_false {})",
            self.statistic,
            if self.exceeds_threshold { ">=" } else { "<" },
            self.critical_value,
            self.dof,
            self.prob_false
        )
    }
}

/// Decision rule; the boundary counts as exceeding.
#[inline]
pub fn exceeds_threshold(statistic: f64, critical_value: f64) -> bool {
    statistic >= critical_value
}

/// Per-phase normalized squared residuals for every measurement, in
/// measurement order. Measurement ids must be unique.
pub fn normalized_residuals<S>(
    solution: &S,
    measurements: &MeasurementSet,
) -> BddResult<Vec<ResidualRecord>>
where
    S: SolutionLookup + ?Sized,
{
    let mut records = Vec::with_capacity(measurements.len());
    let mut seen = HashSet::with_capacity(measurements.len());
    for meas in measurements {
        if !seen.insert(meas.id) {
            return Err(BddError::Config(format!(
                "duplicate measurement id {}",
                meas.id.value()
            )));
        }
        let moments = meas.moments()?;
        let solved = solution.get_solution_value(meas.cmp, meas.cmp_id, &meas.var)?;

        let mut residuals = Vec::with_capacity(moments.len());
        for (phase, moment) in moments.iter().enumerate() {
            let h = *solved.get(phase).ok_or_else(|| BddError::Lookup {
                component: meas.cmp,
                id: meas.cmp_id,
                variable: meas.var.clone(),
                phase: Some(phase + 1),
            })?;
            residuals.push(((h - moment.mean) / moment.std).powi(2));
        }

        records.push(ResidualRecord {
            measurement: meas.id,
            cmp: meas.cmp,
            cmp_id: meas.cmp_id,
            var: meas.var.clone(),
            normalized_residuals: residuals,
        });
    }
    Ok(records)
}

/// Pure form of the test: nothing is written back into `solution`.
pub fn chi_squared_test<S>(
    solution: &S,
    network: &Network,
    measurements: &MeasurementSet,
    stats: &dyn StatsBackend,
    prob_false: f64,
) -> BddResult<TestOutcome>
where
    S: SolutionLookup + ?Sized,
{
    validate_prob_false(prob_false)?;
    let dof = compute_degrees_of_freedom(network, measurements)?;

    let residuals = normalized_residuals(solution, measurements)?;
    let statistic: f64 = residuals.iter().map(ResidualRecord::total).sum();
    if !statistic.is_finite() {
        return Err(BddError::Config(format!(
            "test statistic is not finite ({statistic}); check solved values"
        )));
    }

    let critical_value = stats.chi_squared_quantile(dof, 1.0 - prob_false)?;

    Ok(TestOutcome {
        exceeds_threshold: exceeds_threshold(statistic, critical_value),
        statistic,
        critical_value,
        dof,
        prob_false,
        objective_gap: solution.objective().map(|objective| statistic - objective),
        residuals,
    })
}

/// Run the test and record each measurement's residuals into `solution`.
///
/// The recomputed statistic is authoritative; a solver objective that
/// disagrees with it beyond `options.objective_tolerance` is logged, not
/// trusted.
pub fn evaluate_bad_data(
    solution: &mut Solution,
    network: &Network,
    measurements: &MeasurementSet,
    options: &Chi2Options,
) -> BddResult<TestOutcome> {
    options.validate()?;
    let backend = options.stats.build_backend();
    let outcome = chi_squared_test(
        &*solution,
        network,
        measurements,
        backend.as_ref(),
        options.prob_false,
    )?;

    if outcome.objective_consistent(options.objective_tolerance) == Some(false) {
        warn!(
            statistic = outcome.statistic,
            objective = ?solution.objective,
            "solver objective differs from the recomputed test statistic; using the recomputed value"
        );
    }

    solution.record_residuals(&outcome.residuals);

    if options.announce {
        info!("{outcome}");
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bdd_core::{
        Bus, BusId, BusType, ComponentKind, Distribution, Gen, GenId, Load, LoadId, Measurement,
        MeasurementId, NetworkData,
    };

    /// Backend returning a fixed critical value.
    struct Fixed(f64);

    impl StatsBackend for Fixed {
        fn chi_squared_quantile(&self, _dof: usize, _probability: f64) -> BddResult<f64> {
            Ok(self.0)
        }
    }

    fn network() -> Network {
        Network::from_data(NetworkData {
            buses: vec![
                Bus::new(BusId::new(1), "src", BusType::Reference),
                Bus::new(BusId::new(2), "load", BusType::Pq),
            ],
            loads: vec![Load::new(LoadId::new(1), "", BusId::new(2))],
            gens: vec![Gen::new(GenId::new(1), "", BusId::new(1))],
            ..NetworkData::default()
        })
        .unwrap()
    }

    // n = 2*2 - 1 = 3, m = 4, dof = 1
    fn case(offset: f64) -> (Solution, MeasurementSet) {
        let mut sol = Solution::new();
        sol.insert(ComponentKind::Bus, 1, "vm", vec![1.0]);
        sol.insert(ComponentKind::Bus, 2, "vm", vec![0.98]);
        sol.insert(ComponentKind::Load, 1, "pd", vec![0.5]);
        sol.insert(ComponentKind::Gen, 1, "pg", vec![0.52]);
        let meas: MeasurementSet = vec![
            Measurement::new(
                MeasurementId::new(1),
                ComponentKind::Bus,
                1,
                "vm",
                vec![Distribution::normal(1.0, 0.01)],
            ),
            Measurement::new(
                MeasurementId::new(2),
                ComponentKind::Bus,
                2,
                "vm",
                vec![Distribution::normal(0.98 + offset, 0.01)],
            ),
            Measurement::new(
                MeasurementId::new(3),
                ComponentKind::Load,
                1,
                "pd",
                vec![Distribution::normal(0.5, 0.02)],
            ),
            Measurement::new(
                MeasurementId::new(4),
                ComponentKind::Gen,
                1,
                "pg",
                vec![Distribution::normal(0.52, 0.02)],
            ),
        ]
        .into();
        (sol, meas)
    }

    #[test]
    fn residual_is_squared_standardized_error() {
        let (sol, meas) = case(0.03);
        let records = normalized_residuals(&sol, &meas).unwrap();
        assert_eq!(records.len(), 4);
        // (0.03 / 0.01)^2
        assert!((records[1].normalized_residuals[0] - 9.0).abs() < 1e-9);
        assert_eq!(records[0].normalized_residuals, vec![0.0]);
    }

    #[test]
    fn boundary_counts_as_exceeding() {
        let (sol, meas) = case(0.03);
        let j: f64 = normalized_residuals(&sol, &meas)
            .unwrap()
            .iter()
            .map(ResidualRecord::total)
            .sum();
        let outcome = chi_squared_test(&sol, &network(), &meas, &Fixed(j), 0.05).unwrap();
        assert_eq!(outcome.statistic, outcome.critical_value);
        assert!(outcome.exceeds_threshold);
        assert!(exceeds_threshold(1.0, 1.0));
        assert!(!exceeds_threshold(0.999, 1.0));
    }

    #[test]
    fn gross_error_is_detected() {
        // J = 9 > chi2(1, 0.95) = 3.84
        let (mut sol, meas) = case(0.03);
        let outcome =
            evaluate_bad_data(&mut sol, &network(), &meas, &Chi2Options::default().quiet())
                .unwrap();
        assert_eq!(outcome.dof, 1);
        assert!(outcome.exceeds_threshold);
        assert!((outcome.critical_value - 3.841_458_820_694_124).abs() < 1e-6);
    }

    #[test]
    fn small_error_passes() {
        // J = 1
        let (mut sol, meas) = case(0.01);
        let outcome =
            evaluate_bad_data(&mut sol, &network(), &meas, &Chi2Options::default().quiet())
                .unwrap();
        assert!(!outcome.exceeds_threshold);
        assert!((outcome.statistic - 1.0).abs() < 1e-9);
        assert!(outcome.to_string().starts_with("no bad data detected"));
    }

    #[test]
    fn residuals_are_recorded_into_solution() {
        let (mut sol, meas) = case(0.02);
        evaluate_bad_data(&mut sol, &network(), &meas, &Chi2Options::default().quiet()).unwrap();
        let recorded = sol.residuals_for(MeasurementId::new(2)).unwrap();
        assert!((recorded[0] - 4.0).abs() < 1e-9);
        assert_eq!(sol.measurements.len(), 4);
    }

    #[test]
    fn missing_phase_is_a_lookup_error() {
        let (sol, mut meas) = case(0.0);
        meas.push(Measurement::new(
            MeasurementId::new(5),
            ComponentKind::Bus,
            2,
            "vm",
            vec![Distribution::normal(0.98, 0.01); 2],
        ));
        let err = normalized_residuals(&sol, &meas).unwrap_err();
        assert!(matches!(
            err,
            BddError::Lookup {
                phase: Some(2),
                ..
            }
        ));
    }

    #[test]
    fn prob_false_outside_unit_interval_is_rejected() {
        let (sol, meas) = case(0.0);
        for p in [0.0, 1.0, -0.5, 2.0, f64::NAN] {
            let err = chi_squared_test(&sol, &network(), &meas, &Fixed(1.0), p).unwrap_err();
            assert!(err.is_config(), "p={p}");
        }
        assert!(Chi2Options::default().with_prob_false(1.0).validate().is_err());
    }

    #[test]
    fn prob_false_below_double_resolution_is_rejected() {
        let (sol, meas) = case(0.0);
        let err = chi_squared_test(&sol, &network(), &meas, &Fixed(1.0), 1e-17).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("too small"), "{err}");
        assert!(chi_squared_test(&sol, &network(), &meas, &Fixed(1.0), 1e-15).is_ok());
    }

    #[test]
    fn duplicate_measurement_ids_are_rejected() {
        let (mut sol, mut meas) = case(0.0);
        meas.push(Measurement::new(
            MeasurementId::new(3),
            ComponentKind::Bus,
            1,
            "vm",
            vec![Distribution::normal(1.0, 0.01)],
        ));
        let err = evaluate_bad_data(&mut sol, &network(), &meas, &Chi2Options::default().quiet())
            .unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("duplicate measurement id 3"));
        assert!(sol.measurements.is_empty());
    }

    #[test]
    fn objective_gap_is_reported() {
        let (sol, meas) = case(0.01);
        let sol = sol.with_objective(1.0);
        let outcome = chi_squared_test(&sol, &network(), &meas, &Fixed(3.84), 0.05).unwrap();
        assert!(outcome.objective_gap.unwrap().abs() < 1e-9);
        assert_eq!(outcome.objective_consistent(1e-6), Some(true));

        let (sol, meas) = case(0.01);
        let sol = sol.with_objective(0.5);
        let outcome = chi_squared_test(&sol, &network(), &meas, &Fixed(3.84), 0.05).unwrap();
        assert_eq!(outcome.objective_consistent(1e-6), Some(false));
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: Chi2Options = toml::from_str("prob_false = 0.01\nstats = \"series\"").unwrap();
        assert_eq!(opts.prob_false, 0.01);
        assert_eq!(opts.stats, StatsKind::Series);
        assert!(opts.announce);
        assert_eq!(opts.objective_tolerance, 1e-6);
    }
}
