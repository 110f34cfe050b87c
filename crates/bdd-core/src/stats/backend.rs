use crate::error::{BddError, BddResult};
use statrs::distribution::{ChiSquared, Continuous, ContinuousCDF};

/// Trait for the statistical functions the bad-data test needs.
///
/// Only the Chi-squared quantile is required; implementations must reject
/// `dof == 0` and probabilities outside the open interval `(0, 1)`.
pub trait StatsBackend: Send + Sync {
    /// Inverse CDF of a Chi-squared distribution with `dof` degrees of freedom.
    fn chi_squared_quantile(&self, dof: usize, probability: f64) -> BddResult<f64>;
}

fn check_quantile_args(dof: usize, probability: f64) -> BddResult<()> {
    if dof == 0 {
        return Err(BddError::Config(
            "Chi-squared quantile needs at least one degree of freedom".into(),
        ));
    }
    if !(probability > 0.0 && probability < 1.0) {
        return Err(BddError::Config(format!(
            "Chi-squared quantile probability must lie in (0, 1), got {probability}"
        )));
    }
    Ok(())
}

/// Backed by `statrs::distribution::ChiSquared`.
#[derive(Debug, Clone, Default)]
pub struct StatrsBackend;

impl StatsBackend for StatrsBackend {
    fn chi_squared_quantile(&self, dof: usize, probability: f64) -> BddResult<f64> {
        check_quantile_args(dof, probability)?;
        let dist = ChiSquared::new(dof as f64).map_err(|e| {
            BddError::Config(format!("Chi-squared distribution with {dof} dof: {e}"))
        })?;

        // statrs' generic inverse_cdf is a short bisection; use it as the
        // starting point and refine on a bracket.
        let seed = dist.inverse_cdf(probability);
        let seed = if seed.is_finite() && seed > 0.0 {
            seed
        } else {
            dof as f64
        };
        let (lo, hi) = bracket(|x| dist.cdf(x), probability, seed, dof)?;
        Ok(refine_quantile(
            |x| dist.cdf(x),
            |x| dist.pdf(x),
            probability,
            lo,
            hi,
            seed,
        ))
    }
}

/// Grow `[lo, hi]` from `start` until `cdf(hi) >= probability`.
fn bracket<F>(cdf: F, probability: f64, start: f64, dof: usize) -> BddResult<(f64, f64)>
where
    F: Fn(f64) -> f64,
{
    let mut lo = 0.0;
    let mut hi = start;
    let mut expansions = 0;
    while cdf(hi) < probability {
        lo = hi;
        hi *= 2.0;
        expansions += 1;
        if expansions > 1_000 {
            return Err(BddError::Config(format!(
                "Chi-squared quantile did not bracket p={probability} for {dof} dof"
            )));
        }
    }
    Ok((lo, hi))
}

/// Newton on `[lo, hi]`, bisecting whenever a step leaves the bracket.
///
/// The stopping tolerance is relative to `x` so lower-tail quantiles far
/// below one are resolved too.
fn refine_quantile<F, D>(
    cdf: F,
    pdf: D,
    probability: f64,
    mut lo: f64,
    mut hi: f64,
    x0: f64,
) -> f64
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    let mut x = if x0 > lo && x0 < hi { x0 } else { 0.5 * (lo + hi) };
    for _ in 0..500 {
        let f = cdf(x) - probability;
        if f == 0.0 {
            break;
        }
        if f < 0.0 {
            lo = x;
        } else {
            hi = x;
        }
        let density = pdf(x);
        let mut next = if density.is_finite() && density > 0.0 {
            x - f / density
        } else {
            f64::NAN
        };
        if !(next > lo && next < hi) {
            next = 0.5 * (lo + hi);
        }
        let converged = (next - x).abs() <= 1e-14 * next;
        x = next;
        if converged || hi - lo <= 1e-15 * hi {
            break;
        }
    }
    x
}

/// Self-contained series / continued-fraction implementation.
#[derive(Debug, Clone, Default)]
pub struct SeriesBackend;

const EPS: f64 = 1e-15;
const FPMIN: f64 = 1e-300;
const MAX_TERMS: usize = 500;

/// Iteration cap for the incomplete gamma; both expansions need O(sqrt(a))
/// terms around `x ~ a`.
fn max_terms(a: f64) -> usize {
    MAX_TERMS + 20 * a.sqrt() as usize
}

/// Lanczos approximation (g = 7, n = 9).
fn ln_gamma(z: f64) -> f64 {
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if z < 0.5 {
        // reflection
        let pi = std::f64::consts::PI;
        return (pi / (pi * z).sin()).ln() - ln_gamma(1.0 - z);
    }
    let z = z - 1.0;
    let t = z + 7.5;
    let mut acc = COEFFS[0];
    for (i, c) in COEFFS.iter().enumerate().skip(1) {
        acc += c / (z + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (z + 0.5) * t.ln() - t + acc.ln()
}

/// Regularized lower incomplete gamma `P(a, x)`.
fn gamma_p(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let prefactor = (-x + a * x.ln() - ln_gamma(a)).exp();
    let limit = max_terms(a);
    if x < a + 1.0 {
        let mut ap = a;
        let mut term = 1.0 / a;
        let mut sum = term;
        for _ in 0..limit {
            ap += 1.0;
            term *= x / ap;
            sum += term;
            if term.abs() < sum.abs() * EPS {
                break;
            }
        }
        (sum * prefactor).min(1.0)
    } else {
        // Lentz evaluation of the continued fraction for Q(a, x)
        let mut b = x + 1.0 - a;
        let mut c = 1.0 / FPMIN;
        let mut d = 1.0 / b;
        let mut h = d;
        for i in 1..=limit {
            let an = -(i as f64) * (i as f64 - a);
            b += 2.0;
            d = an * d + b;
            if d.abs() < FPMIN {
                d = FPMIN;
            }
            c = b + an / c;
            if c.abs() < FPMIN {
                c = FPMIN;
            }
            d = 1.0 / d;
            let delta = d * c;
            h *= delta;
            if (delta - 1.0).abs() < EPS {
                break;
            }
        }
        (1.0 - prefactor * h).max(0.0)
    }
}

fn chi_squared_cdf(k: f64, x: f64) -> f64 {
    gamma_p(0.5 * k, 0.5 * x)
}

fn chi_squared_pdf(k: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    let half_k = 0.5 * k;
    ((half_k - 1.0) * x.ln() - 0.5 * x - half_k * std::f64::consts::LN_2 - ln_gamma(half_k)).exp()
}

impl StatsBackend for SeriesBackend {
    fn chi_squared_quantile(&self, dof: usize, probability: f64) -> BddResult<f64> {
        check_quantile_args(dof, probability)?;
        let k = dof as f64;

        let (lo, hi) = bracket(|x| chi_squared_cdf(k, x), probability, k.max(1.0), dof)?;
        Ok(refine_quantile(
            |x| chi_squared_cdf(k, x),
            |x| chi_squared_pdf(k, x),
            probability,
            lo,
            hi,
            k,
        ))
    }
}
