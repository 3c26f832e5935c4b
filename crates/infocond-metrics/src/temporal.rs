// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Temporal Observables
// ─────────────────────────────────────────────────────────────────────
//! Observables over sequences of snapshots or scalar series.

use serde::{Deserialize, Serialize};

use infocond_lattice::Lattice;
use infocond_types::record::{mean, variance};
use infocond_types::LatticeResult;

use crate::spatial;

const TE_EPSILON: f64 = 1e-12;

/// Scalar reduction applied per snapshot in a temporal series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalarObservable {
    Simple,
    Entropy { bins: usize },
    Gradient,
    Variance,
    GaussianEntropy,
}

impl ScalarObservable {
    pub fn evaluate(&self, grid: &Lattice) -> LatticeResult<f64> {
        Ok(match *self {
            Self::Simple => spatial::simple(grid),
            Self::Entropy { bins } => spatial::entropy(grid, bins)?,
            Self::Gradient => spatial::gradient(grid),
            Self::Variance => spatial::variance(grid),
            Self::GaussianEntropy => spatial::gaussian_entropy(grid),
        })
    }
}

/// Apply `observable` to every snapshot of `history`, in order.
pub fn temporal_series<'a, I>(history: I, observable: ScalarObservable) -> LatticeResult<Vec<f64>>
where
    I: IntoIterator<Item = &'a Lattice>,
{
    history
        .into_iter()
        .map(|grid| observable.evaluate(grid))
        .collect()
}

/// Fluctuation susceptibility χ = N · var(series) of a mean-activity series.
pub fn susceptibility(series: &[f64], n_cells: usize) -> f64 {
    n_cells as f64 * variance(series)
}

/// Pearson correlation; `None` when either side has no spread.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let (mx, my) = (mean(x), mean(y));
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let (dx, dy) = (a - mx, b - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    let r = sxy / (sxx * syy).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Correlation-based transfer-entropy proxy from `source` to `target`:
///
///   TE ≈ −ln(1 − r² + ε),  r = corr(Δsource(t), Δtarget(t + lag))
///
/// Returns 0 when the series are too short or the correlation is undefined.
pub fn transfer_entropy_approx(source: &[f64], target: &[f64], lag: usize) -> f64 {
    if source.len() <= lag + 1 || target.len() <= lag + 1 {
        return 0.0;
    }
    let ds: Vec<f64> = source.windows(2).map(|w| w[1] - w[0]).collect();
    let dt: Vec<f64> = target.windows(2).map(|w| w[1] - w[0]).collect();
    let m = ds.len().min(dt.len());
    if m <= lag {
        return 0.0;
    }
    match pearson(&ds[..m - lag], &dt[lag..m]) {
        Some(r) => (-(1.0 - r * r + TE_EPSILON).ln()).max(0.0),
        None => 0.0,
    }
}
