// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Result Records
// ─────────────────────────────────────────────────────────────────────
//! In-memory records handed to external collaborators: conductivity
//! series, sweep results, critical-point and scaling estimates.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::ScalingMode;
use crate::error::{LatticeError, LatticeResult};

/// Replace a non-finite value with `fallback`, logging the substitution.
#[inline]
pub fn finite_or(value: f64, fallback: f64, context: &str) -> f64 {
    if value.is_finite() {
        value
    } else {
        log::warn!("{context}: non-finite value {value}, using {fallback:.4}");
        fallback
    }
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance; exactly 0.0 for fewer than two values or a
/// constant slice.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 || values.iter().all(|v| *v == values[0]) {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// One observation of one metric at one timestep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConductivitySample {
    pub timestep: u64,
    pub metric: String,
    pub value: f64,
}

/// Append-only per-metric time series of a single run.
///
/// Holds `steps + 1` values once a run completes (step 0 included).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConductivitySeries {
    pub metric: String,
    pub values: Vec<f64>,
}

impl ConductivitySeries {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            values: Vec::new(),
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Samples with their timestep, in order.
    pub fn samples(&self) -> impl Iterator<Item = ConductivitySample> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(t, &value)| ConductivitySample {
                timestep: t as u64,
                metric: self.metric.clone(),
                value,
            })
    }

    /// The trailing `window` values (fewer if the series is shorter).
    pub fn tail(&self, window: usize) -> &[f64] {
        let start = self.values.len().saturating_sub(window);
        &self.values[start..]
    }

    pub fn summary(&self) -> SeriesSummary {
        SeriesSummary::from_values(&self.values)
    }
}

/// Scalar digest of a conductivity series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub final_value: f64,
    pub mean: f64,
    /// Final minus initial value.
    pub trend: f64,
    pub variance: f64,
}

impl SeriesSummary {
    pub fn from_values(values: &[f64]) -> Self {
        match (values.first(), values.last()) {
            (Some(&first), Some(&last)) => Self {
                final_value: last,
                mean: mean(values),
                trend: last - first,
                variance: variance(values),
            },
            _ => Self::default(),
        }
    }
}

/// Aggregated observables of all runs at one ρ.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub rho: f64,
    /// Observable name → mean of its raw samples.
    pub values: BTreeMap<String, f64>,
    /// Observable name → raw samples (replicates × measurement window).
    pub samples: BTreeMap<String, Vec<f64>>,
    /// Observable name → digest of the first replicate's series.
    pub summaries: BTreeMap<String, SeriesSummary>,
    /// Observable name → full series of the first replicate (only when recorded).
    pub series: BTreeMap<String, Vec<f64>>,
    /// `N · var(mean activity)` over the measurement window, averaged over replicates.
    pub susceptibility: f64,
}

/// Flat record of one (size, ρ) pair, the sole artifact for plotting/reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRecord {
    pub lattice_size: usize,
    pub rho: f64,
    pub values: BTreeMap<String, f64>,
}

/// All ρ points of one lattice size, in sweep (ascending ρ) order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepResult {
    pub lattice_size: usize,
    pub dimensions: usize,
    pub points: Vec<SweepPoint>,
}

impl SweepResult {
    pub fn rhos(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.rho).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Number of cells of each lattice in this result.
    pub fn n_cells(&self) -> usize {
        self.lattice_size.pow(self.dimensions as u32)
    }

    /// Observable names present in every point.
    pub fn observables(&self) -> Vec<String> {
        self.points
            .first()
            .map(|p| p.values.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Reject empty results and non-ascending ρ.
    pub fn ensure_ordered(&self) -> LatticeResult<()> {
        if self.points.is_empty() {
            return Err(LatticeError::InsufficientData {
                required: 1,
                got: 0,
            });
        }
        if self.points.windows(2).any(|w| !(w[1].rho > w[0].rho)) {
            return Err(LatticeError::InvalidSweepRange(
                "sweep points must be strictly ascending in rho".to_string(),
            ));
        }
        Ok(())
    }

    /// `(ρ, value)` pairs of one observable.
    pub fn curve(&self, observable: &str) -> LatticeResult<Vec<(f64, f64)>> {
        self.points
            .iter()
            .map(|p| {
                p.values
                    .get(observable)
                    .map(|&v| (p.rho, v))
                    .ok_or_else(|| missing_observable(observable, p.rho))
            })
            .collect()
    }

    /// `(ρ, raw samples)` pairs of one observable.
    pub fn sample_sets(&self, observable: &str) -> LatticeResult<Vec<(f64, &[f64])>> {
        self.points
            .iter()
            .map(|p| {
                p.samples
                    .get(observable)
                    .map(|s| (p.rho, s.as_slice()))
                    .ok_or_else(|| missing_observable(observable, p.rho))
            })
            .collect()
    }

    pub fn susceptibility_curve(&self) -> Vec<(f64, f64)> {
        self.points.iter().map(|p| (p.rho, p.susceptibility)).collect()
    }

    /// Point whose ρ matches within 1e-12.
    pub fn point_at(&self, rho: f64) -> Option<&SweepPoint> {
        self.points.iter().find(|p| (p.rho - rho).abs() <= 1e-12)
    }

    pub fn records(&self) -> Vec<SweepRecord> {
        self.points
            .iter()
            .map(|p| SweepRecord {
                lattice_size: self.lattice_size,
                rho: p.rho,
                values: p.values.clone(),
            })
            .collect()
    }
}

fn missing_observable(observable: &str, rho: f64) -> LatticeError {
    LatticeError::InvalidParameter(format!(
        "observable '{observable}' missing at rho = {rho}"
    ))
}

/// Located critical point of one metric at one lattice size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalPointEstimate {
    pub metric: String,
    pub lattice_size: usize,
    pub rho_c: f64,
    /// |dM/dρ| at `rho_c`.
    pub derivative_magnitude: f64,
    pub ci_low: f64,
    pub ci_high: f64,
    /// Bootstrap resamples behind the interval (0 = point estimate only).
    pub resamples: usize,
}

impl CriticalPointEstimate {
    pub fn ci_width(&self) -> f64 {
        self.ci_high - self.ci_low
    }

    pub fn contains(&self, rho: f64) -> bool {
        (self.ci_low..=self.ci_high).contains(&rho)
    }
}

/// Susceptibility exponent γ from χ ∝ |ρ − ρ_c|^(−γ) around the χ peak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SusceptibilityExponent {
    pub lattice_size: usize,
    /// ρ of the susceptibility peak.
    pub rho_c: f64,
    pub gamma: f64,
    pub standard_error: f64,
    /// Points entering the log-log fit (peak excluded).
    pub n_points: usize,
}

/// Standard errors of the scaling fit; `None` without residual degrees of freedom.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardErrors {
    pub rho_c_infinite: Option<f64>,
    pub amplitude: Option<f64>,
    pub nu: Option<f64>,
}

/// Finite-size extrapolated critical point and exponent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalingEstimate {
    pub metric: String,
    pub rho_c_infinite: f64,
    pub amplitude: f64,
    pub nu: f64,
    pub standard_errors: StandardErrors,
    pub residual_sum_squares: f64,
    pub n_points: usize,
    pub mode: ScalingMode,
}
