// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Configuration
// ─────────────────────────────────────────────────────────────────────

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LatticeError, LatticeResult};

/// Boundary handling for face-adjacent neighbours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Boundary {
    /// Wrap-around indices (torus).
    #[default]
    Periodic,
    /// Out-of-range neighbours are replaced by the cell itself (Neumann clamp).
    ZeroFlux,
}

/// How a freshly initialised lattice is filled.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FillPolicy {
    /// Independent U[0, 1) draws.
    #[default]
    Uniform,
    /// Every cell set to `value`.
    Constant { value: f64 },
    /// Normal draws clamped into [0, 1].
    Normal { mean: f64, std_dev: f64 },
    /// Beta(α, β) draws, already in [0, 1].
    Beta { alpha: f64, beta: f64 },
    /// Explicit row-major cell values.
    Values { values: Vec<f64> },
}

impl FillPolicy {
    pub fn validate(&self) -> LatticeResult<()> {
        match self {
            Self::Uniform => Ok(()),
            Self::Constant { value } => {
                if !(value.is_finite() && (0.0..=1.0).contains(value)) {
                    return Err(LatticeError::InvalidParameter(format!(
                        "constant fill must be in [0, 1], got {value}"
                    )));
                }
                Ok(())
            }
            Self::Normal { mean, std_dev } => {
                if !mean.is_finite() || !std_dev.is_finite() || *std_dev < 0.0 {
                    return Err(LatticeError::InvalidParameter(format!(
                        "normal fill needs finite mean and std_dev >= 0, got ({mean}, {std_dev})"
                    )));
                }
                Ok(())
            }
            Self::Beta { alpha, beta } => {
                if !(alpha.is_finite() && beta.is_finite() && *alpha > 0.0 && *beta > 0.0) {
                    return Err(LatticeError::InvalidParameter(format!(
                        "beta fill needs alpha > 0 and beta > 0, got ({alpha}, {beta})"
                    )));
                }
                Ok(())
            }
            Self::Values { values } => {
                if let Some(bad) = values
                    .iter()
                    .find(|v| !(v.is_finite() && (0.0..=1.0).contains(*v)))
                {
                    return Err(LatticeError::InvalidParameter(format!(
                        "explicit fill values must lie in [0, 1], found {bad}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Conductivity measurement definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Simple,
    Entropy,
    Gradient,
    Multiscale,
}

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Simple,
        MetricKind::Entropy,
        MetricKind::Gradient,
        MetricKind::Multiscale,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Entropy => "entropy",
            Self::Gradient => "gradient",
            Self::Multiscale => "multiscale",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MetricKind {
    type Err = LatticeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| LatticeError::Config(format!("unknown metric '{s}'")))
    }
}

/// Which update backend the engine should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendPreference {
    /// Parallel when the capability probe succeeds, sequential otherwise.
    #[default]
    Auto,
    Sequential,
    Parallel,
}

/// How each ρ run derives its seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPolicy {
    /// Every ρ run starts from the same initial lattice.
    #[default]
    Shared,
    /// Run `i` uses `seed + i`.
    PerRun,
}

/// Finite-size scaling model selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMode {
    /// Full fit with >= 3 distinct sizes, linear-in-1/L otherwise.
    #[default]
    Auto,
    /// ρ_c(L) = ρ_c(∞) + A / L (ν fixed at 1).
    Linear,
    /// ρ_c(L) = ρ_c(∞) + A · L^(−1/ν).
    Full,
}

/// Lattice construction input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    /// Extent per axis; rank 2 or 3.
    pub shape: Vec<usize>,
    pub boundary: Boundary,
    /// Key of the deterministic fill stream.
    pub seed: u64,
    pub fill: FillPolicy,
    /// Snapshots retained by the engine (0 = none).
    pub history_capacity: usize,
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            shape: vec![50, 50],
            boundary: Boundary::Periodic,
            seed: 42,
            fill: FillPolicy::Uniform,
            history_capacity: 0,
        }
    }
}

impl LatticeConfig {
    pub fn validate(&self) -> LatticeResult<()> {
        validate_shape(&self.shape)?;
        self.fill.validate()
    }
}

/// Shared rank/extent check for lattice shapes.
pub fn validate_shape(shape: &[usize]) -> LatticeResult<()> {
    if !(2..=3).contains(&shape.len()) {
        return Err(LatticeError::InvalidShape(format!(
            "lattice must be 2- or 3-dimensional, got rank {}",
            shape.len()
        )));
    }
    if let Some(axis) = shape.iter().position(|&d| d == 0) {
        return Err(LatticeError::InvalidShape(format!(
            "axis {axis} has zero extent in {shape:?}"
        )));
    }
    Ok(())
}

/// Backend selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub preference: BackendPreference,
    /// Fall back to the sequential backend when the parallel one is unusable.
    pub allow_fallback: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            preference: BackendPreference::Auto,
            allow_fallback: true,
        }
    }
}

/// Tunables of the conductivity metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Equal-width buckets over [0, 1] for the entropy metric.
    pub entropy_bins: usize,
    /// Block-averaging factors for the multiscale metric.
    pub scales: Vec<usize>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            entropy_bins: 10,
            scales: vec![1, 2, 4],
        }
    }
}

impl MetricsConfig {
    pub fn validate(&self) -> LatticeResult<()> {
        if self.entropy_bins < 1 {
            return Err(LatticeError::InvalidParameter(
                "entropy_bins must be >= 1".to_string(),
            ));
        }
        if self.scales.iter().any(|&s| s == 0) {
            return Err(LatticeError::InvalidParameter(format!(
                "multiscale factors must be >= 1, got {:?}",
                self.scales
            )));
        }
        Ok(())
    }
}

/// Coupling-strength sweep input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub rho_min: f64,
    pub rho_max: f64,
    /// Number of evenly spaced ρ values (bounds inclusive when > 1).
    pub steps_count: usize,
    /// Update steps per run.
    pub iterations: usize,
    /// Edge length L of each (L^d) lattice.
    pub lattice_sizes: Vec<usize>,
    /// Lattice rank d (2 or 3).
    pub dimensions: usize,
    pub metrics: Vec<MetricKind>,
    /// Independent repetitions per ρ, each with its own seed.
    pub replicates: usize,
    /// Trailing timesteps kept as raw samples (1 = terminal value only).
    /// `None` measures everything after the equilibration prefix.
    pub measurement_window: Option<usize>,
    /// Leading share of the `iterations` steps discarded before measuring
    /// when no explicit window is set.
    pub equilibration_fraction: f64,
    pub seed_policy: SeedPolicy,
    /// Keep the full conductivity series of every run.
    pub record_series: bool,
    /// Run independent ρ jobs on the rayon pool.
    pub parallel_runs: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            rho_min: 0.1,
            rho_max: 1.0,
            steps_count: 5,
            iterations: 100,
            lattice_sizes: vec![50],
            dimensions: 2,
            metrics: vec![MetricKind::Simple],
            replicates: 1,
            measurement_window: None,
            equilibration_fraction: 0.5,
            seed_policy: SeedPolicy::Shared,
            record_series: false,
            parallel_runs: true,
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> LatticeResult<()> {
        if self.steps_count < 1 {
            return Err(LatticeError::InvalidSweepRange(
                "steps_count must be >= 1".to_string(),
            ));
        }
        if !(self.rho_min.is_finite() && self.rho_max.is_finite()) {
            return Err(LatticeError::InvalidSweepRange(format!(
                "sweep bounds must be finite, got [{}, {}]",
                self.rho_min, self.rho_max
            )));
        }
        if self.rho_max < self.rho_min {
            return Err(LatticeError::InvalidSweepRange(format!(
                "rho_max {} < rho_min {}",
                self.rho_max, self.rho_min
            )));
        }
        if self.steps_count > 1 && self.rho_max == self.rho_min {
            return Err(LatticeError::InvalidSweepRange(format!(
                "{} rho values need rho_max > rho_min, got both = {}",
                self.steps_count, self.rho_min
            )));
        }
        if self.rho_min < 0.0 || self.rho_max > 1.0 {
            return Err(LatticeError::InvalidSweepRange(format!(
                "sweep bounds must lie in [0, 1], got [{}, {}]",
                self.rho_min, self.rho_max
            )));
        }
        if self.lattice_sizes.is_empty() {
            return Err(LatticeError::InvalidSweepRange(
                "at least one lattice size is required".to_string(),
            ));
        }
        let probe = vec![1; self.dimensions];
        validate_shape(&probe)?;
        if self.lattice_sizes.contains(&0) {
            return Err(LatticeError::InvalidShape(format!(
                "lattice sizes must be positive, got {:?}",
                self.lattice_sizes
            )));
        }
        if self.metrics.is_empty() {
            return Err(LatticeError::Config(
                "at least one metric is required".to_string(),
            ));
        }
        if self.replicates < 1 {
            return Err(LatticeError::Config("replicates must be >= 1".to_string()));
        }
        if !(0.0..1.0).contains(&self.equilibration_fraction) {
            return Err(LatticeError::Config(format!(
                "equilibration_fraction must be in [0, 1), got {}",
                self.equilibration_fraction
            )));
        }
        if let Some(window) = self.measurement_window {
            if window < 1 || window > self.iterations + 1 {
                return Err(LatticeError::Config(format!(
                    "measurement_window must be in [1, iterations + 1 = {}], got {window}",
                    self.iterations + 1
                )));
            }
        }
        Ok(())
    }

    /// Samples kept per run: the explicit window, else every timestep
    /// after the first `⌊equilibration_fraction · iterations⌋` steps.
    pub fn window(&self) -> usize {
        match self.measurement_window {
            Some(window) => window,
            None => {
                let discarded = (self.equilibration_fraction * self.iterations as f64).floor() as usize;
                self.iterations + 1 - discarded.min(self.iterations)
            }
        }
    }

    /// Evenly spaced ρ values, ascending.
    pub fn rho_values(&self) -> LatticeResult<Vec<f64>> {
        self.validate()?;
        Ok(linspace(self.rho_min, self.rho_max, self.steps_count))
    }
}

/// `n` evenly spaced values from `lo` to `hi` inclusive; `[lo]` when `n == 1`.
pub fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let span = hi - lo;
            let denom = (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { hi } else { lo + span * i as f64 / denom })
                .collect()
        }
    }
}

/// Bootstrap resampling of the critical point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Number of resamples B.
    pub resamples: usize,
    /// Two-sided coverage of the reported interval.
    pub confidence: f64,
    /// Key of the resampling streams.
    pub seed: u64,
    /// Re-run the physical simulation per resample instead of resampling cached samples.
    pub fresh_simulation: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            resamples: 1000,
            confidence: 0.95,
            seed: 7,
            fresh_simulation: false,
        }
    }
}

impl BootstrapConfig {
    pub const MIN_RESAMPLES: usize = 100;

    pub fn validate(&self) -> LatticeResult<()> {
        if self.resamples < Self::MIN_RESAMPLES {
            return Err(LatticeError::InvalidParameter(format!(
                "bootstrap needs at least {} resamples, got {}",
                Self::MIN_RESAMPLES,
                self.resamples
            )));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(LatticeError::InvalidParameter(format!(
                "confidence must be in (0, 1), got {}",
                self.confidence
            )));
        }
        Ok(())
    }
}

/// Finite-size scaling fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingConfig {
    pub mode: ScalingMode,
    /// Lower bound of the ν search interval.
    pub nu_min: f64,
    /// Upper bound of the ν search interval.
    pub nu_max: f64,
    /// Coarse grid points before golden-section refinement.
    pub grid_points: usize,
}

impl Default for ScalingConfig {
    fn default() -> Self {
        Self {
            mode: ScalingMode::Auto,
            nu_min: 0.2,
            nu_max: 20.0,
            grid_points: 400,
        }
    }
}

impl ScalingConfig {
    pub fn validate(&self) -> LatticeResult<()> {
        if !(self.nu_min.is_finite() && self.nu_max.is_finite())
            || self.nu_min <= 0.0
            || self.nu_max <= self.nu_min
        {
            return Err(LatticeError::InvalidParameter(format!(
                "need 0 < nu_min < nu_max, got [{}, {}]",
                self.nu_min, self.nu_max
            )));
        }
        if self.grid_points < 3 {
            return Err(LatticeError::InvalidParameter(format!(
                "grid_points must be >= 3, got {}",
                self.grid_points
            )));
        }
        Ok(())
    }
}

/// Complete configuration record, passed into each component at
/// construction and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub lattice: LatticeConfig,
    pub backend: BackendConfig,
    pub metrics: MetricsConfig,
    pub sweep: SweepConfig,
    pub bootstrap: BootstrapConfig,
    pub scaling: ScalingConfig,
}

impl SimulationConfig {
    pub fn validate(&self) -> LatticeResult<()> {
        self.lattice.validate()?;
        self.metrics.validate()?;
        self.sweep.validate()?;
        self.bootstrap.validate()?;
        self.scaling.validate()
    }

    /// Load from JSON string; missing fields take their defaults.
    pub fn from_json(json: &str) -> LatticeResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| LatticeError::Config(format!("JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> LatticeResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| LatticeError::Config(format!("JSON encode error: {e}")))
    }
}
