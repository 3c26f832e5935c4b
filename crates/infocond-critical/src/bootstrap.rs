// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Bootstrap Confidence Intervals
// ─────────────────────────────────────────────────────────────────────
//! Percentile bootstrap for ρ_c.
//!
//! Cached mode (default): for each of B resamples, draw every ρ point's
//! raw samples with replacement, rebuild the mean curve and relocate the
//! derivative peak. No lattice is simulated.
//!
//! Fresh-simulation mode (opt-in): every resample re-runs the whole sweep
//! with an offset seed. Orders of magnitude more expensive.
//!
//! Resample b draws from its own ChaCha stream keyed by `seed + b`, so
//! the interval does not depend on how rayon schedules the batch.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use infocond_sweep::SweepOrchestrator;
use infocond_types::{
    BootstrapConfig, CriticalPointEstimate, LatticeError, LatticeResult, SweepResult,
};

use crate::detector::CriticalPointDetector;

/// Linear-interpolation percentile of ascending `sorted`, `q ∈ [0, 1]`.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = (lo + 1).min(n - 1);
            let frac = pos - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

/// Bootstrap validator for critical-point estimates.
#[derive(Debug, Clone)]
pub struct BootstrapValidator {
    config: BootstrapConfig,
    detector: CriticalPointDetector,
}

impl BootstrapValidator {
    pub fn new(config: BootstrapConfig) -> LatticeResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            detector: CriticalPointDetector::new(),
        })
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    /// ρ_c of `metric` with a percentile interval from cached raw samples.
    pub fn confidence_interval(
        &self,
        result: &SweepResult,
        metric: &str,
    ) -> LatticeResult<CriticalPointEstimate> {
        let point = self.detector.locate(result, metric)?;
        let sets = result.sample_sets(metric)?;
        if let Some((rho, _)) = sets.iter().find(|(_, s)| s.is_empty()) {
            log::warn!("bootstrap: no raw samples for '{metric}' at rho = {rho}");
            return Err(LatticeError::InsufficientData {
                required: 1,
                got: 0,
            });
        }
        if sets.iter().all(|(_, s)| s.len() == 1) {
            log::warn!(
                "bootstrap: one sample per rho for '{metric}', interval collapses to the point estimate"
            );
        }

        let seed = self.config.seed;
        let draws: Vec<f64> = (0..self.config.resamples)
            .into_par_iter()
            .map(|b| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(b as u64));
                let curve: Vec<(f64, f64)> = sets
                    .iter()
                    .map(|(rho, samples)| {
                        let n = samples.len();
                        let sum: f64 = (0..n).map(|_| samples[rng.random_range(0..n)]).sum();
                        (*rho, sum / n as f64)
                    })
                    .collect();
                self.detector.locate_curve(&curve).map(|(rho_c, _)| rho_c)
            })
            .collect::<LatticeResult<_>>()?;

        Ok(self.interval(point, draws))
    }

    /// ρ_c with an interval from B fresh sweeps of `lattice_size`.
    ///
    /// Fails with `Config` unless `fresh_simulation` is enabled.
    pub fn revalidate_by_simulation(
        &self,
        orchestrator: &SweepOrchestrator,
        lattice_size: usize,
        metric: &str,
    ) -> LatticeResult<CriticalPointEstimate> {
        if !self.config.fresh_simulation {
            return Err(LatticeError::Config(
                "fresh-simulation bootstrap is disabled; set bootstrap.fresh_simulation".to_string(),
            ));
        }
        log::info!(
            "bootstrap: re-running {} sweeps of L={lattice_size} for '{metric}'",
            self.config.resamples
        );
        let base = orchestrator.run_size(lattice_size)?;
        let point = self.detector.locate(&base, metric)?;

        let base_seed = orchestrator.base_seed();
        let draws: Vec<f64> = (0..self.config.resamples)
            .into_par_iter()
            .map(|b| {
                let seed = base_seed.wrapping_add(self.config.seed).wrapping_add(b as u64 + 1);
                let result = orchestrator.reseeded(seed).run_size(lattice_size)?;
                self.detector.locate(&result, metric).map(|e| e.rho_c)
            })
            .collect::<LatticeResult<_>>()?;

        Ok(self.interval(point, draws))
    }

    fn interval(&self, point: CriticalPointEstimate, mut draws: Vec<f64>) -> CriticalPointEstimate {
        draws.sort_by(f64::total_cmp);
        let alpha = (1.0 - self.config.confidence) / 2.0;
        let estimate = CriticalPointEstimate {
            ci_low: percentile(&draws, alpha),
            ci_high: percentile(&draws, 1.0 - alpha),
            resamples: draws.len(),
            ..point
        };
        log::debug!(
            "bootstrap '{}' L={}: ρ_c = {:.4}, CI [{:.4}, {:.4}] from {} resamples",
            estimate.metric,
            estimate.lattice_size,
            estimate.rho_c,
            estimate.ci_low,
            estimate.ci_high,
            estimate.resamples
        );
        estimate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use infocond_types::{
        linspace, BackendConfig, BackendPreference, MetricKind, SimulationConfig, SweepConfig,
        SweepPoint,
    };

    fn synthetic(samples: impl Fn(usize, f64) -> Vec<f64>) -> SweepResult {
        let points = linspace(0.0, 1.0, 9)
            .into_iter()
            .enumerate()
            .map(|(i, rho)| {
                let s = samples(i, rho);
                let mut p = SweepPoint {
                    rho,
                    ..SweepPoint::default()
                };
                p.values.insert("m".to_string(), s.iter().sum::<f64>() / s.len() as f64);
                p.samples.insert("m".to_string(), s);
                p
            })
            .collect();
        SweepResult {
            lattice_size: 10,
            dimensions: 2,
            points,
        }
    }

    /// Logistic step centred at ρ = 0.5.
    fn step(rho: f64) -> f64 {
        1.0 / (1.0 + (-(rho - 0.5) * 30.0).exp())
    }

    #[test]
    fn test_percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 1.0), 5.0);
        assert_eq!(percentile(&v, 0.5), 3.0);
        assert!((percentile(&v, 0.125) - 1.5).abs() < 1e-12);
        assert!(percentile(&[], 0.5).is_nan());
    }

    #[test]
    fn test_too_few_resamples_rejected() {
        let cfg = BootstrapConfig {
            resamples: 99,
            ..BootstrapConfig::default()
        };
        assert!(matches!(
            BootstrapValidator::new(cfg),
            Err(LatticeError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_zero_variance_gives_zero_width() {
        let result = synthetic(|_, rho| vec![step(rho); 6]);
        let v = BootstrapValidator::new(BootstrapConfig::default()).unwrap();
        let est = v.confidence_interval(&result, "m").unwrap();
        assert_eq!(est.ci_width(), 0.0);
        assert_eq!(est.ci_low, est.rho_c);
        assert_eq!(est.rho_c, 0.5);
        assert_eq!(est.resamples, 1000);
    }

    #[test]
    fn test_noisy_samples_bracket_point_estimate() {
        // deterministic jitter, symmetric around the step curve
        let jitter = [-0.02, 0.015, -0.01, 0.0, 0.01, -0.015, 0.02, 0.005];
        let result = synthetic(|i, rho| {
            jitter.iter().map(|j| step(rho) + j * (1.0 + (i % 3) as f64)).collect()
        });
        let v = BootstrapValidator::new(BootstrapConfig {
            resamples: 400,
            ..BootstrapConfig::default()
        })
        .unwrap();
        let est = v.confidence_interval(&result, "m").unwrap();
        assert!(est.ci_low <= est.ci_high);
        assert!(est.contains(0.5), "CI [{}, {}]", est.ci_low, est.ci_high);
    }

    #[test]
    fn test_same_seed_same_interval() {
        let jitter = [-0.05, 0.05, 0.0, 0.03];
        let result = synthetic(|_, rho| jitter.iter().map(|j| rho * rho + j).collect());
        let v = BootstrapValidator::new(BootstrapConfig::default()).unwrap();
        let a = v.confidence_interval(&result, "m").unwrap();
        let b = v.confidence_interval(&result, "m").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_missing_samples_rejected() {
        let mut result = synthetic(|_, rho| vec![rho]);
        result.points[2].samples.insert("m".to_string(), Vec::new());
        let v = BootstrapValidator::new(BootstrapConfig::default()).unwrap();
        assert!(matches!(
            v.confidence_interval(&result, "m"),
            Err(LatticeError::InsufficientData { .. })
        ));
    }

    fn tiny_sweep() -> SimulationConfig {
        SimulationConfig {
            backend: BackendConfig {
                preference: BackendPreference::Sequential,
                allow_fallback: true,
            },
            sweep: SweepConfig {
                rho_min: 0.0,
                rho_max: 1.0,
                steps_count: 4,
                iterations: 3,
                lattice_sizes: vec![4],
                metrics: vec![MetricKind::Gradient],
                ..SweepConfig::default()
            },
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn test_fresh_simulation_is_opt_in() {
        let orch = SweepOrchestrator::new(&tiny_sweep()).unwrap();
        let v = BootstrapValidator::new(BootstrapConfig::default()).unwrap();
        assert!(matches!(
            v.revalidate_by_simulation(&orch, 4, "gradient"),
            Err(LatticeError::Config(_))
        ));
    }

    #[test]
    fn test_fresh_simulation_interval() {
        let orch = SweepOrchestrator::new(&tiny_sweep()).unwrap();
        let v = BootstrapValidator::new(BootstrapConfig {
            resamples: 100,
            fresh_simulation: true,
            ..BootstrapConfig::default()
        })
        .unwrap();
        let est = v.revalidate_by_simulation(&orch, 4, "gradient").unwrap();
        assert_eq!(est.resamples, 100);
        assert!(est.ci_low <= est.ci_high);
        assert!((0.0..=1.0).contains(&est.ci_low) && (0.0..=1.0).contains(&est.ci_high));
    }
}
