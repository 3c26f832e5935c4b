// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Observable Sets & Series Recording
// ─────────────────────────────────────────────────────────────────────
//! Named observables for a requested metric set, and a recorder that
//! turns an engine run into per-observable conductivity series.
//!
//! Names: `simple`, `entropy`, `gradient`, and for multiscale
//! `multiscale.s{scale}.entropy` / `multiscale.s{scale}.gradient`.

use std::collections::BTreeMap;

use infocond_lattice::{Lattice, UpdateEngine};
use infocond_types::record::finite_or;
use infocond_types::{ConductivitySeries, LatticeError, LatticeResult, MetricKind, MetricsConfig};

use crate::spatial;

/// Observable name of one multiscale component.
pub fn multiscale_name(scale: usize, component: &str) -> String {
    format!("multiscale.s{scale}.{component}")
}

/// A validated, de-duplicated set of metrics with their tunables.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSet {
    kinds: Vec<MetricKind>,
    bins: usize,
    scales: Vec<usize>,
}

impl MetricSet {
    pub fn new(kinds: &[MetricKind], config: &MetricsConfig) -> LatticeResult<Self> {
        config.validate()?;
        if kinds.is_empty() {
            return Err(LatticeError::Config(
                "metric set must not be empty".to_string(),
            ));
        }
        let mut unique = kinds.to_vec();
        unique.sort();
        unique.dedup();
        Ok(Self {
            kinds: unique,
            bins: config.entropy_bins,
            scales: config.scales.clone(),
        })
    }

    pub fn kinds(&self) -> &[MetricKind] {
        &self.kinds
    }

    /// Every observable of one snapshot, in stable order. A non-finite
    /// value is reported as 0.
    pub fn evaluate(&self, grid: &Lattice) -> LatticeResult<Vec<(String, f64)>> {
        let mut out = Vec::with_capacity(self.kinds.len() + 2 * self.scales.len());
        for kind in &self.kinds {
            match kind {
                MetricKind::Simple => out.push((kind.name().to_string(), spatial::simple(grid))),
                MetricKind::Entropy => {
                    out.push((kind.name().to_string(), spatial::entropy(grid, self.bins)?))
                }
                MetricKind::Gradient => {
                    out.push((kind.name().to_string(), spatial::gradient(grid)))
                }
                MetricKind::Multiscale => {
                    for (scale, m) in spatial::multiscale(grid, &self.scales, self.bins)? {
                        out.push((multiscale_name(scale, "entropy"), m.entropy));
                        out.push((multiscale_name(scale, "gradient"), m.gradient));
                    }
                }
            }
        }
        for (name, value) in out.iter_mut() {
            *value = finite_or(*value, 0.0, name);
        }
        Ok(out)
    }
}

/// Series of one run: one entry per observable, plus the cell activity
/// which is always tracked for susceptibility.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordedRun {
    pub series: BTreeMap<String, ConductivitySeries>,
    /// Mean absolute per-cell change between consecutive snapshots; one
    /// value per step, so one shorter than the observable series.
    pub activity: ConductivitySeries,
}

impl RecordedRun {
    /// Number of snapshots observed (steps + 1 after a full run).
    pub fn len(&self) -> usize {
        self.series.values().next().map_or(0, ConductivitySeries::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mean absolute per-cell difference of two equally sized snapshots.
pub fn cell_activity(previous: &[f64], current: &[f64]) -> f64 {
    if current.is_empty() {
        return 0.0;
    }
    let total: f64 = previous
        .iter()
        .zip(current)
        .map(|(a, b)| (b - a).abs())
        .sum();
    total / current.len() as f64
}

/// Accumulates observables sample by sample; feed it from
/// `UpdateEngine::try_run`.
#[derive(Debug)]
pub struct SeriesRecorder<'m> {
    metrics: &'m MetricSet,
    run: RecordedRun,
    previous: Option<Vec<f64>>,
}

impl<'m> SeriesRecorder<'m> {
    pub fn new(metrics: &'m MetricSet) -> Self {
        Self {
            metrics,
            run: RecordedRun {
                series: BTreeMap::new(),
                activity: ConductivitySeries::new("activity"),
            },
            previous: None,
        }
    }

    /// Record every observable of `grid`.
    pub fn observe(&mut self, _timestep: u64, grid: &Lattice) -> LatticeResult<()> {
        let values = self.metrics.evaluate(grid)?;
        for (name, value) in values {
            self.run
                .series
                .entry(name.clone())
                .or_insert_with(|| ConductivitySeries::new(name))
                .push(value);
        }
        match &mut self.previous {
            Some(prev) => {
                self.run.activity.push(cell_activity(prev, grid.values()));
                prev.copy_from_slice(grid.values());
            }
            None => self.previous = Some(grid.values().to_vec()),
        }
        Ok(())
    }

    pub fn finish(self) -> RecordedRun {
        self.run
    }
}

/// Run `engine` for `steps` at ρ and record every observable, step 0
/// included. A metric failure aborts the run.
pub fn record_run(
    engine: &mut UpdateEngine,
    steps: u64,
    rho: f64,
    metrics: &MetricSet,
) -> LatticeResult<RecordedRun> {
    let mut recorder = SeriesRecorder::new(metrics);
    engine.try_run(steps, rho, |t, grid| recorder.observe(t, grid))?;
    Ok(recorder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use infocond_types::{BackendConfig, BackendPreference, LatticeConfig};

    fn engine(shape: &[usize]) -> UpdateEngine {
        let cfg = LatticeConfig {
            shape: shape.to_vec(),
            ..LatticeConfig::default()
        };
        let backend = BackendConfig {
            preference: BackendPreference::Sequential,
            allow_fallback: true,
        };
        UpdateEngine::new(&cfg, &backend).unwrap()
    }

    #[test]
    fn test_metric_set_dedups_and_orders() {
        let set = MetricSet::new(
            &[MetricKind::Gradient, MetricKind::Simple, MetricKind::Gradient],
            &MetricsConfig::default(),
        )
        .unwrap();
        assert_eq!(set.kinds(), &[MetricKind::Simple, MetricKind::Gradient]);
    }

    #[test]
    fn test_metric_set_rejects_empty_and_bad_config() {
        assert!(MetricSet::new(&[], &MetricsConfig::default()).is_err());
        let bad = MetricsConfig {
            entropy_bins: 0,
            ..MetricsConfig::default()
        };
        assert!(MetricSet::new(&[MetricKind::Entropy], &bad).is_err());
    }

    #[test]
    fn test_evaluate_names() {
        let set = MetricSet::new(&MetricKind::ALL, &MetricsConfig::default()).unwrap();
        let e = engine(&[8, 8]);
        let names: Vec<String> = set.evaluate(e.lattice()).unwrap().into_iter().map(|(n, _)| n).collect();
        assert_eq!(
            names,
            vec![
                "simple",
                "entropy",
                "gradient",
                "multiscale.s1.entropy",
                "multiscale.s1.gradient",
                "multiscale.s2.entropy",
                "multiscale.s2.gradient",
                "multiscale.s4.entropy",
                "multiscale.s4.gradient",
            ]
        );
    }

    #[test]
    fn test_record_run_series_length_is_steps_plus_one() {
        let set = MetricSet::new(&[MetricKind::Simple, MetricKind::Entropy], &MetricsConfig::default()).unwrap();
        let mut e = engine(&[10, 10]);
        let run = record_run(&mut e, 7, 0.4, &set).unwrap();
        assert_eq!(run.len(), 8);
        for series in run.series.values() {
            assert_eq!(series.len(), 8);
        }
        assert_eq!(run.activity.len(), 7);
        assert!(run.activity.values.iter().all(|a| *a > 0.0));
    }

    #[test]
    fn test_activity_is_zero_without_coupling() {
        let set = MetricSet::new(&[MetricKind::Simple], &MetricsConfig::default()).unwrap();
        let mut e = engine(&[6, 6]);
        let run = record_run(&mut e, 4, 0.0, &set).unwrap();
        assert_eq!(run.activity.values, vec![0.0; 4]);
    }

    #[test]
    fn test_cell_activity() {
        assert_eq!(cell_activity(&[0.0, 1.0], &[0.5, 0.5]), 0.5);
        assert_eq!(cell_activity(&[], &[]), 0.0);
    }

    #[test]
    fn test_metric_failure_stops_the_run() {
        let set = MetricSet::new(&[MetricKind::Entropy], &MetricsConfig::default()).unwrap();
        let broken = MetricSet { bins: 0, ..set };
        let mut e = engine(&[4, 4]);
        assert!(matches!(
            record_run(&mut e, 20, 0.5, &broken),
            Err(LatticeError::InvalidParameter(_))
        ));
        assert_eq!(e.step_count(), 0);
    }

    #[test]
    fn test_record_run_invalid_rho() {
        let set = MetricSet::new(&[MetricKind::Simple], &MetricsConfig::default()).unwrap();
        let mut e = engine(&[4, 4]);
        assert!(matches!(
            record_run(&mut e, 3, -1.0, &set),
            Err(LatticeError::InvalidParameter(_))
        ));
    }
}
