// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Parameter Sweep Orchestrator
// ─────────────────────────────────────────────────────────────────────
//! Runs one independent simulation per (lattice size, ρ) pair and
//! reassembles the outcomes in ρ order.
//!
//! ```text
//! for each lattice size L:
//!   for each ρ_i in linspace(ρ_min, ρ_max, steps_count):     ← rayon job
//!     for each replicate r:
//!       fresh engine (seed_i,r) → run(iterations, ρ_i) → series
//!     samples   ← trailing window of every replicate (post-equilibration half by default)
//!     value     ← mean(samples)
//!     χ         ← mean_r  N · var(cell activity over the window)
//! ```
//!
//! Jobs share no mutable lattice state. The cancel flag is checked before
//! each job starts; a running step is never interrupted.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;

use infocond_lattice::UpdateEngine;
use infocond_metrics::{record_run, susceptibility, MetricSet};
use infocond_types::record::mean;
use infocond_types::{
    BackendConfig, LatticeConfig, LatticeError, LatticeResult, SeedPolicy, SimulationConfig,
    SweepConfig, SweepPoint, SweepRecord, SweepResult,
};

/// Golden-ratio increment separating replicate seed streams.
const REPLICATE_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// Progress report delivered after each completed (size, ρ) job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepProgress {
    pub lattice_size: usize,
    pub rho: f64,
    pub completed: usize,
    pub total: usize,
}

/// Caller-supplied progress hook; invoked from worker threads, one call at a time.
pub type ProgressCallback = Box<dyn FnMut(&SweepProgress) + Send>;

#[derive(Debug, Clone, Copy)]
struct Job {
    lattice_size: usize,
    rho_index: usize,
    rho: f64,
}

/// Coupling-strength sweep over one or more lattice sizes.
pub struct SweepOrchestrator {
    sweep: SweepConfig,
    lattice: LatticeConfig,
    backend: BackendConfig,
    metrics: MetricSet,
    cancel: Arc<AtomicBool>,
    progress: Option<Mutex<ProgressCallback>>,
}

impl SweepOrchestrator {
    /// Validate the relevant sections of `config` and build the orchestrator.
    ///
    /// `config.lattice` supplies boundary, seed and fill; its shape is
    /// replaced by `[L; dimensions]` for every swept size.
    pub fn new(config: &SimulationConfig) -> LatticeResult<Self> {
        config.sweep.validate()?;
        config.lattice.fill.validate()?;
        let metrics = MetricSet::new(&config.sweep.metrics, &config.metrics)?;
        Ok(Self {
            sweep: config.sweep.clone(),
            lattice: config.lattice.clone(),
            backend: config.backend,
            metrics,
            cancel: Arc::new(AtomicBool::new(false)),
            progress: None,
        })
    }

    /// Install a progress callback.
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&SweepProgress) + Send + 'static,
    {
        self.progress = Some(Mutex::new(Box::new(callback)));
        self
    }

    /// Same sweep with a different base seed; shares the cancel flag, drops the progress hook.
    pub fn reseeded(&self, seed: u64) -> Self {
        Self {
            sweep: self.sweep.clone(),
            lattice: LatticeConfig {
                seed,
                ..self.lattice.clone()
            },
            backend: self.backend,
            metrics: self.metrics.clone(),
            cancel: Arc::clone(&self.cancel),
            progress: None,
        }
    }

    pub fn config(&self) -> &SweepConfig {
        &self.sweep
    }

    pub fn metrics(&self) -> &MetricSet {
        &self.metrics
    }

    pub fn base_seed(&self) -> u64 {
        self.lattice.seed
    }

    /// Flag that, once set, stops the sweep before its next (size, ρ) job.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// The ρ grid, ascending, bounds inclusive.
    pub fn rho_values(&self) -> LatticeResult<Vec<f64>> {
        self.sweep.rho_values()
    }

    /// Seed of replicate `replicate` of the run at ρ index `rho_index`.
    pub fn seed_for(&self, rho_index: usize, replicate: usize) -> u64 {
        let base = match self.sweep.seed_policy {
            SeedPolicy::Shared => self.lattice.seed,
            SeedPolicy::PerRun => self.lattice.seed.wrapping_add(rho_index as u64),
        };
        base.wrapping_add((replicate as u64).wrapping_mul(REPLICATE_SEED_STRIDE))
    }

    /// Sweep every configured lattice size; one result per size, in config order.
    pub fn run(&self) -> LatticeResult<Vec<SweepResult>> {
        let rhos = self.rho_values()?;
        let jobs: Vec<Job> = self
            .sweep
            .lattice_sizes
            .iter()
            .flat_map(|&lattice_size| {
                rhos.iter().enumerate().map(move |(rho_index, &rho)| Job {
                    lattice_size,
                    rho_index,
                    rho,
                })
            })
            .collect();
        let total = jobs.len();
        log::info!(
            "sweep start: {} size(s) × {} ρ value(s), {} iterations, {} replicate(s)",
            self.sweep.lattice_sizes.len(),
            rhos.len(),
            self.sweep.iterations,
            self.sweep.replicates
        );

        let completed = AtomicUsize::new(0);
        let points: Vec<SweepPoint> = if self.sweep.parallel_runs {
            jobs.par_iter()
                .map(|job| self.execute(job, &completed, total))
                .collect::<LatticeResult<_>>()?
        } else {
            jobs.iter()
                .map(|job| self.execute(job, &completed, total))
                .collect::<LatticeResult<_>>()?
        };

        let results: Vec<SweepResult> = points
            .chunks(rhos.len())
            .zip(self.sweep.lattice_sizes.iter())
            .map(|(chunk, &lattice_size)| SweepResult {
                lattice_size,
                dimensions: self.sweep.dimensions,
                points: chunk.to_vec(),
            })
            .collect();
        log::info!("sweep finished: {total} run(s)");
        Ok(results)
    }

    /// Sweep a single lattice size.
    pub fn run_size(&self, lattice_size: usize) -> LatticeResult<SweepResult> {
        let single = Self {
            sweep: SweepConfig {
                lattice_sizes: vec![lattice_size],
                ..self.sweep.clone()
            },
            lattice: self.lattice.clone(),
            backend: self.backend,
            metrics: self.metrics.clone(),
            cancel: Arc::clone(&self.cancel),
            progress: None,
        };
        single
            .run()?
            .pop()
            .ok_or(LatticeError::InsufficientData { required: 1, got: 0 })
    }

    fn execute(&self, job: &Job, completed: &AtomicUsize, total: usize) -> LatticeResult<SweepPoint> {
        if self.is_cancelled() {
            return Err(LatticeError::Cancelled {
                completed: completed.load(Ordering::SeqCst),
                total,
            });
        }
        let point = self.run_point(job.lattice_size, job.rho, job.rho_index)?;
        let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
        log::debug!(
            "sweep run done: L={} ρ={:.4} ({done}/{total})",
            job.lattice_size,
            job.rho
        );
        if let Some(progress) = &self.progress {
            let mut callback = progress.lock();
            callback(&SweepProgress {
                lattice_size: job.lattice_size,
                rho: job.rho,
                completed: done,
                total,
            });
        }
        Ok(point)
    }

    /// All replicates at one (L, ρ), aggregated into a sweep point.
    pub fn run_point(&self, lattice_size: usize, rho: f64, rho_index: usize) -> LatticeResult<SweepPoint> {
        let shape = vec![lattice_size; self.sweep.dimensions];
        let n_cells: usize = shape.iter().product();
        let window = self.sweep.window();
        let mut point = SweepPoint {
            rho,
            ..SweepPoint::default()
        };
        let mut chi_sum = 0.0;

        for replicate in 0..self.sweep.replicates {
            let config = LatticeConfig {
                shape: shape.clone(),
                seed: self.seed_for(rho_index, replicate),
                history_capacity: 0,
                ..self.lattice.clone()
            };
            let mut engine = UpdateEngine::new(&config, &self.backend)?;
            let run = record_run(&mut engine, self.sweep.iterations as u64, rho, &self.metrics)?;

            for (name, series) in &run.series {
                point
                    .samples
                    .entry(name.clone())
                    .or_default()
                    .extend_from_slice(series.tail(window));
                if replicate == 0 {
                    point.summaries.insert(name.clone(), series.summary());
                    if self.sweep.record_series {
                        point.series.insert(name.clone(), series.values.clone());
                    }
                }
            }
            chi_sum += susceptibility(run.activity.tail(window), n_cells);
        }

        point.values = point
            .samples
            .iter()
            .map(|(name, samples)| (name.clone(), mean(samples)))
            .collect::<BTreeMap<_, _>>();
        point.susceptibility = chi_sum / self.sweep.replicates as f64;
        Ok(point)
    }
}

impl std::fmt::Debug for SweepOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SweepOrchestrator")
            .field("sweep", &self.sweep)
            .field("lattice", &self.lattice)
            .field("backend", &self.backend)
            .field("metrics", &self.metrics)
            .field("cancelled", &self.is_cancelled())
            .field("has_progress", &self.progress.is_some())
            .finish()
    }
}

/// Flatten results into the ordered `{lattice_size, ρ, name → value}` records.
pub fn records(results: &[SweepResult]) -> Vec<SweepRecord> {
    results.iter().flat_map(SweepResult::records).collect()
}
