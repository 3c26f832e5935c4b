// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Update Backends
// ─────────────────────────────────────────────────────────────────────
//! Execution backends for one synchronous diffusive step.
//!
//! ```text
//! UpdateEngine (double buffer, validation, rollback)
//!   │
//!   └── UpdateBackend::step_into(prev, next)   ← dispatched at runtime
//!         ├── ParallelBackend    ← rayon, disjoint chunks of `next`
//!         └── SequentialBackend  ← single-threaded, always available
//! ```
//!
//! Backends read only `prev` and write only `next`, so no lane can
//! observe a value written during the same step. Both evaluate the same
//! per-cell expression in the same order and agree bit for bit.

use rayon::prelude::*;

use infocond_types::{BackendConfig, BackendPreference, LatticeError, LatticeResult};

use crate::lattice::Geometry;

/// One synchronous update of every cell from the previous snapshot.
///
/// Implementations hold configuration only, never lattice data.
pub trait UpdateBackend: Send + Sync {
    /// Human-readable name for diagnostics and benchmarking.
    fn name(&self) -> &'static str;

    /// Write `(1−ρ)·prev[i] + ρ·mean(neighbours of i in prev)` into `next[i]`.
    ///
    /// `prev` and `next` have `geometry.shape().len()` cells; ρ is already validated.
    fn step_into(&self, geometry: &Geometry, rho: f64, prev: &[f64], next: &mut [f64]);
}

/// Per-cell update rule shared by every backend.
///
/// Written as `old + ρ·(mean − old)`: for in-range inputs the rounded
/// result never leaves [min(old, mean), max(old, mean)].
#[inline]
pub fn relax_cell(geometry: &Geometry, rho: f64, prev: &[f64], idx: usize) -> f64 {
    let old = prev[idx];
    let mean = geometry.neighbour_mean(prev, idx);
    old + rho * (mean - old)
}

/// Element-by-element evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialBackend;

impl UpdateBackend for SequentialBackend {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn step_into(&self, geometry: &Geometry, rho: f64, prev: &[f64], next: &mut [f64]) {
        for (idx, out) in next.iter_mut().enumerate() {
            *out = relax_cell(geometry, rho, prev, idx);
        }
    }
}

/// Data-parallel evaluator: `next` is split into disjoint chunks mapped
/// across the rayon pool; the join at the end of `for_each` is the
/// end-of-step barrier.
#[derive(Debug, Clone, Copy)]
pub struct ParallelBackend {
    chunk_cells: usize,
}

impl ParallelBackend {
    pub const DEFAULT_CHUNK_CELLS: usize = 4096;

    pub fn new() -> Self {
        Self::with_chunk(Self::DEFAULT_CHUNK_CELLS)
    }

    /// Cells per work item (at least 1).
    pub fn with_chunk(chunk_cells: usize) -> Self {
        Self {
            chunk_cells: chunk_cells.max(1),
        }
    }

    /// Capability probe: usable when the rayon pool has more than one lane.
    pub fn probe() -> Option<Self> {
        let lanes = rayon::current_num_threads();
        if lanes > 1 {
            Some(Self::new())
        } else {
            log::debug!("parallel backend probe: {lanes} lane(s), not usable");
            None
        }
    }
}

impl Default for ParallelBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateBackend for ParallelBackend {
    fn name(&self) -> &'static str {
        "parallel"
    }

    fn step_into(&self, geometry: &Geometry, rho: f64, prev: &[f64], next: &mut [f64]) {
        let chunk = self.chunk_cells;
        next.par_chunks_mut(chunk)
            .enumerate()
            .for_each(|(c, out)| {
                let base = c * chunk;
                for (k, cell) in out.iter_mut().enumerate() {
                    *cell = relax_cell(geometry, rho, prev, base + k);
                }
            });
    }
}

/// Select the best available backend.
///
/// Priority order:
/// 1. Parallel (if the capability probe succeeds)
/// 2. Sequential fallback (always available)
pub fn auto_detect() -> Box<dyn UpdateBackend> {
    match ParallelBackend::probe() {
        Some(backend) => Box::new(backend),
        None => Box::new(SequentialBackend),
    }
}

/// Resolve a backend preference into a concrete backend.
///
/// A failed parallel probe falls back silently unless `allow_fallback`
/// is false, in which case `BackendUnavailable` is returned.
pub fn select_backend(config: &BackendConfig) -> LatticeResult<Box<dyn UpdateBackend>> {
    let backend: Box<dyn UpdateBackend> = match config.preference {
        BackendPreference::Sequential => Box::new(SequentialBackend),
        BackendPreference::Auto => auto_detect(),
        BackendPreference::Parallel => match ParallelBackend::probe() {
            Some(backend) => Box::new(backend),
            None if config.allow_fallback => {
                log::debug!("parallel backend unavailable, falling back to sequential");
                Box::new(SequentialBackend)
            }
            None => {
                return Err(LatticeError::BackendUnavailable(format!(
                    "parallel backend needs more than one worker thread, pool has {}",
                    rayon::current_num_threads()
                )))
            }
        },
    };
    log::debug!("update backend selected: {}", backend.name());
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{Lattice, Shape};
    use infocond_types::{Boundary, FillPolicy};

    fn run_backend(backend: &dyn UpdateBackend, lattice: &Lattice, rho: f64, steps: usize) -> Vec<f64> {
        let mut prev = lattice.values().to_vec();
        let mut next = vec![0.0; prev.len()];
        for _ in 0..steps {
            backend.step_into(lattice.geometry(), rho, &prev, &mut next);
            std::mem::swap(&mut prev, &mut next);
        }
        prev
    }

    #[test]
    fn test_auto_detect_returns_backend() {
        let name = auto_detect().name();
        assert!(name == "parallel" || name == "sequential", "Unexpected backend name: {name}");
    }

    #[test]
    fn test_sequential_preference_honoured() {
        let cfg = BackendConfig {
            preference: BackendPreference::Sequential,
            allow_fallback: false,
        };
        assert_eq!(select_backend(&cfg).unwrap().name(), "sequential");
    }

    #[test]
    fn test_parallel_preference_resolves_or_falls_back() {
        let cfg = BackendConfig {
            preference: BackendPreference::Parallel,
            allow_fallback: true,
        };
        let name = select_backend(&cfg).unwrap().name();
        if rayon::current_num_threads() > 1 {
            assert_eq!(name, "parallel");
        } else {
            assert_eq!(name, "sequential");
        }
    }

    #[test]
    fn test_parallel_without_fallback_on_single_lane_pool() {
        let pool = rayon::ThreadPoolBuilder::new().num_threads(1).build().unwrap();
        let cfg = BackendConfig {
            preference: BackendPreference::Parallel,
            allow_fallback: false,
        };
        let result = pool.install(|| select_backend(&cfg).map(|b| b.name()));
        assert!(matches!(result, Err(LatticeError::BackendUnavailable(_))));

        let fallback = BackendConfig {
            allow_fallback: true,
            ..cfg
        };
        let name = pool.install(|| select_backend(&fallback).map(|b| b.name()));
        assert_eq!(name.unwrap(), "sequential");
    }

    #[test]
    fn test_backends_agree_2d() {
        let lattice = Lattice::initialize(&[33, 17], Boundary::Periodic, &FillPolicy::Uniform, 9).unwrap();
        let seq = run_backend(&SequentialBackend, &lattice, 0.37, 20);
        let par = run_backend(&ParallelBackend::with_chunk(64), &lattice, 0.37, 20);
        assert_eq!(seq, par);
    }

    #[test]
    fn test_backends_agree_3d_zero_flux() {
        let lattice = Lattice::initialize(&[7, 9, 5], Boundary::ZeroFlux, &FillPolicy::Uniform, 11).unwrap();
        let seq = run_backend(&SequentialBackend, &lattice, 0.8, 15);
        let par = run_backend(&ParallelBackend::with_chunk(10), &lattice, 0.8, 15);
        for (a, b) in seq.iter().zip(par.iter()) {
            assert!((a - b).abs() <= 1e-6 * a.abs().max(1e-12), "{a} vs {b}");
        }
    }

    #[test]
    fn test_rho_zero_is_identity() {
        let lattice = Lattice::initialize(&[6, 6], Boundary::Periodic, &FillPolicy::Uniform, 5).unwrap();
        let out = run_backend(&SequentialBackend, &lattice, 0.0, 3);
        assert_eq!(out, lattice.values());
    }

    #[test]
    fn test_rho_one_is_neighbour_mean() {
        let shape = Shape::new(&[3, 3]).unwrap();
        let values = vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];
        let lattice = Lattice::from_values(shape.dims(), Boundary::Periodic, values).unwrap();
        let out = run_backend(&SequentialBackend, &lattice, 1.0, 1);
        assert_eq!(out[4], 0.0);
        assert!((out[1] - 0.25).abs() < 1e-12);
        assert!((out[0]).abs() < 1e-12);
    }
}
