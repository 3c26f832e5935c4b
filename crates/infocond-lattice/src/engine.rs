// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Update Engine
// ─────────────────────────────────────────────────────────────────────
//! Synchronous diffusive stepper:
//!
//!   x_i(t+1) = (1 − ρ)·x_i(t) + ρ·⟨x_j(t)⟩_{j ∈ N(i)}
//!
//! Two buffers are kept: the live lattice and a scratch buffer. A step
//! writes only the scratch buffer and the buffers are swapped once the
//! whole step has succeeded, so a failed step leaves the lattice as it was.

use std::collections::VecDeque;

use infocond_types::{
    check_coupling, BackendConfig, FillPolicy, LatticeConfig, LatticeError, LatticeResult,
};

use crate::backend::{select_backend, UpdateBackend};
use crate::lattice::Lattice;

/// Owns one lattice for the lifetime of a run and advances it in place.
pub struct UpdateEngine {
    lattice: Lattice,
    scratch: Vec<f64>,
    backend: Box<dyn UpdateBackend>,
    config: LatticeConfig,
    step_count: u64,
    history: VecDeque<Lattice>,
}

impl UpdateEngine {
    /// Build the lattice from `lattice` and resolve the backend from `backend`.
    pub fn new(lattice: &LatticeConfig, backend: &BackendConfig) -> LatticeResult<Self> {
        lattice.validate()?;
        let initial = Lattice::from_config(lattice)?;
        let backend = select_backend(backend)?;
        Ok(Self::assemble(initial, backend, lattice.clone()))
    }

    /// Wrap an existing lattice with an explicit backend (no history).
    ///
    /// `reset` restores the wrapped values whatever the seed.
    pub fn with_backend(lattice: Lattice, backend: Box<dyn UpdateBackend>) -> Self {
        let config = LatticeConfig {
            shape: lattice.shape().dims().to_vec(),
            boundary: lattice.boundary(),
            fill: FillPolicy::Values {
                values: lattice.values().to_vec(),
            },
            history_capacity: 0,
            ..LatticeConfig::default()
        };
        Self::assemble(lattice, backend, config)
    }

    fn assemble(lattice: Lattice, backend: Box<dyn UpdateBackend>, config: LatticeConfig) -> Self {
        let mut engine = Self {
            scratch: vec![0.0; lattice.len()],
            lattice,
            backend,
            config,
            step_count: 0,
            history: VecDeque::new(),
        };
        engine.record_history();
        engine
    }

    pub fn lattice(&self) -> &Lattice {
        &self.lattice
    }

    /// Owned copy of the current state.
    pub fn snapshot(&self) -> Lattice {
        self.lattice.clone()
    }

    /// Steps applied since construction or the last `reset`.
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Most recent snapshots, oldest first (empty when `history_capacity` is 0).
    pub fn history(&self) -> &VecDeque<Lattice> {
        &self.history
    }

    /// Advance every cell by one synchronous step.
    ///
    /// Fails with `InvalidParameter` if ρ ∉ [0, 1] and with `Numerical` if
    /// the step produced a non-finite value; the lattice is untouched in
    /// both cases.
    pub fn step(&mut self, rho: f64) -> LatticeResult<()> {
        check_coupling(rho)?;
        self.backend.step_into(
            self.lattice.geometry(),
            rho,
            self.lattice.values(),
            &mut self.scratch,
        );

        if let Some(idx) = self.scratch.iter().position(|v| !v.is_finite()) {
            return Err(LatticeError::Numerical(format!(
                "step {} produced non-finite value {} at cell {idx}",
                self.step_count + 1,
                self.scratch[idx]
            )));
        }

        self.lattice.swap_values(&mut self.scratch);
        self.step_count += 1;
        self.record_history();
        Ok(())
    }

    /// Apply `steps` updates at coupling ρ.
    ///
    /// `on_sample(t, lattice)` is called for t = 0 (before the first step)
    /// and after every step, `steps + 1` times in total.
    pub fn run<F>(&mut self, steps: u64, rho: f64, mut on_sample: F) -> LatticeResult<()>
    where
        F: FnMut(u64, &Lattice),
    {
        self.try_run(steps, rho, |t, grid| {
            on_sample(t, grid);
            Ok(())
        })
    }

    /// Like [`run`](Self::run), but stops at the first callback error and
    /// returns it. Steps already taken are kept.
    pub fn try_run<F>(&mut self, steps: u64, rho: f64, mut on_sample: F) -> LatticeResult<()>
    where
        F: FnMut(u64, &Lattice) -> LatticeResult<()>,
    {
        check_coupling(rho)?;
        on_sample(0, &self.lattice)?;
        for t in 1..=steps {
            self.step(rho)?;
            on_sample(t, &self.lattice)?;
        }
        Ok(())
    }

    /// Re-initialise the lattice from the construction config with a new seed.
    pub fn reset(&mut self, seed: u64) -> LatticeResult<()> {
        self.config.seed = seed;
        self.lattice = Lattice::from_config(&self.config)?;
        self.scratch.resize(self.lattice.len(), 0.0);
        self.step_count = 0;
        self.history.clear();
        self.record_history();
        Ok(())
    }

    fn record_history(&mut self) {
        let capacity = self.config.history_capacity;
        if capacity == 0 {
            return;
        }
        while self.history.len() >= capacity {
            self.history.pop_front();
        }
        self.history.push_back(self.lattice.clone());
    }
}

impl std::fmt::Debug for UpdateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateEngine")
            .field("shape", &self.lattice.shape().dims())
            .field("boundary", &self.lattice.boundary())
            .field("backend", &self.backend.name())
            .field("step_count", &self.step_count)
            .finish()
    }
}
