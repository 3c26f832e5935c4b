// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all lattice-kernel failures.
///
/// Parameter-validation variants indicate caller misuse and are never
/// retried. `BackendUnavailable` only escapes when the caller disabled
/// the automatic sequential fallback.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LatticeError {
    /// Lattice shape has the wrong rank or a zero-length axis.
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// A scalar parameter is out of its domain (ρ outside [0, 1], bins = 0, ...).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Sweep bounds are inverted, outside [0, 1], or the point count is zero.
    #[error("invalid sweep range: {0}")]
    InvalidSweepRange(String),

    /// Too few ρ points for derivative estimation.
    #[error("insufficient data: need at least {required} points, got {got}")]
    InsufficientData { required: usize, got: usize },

    /// Too few distinct lattice sizes for a finite-size scaling fit.
    #[error("insufficient sizes: need at least {required} distinct lattice sizes, got {got}")]
    InsufficientSizes { required: usize, got: usize },

    /// Parallel backend requested with fallback disabled, but not usable.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Numerical error (NaN/Inf produced during a step or a fit).
    #[error("numerical error: {0}")]
    Numerical(String),

    /// Configuration error (malformed record or JSON).
    #[error("config error: {0}")]
    Config(String),

    /// Sweep abandoned by the caller between ρ runs.
    #[error("cancelled after {completed} of {total} runs")]
    Cancelled { completed: usize, total: usize },
}

pub type LatticeResult<T> = Result<T, LatticeError>;

/// Reject ρ outside [0, 1] (NaN included).
pub fn check_coupling(rho: f64) -> LatticeResult<()> {
    if rho.is_finite() && (0.0..=1.0).contains(&rho) {
        Ok(())
    } else {
        Err(LatticeError::InvalidParameter(format!(
            "coupling strength must be in [0, 1], got {rho}"
        )))
    }
}
