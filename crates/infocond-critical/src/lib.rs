// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Critical Point & Statistics
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Critical-point location on sweep curves, bootstrap confidence
//! intervals, and finite-size scaling across lattice sizes.
//!
//! ```text
//! SweepResult (per L) ──→ CriticalPointDetector ──→ ρ_c(L)
//!        │                                            │
//!        └──→ BootstrapValidator ──→ ρ_c(L) ± CI      │
//!                                         └──────────→ FiniteSizeScaling ──→ ρ_c(∞), ν
//! ```

pub mod bootstrap;
pub mod detector;
pub mod scaling;

pub use bootstrap::{percentile, BootstrapValidator};
pub use detector::CriticalPointDetector;
pub use scaling::{predict, FiniteSizeScaling};
