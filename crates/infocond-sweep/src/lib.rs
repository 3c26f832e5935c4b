// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Parameter Sweeps
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Coupling-strength sweeps: independent lattice runs per (size, ρ),
//! executed on the rayon pool and reassembled in ρ order.

pub mod orchestrator;

pub use orchestrator::{records, ProgressCallback, SweepOrchestrator, SweepProgress};
