// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Lattice Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Lattice state, update backends and the double-buffered update engine.

pub mod backend;
pub mod engine;
pub mod lattice;

pub use backend::{
    auto_detect, relax_cell, select_backend, ParallelBackend, SequentialBackend, UpdateBackend,
};
pub use engine::UpdateEngine;
pub use lattice::{Geometry, Lattice, Shape};
