// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Conductivity Metrics
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Conductivity metrics: snapshot reductions (mean activity, binned and
//! Gaussian entropy, gradient magnitude, multiscale), temporal observables
//! and per-run series recording.

pub mod observables;
pub mod spatial;
pub mod temporal;

pub use observables::{
    cell_activity, multiscale_name, record_run, MetricSet, RecordedRun, SeriesRecorder,
};
pub use spatial::{
    block_average, entropy, gaussian_entropy, gradient, multiscale, simple, variance, ScaleMetrics,
};
pub use temporal::{
    pearson, susceptibility, temporal_series, transfer_entropy_approx, ScalarObservable,
};
