// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Type definitions, configuration, and error hierarchy shared by the
//! lattice engine, metrics, sweep orchestrator and statistical layers.

pub mod config;
pub mod error;
pub mod record;

pub use config::{
    linspace, validate_shape, BackendConfig, BackendPreference, BootstrapConfig, Boundary,
    FillPolicy, LatticeConfig, MetricKind, MetricsConfig, ScalingConfig, ScalingMode, SeedPolicy,
    SimulationConfig, SweepConfig,
};
pub use error::{check_coupling, LatticeError, LatticeResult};
pub use record::{
    ConductivitySample, ConductivitySeries, CriticalPointEstimate, ScalingEstimate,
    SeriesSummary, StandardErrors, SusceptibilityExponent, SweepPoint, SweepRecord,
    SweepResult,
};
