// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Sweep Benchmarks
// ─────────────────────────────────────────────────────────────────────
//! Criterion benchmarks for complete sweeps, sequential vs parallel runs.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use infocond_sweep::SweepOrchestrator;
use infocond_types::{MetricKind, SimulationConfig, SweepConfig};

fn make_config(parallel_runs: bool, metrics: Vec<MetricKind>) -> SimulationConfig {
    SimulationConfig {
        sweep: SweepConfig {
            rho_min: 0.0,
            rho_max: 1.0,
            steps_count: 8,
            iterations: 50,
            lattice_sizes: vec![32],
            metrics,
            parallel_runs,
            ..SweepConfig::default()
        },
        ..SimulationConfig::default()
    }
}

// ── Simple metric ───────────────────────────────────────────────────

fn bench_sweep_sequential_runs(c: &mut Criterion) {
    let orch = SweepOrchestrator::new(&make_config(false, vec![MetricKind::Simple]))
        .unwrap_or_else(|e| panic!("bench config: {e}"));
    c.bench_function("sweep_8rho_32x32_sequential", |b| b.iter(|| black_box(orch.run())));
}

fn bench_sweep_parallel_runs(c: &mut Criterion) {
    let orch = SweepOrchestrator::new(&make_config(true, vec![MetricKind::Simple]))
        .unwrap_or_else(|e| panic!("bench config: {e}"));
    c.bench_function("sweep_8rho_32x32_parallel", |b| b.iter(|| black_box(orch.run())));
}

// ── All metrics ─────────────────────────────────────────────────────

fn bench_sweep_all_metrics(c: &mut Criterion) {
    let orch = SweepOrchestrator::new(&make_config(true, MetricKind::ALL.to_vec()))
        .unwrap_or_else(|e| panic!("bench config: {e}"));
    c.bench_function("sweep_8rho_32x32_all_metrics", |b| b.iter(|| black_box(orch.run())));
}

criterion_group!(
    benches,
    bench_sweep_sequential_runs,
    bench_sweep_parallel_runs,
    bench_sweep_all_metrics
);
criterion_main!(benches);
