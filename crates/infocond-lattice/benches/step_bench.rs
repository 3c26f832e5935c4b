// ─────────────────────────────────────────────────────────────────────
// Information Conductivity Kernel — Update Step Benchmarks
// ─────────────────────────────────────────────────────────────────────
//! Criterion benchmarks for one synchronous step on each backend,
//! 2-D and 3-D, periodic and zero-flux.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use infocond_lattice::{Lattice, ParallelBackend, SequentialBackend, UpdateBackend, UpdateEngine};
use infocond_types::{Boundary, FillPolicy};

fn make_engine(shape: &[usize], boundary: Boundary, backend: Box<dyn UpdateBackend>) -> UpdateEngine {
    let lattice = Lattice::initialize(shape, boundary, &FillPolicy::Uniform, 42)
        .unwrap_or_else(|e| panic!("bench lattice: {e}"));
    UpdateEngine::with_backend(lattice, backend)
}

// ── 2-D step ────────────────────────────────────────────────────────

fn bench_step_2d(c: &mut Criterion) {
    let mut group = c.benchmark_group("step_2d");
    for edge in [64usize, 256, 512] {
        let mut seq = make_engine(&[edge, edge], Boundary::Periodic, Box::new(SequentialBackend));
        group.bench_with_input(BenchmarkId::new("sequential", edge), &edge, |b, _| {
            b.iter(|| seq.step(black_box(0.5)))
        });
        let mut par = make_engine(&[edge, edge], Boundary::Periodic, Box::new(ParallelBackend::new()));
        group.bench_with_input(BenchmarkId::new("parallel", edge), &edge, |b, _| {
            b.iter(|| par.step(black_box(0.5)))
        });
    }
    group.finish();
}

// ── 3-D step ────────────────────────────────────────────────────────

fn bench_step_3d(c: &mut Criterion) {
    let mut group = c.benchmark_group("step_3d");
    for edge in [16usize, 48] {
        let shape = [edge, edge, edge];
        let mut seq = make_engine(&shape, Boundary::ZeroFlux, Box::new(SequentialBackend));
        group.bench_with_input(BenchmarkId::new("sequential", edge), &edge, |b, _| {
            b.iter(|| seq.step(black_box(0.5)))
        });
        let mut par = make_engine(&shape, Boundary::ZeroFlux, Box::new(ParallelBackend::new()));
        group.bench_with_input(BenchmarkId::new("parallel", edge), &edge, |b, _| {
            b.iter(|| par.step(black_box(0.5)))
        });
    }
    group.finish();
}

// ── Full run with callback ──────────────────────────────────────────

fn bench_run_100_steps(c: &mut Criterion) {
    c.bench_function("run_100_steps_50x50", |b| {
        b.iter(|| {
            let mut engine = make_engine(&[50, 50], Boundary::Periodic, Box::new(SequentialBackend));
            let mut acc = 0.0;
            let _ = engine.run(100, black_box(0.5), |_, l| acc += l.mean());
            acc
        })
    });
}

criterion_group!(benches, bench_step_2d, bench_step_3d, bench_run_100_steps);
criterion_main!(benches);
