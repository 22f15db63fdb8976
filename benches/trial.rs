//! Criterion benchmarks for trial generation and stepping.
//!
//! Run with:
//!   cargo bench
//!
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use epochtask::config::DmsConfig;
use epochtask::env::Action;
use epochtask::tasks::{DelayedMatchToSample, TrialOverrides};

/// Benchmark new_trial() across step sizes (smaller dt means more rows).
fn bench_new_trial(c: &mut Criterion) {
    let mut group = c.benchmark_group("new_trial");

    for dt in [100.0f32, 10.0, 1.0].iter() {
        let rows = (3200.0 / dt) as u64;
        group.throughput(Throughput::Elements(rows));

        group.bench_with_input(BenchmarkId::new("dt", dt), dt, |b, &dt| {
            let mut env = DelayedMatchToSample::new(DmsConfig::default().with_dt(dt).with_seed(42));
            b.iter(|| black_box(*env.new_trial(TrialOverrides::default())));
        });
    }

    group.finish();
}

/// Benchmark a full trial of step() calls with a fixating agent.
fn bench_step_trial(c: &mut Criterion) {
    let mut env = DelayedMatchToSample::new(DmsConfig::default().with_seed(7));
    let steps = env.epochs().total_steps();

    c.bench_function("step_full_trial", |b| {
        b.iter(|| {
            let mut reward = 0.0f32;
            for _ in 0..steps {
                reward += env.step(Action::Fixate).reward;
            }
            black_box(reward)
        });
    });
}

/// Benchmark the pure evaluator at a fixed clock position.
fn bench_evaluate(c: &mut Criterion) {
    let env = DelayedMatchToSample::new(DmsConfig::default().with_seed(7));

    c.bench_function("evaluate", |b| {
        b.iter(|| black_box(env.evaluate(black_box(Action::Match)).reward));
    });
}

criterion_group!(benches, bench_new_trial, bench_step_trial, bench_evaluate);
criterion_main!(benches);
