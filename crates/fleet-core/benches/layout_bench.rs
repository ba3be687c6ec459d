//! Criterion benchmarks for the mirror grid [`arrange`] function.
//!
//! `arrange` runs on the interactive task every time the operator tiles the
//! mirrors, so it must stay well below a frame even for large fleets.
//!
//! Run with:
//! ```bash
//! cargo bench --package fleet-core --bench layout_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fleet_core::{arrange, LayoutInput, ScreenRect};

// ── Fixture builders ──────────────────────────────────────────────────────────

/// Builds `n` inputs cycling through common phone and tablet aspect ratios,
/// with every fourth device of unknown resolution.
fn build_inputs(n: usize) -> Vec<LayoutInput> {
    const RATIOS: [f64; 4] = [0.45, 0.5625, 0.0, 0.75];
    (0..n)
        .map(|i| LayoutInput::new(format!("device-{i}"), RATIOS[i % RATIOS.len()]))
        .collect()
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_arrange_typical_fleet(c: &mut Criterion) {
    let inputs = build_inputs(7);
    let screen = ScreenRect::new(0, 0, 2560, 1440);

    c.bench_function("arrange/7_sessions_5_columns", |b| {
        b.iter(|| arrange(black_box(&inputs), black_box(5), black_box(screen)))
    });
}

fn bench_arrange_scaling(c: &mut Criterion) {
    let screen = ScreenRect::new(0, 0, 3840, 2160);
    let mut group = c.benchmark_group("arrange_scaling");

    for &count in &[1usize, 10, 50, 200] {
        let inputs = build_inputs(count);
        group.bench_with_input(BenchmarkId::new("sessions", count), &inputs, |b, inputs| {
            b.iter(|| arrange(black_box(inputs), black_box(10), black_box(screen)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_arrange_typical_fleet, bench_arrange_scaling);
criterion_main!(benches);
