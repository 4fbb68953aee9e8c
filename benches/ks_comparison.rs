//! KS comparison benchmark
//!
//! Comparison runs once per level per program, so it must stay cheap next to
//! the backend call it follows. Sample reconstruction is O(shots) and the
//! statistic is a merge over two sorted samples.
//!
//! # Run Instructions
//!
//! ```bash
//! cargo bench --bench ks_comparison
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use difftriage::comparison::{compare, kolmogorov_survival, overlap, Amplitude};
use difftriage::normalize::{normalize, Distribution, RawLabel};

/// Spread `shots` over `outcomes` basis states, skewed by `tilt`
fn make_distribution(outcomes: u64, shots: u64, tilt: u64) -> Distribution {
    let mut counts: Vec<(u64, u64)> = (0..outcomes).map(|i| (i, shots / outcomes)).collect();
    let assigned: u64 = counts.iter().map(|(_, c)| c).sum();
    counts[0].1 += shots - assigned;
    if outcomes > 1 {
        let moved = tilt.min(counts[1].1);
        counts[1].1 -= moved;
        counts[0].1 += moved;
    }
    counts.into_iter().collect()
}

fn bench_compare_shots(c: &mut Criterion) {
    let mut group = c.benchmark_group("compare_shots");

    for shots in [1_000u64, 10_000, 100_000] {
        let a = make_distribution(16, shots, 0);
        let b = make_distribution(16, shots, shots / 100);
        group.bench_with_input(BenchmarkId::from_parameter(shots), &shots, |bench, &n| {
            bench.iter(|| compare(black_box(&a), black_box(&b), n));
        });
    }

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let raw: Vec<(RawLabel, u64)> = (0..1024u64)
        .map(|i| (RawLabel::from(format!("{:010b}", i).as_str()), 10))
        .collect();

    c.bench_function("normalize_1024_labels", |b| {
        b.iter(|| normalize(black_box(&raw)));
    });
}

fn bench_survival(c: &mut Criterion) {
    c.bench_function("kolmogorov_survival", |b| {
        b.iter(|| {
            for i in 1..100 {
                black_box(kolmogorov_survival(f64::from(i) * 0.03));
            }
        });
    });
}

fn bench_overlap(c: &mut Criterion) {
    let dim = 1 << 12;
    let amp = 1.0 / (dim as f64).sqrt();
    let a: Vec<Amplitude> = (0..dim).map(|_| Amplitude::new(amp, 0.0)).collect();
    let b: Vec<Amplitude> = a.iter().map(|x| x.rotate(0.3)).collect();

    c.bench_function("overlap_12_qubits", |bench| {
        bench.iter(|| overlap(black_box(&a), black_box(&b), 6));
    });
}

criterion_group!(
    benches,
    bench_compare_shots,
    bench_normalize,
    bench_survival,
    bench_overlap
);
criterion_main!(benches);
