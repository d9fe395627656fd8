//! Corpus Pipeline Benchmarks
//!
//! Measures suspiciousness scoring, labeling and sampling over synthetic
//! corpora of increasing size.
//!
//! Run with: cargo bench --bench tarantula

use criba::{
    AllocationPolicy, CorpusRecord, Feature, FeatureVector, SbflFormula, StratifiedSampler,
    TarantulaEngine, WeakSupervisionLabeler,
};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

/// Deterministic synthetic corpus: features cycle with the index, failures
/// follow async and eval usage.
fn synthetic_corpus(n: usize) -> Vec<CorpusRecord> {
    (0..n)
        .map(|i| {
            let features = Feature::ALL
                .iter()
                .enumerate()
                .fold(FeatureVector::default(), |v, (bit, f)| {
                    v.with(*f, (i >> bit) & 1 == 1 && i % (bit + 2) == 0)
                });
            let record = CorpusRecord::new(format!("r{:07}", i), format!("cat{}", i % 40))
                .with_features(features);
            if features.async_await || features.eval_exec {
                record.failing()
            } else {
                record.passing()
            }
        })
        .collect()
}

fn bench_suspiciousness(c: &mut Criterion) {
    let mut group = c.benchmark_group("suspiciousness");

    for size in [1_000, 10_000, 100_000] {
        let records = synthetic_corpus(size);
        group.throughput(Throughput::Elements(size as u64));

        for formula in [SbflFormula::Tarantula, SbflFormula::Ochiai] {
            let engine = TarantulaEngine::new(formula);
            group.bench_with_input(
                BenchmarkId::new(formula.to_string(), size),
                &records,
                |b, records| {
                    b.iter(|| black_box(engine.scores(black_box(records))));
                },
            );
        }
    }

    group.finish();
}

fn bench_labeling(c: &mut Criterion) {
    let mut group = c.benchmark_group("labeling");
    let labeler = WeakSupervisionLabeler::default();

    for size in [1_000, 10_000, 100_000] {
        let records = synthetic_corpus(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("label_corpus", size), &records, |b, records| {
            b.iter(|| black_box(labeler.label_corpus(black_box(records))));
        });
    }

    group.finish();
}

fn bench_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling");

    let records = synthetic_corpus(100_000);
    for fraction in [0.01, 0.05, 0.25] {
        let sampler = StratifiedSampler::new(fraction, 42, AllocationPolicy::default())
            .expect("valid fraction");
        group.bench_with_input(
            BenchmarkId::new("select", fraction),
            &records,
            |b, records| {
                b.iter(|| black_box(sampler.select(black_box(records))));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_suspiciousness, bench_labeling, bench_sampling);
criterion_main!(benches);
