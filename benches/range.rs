//! Criterion benchmarks for the in-memory range algebra.
//!
//! Run with:
//!   cargo bench --bench range
//!
//! Measures `insert` and `find_overlaps` at the record counts the
//! concurrency model calls out as the expected operating range (tens to
//! low thousands); growth well beyond that is a known pathological case,
//! not the common one.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use cowolf::range::{find_overlaps, insert, Record, Span};

fn scattered_recs(count: usize) -> Vec<Record> {
    let mut recs = vec![Record::sentinel(count as u64 * 100)];
    for i in 0..count {
        let start = (i as u64) * 100 + 10;
        insert(Record::new(start, start + 5), &mut recs);
    }
    recs
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_insert");
    for &count in &[10usize, 100, 1_000] {
        group.bench_with_input(BenchmarkId::new("insert", count), &count, |b, &count| {
            b.iter_batched(
                || scattered_recs(count),
                |mut recs| {
                    let last_start = (count as u64) * 100 + 50;
                    insert(Record::new(last_start, last_start + 1), &mut recs);
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_find_overlaps(c: &mut Criterion) {
    let mut group = c.benchmark_group("range_find_overlaps");
    for &count in &[10usize, 100, 1_000] {
        let recs = scattered_recs(count);
        group.bench_with_input(BenchmarkId::new("find_overlaps", count), &recs, |b, recs| {
            b.iter(|| find_overlaps(Span::new(0, count as u64 * 100), recs))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_find_overlaps);
criterion_main!(benches);
