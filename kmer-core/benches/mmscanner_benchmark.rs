use criterion::{criterion_group, criterion_main, Criterion};
use kmer_core::sketch::{scan_minimizers, Meros};

fn bench_scan(c: &mut Criterion) {
    let seq: Vec<u8> = b"ACGT".iter().cycle().take(10_000).copied().collect();
    let meros = Meros::default();
    c.bench_function("scan_minimizers_10k", |b| {
        b.iter(|| scan_minimizers(&seq, &meros).unwrap())
    });
}

criterion_group!(benches, bench_scan);
criterion_main!(benches);
