use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kmer_core::bits::wang_hash;
use kmer_core::hash::{simple_fast_hash, wyhash64_step};

fn criterion_benchmark(c: &mut Criterion) {
    let key = 0x12345678abcdef01u64;

    c.bench_function("simple_fast_hash", |b| b.iter(|| simple_fast_hash(black_box(key))));
    c.bench_function("wang_hash", |b| b.iter(|| wang_hash(black_box(key))));
    c.bench_function("wyhash64_step", |b| {
        let mut seed = key;
        b.iter(|| wyhash64_step(black_box(&mut seed)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
