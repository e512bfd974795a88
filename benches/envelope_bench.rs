use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use keyward::core::cipher::AgeKeyring;
use keyward::core::codec;
use keyward::{Encryption, Provider};
use std::time::Duration;
use tempfile::TempDir;

/// Generate a payload of given size.
fn generate_payload(size: usize) -> String {
    "x".repeat(size)
}

/// Benchmark the base64 envelope codec alone.
fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    for size in [32, 1024, 16384] {
        let payload = generate_payload(size);
        let encoded = codec::encode(&payload);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &payload, |b, payload| {
            b.iter(|| codec::encode(black_box(payload)))
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &encoded, |b, encoded| {
            b.iter(|| codec::decode(black_box(encoded)))
        });
    }

    group.finish();
}

/// Benchmark provider encrypt/decrypt on the age keyring.
///
/// Decryption unseals the secret key every call, so the scrypt work factor
/// dominates; it is kept low here to measure the envelope path.
fn bench_provider_roundtrip(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let keyring = AgeKeyring::open(dir.path(), false)
        .unwrap()
        .with_work_factor(10);
    let provider = Provider::new(keyring, "bench", "p@ss").unwrap();

    let mut group = c.benchmark_group("provider");
    group.sample_size(20);
    group.warm_up_time(Duration::from_secs(1));
    group.measurement_time(Duration::from_secs(3));

    for size in [32, 1024, 16384] {
        let payload = generate_payload(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("encrypt", size), &payload, |b, payload| {
            b.iter(|| provider.encrypt(black_box(payload)).unwrap())
        });

        let envelope = provider.encrypt(&payload).unwrap();
        group.bench_with_input(BenchmarkId::new("decrypt", size), &envelope, |b, envelope| {
            b.iter(|| provider.decrypt(black_box(envelope)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_codec, bench_provider_roundtrip);
criterion_main!(benches);
