use std::hint::black_box;

use badger_totp::crypto::{base32_decode, hmac_sha1, sha1};
use badger_totp::scheduler::{Scheduler, Secret, Trigger};
use badger_totp::totp::{TotpConfig, totp};
use criterion::{Criterion, criterion_group, criterion_main};

const KEY: &str = "LMESUJEY7PTJSNYO5LKSME5HWQO6XZ5L";

fn primitives_benchmark(c: &mut Criterion) {
    c.bench_function("sha1 64 bytes", |b| b.iter(|| sha1(black_box(&[0x5a; 64]))));
    c.bench_function("hmac_sha1", |b| {
        b.iter(|| hmac_sha1(black_box(b"12345678901234567890"), black_box(&[0; 8])))
    });
    c.bench_function("base32 decode", |b| b.iter(|| base32_decode(black_box(KEY))));
}

fn totp_benchmark(c: &mut Criterion) {
    let config = TotpConfig::default();
    c.bench_function("totp", |b| {
        b.iter(|| totp(black_box(1_700_000_000), black_box(KEY), &config))
    });

    let secrets = (0..20)
        .map(|i| Secret::new(format!("key {i}"), KEY))
        .collect();
    let mut scheduler = Scheduler::new(secrets, config);
    c.bench_function("refresh 20 secrets", |b| {
        b.iter(|| scheduler.refresh(black_box(1_700_000_000), Trigger::Manual).seconds_remaining())
    });
}

criterion_group!(benches, primitives_benchmark, totp_benchmark);
criterion_main!(benches);
