//! Benchmarks for the hot non-database paths
//!
//! Run with: cargo bench --package rentshare-api
//!
//! Covers booking price calculation, distance filtering and the in-process
//! cache. Database queries are not measured here.

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rentshare_cache::MemoryCache;
use rentshare_core::{
    location::GeoPoint,
    models::{DateRange, RateCard},
    pricing::PricingPolicy,
};
use rust_decimal_macros::dec;
use serde_json::json;

fn rate_card() -> RateCard {
    RateCard {
        daily_rate: dec!(25.00),
        hourly_rate: Some(dec!(4.50)),
        security_deposit: dec!(100.00),
    }
}

/// Benchmark price breakdowns for short and long rentals
fn bench_pricing(c: &mut Criterion) {
    let policy = PricingPolicy::default();
    let card = rate_card();
    let start = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();

    let mut group = c.benchmark_group("pricing");
    for hours in [3_i64, 30, 24 * 14].iter() {
        let range = DateRange::new(start, start + Duration::hours(*hours)).unwrap();
        group.bench_with_input(BenchmarkId::new("calculate", hours), &range, |b, range| {
            b.iter(|| policy.calculate(black_box(&card), black_box(range), Some(dec!(12.00))));
        });
    }
    group.finish();
}

/// Benchmark radius filtering over candidate listings
fn bench_distance_filter(c: &mut Criterion) {
    let origin = GeoPoint::new(-12.0464, -77.0428);
    let mut group = c.benchmark_group("distance_filter");

    for size in [1_000, 10_000].iter() {
        let points: Vec<GeoPoint> = (0..*size)
            .map(|i| GeoPoint::new(-12.0 - (i % 100) as f64 * 0.01, -77.0 - (i % 37) as f64 * 0.01))
            .collect();

        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &points, |b, points| {
            b.iter(|| {
                points
                    .iter()
                    .filter(|p| origin.within_km(black_box(p), 10.0))
                    .count()
            });
        });
    }
    group.finish();
}

/// Benchmark cache writes, hits and writes that trigger eviction
fn bench_memory_cache(c: &mut Criterion) {
    let ttl = std::time::Duration::from_secs(300);
    let value = json!({"id": "3f1c", "title": "Power drill", "daily_rate": "15.00"});

    c.bench_function("memory_cache_set", |b| {
        let cache = MemoryCache::new(10_000);
        let mut i = 0u64;
        b.iter(|| {
            cache.set(&format!("item:{}", i % 5_000), value.clone(), ttl);
            i += 1;
        });
    });

    c.bench_function("memory_cache_get_hit", |b| {
        let cache = MemoryCache::new(10_000);
        for i in 0..1_000 {
            cache.set(&format!("item:{}", i), value.clone(), ttl);
        }
        b.iter(|| cache.get(black_box("item:500")));
    });

    c.bench_function("memory_cache_set_evicting", |b| {
        let cache = MemoryCache::new(100);
        let mut i = 0u64;
        b.iter(|| {
            cache.set(&format!("search:{}", i), value.clone(), ttl);
            i += 1;
        });
    });
}

criterion_group!(benches, bench_pricing, bench_distance_filter, bench_memory_cache);
criterion_main!(benches);
