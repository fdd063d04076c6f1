use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use keplerian_transfer::{anomaly, Orbit};
use std::hint::black_box;

const POLL_ITERS: u64 = 1024;
const MULTIPLIER: f64 = std::f64::consts::TAU / POLL_ITERS as f64;

#[inline(always)]
fn poll_eccentric_anomaly(eccentricity: f64) {
    for i in 0..POLL_ITERS {
        let mean_anomaly = i as f64 * MULTIPLIER - std::f64::consts::PI;
        black_box(anomaly::mean_to_eccentric(
            black_box(mean_anomaly),
            black_box(eccentricity),
        ));
    }
}

#[inline(always)]
fn poll_position(orbit: &Orbit) {
    let period = orbit.get_period();
    let period = if period.is_finite() { period } else { 10.0 };

    for i in 0..POLL_ITERS {
        let time = i as f64 * period / POLL_ITERS as f64;
        black_box(orbit.get_position(black_box(time)));
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("eccentric_anomaly@mean_anomaly");
    group.throughput(Throughput::Elements(POLL_ITERS));

    group.bench_function("circular", |b| b.iter(|| poll_eccentric_anomaly(0.0)));
    group.bench_function("fixed point", |b| b.iter(|| poll_eccentric_anomaly(0.05)));
    group.bench_function("elliptic", |b| b.iter(|| poll_eccentric_anomaly(0.5)));
    group.bench_function("near parabolic", |b| b.iter(|| poll_eccentric_anomaly(0.99)));
    group.bench_function("hyperbolic", |b| b.iter(|| poll_eccentric_anomaly(2.9)));

    group.finish();

    let elliptic = Orbit::new(0.3, 1.0, 2.19, 0.44, 0.61, 0.98, 1.0).expect("valid orbit");
    let hyperbolic = Orbit::new(2.9, -1.0, 2.19, 0.44, 0.61, 0.98, 1.0).expect("valid orbit");

    let mut group = c.benchmark_group("position@time");
    group.throughput(Throughput::Elements(POLL_ITERS));

    group.bench_function("elliptic", |b| b.iter(|| poll_position(black_box(&elliptic))));
    group.bench_function("hyperbolic", |b| {
        b.iter(|| poll_position(black_box(&hyperbolic)))
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
