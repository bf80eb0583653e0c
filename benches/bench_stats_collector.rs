// benches/bench_stats_collector.rs
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use signal_control::flow_analyzer::StatsCollector;
use signal_control::simulation_engine::vehicles::{Direction, Vehicle, VehicleType};
use std::time::Duration;

fn bench_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("stats_collector");
    group.sample_size(100);
    group.measurement_time(Duration::from_secs(3));

    let vehicle = Vehicle::new("V1", VehicleType::Truck, Direction::South);
    group.bench_function("record_admission_and_departure", |b| {
        let mut stats = StatsCollector::new();
        let mut wait = 0.0;
        b.iter(|| {
            stats.record_admission(black_box(&vehicle));
            wait = (wait + 1.0) % 30.0;
            stats.record_departure(Direction::South, black_box(wait));
        });
    });

    group.bench_function("snapshot", |b| {
        let mut stats = StatsCollector::new();
        for i in 0..1000 {
            stats.record_admission(&vehicle);
            stats.record_departure(Direction::ALL[i % 4], (i % 17) as f64);
            stats.record_cycle();
        }
        b.iter(|| black_box(stats.snapshot_at(Duration::from_secs(600))));
    });
    group.finish();
}

criterion_group!(benches, bench_stats);
criterion_main!(benches);
