// benches/bench_traffic_generation.rs
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use signal_control::config::IntersectionConfig;
use signal_control::simulation_engine::traffic_generation::TrafficGenerator;
use signal_control::{ControllerConfig, TrafficLightController};
use std::time::Duration;

fn controller_with(intersections: usize) -> TrafficLightController {
    let mut config = ControllerConfig {
        seed: Some(99),
        emergency_chance: 0.0,
        intersections: (0..intersections)
            .map(|i| IntersectionConfig {
                id: format!("I{}", i),
                timings: Vec::new(),
            })
            .collect(),
        ..ControllerConfig::default()
    };
    config.adaptive.enabled = false;
    match TrafficLightController::new(config) {
        Ok(controller) => controller,
        Err(e) => panic!("bench controller: {}", e),
    }
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("traffic_generation");
    group.sample_size(100);
    group.measurement_time(Duration::from_secs(3));

    group.bench_function("next_vehicle", |b| {
        let mut generator = TrafficGenerator::seeded(1, 0.05);
        let mut tick = 0;
        b.iter(|| {
            tick += 1;
            black_box(generator.next_vehicle(tick))
        });
    });

    // Generation step plus one control pass across the whole network.
    for &size in [1usize, 10, 50].iter() {
        group.bench_with_input(BenchmarkId::new("generate_and_tick", size), &size, |b, &size| {
            let controller = controller_with(size);
            b.iter(|| {
                black_box(controller.generate_traffic());
                black_box(controller.run_control_tick())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_generation);
criterion_main!(benches);
