// benches/bench_emergency_dispatch.rs
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use signal_control::control_system::emergency_dispatcher::EmergencyDispatcher;
use signal_control::simulation_engine::vehicles::{Direction, Vehicle, VehicleType};
use std::time::Duration;

const EMERGENCY_TYPES: [VehicleType; 3] = [
    VehicleType::Ambulance,
    VehicleType::FireTruck,
    VehicleType::Police,
];

fn filled_dispatcher(pending: usize, intersections: usize) -> EmergencyDispatcher {
    let mut dispatcher = EmergencyDispatcher::new();
    for i in 0..pending {
        let vehicle = Vehicle::new(
            format!("E{}", i),
            EMERGENCY_TYPES[i % EMERGENCY_TYPES.len()],
            Direction::ALL[i % 4],
        )
        .with_arrival(i as u64);
        dispatcher.enqueue(format!("I{}", i % intersections), vehicle);
    }
    dispatcher
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("emergency_dispatch");
    group.sample_size(50);
    group.measurement_time(Duration::from_secs(5));

    for &pending in [10usize, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("plan", pending), &pending, |b, &pending| {
            b.iter_batched(
                || filled_dispatcher(pending, 8),
                |mut dispatcher| black_box(dispatcher.plan()),
                criterion::BatchSize::SmallInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("drain", pending), &pending, |b, &pending| {
            b.iter_batched(
                || filled_dispatcher(pending, 8),
                |mut dispatcher| {
                    while let Some(request) = dispatcher.pop() {
                        black_box(request);
                    }
                    dispatcher.settle()
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dispatch);
criterion_main!(benches);
