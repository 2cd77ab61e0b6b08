use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;

use evbus_core::{EventRegistry, Handler, args};

fn registry_with(handlers: usize) -> EventRegistry {
    let registry = EventRegistry::new();
    for i in 0..handlers {
        let offset = i as i64;
        registry
            .register(1, Handler::new(move |x: i64| x + offset))
            .unwrap();
    }
    registry
}

fn bench_send(c: &mut Criterion) {
    let mut group = c.benchmark_group("send");

    for handlers in [1usize, 8, 64] {
        let registry = registry_with(handlers);
        group.throughput(Throughput::Elements(handlers as u64));

        group.bench_with_input(BenchmarkId::new("send_as", handlers), &registry, |b, r| {
            b.iter(|| r.send_as::<i64>(black_box(1), args![black_box(5i64)]).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("sends_as", handlers), &registry, |b, r| {
            b.iter(|| r.sends_as::<i64>(black_box(1), args![black_box(5i64)]).unwrap())
        });
    }

    group.finish();
}

fn bench_register_unregister(c: &mut Criterion) {
    let registry = registry_with(16);
    let handler = Handler::new(|x: i64| x);

    c.bench_function("register_unregister", |b| {
        b.iter(|| {
            registry.register(1, handler.clone()).unwrap();
            registry.unregister(1, handler.clone());
        })
    });
}

fn bench_missing_id(c: &mut Criterion) {
    let registry = registry_with(1);

    c.bench_function("send_missing_id", |b| {
        b.iter(|| registry.send(black_box(404), args![5i64]).unwrap())
    });
}

criterion_group!(benches, bench_send, bench_register_unregister, bench_missing_id);
criterion_main!(benches);
