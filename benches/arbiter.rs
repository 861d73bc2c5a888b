//! Benchmarks for arbitration passes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use gpubudget::{kb, mb, ArbiterConfig, GpuMemoryManager, ManagedMemoryStats, OwnerId, ProcessId};

/// A manager with `clients` surfaces spread over 16 processes; a quarter
/// of them visible.
fn populated(clients: u64, ceiling: usize) -> GpuMemoryManager {
    let config = ArbiterConfig::default().with_bytes_available(ceiling);
    let (mut manager, queue) = GpuMemoryManager::with_queue(config);

    for i in 0..clients {
        let group = manager.tracking_group(ProcessId::new((i % 16) as u32)).unwrap();
        let handle = manager
            .create_client_state(OwnerId::new(i), group, true, i % 4 == 0)
            .unwrap();
        let required = mb(2) + kb(64) * (i as usize % 32);
        manager
            .set_client_managed_memory_stats(handle, ManagedMemoryStats::new(required, mb(1), kb(256)))
            .unwrap();
        queue.drain();
    }

    manager
}

fn bench_steady_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("steady_pass");

    for clients in [10u64, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(clients), &clients, |b, &clients| {
            let mut manager = populated(clients, mb(1024));
            b.iter(|| black_box(manager.manage().unwrap()));
        });
    }

    group.finish();
}

fn bench_pressure_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("pressure_pass");

    for clients in [10u64, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(clients), &clients, |b, &clients| {
            let mut manager = populated(clients, mb(64));
            b.iter(|| black_box(manager.manage().unwrap()));
        });
    }

    group.finish();
}

fn bench_visibility_flip(c: &mut Criterion) {
    let mut manager = populated(1000, mb(512));
    let handles: Vec<_> = manager.clients().map(|(handle, _)| handle).take(8).collect();

    c.bench_function("visibility_flip_1000", |b| {
        let mut visible = false;
        b.iter(|| {
            visible = !visible;
            for &handle in &handles {
                manager.set_client_visible(handle, visible).unwrap();
            }
        });
    });
}

criterion_group!(benches, bench_steady_pass, bench_pressure_pass, bench_visibility_flip);
criterion_main!(benches);
