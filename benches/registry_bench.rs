use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use keylock::config::BackoffConfig;
use keylock::locking::{Backoff, LockRegistry};

fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended");

    // Table size affects hashing, not the probe itself
    for held in [0usize, 1_000, 100_000] {
        let registry = LockRegistry::<u64>::new();
        for key in 0..held as u64 {
            assert!(registry.try_rlock(key));
        }
        let probe_key = u64::MAX;

        group.bench_with_input(
            BenchmarkId::new("lock_unlock", held),
            &registry,
            |b, registry| {
                b.iter(|| {
                    assert!(registry.try_lock(black_box(probe_key)));
                    registry.unlock(black_box(&probe_key));
                })
            },
        );
    }

    let registry = LockRegistry::<String>::new();
    group.bench_function("rlock_runlock_string", |b| {
        let key = "orders/42".to_string();
        b.iter(|| {
            assert!(registry.try_rlock(black_box(key.clone())));
            registry.runlock(black_box(&key));
        })
    });

    group.bench_function("is_locked_miss", |b| {
        let key = "absent".to_string();
        b.iter(|| registry.is_locked(black_box(&key)))
    });

    group.finish();
}

fn bench_backoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("backoff");
    let backoff = Backoff::new(&BackoffConfig::default());

    for attempt in [1usize, 50, 500] {
        group.bench_with_input(
            BenchmarkId::new("delay", attempt),
            &attempt,
            |b, attempt| b.iter(|| backoff.delay(black_box(*attempt))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_uncontended, bench_backoff);
criterion_main!(benches);
