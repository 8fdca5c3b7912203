use keylock::config::BackoffConfig;
use keylock::locking::{AcquireOptions, AcquireOutcome, LockRegistry, WaitStats};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

fn config(retries: usize, initial: Duration, max: Duration, jitter: f64) -> BackoffConfig {
    BackoffConfig::default()
        .with_delays(initial, max)
        .with_factor(2.0)
        .with_jitter(jitter)
        .with_max_retries(retries)
}

#[test]
fn racing_exclusive_lockers_admit_exactly_one() {
    const WORKERS: usize = 16;
    let registry = Arc::new(LockRegistry::<&'static str>::with_config(config(
        3,
        Duration::from_micros(100),
        Duration::from_micros(400),
        0.2,
    )));
    let barrier = Arc::new(Barrier::new(WORKERS));
    let winners = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            let winners = Arc::clone(&winners);
            thread::spawn(move || {
                barrier.wait();
                if registry.try_lock("x") {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(winners.load(Ordering::SeqCst), 1);
    assert_eq!(registry.lock_count(&"x"), Some(0));
}

#[test]
fn concurrent_readers_are_all_counted() {
    const READERS: usize = 24;
    let registry = Arc::new(LockRegistry::<String>::new());
    let barrier = Arc::new(Barrier::new(READERS));

    let handles: Vec<_> = (0..READERS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.try_rlock("shared".to_string())
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }

    let key = "shared".to_string();
    assert_eq!(registry.lock_count(&key), Some(READERS));

    let handles: Vec<_> = (0..READERS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.runlock("shared"))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(!registry.is_locked(&key));
    assert!(registry.is_empty());
}

#[test]
fn exclusive_and_shared_exclude_each_other_across_threads() {
    let registry = Arc::new(LockRegistry::<u64>::with_config(config(
        3,
        Duration::from_micros(100),
        Duration::from_micros(200),
        0.0,
    )));

    assert!(registry.try_lock(7));
    let reader = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || registry.try_rlock(7))
    };
    assert!(!reader.join().unwrap());
    registry.unlock(&7);

    assert!(registry.try_rlock(7));
    let writer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || registry.try_lock(7))
    };
    assert!(!writer.join().unwrap());
    assert_eq!(registry.lock_count(&7), Some(1));

    registry.runlock(&7);
    let writer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || registry.try_lock(7))
    };
    assert!(writer.join().unwrap());
}

#[test]
fn held_key_fails_within_retry_bound() {
    let config = config(6, Duration::from_millis(1), Duration::from_millis(4), 0.5);
    let bound = config.worst_case_wait();
    let registry = LockRegistry::with_config(config);
    assert!(registry.try_lock("held"));

    let started = Instant::now();
    let report = registry.try_lock_with("held", &AcquireOptions::new());
    let elapsed = started.elapsed();

    assert_eq!(report.outcome, AcquireOutcome::Exhausted);
    assert_eq!(report.attempts, 6);
    // Scheduler slack on top of the sleep budget.
    assert!(
        elapsed <= bound + Duration::from_millis(250),
        "waited {elapsed:?}, bound {bound:?}"
    );
}

#[test]
fn end_to_end_contention_scenario() {
    let registry = Arc::new(LockRegistry::<String>::with_config(config(
        3,
        Duration::from_millis(1),
        Duration::from_millis(5),
        0.0,
    )));

    // Thread A takes the key.
    let holder = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || registry.try_lock("k".to_string()))
    };
    assert!(holder.join().unwrap());

    // Thread B sleeps 1ms, 2ms, 4ms between its three probes and gives up.
    let contender = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            let started = Instant::now();
            let acquired = registry.try_lock("k".to_string());
            (acquired, started.elapsed())
        })
    };
    let (acquired, elapsed) = contender.join().unwrap();
    assert!(!acquired);
    assert!(elapsed >= Duration::from_millis(7), "waited {elapsed:?}");

    registry.unlock("k");

    let contender = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || registry.try_lock("k".to_string()))
    };
    assert!(contender.join().unwrap());
}

#[test]
fn waiters_progress_as_holders_release() {
    const WORKERS: usize = 8;
    const ROUNDS: usize = 25;
    let registry = Arc::new(LockRegistry::<&'static str>::with_config(config(
        5_000,
        Duration::from_micros(20),
        Duration::from_micros(500),
        0.2,
    )));
    let stats = Arc::new(WaitStats::new());
    let inside = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let stats = Arc::clone(&stats);
            let inside = Arc::clone(&inside);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let options = AcquireOptions::new().with_observer(stats.as_ref());
                    let guard = registry.lock_with("critical", &options).unwrap();
                    assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                    thread::sleep(Duration::from_micros(50));
                    inside.fetch_sub(1, Ordering::SeqCst);
                    drop(guard);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.acquired, (WORKERS * ROUNDS) as u64);
    assert_eq!(snapshot.exhausted, 0);
    assert!(registry.is_empty());
}

#[test]
fn independent_registries_do_not_share_state() {
    let first = LockRegistry::<&'static str>::with_config(BackoffConfig::exclusive_only());
    let second = LockRegistry::<&'static str>::new();

    assert!(first.try_lock("k"));
    assert!(!second.is_locked(&"k"));
    assert!(second.try_lock("k"));
    assert_eq!(first.config().max_retries, 450);
    assert_eq!(second.config().max_retries, 512);
}

#[test]
fn try_with_config_validates() {
    let err = LockRegistry::<u8>::try_with_config(BackoffConfig::default().with_jitter(2.0))
        .unwrap_err();
    assert!(err.to_string().contains("Invalid configuration"));
    let registry = LockRegistry::<u8>::try_with_config(BackoffConfig::default());
    assert!(registry.is_ok());
}
