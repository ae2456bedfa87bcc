use instance_pool::{AccessError, MemorySink, PoolConfig, ResourcePool};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

fn pool(capacity: usize, wait: Duration) -> (ResourcePool, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let cfg = PoolConfig::new(capacity).with_acquire_wait(wait);
    (ResourcePool::with_sink(&cfg, sink.clone()), sink)
}

fn drain(pool: &ResourcePool) {
    for _ in 0..pool.capacity() {
        pool.acquire("drain").expect("instance available");
    }
    assert_eq!(pool.available(), 0);
}

#[test]
fn three_concurrent_acquires_leave_seven() {
    let (pool, _sink) = pool(10, Duration::from_millis(50));
    let handles: Vec<_> = (0..3)
        .map(|i| {
            let pool = pool.clone();
            thread::spawn(move || {
                let name = format!("Consumer_{i}");
                loop {
                    match pool.acquire(&name) {
                        Ok(left) => return left,
                        Err(AccessError::GuardBusy) => thread::yield_now(),
                        Err(other) => panic!("unexpected {other:?}"),
                    }
                }
            })
        })
        .collect();

    let mut seen: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    seen.sort_unstable();
    assert_eq!(seen, vec![7, 8, 9]);
    assert_eq!(pool.available(), 7);
}

#[test]
fn empty_pool_times_out_after_bound() {
    let (pool, sink) = pool(10, Duration::from_millis(50));
    drain(&pool);
    sink.drain();

    let start = Instant::now();
    let result = pool.acquire("Consumer_2");
    let elapsed = start.elapsed();

    assert_eq!(
        result,
        Err(AccessError::NoInstanceAvailable(Duration::from_millis(50)))
    );
    assert!(elapsed >= Duration::from_millis(50), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(300), "returned late: {elapsed:?}");
    assert_eq!(pool.available(), 0);
    assert!(!pool.guard().is_held());
    assert_eq!(sink.drain(), vec!["Consumer_2: Semaphore not available"]);
}

#[test]
fn held_guard_makes_both_operations_busy_immediately() {
    let (pool, sink) = pool(10, Duration::from_millis(50));
    pool.acquire("Consumer_1").unwrap();
    sink.drain();

    let _token = pool.guard().try_lock("intruder").expect("guard free");

    let start = Instant::now();
    assert_eq!(pool.acquire("Consumer_1"), Err(AccessError::GuardBusy));
    assert_eq!(pool.release("Producer"), Err(AccessError::GuardBusy));
    assert!(start.elapsed() < Duration::from_millis(20));

    assert_eq!(pool.available(), 9);
    assert_eq!(
        sink.drain(),
        vec!["Consumer_1: Mutex not available", "Producer: Mutex not available"]
    );
}

#[test]
fn guard_blocked_callers_always_return() {
    let (pool, _sink) = pool(4, Duration::from_millis(50));
    let token = pool.guard().try_lock("blocker").unwrap();

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let pool = pool.clone();
            thread::spawn(move || {
                let start = Instant::now();
                for _ in 0..100 {
                    assert_eq!(pool.acquire(&format!("a{i}")), Err(AccessError::GuardBusy));
                    assert_eq!(pool.release(&format!("r{i}")), Err(AccessError::GuardBusy));
                }
                start.elapsed()
            })
        })
        .collect();

    for h in handles {
        assert!(h.join().unwrap() < Duration::from_secs(1));
    }
    drop(token);
    assert_eq!(pool.available(), 4);
}

#[test]
fn outstanding_instances_never_exceed_capacity() {
    const CAPACITY: usize = 3;
    let (pool, _sink) = pool(CAPACITY, Duration::from_millis(5));
    let outstanding = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let pool = pool.clone();
            let outstanding = Arc::clone(&outstanding);
            let peak = Arc::clone(&peak);
            thread::spawn(move || {
                let name = format!("worker_{i}");
                for _ in 0..50 {
                    if pool.acquire(&name).is_err() {
                        thread::yield_now();
                        continue;
                    }
                    let now = outstanding.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    thread::sleep(Duration::from_micros(200));
                    outstanding.fetch_sub(1, Ordering::SeqCst);
                    loop {
                        match pool.release(&name) {
                            Ok(_) => break,
                            Err(AccessError::GuardBusy) => thread::yield_now(),
                            Err(other) => panic!("unbalanced release: {other}"),
                        }
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
    assert!(peak.load(Ordering::SeqCst) <= CAPACITY);
    assert_eq!(pool.available(), CAPACITY);
    let stats = pool.stats();
    assert_eq!(stats.acquired, stats.released);
}

#[test]
fn peek_is_a_hint_that_tracks_committed_changes() {
    let (pool, _sink) = pool(5, Duration::from_millis(10));
    assert_eq!(pool.peek_available(), 5);
    pool.acquire("c").unwrap();
    pool.acquire("c").unwrap();
    assert_eq!(pool.peek_available(), 3);
    pool.release("p").unwrap();
    assert_eq!(pool.peek_available(), 4);
}

#[test]
fn release_on_full_pool_is_rejected_loudly() {
    let (pool, sink) = pool(10, Duration::from_millis(10));
    assert_eq!(
        pool.release("Producer"),
        Err(AccessError::CapacityExceeded { capacity: 10 })
    );
    assert_eq!(pool.available(), 10);
    assert_eq!(pool.stats().capacity_exceeded, 1);
    assert_eq!(
        sink.drain(),
        vec!["Producer: Release rejected, pool already at capacity 10"]
    );
}
