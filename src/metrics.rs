use std::sync::atomic::{AtomicU64, Ordering};
#[cfg(feature = "metrics")]
use std::sync::Mutex;
use std::time::Duration;

#[cfg(feature = "metrics")]
use hdrhistogram::Histogram;

use crate::error::AccessError;

/// 直方图可记录的最大耗时（微秒），超过的值按上限记录
#[cfg(feature = "metrics")]
const LATENCY_CEILING_MICROS: u64 = 60_000_000;

/// 资源池统计 | Pool statistics
///
/// 原子计数器始终可用；启用 `metrics` feature 时额外以直方图记录 acquire 耗时（微秒）。
pub struct PoolStats {
    acquired: AtomicU64,
    released: AtomicU64,
    guard_busy: AtomicU64,
    no_instance: AtomicU64,
    capacity_exceeded: AtomicU64,
    #[cfg(feature = "metrics")]
    acquire_latency: Option<Mutex<Histogram<u64>>>,
}

/// 某一时刻的统计快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub acquired: u64,
    pub released: u64,
    pub guard_busy: u64,
    pub no_instance: u64,
    pub capacity_exceeded: u64,
    /// acquire 耗时中位数（未启用 `metrics` 时为 `None`）
    pub acquire_p50: Option<Duration>,
    pub acquire_p99: Option<Duration>,
    pub acquire_max: Option<Duration>,
}

impl PoolStats {
    pub fn new() -> Self {
        Self {
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
            guard_busy: AtomicU64::new(0),
            no_instance: AtomicU64::new(0),
            capacity_exceeded: AtomicU64::new(0),
            #[cfg(feature = "metrics")]
            acquire_latency: Histogram::new_with_bounds(1, LATENCY_CEILING_MICROS, 3)
                .ok()
                .map(Mutex::new),
        }
    }

    pub(crate) fn record_acquire(&self, outcome: Result<usize, AccessError>, elapsed: Duration) {
        match outcome {
            Ok(_) => self.acquired.fetch_add(1, Ordering::Relaxed),
            Err(err) => self.record_error(err),
        };
        #[cfg(feature = "metrics")]
        if let Some(hist) = &self.acquire_latency {
            let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
            hist.lock()
                .unwrap_or_else(|e| e.into_inner())
                .saturating_record(micros);
        }
        #[cfg(not(feature = "metrics"))]
        let _ = elapsed;
    }

    pub(crate) fn record_release(&self, outcome: Result<usize, AccessError>) {
        match outcome {
            Ok(_) => self.released.fetch_add(1, Ordering::Relaxed),
            Err(err) => self.record_error(err),
        };
    }

    fn record_error(&self, err: AccessError) -> u64 {
        let counter = match err {
            AccessError::GuardBusy => &self.guard_busy,
            AccessError::NoInstanceAvailable(_) => &self.no_instance,
            AccessError::CapacityExceeded { .. } => &self.capacity_exceeded,
        };
        counter.fetch_add(1, Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        #[allow(unused_mut)]
        let mut snapshot = StatsSnapshot {
            acquired: self.acquired.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            guard_busy: self.guard_busy.load(Ordering::Relaxed),
            no_instance: self.no_instance.load(Ordering::Relaxed),
            capacity_exceeded: self.capacity_exceeded.load(Ordering::Relaxed),
            ..StatsSnapshot::default()
        };
        #[cfg(feature = "metrics")]
        if let Some(hist) = &self.acquire_latency {
            let hist = hist.lock().unwrap_or_else(|e| e.into_inner());
            if !hist.is_empty() {
                snapshot.acquire_p50 = Some(Duration::from_micros(hist.value_at_quantile(0.5)));
                snapshot.acquire_p99 = Some(Duration::from_micros(hist.value_at_quantile(0.99)));
                snapshot.acquire_max = Some(Duration::from_micros(hist.max()));
            }
        }
        snapshot
    }
}

impl Default for PoolStats {
    fn default() -> Self {
        Self::new()
    }
}
