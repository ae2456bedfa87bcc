use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::error::AccessError;

/// 有上限的计数信号量 | Bounded counting semaphore
///
/// 基于 `Mutex` 和 `Condvar` 实现，表示资源池中当前空闲的实例数量。
/// 计数始终位于 `[0, capacity]` 区间内：`give` 不会越过上限，越界时返回
/// `AccessError::CapacityExceeded` 而不是静默截断。
///
/// 另外维护一个原子镜像值，供 `peek` 在不加锁的情况下读取（可能是过期值）。
pub struct AvailabilityCounter {
    capacity: usize,
    initial: usize,
    count: Mutex<usize>,
    freed: Condvar,
    hint: AtomicUsize,
}

impl AvailabilityCounter {
    /// 创建计数器，初始计数为 `initial`，上限为 `capacity`
    ///
    /// # Panics
    ///
    /// `capacity` 为 0 或 `initial > capacity` 时 panic。
    pub fn new(initial: usize, capacity: usize) -> Self {
        assert!(capacity > 0, "counter capacity must be positive");
        assert!(
            initial <= capacity,
            "initial count {initial} exceeds capacity {capacity}"
        );
        Self {
            capacity,
            initial,
            count: Mutex::new(initial),
            freed: Condvar::new(),
            hint: AtomicUsize::new(initial),
        }
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.count.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 计数上限
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 获取一个实例，最多等待 `wait` | Take one instance, waiting at most `wait`
    ///
    /// 成功时返回扣减后的计数；等待超时返回 `None`，计数保持不变。
    pub fn take_timeout(&self, wait: Duration) -> Option<usize> {
        let cnt = self.lock();
        let (mut cnt, _) = self
            .freed
            .wait_timeout_while(cnt, wait, |c| *c == 0)
            .unwrap_or_else(|e| e.into_inner());
        // 超时与最后一刻的 give 可能同时发生，以计数为准
        if *cnt == 0 {
            return None;
        }
        *cnt -= 1;
        self.hint.store(*cnt, Ordering::Release);
        Some(*cnt)
    }

    /// 非阻塞地获取一个实例 | Take one instance without waiting
    pub fn try_take(&self) -> Option<usize> {
        let mut cnt = self.lock();
        if *cnt == 0 {
            return None;
        }
        *cnt -= 1;
        self.hint.store(*cnt, Ordering::Release);
        Some(*cnt)
    }

    /// 归还一个实例并唤醒一个等待者 | Give back one instance and wake one waiter
    ///
    /// 返回增加后的计数；若已满则返回 `CapacityExceeded`，计数不变。
    pub fn give(&self) -> Result<usize, AccessError> {
        let mut cnt = self.lock();
        if *cnt >= self.capacity {
            return Err(AccessError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        *cnt += 1;
        let now = *cnt;
        self.hint.store(now, Ordering::Release);
        drop(cnt);
        self.freed.notify_one();
        Ok(now)
    }

    /// 加锁读取当前计数
    pub fn count(&self) -> usize {
        *self.lock()
    }

    /// 无锁读取计数镜像，可能已过期 | Lock-free read of the mirrored count; may be stale
    pub fn peek(&self) -> usize {
        self.hint.load(Ordering::Acquire)
    }

    /// 恢复到初始计数 | Restore the initial count
    pub fn reset(&self) {
        let mut cnt = self.lock();
        *cnt = self.initial;
        self.hint.store(self.initial, Ordering::Release);
        drop(cnt);
        self.freed.notify_all();
    }
}
