use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::PoolConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::AccessError;
use crate::guard::Guard;
use crate::metrics::{PoolStats, StatsSnapshot};
use crate::semaphore::AvailabilityCounter;

/// 资源池：守卫 + 可用计数器 | Resource pool: guard plus availability counter
///
/// 可克隆的共享句柄，所有克隆指向同一份状态。编排器创建后在启动时传给每个角色。
///
/// 协议约束：
/// - 守卫只用零等待方式获取，失败立即返回 `AccessError::GuardBusy`；
/// - 持有守卫期间的等待都是有界的；
/// - 守卫由 RAII 令牌持有，所有返回路径上都会释放。
///
/// 使用示例：
/// ```ignore
/// use instance_pool::{PoolConfig, ResourcePool};
///
/// let pool = ResourcePool::new(&PoolConfig::new(10));
/// let left = pool.acquire("Consumer_1")?;
/// pool.release("Consumer_1")?;
/// ```
#[derive(Clone)]
pub struct ResourcePool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    acquire_wait: Duration,
    guard: Guard,
    counter: AvailabilityCounter,
    sink: Arc<dyn DiagnosticSink>,
    stats: PoolStats,
}

impl ResourcePool {
    /// # 创建一个满载的资源池，诊断输出到 `tracing`
    ///
    /// # Panics
    ///
    /// 容量为 0 时 panic；编排器在构造前通过 `OrchestratorConfig::validate` 拦截。
    pub fn new(config: &PoolConfig) -> Self {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    /// # 使用指定诊断输出创建资源池
    pub fn with_sink(config: &PoolConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                acquire_wait: config.acquire_wait,
                guard: Guard::new(),
                counter: AvailabilityCounter::new(config.capacity, config.capacity),
                sink,
                stats: PoolStats::new(),
            }),
        }
    }

    /// # 为 `name` 获取一个实例
    ///
    /// 1. 零等待获取守卫，失败返回 `GuardBusy`；
    /// 2. 持有守卫，最多等待 `acquire_wait` 扣减计数，超时返回 `NoInstanceAvailable`；
    /// 3. 成功时返回扣减后的可用数量。
    ///
    /// 返回前守卫一定已经释放。
    pub fn acquire(&self, name: &str) -> Result<usize, AccessError> {
        let started = Instant::now();
        let outcome = self.acquire_inner(name);
        self.inner.stats.record_acquire(outcome, started.elapsed());
        outcome
    }

    fn acquire_inner(&self, name: &str) -> Result<usize, AccessError> {
        let inner = &*self.inner;
        let Some(token) = inner.guard.try_lock(name) else {
            inner.sink.emit(&Diagnostic::GuardBusy { name });
            return Err(AccessError::GuardBusy);
        };

        match inner.counter.take_timeout(inner.acquire_wait) {
            Some(available) => {
                inner.sink.emit(&Diagnostic::Taken { name, available });
                Ok(available)
            }
            None => {
                token.unlock();
                inner.sink.emit(&Diagnostic::NoInstance { name });
                Err(AccessError::NoInstanceAvailable(inner.acquire_wait))
            }
        }
    }

    /// # 为 `name` 归还一个实例
    ///
    /// 零等待获取守卫，失败返回 `GuardBusy` 且不改变任何状态（调用方手中的实例尚未归还）。
    /// 计数已满时返回 `CapacityExceeded`：acquire / release 调用不平衡，属于协议违规。
    pub fn release(&self, name: &str) -> Result<usize, AccessError> {
        let outcome = self.release_inner(name);
        self.inner.stats.record_release(outcome);
        outcome
    }

    fn release_inner(&self, name: &str) -> Result<usize, AccessError> {
        let inner = &*self.inner;
        let Some(_token) = inner.guard.try_lock(name) else {
            inner.sink.emit(&Diagnostic::GuardBusy { name });
            return Err(AccessError::GuardBusy);
        };

        match inner.counter.give() {
            Ok(available) => {
                inner.sink.emit(&Diagnostic::Given { name, available });
                Ok(available)
            }
            Err(err) => {
                let capacity = inner.counter.capacity();
                tracing::error!(
                    role = name,
                    capacity,
                    "unbalanced release: pool already full"
                );
                inner.sink.emit(&Diagnostic::CapacityExceeded { name, capacity });
                Err(err)
            }
        }
    }

    /// # 不加锁读取可用数量提示
    ///
    /// 读取结果随时可能过期，只能作为建议；权威判断发生在 `acquire` / `release`
    /// 的守卫保护路径内。
    pub fn peek_available(&self) -> usize {
        self.inner.counter.peek()
    }

    /// # 读取当前可用数量（短暂加锁计数器，不获取守卫）
    pub fn available(&self) -> usize {
        self.inner.counter.count()
    }

    /// # 获取容量
    pub fn capacity(&self) -> usize {
        self.inner.counter.capacity()
    }

    /// # 获取有界等待时长
    pub fn acquire_wait(&self) -> Duration {
        self.inner.acquire_wait
    }

    /// # 直接访问守卫
    ///
    /// 供守卫探测任务及测试使用；绕过了零等待约束。
    pub fn guard(&self) -> &Guard {
        &self.inner.guard
    }

    /// 直接访问计数器，绕过守卫
    #[cfg(test)]
    pub(crate) fn counter(&self) -> &AvailabilityCounter {
        &self.inner.counter
    }

    /// # 诊断输出
    pub fn diagnostics(&self) -> &dyn DiagnosticSink {
        self.inner.sink.as_ref()
    }

    /// # 统计快照
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// # 重置为初始状态
    ///
    /// 计数恢复为容量，守卫恢复空闲。调用前应先让所有角色停止。
    pub fn reset(&self) {
        if let Some(holder) = self.inner.guard.reset() {
            tracing::warn!(holder = %holder, "guard forcibly reset while held");
        }
        self.inner.counter.reset();
    }
}
