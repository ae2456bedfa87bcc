use std::sync::Arc;

use crate::config::{ConsumerConfig, ProbeConfig, ProducerConfig, ReplenishPolicy, TogglePolicy};
use crate::diagnostics::Diagnostic;
use crate::entropy::EntropySource;
use crate::error::AccessError;
use crate::pool::ResourcePool;
use crate::signal::OutputSignal;
use crate::task_handle::TaskContext;

/// 角色运行所需的共享协作者
///
/// 编排器在 spawn 时把同一份资源池句柄交给每个角色，角色之间不直接通信。
#[derive(Clone)]
pub struct RoleEnv {
    pub pool: ResourcePool,
    pub signal: Arc<dyn OutputSignal>,
    pub entropy: Arc<dyn EntropySource>,
}

impl RoleEnv {
    pub fn new(
        pool: ResourcePool,
        signal: Arc<dyn OutputSignal>,
        entropy: Arc<dyn EntropySource>,
    ) -> Self {
        Self {
            pool,
            signal,
            entropy,
        }
    }
}

/// 根据提示值判断生产者本轮是否归还实例
pub fn should_replenish(policy: ReplenishPolicy, hint: usize, capacity: usize) -> bool {
    match policy {
        ReplenishPolicy::WhenAnyAvailable => hint > 0,
        ReplenishPolicy::WhenBelowCapacity => hint < capacity,
    }
}

/// 生产者循环
///
/// 先不加锁地读取可用数量提示，满足策略时调用 `release` 并翻转输出。
/// 提示值可能已经过期，`release` 在守卫内做最终判断。
pub fn run_producer(ctx: &TaskContext, env: &RoleEnv, cfg: &ProducerConfig) {
    let name = ctx.name();
    env.pool.diagnostics().emit(&Diagnostic::TaskStarted { name });

    loop {
        let hint = env.pool.peek_available();
        if !should_replenish(cfg.policy, hint, env.pool.capacity()) {
            if !ctx.sleep(cfg.idle_poll) {
                break;
            }
            continue;
        }

        match env.pool.release(name) {
            Ok(available) => tracing::trace!(role = name, available, "replenished"),
            // 已由资源池以 error 级别报告
            Err(AccessError::CapacityExceeded { .. }) => {}
            Err(err) => tracing::debug!(role = name, %err, "release deferred"),
        }
        env.signal.toggle(cfg.channel);

        if !ctx.sleep(cfg.cadence.next_interval(env.entropy.as_ref())) {
            break;
        }
    }
    tracing::info!(role = name, "producer stopped");
}

/// 消费者循环
///
/// 每轮调用一次 `acquire`，按 `TogglePolicy` 翻转输出，然后休眠模拟工作。
/// `GuardBusy` 与 `NoInstanceAvailable` 都在下一轮重试。
pub fn run_consumer(ctx: &TaskContext, env: &RoleEnv, cfg: &ConsumerConfig) {
    let name = ctx.name();
    env.pool.diagnostics().emit(&Diagnostic::TaskStarted { name });

    loop {
        let outcome = env.pool.acquire(name);
        if let Err(err) = outcome {
            tracing::debug!(role = name, %err, "acquire deferred");
        }
        if cfg.toggle == TogglePolicy::Always || outcome.is_ok() {
            env.signal.toggle(cfg.channel);
        }

        if !ctx.sleep(cfg.cadence.next_interval(env.entropy.as_ref())) {
            break;
        }
    }
    tracing::info!(role = name, "consumer stopped");
}

/// 守卫探测：无限期阻塞获取守卫，短暂持有后释放并结束
pub fn run_guard_probe(ctx: &TaskContext, env: &RoleEnv, cfg: &ProbeConfig) {
    let sink = env.pool.diagnostics();
    sink.emit(&Diagnostic::ProbeStarted);

    let token = env.pool.guard().lock(ctx.name());
    sink.emit(&Diagnostic::ProbeTookGuard);
    ctx.sleep(cfg.hold);
    drop(token);
}
