use std::collections::HashSet;
use std::time::Duration;

use crate::entropy::EntropySource;
use crate::error::OrchestratorError;
use crate::scheduler::Priority;

/// PoolConfig 表示资源池的固定参数。
///
/// 字段：
/// - `capacity`: 实例总数，初始化后不再改变。
/// - `acquire_wait`: acquire 在持有守卫时等待空闲实例的最长时间。
///
/// 示例：
/// ```ignore
/// use instance_pool::PoolConfig;
/// use std::time::Duration;
///
/// let cfg = PoolConfig::new(4).with_acquire_wait(Duration::from_millis(20));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    pub(crate) capacity: usize,
    pub(crate) acquire_wait: Duration,
}

impl PoolConfig {
    /// # 创建一个PoolConfig，等待上限默认 50ms
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            acquire_wait: Duration::from_millis(50),
        }
    }

    /// # 设置 acquire 的有界等待时长
    pub fn with_acquire_wait(mut self, wait: Duration) -> Self {
        self.acquire_wait = wait;
        self
    }

    /// # 获取容量
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// # 获取有界等待时长
    pub fn acquire_wait(&self) -> Duration {
        self.acquire_wait
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new(10)
    }
}

/// 循环节奏：基础间隔加随机抖动 | Loop cadence: base interval plus jitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    pub base: Duration,
    pub jitter_ms: u32,
}

impl Cadence {
    pub fn new(base: Duration, jitter_ms: u32) -> Self {
        Self { base, jitter_ms }
    }

    /// 计算下一次休眠时长：`base + random_u32() % jitter_ms` 毫秒
    pub fn next_interval(&self, entropy: &dyn EntropySource) -> Duration {
        if self.jitter_ms == 0 {
            return self.base;
        }
        let jitter = entropy.random_u32() % self.jitter_ms;
        self.base + Duration::from_millis(u64::from(jitter))
    }
}

/// 生产者补充策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplenishPolicy {
    /// 仅当提示值大于 0 时归还实例（池空时从不补充）
    #[default]
    WhenAnyAvailable,
    /// 当提示值小于容量时归还实例
    WhenBelowCapacity,
}

/// 消费者输出翻转策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TogglePolicy {
    /// 每轮都翻转输出，无论 acquire 是否成功
    #[default]
    Always,
    /// 仅在 acquire 成功后翻转
    OnSuccess,
}

/// 生产者角色配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducerConfig {
    pub name: String,
    pub priority: Priority,
    pub start_delay: Duration,
    pub cadence: Cadence,
    pub channel: u8,
    pub policy: ReplenishPolicy,
    /// 提示值表明无事可做时的轮询间隔
    pub idle_poll: Duration,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            name: "Producer".to_string(),
            priority: Priority(5),
            start_delay: Duration::ZERO,
            cadence: Cadence::new(Duration::from_millis(1500), 10),
            channel: 1,
            policy: ReplenishPolicy::default(),
            idle_poll: Duration::from_millis(10),
        }
    }
}

/// 消费者角色配置（所有实例共享）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// 名称前缀，实例名为 `<prefix>_<n>`，n 从 1 开始
    pub name_prefix: String,
    pub instances: usize,
    pub priority: Priority,
    pub start_delay: Duration,
    pub cadence: Cadence,
    pub channel: u8,
    pub toggle: TogglePolicy,
}

impl ConsumerConfig {
    /// 第 `index` 个实例的名称（从 0 计）
    pub fn instance_name(&self, index: usize) -> String {
        format!("{}_{}", self.name_prefix, index + 1)
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            name_prefix: "Consumer".to_string(),
            instances: 2,
            priority: Priority(4),
            start_delay: Duration::from_secs(3),
            cadence: Cadence::new(Duration::from_millis(1000), 10),
            channel: 0,
            toggle: TogglePolicy::default(),
        }
    }
}

/// 守卫探测角色配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub name: String,
    pub priority: Priority,
    pub start_delay: Duration,
    pub hold: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            name: "Main".to_string(),
            priority: Priority(6),
            start_delay: Duration::ZERO,
            hold: Duration::from_millis(100),
        }
    }
}

/// 编排器配置，聚合资源池与各角色参数。
///
/// 示例：
/// ```ignore
/// use instance_pool::{OrchestratorConfig, PoolConfig};
/// use std::time::Duration;
///
/// let cfg = OrchestratorConfig::new()
///     .with_pool(PoolConfig::new(4))
///     .with_consumer_start_delay(Duration::from_millis(100));
/// cfg.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub pool: PoolConfig,
    pub producer: ProducerConfig,
    pub consumer: ConsumerConfig,
    pub probe: ProbeConfig,
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_producer(mut self, producer: ProducerConfig) -> Self {
        self.producer = producer;
        self
    }

    pub fn with_consumer(mut self, consumer: ConsumerConfig) -> Self {
        self.consumer = consumer;
        self
    }

    pub fn with_probe(mut self, probe: ProbeConfig) -> Self {
        self.probe = probe;
        self
    }

    /// 设置消费者相对生产者的启动延迟
    pub fn with_consumer_start_delay(mut self, delay: Duration) -> Self {
        self.consumer.start_delay = delay;
        self
    }

    /// # 校验配置
    ///
    /// 拒绝容量为 0、没有消费者以及角色优先级重复的配置。
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.pool.capacity == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "pool capacity must be positive".to_string(),
            ));
        }
        if self.consumer.instances == 0 {
            return Err(OrchestratorError::InvalidConfig(
                "at least one consumer is required".to_string(),
            ));
        }
        let priorities = [
            self.producer.priority,
            self.consumer.priority,
            self.probe.priority,
        ];
        let distinct: HashSet<_> = priorities.iter().collect();
        if distinct.len() != priorities.len() {
            return Err(OrchestratorError::InvalidConfig(format!(
                "role priorities must be distinct, got {priorities:?}"
            )));
        }
        Ok(())
    }
}
