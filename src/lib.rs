//! 有限实例资源池的并发访问控制。
//!
//! 一个守卫（零等待获取的互斥锁）保护一个有上限的可用计数器，
//! 生产者、消费者与守卫探测任务在不同优先级的线程上竞争访问。
//!
//! - [`ResourcePool`]：`acquire` / `release` 协议
//! - [`Orchestrator`]：按配置启动与停止各角色
//! - [`Scheduler`]、[`OutputSignal`]、[`EntropySource`]、[`DiagnosticSink`]：外部协作者接口

pub mod config;
pub mod diagnostics;
pub mod entropy;
pub mod error;
pub mod guard;
pub mod metrics;
pub mod orchestrator;
pub mod pool;
pub mod roles;
pub mod scheduler;
pub mod semaphore;
pub mod signal;
pub mod task_handle;
pub mod task_status;

pub use config::{
    Cadence, ConsumerConfig, OrchestratorConfig, PoolConfig, ProbeConfig, ProducerConfig,
    ReplenishPolicy, TogglePolicy,
};
pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, StdoutSink, TracingSink};
pub use entropy::{EntropySource, FixedEntropy, SeededEntropy, ThreadRngEntropy};
pub use error::{AccessError, OrchestratorError};
pub use guard::{Guard, GuardToken};
pub use metrics::{PoolStats, StatsSnapshot};
pub use orchestrator::{Orchestrator, SystemSnapshot};
pub use pool::ResourcePool;
pub use roles::RoleEnv;
pub use scheduler::{Priority, Scheduler, TaskEntry, TaskSpec, ThreadScheduler};
pub use semaphore::AvailabilityCounter;
pub use signal::{LogSignal, OutputSignal, RecordingSignal};
pub use task_handle::{TaskContext, TaskHandle};
pub use task_status::{TaskIdGenerator, TaskState};
