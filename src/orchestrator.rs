use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::OrchestratorConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::entropy::{EntropySource, ThreadRngEntropy};
use crate::error::OrchestratorError;
use crate::metrics::StatsSnapshot;
use crate::pool::ResourcePool;
use crate::roles::{RoleEnv, run_consumer, run_guard_probe, run_producer};
use crate::scheduler::{Scheduler, TaskEntry, TaskSpec, ThreadScheduler};
use crate::signal::{LogSignal, OutputSignal};
use crate::task_handle::{TaskContext, TaskHandle};
use crate::task_status::TaskState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum RoleKind {
    Producer,
    Consumer,
    Probe,
}

/// 一次 `start` 启动的角色任务，按生产者、消费者、探测任务排列
struct RoleTasks {
    handles: Vec<(RoleKind, TaskHandle)>,
}

impl RoleTasks {
    fn new(mut handles: Vec<(RoleKind, TaskHandle)>) -> Self {
        handles.sort_by_key(|(kind, _)| *kind);
        Self { handles }
    }

    fn all(&self) -> impl Iterator<Item = &TaskHandle> {
        self.handles.iter().map(|(_, handle)| handle)
    }

    fn of(&self, wanted: fn(RoleKind) -> bool) -> impl Iterator<Item = &TaskHandle> {
        self.handles
            .iter()
            .filter(move |(kind, _)| wanted(*kind))
            .map(|(_, handle)| handle)
    }
}

/// 系统快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSnapshot {
    pub available: usize,
    pub capacity: usize,
    pub guard_holder: Option<String>,
    pub tasks: Vec<(String, TaskState)>,
    pub stats: StatsSnapshot,
}

/// 编排器：创建资源池，按优先级与启动延迟启动各角色，并在关闭时挂起与重置。
///
/// 使用示例：
/// ```ignore
/// use instance_pool::{Orchestrator, OrchestratorConfig};
///
/// let orchestrator = Orchestrator::new(OrchestratorConfig::default())?;
/// orchestrator.start()?;
/// // ...
/// orchestrator.stop()?;
/// ```
pub struct Orchestrator<S: Scheduler = ThreadScheduler> {
    config: OrchestratorConfig,
    pool: ResourcePool,
    scheduler: S,
    signal: Arc<dyn OutputSignal>,
    entropy: Arc<dyn EntropySource>,
    tasks: Mutex<Option<RoleTasks>>,
}

impl Orchestrator<ThreadScheduler> {
    /// # 使用默认协作者创建编排器
    ///
    /// 诊断输出到 `tracing`，输出翻转记录为 debug 事件，抖动来自线程本地随机数。
    pub fn new(config: OrchestratorConfig) -> Result<Self, OrchestratorError> {
        Self::with_sink(config, Arc::new(TracingSink))
    }

    /// # 使用指定诊断输出创建编排器
    pub fn with_sink(
        config: OrchestratorConfig,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<Self, OrchestratorError> {
        Self::with_scheduler(config, sink, ThreadScheduler::new())
    }
}

impl<S: Scheduler> Orchestrator<S> {
    /// # 使用指定调度器创建编排器
    pub fn with_scheduler(
        config: OrchestratorConfig,
        sink: Arc<dyn DiagnosticSink>,
        scheduler: S,
    ) -> Result<Self, OrchestratorError> {
        config.validate()?;
        let pool = ResourcePool::with_sink(&config.pool, sink);
        Ok(Self {
            config,
            pool,
            scheduler,
            signal: Arc::new(LogSignal),
            entropy: Arc::new(ThreadRngEntropy),
            tasks: Mutex::new(None),
        })
    }

    /// # 替换输出翻转信号
    pub fn with_signal(mut self, signal: Arc<dyn OutputSignal>) -> Self {
        self.signal = signal;
        self
    }

    /// # 替换熵源
    pub fn with_entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }

    fn lock_tasks(&self) -> MutexGuard<'_, Option<RoleTasks>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// # 资源池句柄
    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    /// # 配置
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// # 角色是否在运行
    pub fn is_running(&self) -> bool {
        self.lock_tasks().is_some()
    }

    /// # 启动所有角色
    ///
    /// 先把资源池初始化为满载、守卫空闲，然后按优先级从高到低启动生产者、
    /// 消费者（带启动延迟）与守卫探测任务。已在运行时返回 `AlreadyRunning`。
    pub fn start(&self) -> Result<(), OrchestratorError> {
        let mut tasks = self.lock_tasks();
        if tasks.is_some() {
            return Err(OrchestratorError::AlreadyRunning);
        }
        self.pool.reset();

        let env = RoleEnv::new(
            self.pool.clone(),
            Arc::clone(&self.signal),
            Arc::clone(&self.entropy),
        );
        let mut spawned = Vec::new();
        match self.spawn_roles(&env, &mut spawned) {
            Ok(roles) => {
                *tasks = Some(roles);
                self.pool.diagnostics().emit(&Diagnostic::TasksCreated);
                Ok(())
            }
            Err(err) => {
                // 部分启动失败：等待已启动的任务退出后再重置
                for handle in &spawned {
                    self.scheduler.suspend(handle);
                }
                for handle in &spawned {
                    if let Err(join_err) = handle.join() {
                        tracing::error!(task = handle.name(), %join_err, "task ended abnormally");
                    }
                }
                self.pool.reset();
                Err(err)
            }
        }
    }

    /// 每个角色的任务描述与入口，按优先级排序
    fn role_entries(&self, env: &RoleEnv) -> Vec<(RoleKind, TaskSpec, TaskEntry)> {
        let mut entries = Vec::with_capacity(self.config.consumer.instances + 2);

        let producer_cfg = self.config.producer.clone();
        let producer_env = env.clone();
        let spec = TaskSpec::new(producer_cfg.name.clone(), producer_cfg.priority)
            .with_initial_delay(producer_cfg.start_delay);
        let entry: TaskEntry =
            Box::new(move |ctx: &TaskContext| run_producer(ctx, &producer_env, &producer_cfg));
        entries.push((RoleKind::Producer, spec, entry));

        for index in 0..self.config.consumer.instances {
            let consumer_cfg = self.config.consumer.clone();
            let consumer_env = env.clone();
            let spec = TaskSpec::new(consumer_cfg.instance_name(index), consumer_cfg.priority)
                .with_initial_delay(consumer_cfg.start_delay);
            let entry: TaskEntry =
                Box::new(move |ctx: &TaskContext| run_consumer(ctx, &consumer_env, &consumer_cfg));
            entries.push((RoleKind::Consumer, spec, entry));
        }

        let probe_cfg = self.config.probe.clone();
        let probe_env = env.clone();
        let spec = TaskSpec::new(probe_cfg.name.clone(), probe_cfg.priority)
            .with_initial_delay(probe_cfg.start_delay);
        let entry: TaskEntry =
            Box::new(move |ctx: &TaskContext| run_guard_probe(ctx, &probe_env, &probe_cfg));
        entries.push((RoleKind::Probe, spec, entry));

        // 稳定排序，同优先级的消费者保持编号顺序
        entries.sort_by_key(|(_, spec, _)| spec.priority);
        entries
    }

    fn spawn_roles(
        &self,
        env: &RoleEnv,
        spawned: &mut Vec<TaskHandle>,
    ) -> Result<RoleTasks, OrchestratorError> {
        let mut handles = Vec::new();
        for (kind, spec, entry) in self.role_entries(env) {
            let handle = self.scheduler.spawn(spec, entry)?;
            spawned.push(handle.clone());
            handles.push((kind, handle));
        }

        tracing::info!(
            capacity = self.pool.capacity(),
            consumers = self.config.consumer.instances,
            "roles started"
        );
        Ok(RoleTasks::new(handles))
    }

    /// # 停止角色并重置资源池
    ///
    /// 挂起所有角色并等待生产者与消费者线程退出，然后把计数恢复为初始值、守卫恢复空闲。
    /// 正在等待守卫的探测任务在重置后拿到守卫并立即退出。未运行时直接返回。
    /// 资源池不会被销毁，之后可以再次 `start`。
    pub fn stop(&self) -> Result<(), OrchestratorError> {
        let Some(roles) = self.lock_tasks().take() else {
            return Ok(());
        };

        for handle in roles.all() {
            self.scheduler.suspend(handle);
        }

        let mut first_err = None;
        let mut join = |handle: &TaskHandle| {
            if let Err(err) = handle.join() {
                tracing::error!(task = handle.name(), %err, "task ended abnormally");
                first_err.get_or_insert(err);
            }
        };
        for handle in roles.of(|kind| kind != RoleKind::Probe) {
            join(handle);
        }
        self.pool.reset();
        for handle in roles.of(|kind| kind == RoleKind::Probe) {
            join(handle);
        }
        self.pool.diagnostics().emit(&Diagnostic::CleanedUp);

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// # 当前状态快照
    pub fn snapshot(&self) -> SystemSnapshot {
        let tasks: Vec<(String, TaskState)> = self
            .lock_tasks()
            .as_ref()
            .map(|roles| {
                roles
                    .all()
                    .map(|h| (h.name().to_string(), h.state()))
                    .collect()
            })
            .unwrap_or_default();
        SystemSnapshot {
            available: self.pool.available(),
            capacity: self.pool.capacity(),
            guard_holder: self.pool.guard().holder(),
            tasks,
            stats: self.pool.stats(),
        }
    }
}

impl<S: Scheduler> Drop for Orchestrator<S> {
    fn drop(&mut self) {
        if let Err(err) = self.stop() {
            tracing::error!(%err, "failed to stop roles on drop");
        }
    }
}
