use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::OrchestratorError;
use crate::task_handle::{TaskContext, TaskControl, TaskHandle};
use crate::task_status::{TaskIdGenerator, TaskState};

/// 任务优先级，数值越小越紧急
///
/// `Ord` 按数值排序，因此排序后更紧急的任务排在前面。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Priority(pub u8);

/// 任务入口函数
pub type TaskEntry = Box<dyn FnOnce(&TaskContext) + Send + 'static>;

/// 每个角色的强类型任务配置：身份、优先级、初始延迟
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: String,
    pub priority: Priority,
    pub initial_delay: Duration,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>, priority: Priority) -> Self {
        Self {
            name: name.into(),
            priority,
            initial_delay: Duration::ZERO,
        }
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }
}

/// 调度器 trait | Scheduler service
///
/// 核心逻辑只要求 "以优先级 P 启动一个任务" 与 "挂起任务" 两种能力。
pub trait Scheduler: Send + Sync {
    /// 启动任务，初始延迟结束后执行 `entry`
    fn spawn(&self, spec: TaskSpec, entry: TaskEntry) -> Result<TaskHandle, OrchestratorError>;

    /// 挂起任务：任务在下一次 `sleep` 或循环检查时停止
    fn suspend(&self, handle: &TaskHandle);
}

/// 基于标准库线程的调度器
///
/// 每个任务一个具名线程。标准库线程没有可移植的优先级接口，
/// 优先级作为元数据记录在句柄与日志 span 中。
#[derive(Default)]
pub struct ThreadScheduler {
    ids: TaskIdGenerator,
}

impl ThreadScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 线程退出（包括 panic 展开）时写入最终状态
struct FinishOnExit(Arc<TaskControl>);

impl Drop for FinishOnExit {
    fn drop(&mut self) {
        self.0.finish();
    }
}

impl Scheduler for ThreadScheduler {
    fn spawn(&self, spec: TaskSpec, entry: TaskEntry) -> Result<TaskHandle, OrchestratorError> {
        let id = self.ids.next_id();
        let name: Arc<str> = Arc::from(spec.name.as_str());
        let (control, wake) = TaskControl::new();
        let ctx = TaskContext::new(Arc::clone(&name), spec.priority, Arc::clone(&control), wake);
        let thread_control = Arc::clone(&control);
        let delay = spec.initial_delay;

        let join = thread::Builder::new()
            .name(spec.name.clone())
            .spawn(move || {
                let _finish = FinishOnExit(Arc::clone(&thread_control));
                let _span = tracing::info_span!(
                    "task",
                    id,
                    name = ctx.name(),
                    priority = ctx.priority().0
                )
                .entered();

                if !delay.is_zero() && !ctx.sleep(delay) {
                    return;
                }
                if ctx.is_suspended() {
                    return;
                }
                thread_control.set_state(TaskState::Running);
                entry(&ctx);
            })?;

        tracing::debug!(
            id,
            name = %name,
            priority = spec.priority.0,
            delay_ms = delay.as_millis() as u64,
            "task spawned"
        );
        Ok(TaskHandle::new(id, name, spec.priority, control, join))
    }

    fn suspend(&self, handle: &TaskHandle) {
        tracing::debug!(id = handle.id(), name = handle.name(), "suspending task");
        handle.control().suspend();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn more_urgent_priorities_sort_first() {
        let mut priorities = vec![Priority(6), Priority(4), Priority(5)];
        priorities.sort();
        assert_eq!(priorities, vec![Priority(4), Priority(5), Priority(6)]);
    }

    #[test]
    fn spawned_task_runs_and_terminates() {
        let scheduler = ThreadScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handle = scheduler
            .spawn(
                TaskSpec::new("once", Priority(3)),
                Box::new(move |ctx: &TaskContext| {
                    assert_eq!(ctx.name(), "once");
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        handle.join().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state(), TaskState::Terminated);
        assert_eq!(handle.priority(), Priority(3));
    }

    #[test]
    fn suspend_during_initial_delay_skips_entry() {
        let scheduler = ThreadScheduler::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let handle = scheduler
            .spawn(
                TaskSpec::new("late", Priority(3)).with_initial_delay(Duration::from_secs(10)),
                Box::new(move |_: &TaskContext| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            )
            .unwrap();

        assert_eq!(handle.state(), TaskState::Delayed);
        scheduler.suspend(&handle);
        handle.join().unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(handle.state(), TaskState::Suspended);
    }

    #[test]
    fn suspend_stops_looping_task() {
        let scheduler = ThreadScheduler::new();
        let handle = scheduler
            .spawn(
                TaskSpec::new("loop", Priority(2)),
                Box::new(|ctx: &TaskContext| while ctx.sleep(Duration::from_millis(5)) {}),
            )
            .unwrap();

        thread::sleep(Duration::from_millis(20));
        assert_eq!(handle.state(), TaskState::Running);
        scheduler.suspend(&handle);
        handle.join().unwrap();
        assert_eq!(handle.state(), TaskState::Suspended);
    }

    #[test]
    fn task_ids_are_unique() {
        let scheduler = ThreadScheduler::new();
        let noop = || -> TaskEntry { Box::new(|_: &TaskContext| {}) };
        let a = scheduler.spawn(TaskSpec::new("a", Priority(1)), noop()).unwrap();
        let b = scheduler.spawn(TaskSpec::new("b", Priority(1)), noop()).unwrap();
        assert_ne!(a.id(), b.id());
        a.join().unwrap();
        b.join().unwrap();
    }
}
