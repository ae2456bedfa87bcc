use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError, Sender, bounded};

use crate::error::OrchestratorError;
use crate::scheduler::Priority;
use crate::task_status::{AtomicTaskState, TaskState};

/// 任务控制块，由句柄与任务线程共享
pub(crate) struct TaskControl {
    state: AtomicTaskState,
    suspended: AtomicBool,
    /// 挂起时丢弃发送端，使任务中的 `recv_timeout` 立即返回
    wake: Mutex<Option<Sender<()>>>,
}

impl TaskControl {
    pub(crate) fn new() -> (Arc<Self>, Receiver<()>) {
        let (tx, rx) = bounded(1);
        let control = Arc::new(Self {
            state: AtomicTaskState::new(TaskState::Delayed),
            suspended: AtomicBool::new(false),
            wake: Mutex::new(Some(tx)),
        });
        (control, rx)
    }

    pub(crate) fn suspend(&self) {
        self.suspended.store(true, Ordering::Release);
        self.wake.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    pub(crate) fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }

    pub(crate) fn set_state(&self, state: TaskState) {
        self.state.store(state);
    }

    pub(crate) fn state(&self) -> TaskState {
        self.state.load()
    }

    /// 根据是否被挂起写入最终状态
    pub(crate) fn finish(&self) {
        let state = if self.is_suspended() {
            TaskState::Suspended
        } else {
            TaskState::Terminated
        };
        self.state.store(state);
    }
}

/// 任务上下文
///
/// 调度器把它交给任务入口函数。任务通过 `sleep` 进行自愿挂起，
/// 并在返回 `false` 时退出循环。
pub struct TaskContext {
    name: Arc<str>,
    priority: Priority,
    control: Arc<TaskControl>,
    wake: Receiver<()>,
}

impl TaskContext {
    pub(crate) fn new(
        name: Arc<str>,
        priority: Priority,
        control: Arc<TaskControl>,
        wake: Receiver<()>,
    ) -> Self {
        Self {
            name,
            priority,
            control,
            wake,
        }
    }

    /// 任务名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 任务优先级
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// 任务是否已被要求挂起
    pub fn is_suspended(&self) -> bool {
        self.control.is_suspended()
    }

    /// 休眠 `duration`，被挂起时提前醒来
    ///
    /// # 返回
    /// - `true`：睡满了时长，任务应继续运行
    /// - `false`：任务已被挂起，应尽快返回
    pub fn sleep(&self, duration: Duration) -> bool {
        if self.is_suspended() {
            return false;
        }
        match self.wake.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => !self.is_suspended(),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

/// 任务句柄
///
/// 由调度器在 spawn 时返回，可用于查询状态、挂起以及等待任务线程结束。
pub struct TaskHandle {
    /// 任务 ID
    id: u64,
    name: Arc<str>,
    priority: Priority,
    control: Arc<TaskControl>,
    join: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl TaskHandle {
    pub(crate) fn new(
        id: u64,
        name: Arc<str>,
        priority: Priority,
        control: Arc<TaskControl>,
        join: JoinHandle<()>,
    ) -> Self {
        Self {
            id,
            name,
            priority,
            control,
            join: Arc::new(Mutex::new(Some(join))),
        }
    }

    /// 获取任务 ID
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 获取任务名称
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 获取任务优先级
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// 获取任务当前状态
    pub fn state(&self) -> TaskState {
        self.control.state()
    }

    pub(crate) fn control(&self) -> &TaskControl {
        &self.control
    }

    /// 等待任务线程结束（阻塞）
    ///
    /// 重复调用直接返回 `Ok(())`。
    ///
    /// # 返回
    /// - `Ok(())`：线程已结束
    /// - `Err(OrchestratorError::TaskPanicked)`：任务线程 panic
    pub fn join(&self) -> Result<(), OrchestratorError> {
        let handle = self.join.lock().unwrap_or_else(|e| e.into_inner()).take();
        match handle {
            Some(handle) => handle
                .join()
                .map_err(|_| OrchestratorError::TaskPanicked(self.name.to_string())),
            None => Ok(()),
        }
    }
}

impl Clone for TaskHandle {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            name: Arc::clone(&self.name),
            priority: self.priority,
            control: Arc::clone(&self.control),
            join: Arc::clone(&self.join),
        }
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    fn context() -> (TaskContext, Arc<TaskControl>) {
        let (control, rx) = TaskControl::new();
        let ctx = TaskContext::new(Arc::from("t"), Priority(1), Arc::clone(&control), rx);
        (ctx, control)
    }

    #[test]
    fn sleep_runs_full_duration_when_not_suspended() {
        let (ctx, _control) = context();
        let start = Instant::now();
        assert!(ctx.sleep(Duration::from_millis(15)));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn suspend_wakes_sleeper_early() {
        let (ctx, control) = context();
        let suspender = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            control.suspend();
        });

        let start = Instant::now();
        assert!(!ctx.sleep(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(ctx.is_suspended());
        suspender.join().unwrap();
    }

    #[test]
    fn finish_reflects_suspension() {
        let (_ctx, control) = context();
        control.finish();
        assert_eq!(control.state(), TaskState::Terminated);
        control.suspend();
        control.finish();
        assert_eq!(control.state(), TaskState::Suspended);
    }

    #[test]
    fn join_is_idempotent_and_reports_panics() {
        let (control, _rx) = TaskControl::new();
        let ok = TaskHandle::new(
            1,
            Arc::from("ok"),
            Priority(1),
            Arc::clone(&control),
            thread::spawn(|| {}),
        );
        assert!(ok.join().is_ok());
        assert!(ok.join().is_ok());

        let bad = TaskHandle::new(
            2,
            Arc::from("bad"),
            Priority(1),
            control,
            thread::spawn(|| {
                panic!("boom");
            }),
        );
        match bad.join() {
            Err(OrchestratorError::TaskPanicked(name)) => assert_eq!(name, "bad"),
            other => panic!("expected TaskPanicked, got {other:?}"),
        }
    }
}
