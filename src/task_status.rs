use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// 等待初始延迟结束
    Delayed,
    /// 运行中
    Running,
    /// 已被挂起，不再执行循环体
    Suspended,
    /// 入口函数已返回
    Terminated,
}

impl TaskState {
    fn as_u8(self) -> u8 {
        match self {
            TaskState::Delayed => 0,
            TaskState::Running => 1,
            TaskState::Suspended => 2,
            TaskState::Terminated => 3,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => TaskState::Delayed,
            1 => TaskState::Running,
            2 => TaskState::Suspended,
            _ => TaskState::Terminated,
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Delayed => write!(f, "delayed"),
            TaskState::Running => write!(f, "running"),
            TaskState::Suspended => write!(f, "suspended"),
            TaskState::Terminated => write!(f, "terminated"),
        }
    }
}

/// 可跨线程共享的原子任务状态
pub(crate) struct AtomicTaskState(AtomicU8);

impl AtomicTaskState {
    pub(crate) fn new(state: TaskState) -> Self {
        Self(AtomicU8::new(state.as_u8()))
    }

    pub(crate) fn load(&self) -> TaskState {
        TaskState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: TaskState) {
        self.0.store(state.as_u8(), Ordering::Release);
    }
}

/// 任务 ID 生成器
pub struct TaskIdGenerator {
    counter: AtomicU64,
}

impl TaskIdGenerator {
    /// 创建新的任务 ID 生成器
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }

    /// 生成下一个任务 ID
    pub fn next_id(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for TaskIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
