use std::time::Duration;
use thiserror::Error;

/// AccessError 表示一次 acquire / release 协议调用未能完成的原因。
///
/// `GuardBusy` 与 `NoInstanceAvailable` 属于可恢复的竞争情况，调用方在下一轮循环中重试即可；
/// `CapacityExceeded` 表示 acquire / release 调用不平衡，是调用方的协议违规。
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessError {
    #[error("guard not available")]
    GuardBusy,

    #[error("no instance became available within {0:?}")]
    NoInstanceAvailable(Duration),

    #[error("release would exceed pool capacity of {capacity}")]
    CapacityExceeded { capacity: usize },
}

impl AccessError {
    /// 是否可以通过稍后重试解决 | Whether retrying later can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, AccessError::GuardBusy | AccessError::NoInstanceAvailable(_))
    }
}

/// OrchestratorError 表示启动、停止角色任务时可能遇到的错误。
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("signal error: {0}")]
    Signal(#[from] nix::errno::Errno),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("roles are already running")]
    AlreadyRunning,

    #[error("task {0} panicked")]
    TaskPanicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contention_errors_are_retryable() {
        assert!(AccessError::GuardBusy.is_retryable());
        assert!(AccessError::NoInstanceAvailable(Duration::from_millis(50)).is_retryable());
        assert!(!AccessError::CapacityExceeded { capacity: 10 }.is_retryable());
    }

    #[test]
    fn capacity_exceeded_message_names_capacity() {
        let err = AccessError::CapacityExceeded { capacity: 10 };
        assert_eq!(err.to_string(), "release would exceed pool capacity of 10");
    }
}
