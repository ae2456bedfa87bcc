use std::fmt;

use crossbeam_queue::SegQueue;

/// 协议诊断事件 | Protocol diagnostic event
///
/// `Display` 输出的文本是协议内部决策唯一的外部可见痕迹，保持逐字不变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic<'a> {
    Taken { name: &'a str, available: usize },
    Given { name: &'a str, available: usize },
    GuardBusy { name: &'a str },
    NoInstance { name: &'a str },
    CapacityExceeded { name: &'a str, capacity: usize },
    TaskStarted { name: &'a str },
    ProbeStarted,
    ProbeTookGuard,
    TasksCreated,
    CleanedUp,
}

impl fmt::Display for Diagnostic<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Taken { name, available } => write!(
                f,
                "{name}: Resource taken and available_instance_count = {available}"
            ),
            Diagnostic::Given { name, available } => write!(
                f,
                "{name}: Resource given and available_instance_count = {available}"
            ),
            Diagnostic::GuardBusy { name } => write!(f, "{name}: Mutex not available"),
            Diagnostic::NoInstance { name } => write!(f, "{name}: Semaphore not available"),
            Diagnostic::CapacityExceeded { name, capacity } => write!(
                f,
                "{name}: Release rejected, pool already at capacity {capacity}"
            ),
            Diagnostic::TaskStarted { name } => write!(f, "{name} thread started"),
            Diagnostic::ProbeStarted => write!(f, "Main mutex thread started"),
            Diagnostic::ProbeTookGuard => write!(f, "Main took mutex"),
            Diagnostic::TasksCreated => write!(f, "Threads created"),
            Diagnostic::CleanedUp => write!(f, "Threads and resources cleaned up"),
        }
    }
}

/// 诊断输出 trait | Diagnostic sink
///
/// 面向行的文本输出，由资源池和各角色调用。
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, event: &Diagnostic<'_>);
}

/// 以 `tracing` 事件输出诊断行（默认）
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, event: &Diagnostic<'_>) {
        match event {
            Diagnostic::CapacityExceeded { .. } => tracing::error!("{event}"),
            Diagnostic::GuardBusy { .. } | Diagnostic::NoInstance { .. } => {
                tracing::debug!("{event}")
            }
            _ => tracing::info!("{event}"),
        }
    }
}

/// 直接打印到标准输出
pub struct StdoutSink;

impl DiagnosticSink for StdoutSink {
    fn emit(&self, event: &Diagnostic<'_>) {
        println!("{event}");
    }
}

/// 基于无锁队列（SegQueue）的内存诊断输出 | In-memory sink on a lock-free queue
///
/// 主要用于测试中断言协议输出。
#[derive(Default)]
pub struct MemorySink {
    lines: SegQueue<String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取出目前记录的全部行
    pub fn drain(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.lines.len());
        while let Some(line) = self.lines.pop() {
            out.push(line);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, event: &Diagnostic<'_>) {
        self.lines.push(event.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_lines_are_verbatim() {
        let taken = Diagnostic::Taken { name: "Consumer_1", available: 9 };
        let given = Diagnostic::Given { name: "Producer", available: 10 };
        assert_eq!(
            taken.to_string(),
            "Consumer_1: Resource taken and available_instance_count = 9"
        );
        assert_eq!(
            given.to_string(),
            "Producer: Resource given and available_instance_count = 10"
        );
        assert_eq!(
            Diagnostic::GuardBusy { name: "Consumer_2" }.to_string(),
            "Consumer_2: Mutex not available"
        );
        assert_eq!(
            Diagnostic::NoInstance { name: "Consumer_2" }.to_string(),
            "Consumer_2: Semaphore not available"
        );
    }

    #[test]
    fn stdout_sink_is_usable_as_shared_sink() {
        let sink: std::sync::Arc<dyn DiagnosticSink> = std::sync::Arc::new(StdoutSink);
        sink.emit(&Diagnostic::TaskStarted { name: "Producer" });
        sink.emit(&Diagnostic::CleanedUp);
    }

    #[test]
    fn memory_sink_drains_in_order() {
        let sink = MemorySink::new();
        sink.emit(&Diagnostic::TaskStarted { name: "Producer" });
        sink.emit(&Diagnostic::TasksCreated);
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.drain(), vec!["Producer thread started", "Threads created"]);
        assert!(sink.is_empty());
    }
}
