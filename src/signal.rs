use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// 输出翻转信号 trait | Output toggle signal
///
/// 即发即忘，核心逻辑不读取任何返回值。
pub trait OutputSignal: Send + Sync {
    fn toggle(&self, channel: u8);
}

/// 以 `tracing` 事件记录翻转（默认）
pub struct LogSignal;

impl OutputSignal for LogSignal {
    fn toggle(&self, channel: u8) {
        tracing::debug!(channel, "output toggled");
    }
}

/// 按通道记录翻转次数
#[derive(Default)]
pub struct RecordingSignal {
    toggles: Arc<Mutex<HashMap<u8, u64>>>,
}

impl RecordingSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取某通道的翻转次数
    pub fn count(&self, channel: u8) -> u64 {
        let toggles = self.toggles.lock().unwrap_or_else(|e| e.into_inner());
        toggles.get(&channel).copied().unwrap_or(0)
    }
}

impl Clone for RecordingSignal {
    fn clone(&self) -> Self {
        Self {
            toggles: Arc::clone(&self.toggles),
        }
    }
}

impl OutputSignal for RecordingSignal {
    fn toggle(&self, channel: u8) {
        let mut toggles = self.toggles.lock().unwrap_or_else(|e| e.into_inner());
        *toggles.entry(channel).or_insert(0) += 1;
    }
}
