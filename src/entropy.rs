use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 熵源 trait | Entropy source
///
/// 仅用于为休眠时长添加抖动，不参与任何正确性不变式。
pub trait EntropySource: Send + Sync {
    fn random_u32(&self) -> u32;
}

/// 线程本地随机数生成器（默认）
pub struct ThreadRngEntropy;

impl EntropySource for ThreadRngEntropy {
    fn random_u32(&self) -> u32 {
        rand::thread_rng().r#gen()
    }
}

/// 固定种子的可复现熵源
pub struct SeededEntropy {
    rng: Mutex<StdRng>,
}

impl SeededEntropy {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl EntropySource for SeededEntropy {
    fn random_u32(&self) -> u32 {
        self.rng.lock().unwrap_or_else(|e| e.into_inner()).r#gen()
    }
}

/// 始终返回同一个值
pub struct FixedEntropy(pub u32);

impl EntropySource for FixedEntropy {
    fn random_u32(&self) -> u32 {
        self.0
    }
}
