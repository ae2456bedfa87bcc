use std::sync::{Condvar, Mutex, MutexGuard};

/// 互斥守卫 | Mutual-exclusion guard over the pool bookkeeping
///
/// 与 `std::sync::Mutex` 不同，`Guard` 记录持有者名称，并支持 `reset`：
/// 强制恢复为空闲状态（相当于重新初始化锁）。重置之前发出的令牌在 Drop 时
/// 不会误释放重置之后的新持有者，这一点通过代数（generation）判断保证。
pub struct Guard {
    state: Mutex<GuardState>,
    released: Condvar,
}

#[derive(Default)]
struct GuardState {
    holder: Option<String>,
    generation: u64,
}

/// RAII 守卫令牌，在 Drop 时释放 `Guard` | RAII token that releases the guard on drop
///
/// 所有退出路径（包括 `?` 提前返回与 panic 展开）都会经过 Drop。
#[must_use = "the guard is released as soon as the token is dropped"]
pub struct GuardToken<'a> {
    guard: &'a Guard,
    generation: u64,
}

impl Guard {
    /// 创建一个空闲的守卫
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GuardState::default()),
            released: Condvar::new(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, GuardState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn claim<'a>(&'a self, state: &mut GuardState, name: &str) -> GuardToken<'a> {
        state.holder = Some(name.to_string());
        GuardToken {
            guard: self,
            generation: state.generation,
        }
    }

    /// 零等待尝试获取守卫 | Zero-wait attempt
    ///
    /// 守卫已被持有时立即返回 `None`，从不挂起调用线程。
    pub fn try_lock(&self, name: &str) -> Option<GuardToken<'_>> {
        let mut state = self.lock_state();
        if state.holder.is_some() {
            return None;
        }
        Some(self.claim(&mut state, name))
    }

    /// 阻塞直到获取守卫 | Block until the guard is free
    ///
    /// 只用于一次性的探测任务；循环执行的角色必须使用 `try_lock`。
    pub fn lock(&self, name: &str) -> GuardToken<'_> {
        let state = self.lock_state();
        let mut state = self
            .released
            .wait_while(state, |s| s.holder.is_some())
            .unwrap_or_else(|e| e.into_inner());
        self.claim(&mut state, name)
    }

    /// 当前持有者名称
    pub fn holder(&self) -> Option<String> {
        self.lock_state().holder.clone()
    }

    /// 守卫是否被持有
    pub fn is_held(&self) -> bool {
        self.lock_state().holder.is_some()
    }

    /// 强制恢复为空闲状态，返回重置前的持有者
    pub fn reset(&self) -> Option<String> {
        let mut state = self.lock_state();
        let previous = state.holder.take();
        state.generation = state.generation.wrapping_add(1);
        drop(state);
        self.released.notify_all();
        previous
    }
}

impl Default for Guard {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardToken<'_> {
    /// 显式释放守卫，等价于 drop
    pub fn unlock(self) {}
}

impl Drop for GuardToken<'_> {
    fn drop(&mut self) {
        let mut state = self.guard.lock_state();
        if state.generation != self.generation {
            return;
        }
        state.holder = None;
        drop(state);
        self.guard.released.notify_one();
    }
}
