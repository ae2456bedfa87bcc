use std::sync::Arc;

use nix::sys::signal::{SigSet, Signal};

use instance_pool::{DiagnosticSink, Orchestrator, OrchestratorConfig, OrchestratorError};

#[cfg(feature = "logging")]
fn init_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .init();
}

#[cfg(not(feature = "logging"))]
fn init_logging() {}

/// 有订阅器时诊断行走 `tracing`，否则直接打印
#[cfg(feature = "logging")]
fn diagnostic_sink() -> Arc<dyn DiagnosticSink> {
    Arc::new(instance_pool::TracingSink)
}

#[cfg(not(feature = "logging"))]
fn diagnostic_sink() -> Arc<dyn DiagnosticSink> {
    Arc::new(instance_pool::StdoutSink)
}

/// # 程序入口
///
/// 以默认配置启动生产者、两个消费者和守卫探测任务，然后阻塞等待 SIGINT / SIGTERM；
/// 收到信号后挂起各角色、重置资源池并输出最终快照。
///
/// 信号在启动任何线程之前屏蔽，工作线程继承该屏蔽字，信号只会由主线程的 `wait` 接收。
///
/// # 返回
/// - `Ok(())`：正常关闭。
/// - `Err(OrchestratorError)`：配置非法、线程创建失败或信号处理失败。
fn main() -> Result<(), OrchestratorError> {
    init_logging();

    let mut shutdown = SigSet::empty();
    shutdown.add(Signal::SIGINT);
    shutdown.add(Signal::SIGTERM);
    shutdown.thread_block()?;

    let orchestrator = Orchestrator::with_sink(OrchestratorConfig::default(), diagnostic_sink())?;
    orchestrator.start()?;

    let signal = shutdown.wait()?;
    tracing::info!(?signal, "shutdown signal received");

    orchestrator.stop()?;
    let snapshot = orchestrator.snapshot();
    tracing::info!(
        available = snapshot.available,
        capacity = snapshot.capacity,
        acquired = snapshot.stats.acquired,
        released = snapshot.stats.released,
        guard_busy = snapshot.stats.guard_busy,
        no_instance = snapshot.stats.no_instance,
        capacity_exceeded = snapshot.stats.capacity_exceeded,
        "final pool state"
    );
    Ok(())
}
