use tokio::signal;
use tracing::{error, warn};

use crate::queue::GradingWorkerPool;

pub async fn listen_for_shutdown() {
    // 等待 Ctrl+C 信号
    if let Err(e) = signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    warn!("Shutdown signal received, initiating graceful shutdown...");
}

/// 停止评分 worker，等待正在执行的任务完成
pub async fn shutdown_workers(workers: GradingWorkerPool) {
    warn!("Stopping {} grading workers...", workers.size());
    workers.shutdown().await;
}
