use crate::config::AppConfig;
use crate::grading::{GradingOrchestrator, HttpScorerClient};
use crate::queue::{GradingQueue, GradingScheduler, GradingWorkerPool, create_queue};
use crate::storage::{LocalFileStore, Storage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct StartupContext {
    pub storage: Arc<dyn Storage>,
    pub queue: Arc<dyn GradingQueue>,
    pub scheduler: GradingScheduler,
    pub workers: GradingWorkerPool,
}

/// 创建评分流程（评分服务客户端 + 代码文件存储 + 题目上下文缓存）
fn create_orchestrator(
    storage: Arc<dyn Storage>,
    config: &AppConfig,
) -> Result<Arc<GradingOrchestrator>, Box<dyn std::error::Error>> {
    let scorer = HttpScorerClient::from_config(&config.scorer)?;
    warn!("Scorer endpoint: {}", scorer.endpoint());

    let files = LocalFileStore::from_config();

    Ok(Arc::new(GradingOrchestrator::new(
        storage,
        Arc::new(files),
        Arc::new(scorer),
        Duration::from_secs(config.cache.default_ttl),
        config.cache.memory.max_capacity,
    )))
}

/// 准备服务器启动的上下文
/// 包括存储、评分队列和评分 worker 池
pub async fn prepare_server_startup() -> StartupContext {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    if cfg!(debug_assertions) {
        crate::queue::register::debug_queue_registry();
        debug!("Debug mode: Queue registry is enabled");
    }

    let config = AppConfig::get();

    let storage = crate::storage::create_storage()
        .await
        .expect("Failed to create storage backend");
    warn!("Storage backend initialized and migrations completed");

    // 创建评分队列（失败时回退到内存队列）
    warn!("Attempting to create {} queue backend", config.queue.queue_type);
    let queue = create_queue(&config.queue)
        .await
        .expect("Failed to create grading queue");
    warn!("Grading queue initialized: {}", queue.backend_name());

    let orchestrator =
        create_orchestrator(storage.clone(), config).expect("Failed to create grading pipeline");

    let scheduler = GradingScheduler::new(storage.clone(), queue.clone());

    let workers = GradingWorkerPool::spawn(
        config.queue.workers,
        queue.clone(),
        orchestrator,
        &config.queue,
    );
    warn!("Using {} grading workers", workers.size());

    StartupContext {
        storage,
        queue,
        scheduler,
        workers,
    }
}
