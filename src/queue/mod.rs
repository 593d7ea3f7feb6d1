//! 评分任务队列
//!
//! 提交创建或请求重新评分时，任务被推入队列，由后台 worker 池异步处理。
//! 后端通过注册表选择（`memory` / `redis`），配置的后端不可用时回退到内存队列。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::config::QueueConfig;
use crate::errors::{HWSystemError, Result};

pub mod backends;
pub mod register;
pub mod scheduler;
pub mod worker;

pub use scheduler::GradingScheduler;
pub use worker::{GradingWorkerPool, RetryPolicy};

/// 评分任务
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradingTask {
    pub task_id: Uuid,
    pub submission_id: i64,
    /// 任务所属的评分批次
    pub attempt: i32,
    /// 已重试次数
    #[serde(default)]
    pub retries: u32,
}

impl GradingTask {
    pub fn new(submission_id: i64, attempt: i32) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            submission_id,
            attempt,
            retries: 0,
        }
    }

    /// 生成下一次重试的任务（保留 task_id）
    pub fn retried(&self) -> Self {
        Self {
            retries: self.retries + 1,
            ..self.clone()
        }
    }
}

#[async_trait]
pub trait GradingQueue: Send + Sync {
    /// 后端名称
    fn backend_name(&self) -> &'static str;

    /// 推入任务
    async fn push(&self, task: GradingTask) -> Result<()>;

    /// 取出任务，超时返回 `None`
    async fn pop(&self, timeout: Duration) -> Result<Option<GradingTask>>;

    /// 队列中等待的任务数
    async fn len(&self) -> Result<usize>;

    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

pub const DEFAULT_QUEUE_BACKEND: &str = "memory";

/// 根据配置创建队列，失败时回退到内存队列
pub async fn create_queue(config: &QueueConfig) -> Result<Arc<dyn GradingQueue>> {
    let queue_type = config.queue_type.as_str();

    match register::get_queue_plugin(queue_type) {
        Some(constructor) => match constructor(config.clone()).await {
            Ok(queue) => return Ok(Arc::from(queue)),
            Err(e) => warn!("Failed to create {} queue: {}", queue_type, e),
        },
        None => warn!("Queue backend '{}' not found in registry", queue_type),
    }

    if queue_type == DEFAULT_QUEUE_BACKEND {
        return Err(HWSystemError::queue_plugin_not_found(queue_type));
    }

    warn!("Falling back to {} queue", DEFAULT_QUEUE_BACKEND);
    let constructor = register::get_queue_plugin(DEFAULT_QUEUE_BACKEND)
        .ok_or_else(|| HWSystemError::queue_plugin_not_found(DEFAULT_QUEUE_BACKEND))?;
    let queue = constructor(config.clone()).await?;
    Ok(Arc::from(queue))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub fn queue_config(queue_type: &str) -> QueueConfig {
        QueueConfig {
            queue_type: queue_type.to_string(),
            workers: 2,
            max_workers: 4,
            capacity: 16,
            poll_timeout_secs: 1,
            max_retries: 2,
            retry_base_delay_ms: 10,
            in_flight_delay_ms: 10,
            redis: crate::config::RedisConfig {
                url: "redis://127.0.0.1:1/".to_string(),
                key_prefix: "hwsystem:test:".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::queue_config;
    use super::*;

    #[test]
    fn test_retried_keeps_identity() {
        let task = GradingTask::new(7, 2);
        let retry = task.retried().retried();
        assert_eq!(retry.task_id, task.task_id);
        assert_eq!(retry.submission_id, 7);
        assert_eq!(retry.attempt, 2);
        assert_eq!(retry.retries, 2);
    }

    #[test]
    fn test_task_json_defaults_retries() {
        let json = format!(
            r#"{{"task_id":"{}","submission_id":3,"attempt":1}}"#,
            Uuid::new_v4()
        );
        let task: GradingTask = serde_json::from_str(&json).unwrap();
        assert_eq!(task.retries, 0);
    }

    #[tokio::test]
    async fn test_create_memory_queue() {
        let queue = create_queue(&queue_config("memory")).await.unwrap();
        assert_eq!(queue.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_unknown_backend_falls_back_to_memory() {
        let queue = create_queue(&queue_config("kafka")).await.unwrap();
        assert_eq!(queue.backend_name(), "memory");
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back_to_memory() {
        let queue = create_queue(&queue_config("redis")).await.unwrap();
        assert_eq!(queue.backend_name(), "memory");
    }
}
