use std::time::Duration;

use async_trait::async_trait;
use redis::{AsyncCommands, aio::MultiplexedConnection};
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::config::RedisConfig;
use crate::errors::{HWSystemError, Result};
use crate::queue::{GradingQueue, GradingTask};

/// 空队列时的轮询间隔
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// 基于 Redis 列表的队列（LPUSH 入队，RPOP 出队）
///
/// 任务以 JSON 存储，多个服务实例可以共享同一队列。
pub struct RedisGradingQueue {
    conn: MultiplexedConnection,
    key: String,
}

impl RedisGradingQueue {
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| HWSystemError::queue(format!("Invalid Redis URL: {e}")))?;

        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                error!(
                    "Failed to connect to Redis queue: {}. Check Redis server status and URL: {}",
                    e, config.url
                );
                HWSystemError::queue(format!("Redis connection failed: {e}"))
            })?;

        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        debug!("Redis queue connection test successful: {}", pong);

        Ok(Self {
            conn,
            key: format!("{}grading", config.key_prefix),
        })
    }
}

#[async_trait]
impl GradingQueue for RedisGradingQueue {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    async fn push(&self, task: GradingTask) -> Result<()> {
        let payload = serde_json::to_string(&task)?;
        let mut conn = self.conn.clone();
        let _: i64 = conn.lpush(&self.key, payload).await?;
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<GradingTask>> {
        let deadline = Instant::now() + timeout;
        let mut conn = self.conn.clone();

        loop {
            let payload: Option<String> = conn.rpop(&self.key, None).await?;
            if let Some(payload) = payload {
                match serde_json::from_str::<GradingTask>(&payload) {
                    Ok(task) => return Ok(Some(task)),
                    Err(e) => {
                        // 无法解析的任务直接丢弃
                        warn!(key = %self.key, "Dropping malformed grading task: {}", e);
                        continue;
                    }
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }

    async fn len(&self) -> Result<usize> {
        let mut conn = self.conn.clone();
        let len: usize = conn.llen(&self.key).await?;
        Ok(len)
    }
}
