use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use crate::errors::{HWSystemError, Result};
use crate::queue::{GradingQueue, GradingTask};

/// 进程内有界队列
pub struct MemoryGradingQueue {
    sender: mpsc::Sender<GradingTask>,
    receiver: Mutex<mpsc::Receiver<GradingTask>>,
}

impl MemoryGradingQueue {
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }
}

#[async_trait]
impl GradingQueue for MemoryGradingQueue {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn push(&self, task: GradingTask) -> Result<()> {
        self.sender.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(task) => HWSystemError::queue(format!(
                "grading queue is full, dropping task for submission {}",
                task.submission_id
            )),
            mpsc::error::TrySendError::Closed(_) => HWSystemError::queue("grading queue is closed"),
        })
    }

    async fn pop(&self, timeout: Duration) -> Result<Option<GradingTask>> {
        let mut receiver = self.receiver.lock().await;
        match tokio::time::timeout(timeout, receiver.recv()).await {
            Ok(Some(task)) => Ok(Some(task)),
            Ok(None) => Err(HWSystemError::queue("grading queue is closed")),
            Err(_) => Ok(None),
        }
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.sender.max_capacity() - self.sender.capacity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fifo_order() {
        let queue = MemoryGradingQueue::new(4);
        queue.push(GradingTask::new(1, 1)).await.unwrap();
        queue.push(GradingTask::new(2, 1)).await.unwrap();
        assert_eq!(queue.len().await.unwrap(), 2);

        let first = queue.pop(Duration::from_millis(10)).await.unwrap().unwrap();
        let second = queue.pop(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(first.submission_id, 1);
        assert_eq!(second.submission_id, 2);
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_pop_times_out_when_empty() {
        let queue = MemoryGradingQueue::new(1);
        let task = queue.pop(Duration::from_millis(20)).await.unwrap();
        assert!(task.is_none());
    }

    #[tokio::test]
    async fn test_push_fails_when_full() {
        let queue = MemoryGradingQueue::new(1);
        queue.push(GradingTask::new(1, 1)).await.unwrap();
        let err = queue.push(GradingTask::new(2, 1)).await.unwrap_err();
        assert!(matches!(err, HWSystemError::Queue(_)));
    }
}
