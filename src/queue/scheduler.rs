use std::sync::Arc;

use tracing::{error, info, warn};

use super::{GradingQueue, GradingTask};
use crate::errors::{HWSystemError, Result};
use crate::storage::Storage;

/// 评分调度
///
/// 每次调度先开启新的评分批次，再把带批次号的任务推入队列；
/// 旧批次的任务在执行时会被识别为过期并跳过。入队失败时撤销新批次，
/// 队列中已有的旧批次任务仍然有效。
#[derive(Clone)]
pub struct GradingScheduler {
    storage: Arc<dyn Storage>,
    queue: Arc<dyn GradingQueue>,
}

impl GradingScheduler {
    pub fn new(storage: Arc<dyn Storage>, queue: Arc<dyn GradingQueue>) -> Self {
        Self { storage, queue }
    }

    /// 为提交安排一次评分，返回入队的任务
    pub async fn schedule(&self, submission_id: i64) -> Result<GradingTask> {
        let attempt = self
            .storage
            .next_grading_attempt(submission_id)
            .await?
            .ok_or_else(|| {
                HWSystemError::not_found(format!("submission {submission_id} not found"))
            })?;

        let task = GradingTask::new(submission_id, attempt);
        if let Err(e) = self.queue.push(task.clone()).await {
            self.revert_attempt(&task).await;
            return Err(e);
        }

        info!(
            submission_id,
            task_id = %task.task_id,
            attempt,
            backend = self.queue.backend_name(),
            "Grading task scheduled"
        );
        Ok(task)
    }

    async fn revert_attempt(&self, task: &GradingTask) {
        match self
            .storage
            .revert_grading_attempt(task.submission_id, task.attempt)
            .await
        {
            Ok(true) => warn!(
                submission_id = task.submission_id,
                task_id = %task.task_id,
                attempt = task.attempt,
                "Failed to enqueue grading task, attempt reverted"
            ),
            Ok(false) => warn!(
                submission_id = task.submission_id,
                task_id = %task.task_id,
                attempt = task.attempt,
                "Failed to enqueue grading task, attempt already superseded"
            ),
            Err(e) => error!(
                submission_id = task.submission_id,
                task_id = %task.task_id,
                attempt = task.attempt,
                error_type = e.error_type(),
                "Failed to revert grading attempt: {}",
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::grading::TaskOutcome;
    use crate::grading::testing::{
        MemoryFileStore, ScriptedScorer, editor_submission, homework, orchestrator, storage,
    };
    use crate::models::submissions::entities::SubmissionStatus;
    use crate::queue::backends::memory::MemoryGradingQueue;

    #[tokio::test]
    async fn test_schedule_opens_new_attempt() {
        let storage = storage().await;
        let hw = homework(&storage).await;
        let submission = editor_submission(&storage, hw.id, "print(1)").await;
        let queue: Arc<dyn GradingQueue> = Arc::new(MemoryGradingQueue::new(8));
        let scheduler = GradingScheduler::new(storage.clone(), queue.clone());

        let first = scheduler.schedule(submission.id).await.unwrap();
        let second = scheduler.schedule(submission.id).await.unwrap();
        assert_eq!(first.attempt, 1);
        assert_eq!(second.attempt, 2);
        assert_ne!(first.task_id, second.task_id);
        assert_eq!(queue.len().await.unwrap(), 2);

        let popped = queue.pop(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(popped, first);

        let reloaded = storage.get_submission_by_id(submission.id).await.unwrap().unwrap();
        assert_eq!(reloaded.grading_attempt, 2);
    }

    #[tokio::test]
    async fn test_schedule_missing_submission() {
        let storage = storage().await;
        let queue: Arc<dyn GradingQueue> = Arc::new(MemoryGradingQueue::new(8));
        let scheduler = GradingScheduler::new(storage, queue.clone());

        let err = scheduler.schedule(404).await.unwrap_err();
        assert!(matches!(err, HWSystemError::NotFound(_)));
        assert!(queue.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_enqueue_keeps_previous_task_valid() {
        let storage = storage().await;
        let hw = homework(&storage).await;
        let submission = editor_submission(&storage, hw.id, "print(1)").await;
        let queue: Arc<dyn GradingQueue> = Arc::new(MemoryGradingQueue::new(1));
        let scheduler = GradingScheduler::new(storage.clone(), queue.clone());

        let first = scheduler.schedule(submission.id).await.unwrap();
        let err = scheduler.schedule(submission.id).await.unwrap_err();
        assert!(matches!(err, HWSystemError::Queue(_)));

        let reloaded = storage.get_submission_by_id(submission.id).await.unwrap().unwrap();
        assert_eq!(reloaded.grading_attempt, first.attempt);

        let popped = queue.pop(Duration::from_millis(10)).await.unwrap().unwrap();
        let orchestrator = orchestrator(
            storage.clone(),
            MemoryFileStore::default(),
            Arc::new(ScriptedScorer::always(88.0)),
        );
        let outcome = orchestrator.run_task(&popped).await.unwrap();
        assert!(matches!(outcome, TaskOutcome::Graded(_)));

        let graded = storage.get_submission_by_id(submission.id).await.unwrap().unwrap();
        assert_eq!(graded.status, SubmissionStatus::Reviewed);
        assert_eq!(graded.automated_grade, Some(88.0));
    }
}
