//! 评分 worker 池
//!
//! 每个 worker 循环从队列取任务并交给评分流程执行：
//! - 同一提交同时只有一个任务在执行，其余任务延迟后重新入队
//! - 暂时性错误按指数退避重新入队，超过最大重试次数后放弃
//! - 任务执行中的 panic 被捕获，不影响 worker 本身
//! - 关闭时等待中的重新入队任务立即入队，不会随进程退出丢失

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashSet;
use futures_util::FutureExt;
use futures_util::future::join_all;
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use super::{GradingQueue, GradingTask};
use crate::config::QueueConfig;
use crate::errors::HWSystemError;
use crate::grading::{GradingOrchestrator, TaskOutcome};

/// 队列出错时 worker 的等待时长
const QUEUE_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// 重试策略
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &QueueConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
        }
    }

    /// 只有暂时性错误且未超过重试上限时才重试
    pub fn should_retry(&self, error: &HWSystemError, retries: u32) -> bool {
        error.is_transient() && retries < self.max_retries
    }

    /// 第 `retries` 次重试前的等待时长：base × 2^retries，加上至多 base/2 的随机抖动
    pub fn delay_for(&self, retries: u32) -> Duration {
        let exponential = self.base_delay.saturating_mul(2u32.saturating_pow(retries));
        let jitter_cap = (self.base_delay.as_millis() / 2) as u64;
        let jitter = if jitter_cap == 0 {
            0
        } else {
            rand::rng().random_range(0..=jitter_cap)
        };
        exponential + Duration::from_millis(jitter)
    }
}

/// 正在执行的提交集合，守卫释放时移除
struct InFlightGuard {
    set: Arc<DashSet<i64>>,
    submission_id: i64,
}

impl InFlightGuard {
    fn acquire(set: &Arc<DashSet<i64>>, submission_id: i64) -> Option<Self> {
        set.insert(submission_id).then(|| Self {
            set: set.clone(),
            submission_id,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.remove(&self.submission_id);
    }
}

struct WorkerContext {
    queue: Arc<dyn GradingQueue>,
    orchestrator: Arc<GradingOrchestrator>,
    policy: RetryPolicy,
    in_flight: Arc<DashSet<i64>>,
    in_flight_delay: Duration,
    poll_timeout: Duration,
    requeues: TaskTracker,
    flush: watch::Receiver<bool>,
}

impl WorkerContext {
    async fn run(self: Arc<Self>, worker_id: usize, mut shutdown: watch::Receiver<bool>) {
        debug!(worker_id, "Grading worker started");

        // 出队本身有超时，关闭信号在两次出队之间检查，已取出的任务不会丢失
        while !*shutdown.borrow_and_update() {
            match self.queue.pop(self.poll_timeout).await {
                Ok(Some(task)) => self.process(task).await,
                Ok(None) => {}
                Err(e) => {
                    error!(worker_id, error_type = e.error_type(), "Failed to pop grading task: {}", e);
                    tokio::select! {
                        _ = tokio::time::sleep(QUEUE_ERROR_BACKOFF) => {}
                        _ = shutdown.changed() => {}
                    }
                }
            }
        }

        debug!(worker_id, "Grading worker stopped");
    }

    async fn process(&self, task: GradingTask) {
        let Some(guard) = InFlightGuard::acquire(&self.in_flight, task.submission_id) else {
            debug!(
                submission_id = task.submission_id,
                task_id = %task.task_id,
                "Submission is being graded, requeueing task"
            );
            self.requeue_later(task, self.in_flight_delay);
            return;
        };

        let result = AssertUnwindSafe(self.orchestrator.run_task(&task))
            .catch_unwind()
            .await;
        drop(guard);

        match result {
            Ok(Ok(TaskOutcome::Graded(_))) => {}
            Ok(Ok(TaskOutcome::Skipped(reason))) => {
                info!(
                    submission_id = task.submission_id,
                    task_id = %task.task_id,
                    attempt = task.attempt,
                    "Grading task skipped: {}",
                    reason
                );
            }
            Ok(Err(e)) if self.policy.should_retry(&e, task.retries) => {
                let delay = self.policy.delay_for(task.retries);
                warn!(
                    submission_id = task.submission_id,
                    task_id = %task.task_id,
                    error_type = e.error_type(),
                    retries = task.retries,
                    delay_ms = delay.as_millis() as u64,
                    "Grading failed, retrying: {}",
                    e.message()
                );
                self.requeue_later(task.retried(), delay);
            }
            Ok(Err(e)) => {
                error!(
                    submission_id = task.submission_id,
                    task_id = %task.task_id,
                    error_type = e.error_type(),
                    retries = task.retries,
                    "Grading failed: {}",
                    e.message()
                );
            }
            Err(_) => {
                error!(
                    submission_id = task.submission_id,
                    task_id = %task.task_id,
                    "Grading task panicked"
                );
            }
        }
    }

    /// 延迟后重新入队，不阻塞当前 worker
    ///
    /// 收到关闭通知时不再等待，立即入队。
    fn requeue_later(&self, task: GradingTask, delay: Duration) {
        let queue = self.queue.clone();
        let mut flush = self.flush.clone();
        self.requeues.spawn(async move {
            let flushed = tokio::select! {
                _ = tokio::time::sleep(delay) => false,
                _ = flush.wait_for(|done| *done) => true,
            };
            let submission_id = task.submission_id;
            let task_id = task.task_id;
            match queue.push(task).await {
                Ok(()) if flushed => info!(
                    submission_id,
                    task_id = %task_id,
                    "Pending grading task requeued at shutdown"
                ),
                Ok(()) => {}
                Err(e) => error!(
                    submission_id,
                    task_id = %task_id,
                    error_type = e.error_type(),
                    "Failed to requeue grading task: {}",
                    e
                ),
            }
        });
    }
}

/// 评分 worker 池
pub struct GradingWorkerPool {
    shutdown: watch::Sender<bool>,
    flush: watch::Sender<bool>,
    requeues: TaskTracker,
    handles: Vec<JoinHandle<()>>,
}

impl GradingWorkerPool {
    pub fn spawn(
        workers: usize,
        queue: Arc<dyn GradingQueue>,
        orchestrator: Arc<GradingOrchestrator>,
        config: &QueueConfig,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        let (flush, flush_rx) = watch::channel(false);
        let requeues = TaskTracker::new();
        let context = Arc::new(WorkerContext {
            queue,
            orchestrator,
            policy: RetryPolicy::from_config(config),
            in_flight: Arc::new(DashSet::new()),
            in_flight_delay: Duration::from_millis(config.in_flight_delay_ms),
            poll_timeout: Duration::from_secs(config.poll_timeout_secs.max(1)),
            requeues: requeues.clone(),
            flush: flush_rx,
        });

        let workers = workers.max(1);
        let handles = (0..workers)
            .map(|worker_id| tokio::spawn(context.clone().run(worker_id, shutdown.subscribe())))
            .collect();

        info!(
            workers,
            backend = context.queue.backend_name(),
            "Grading worker pool started"
        );

        Self {
            shutdown,
            flush,
            requeues,
            handles,
        }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// 通知所有 worker 退出并等待当前任务完成
    ///
    /// worker 全部退出后，等待中的重新入队任务立即推回队列。
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for result in join_all(self.handles).await {
            if let Err(e) = result {
                error!("Grading worker terminated abnormally: {}", e);
            }
        }

        let pending = self.requeues.len();
        if pending > 0 {
            info!(pending, "Flushing pending grading requeues");
        }
        let _ = self.flush.send(true);
        self.requeues.close();
        self.requeues.wait().await;

        info!("Grading worker pool stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::testing::{
        MemoryFileStore, ScriptedScorer, editor_submission, evaluation, homework, orchestrator,
        storage,
    };
    use crate::models::submissions::entities::{Submission, SubmissionStatus};
    use crate::queue::GradingScheduler;
    use crate::queue::backends::memory::MemoryGradingQueue;
    use crate::queue::test_support::queue_config;
    use crate::storage::Storage;

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(100),
        }
    }

    #[test]
    fn test_retry_only_transient_errors() {
        let policy = policy(3);
        assert!(policy.should_retry(&HWSystemError::grading_unavailable("down"), 0));
        assert!(policy.should_retry(&HWSystemError::grading_unavailable("down"), 2));
        assert!(!policy.should_retry(&HWSystemError::grading_unavailable("down"), 3));
        assert!(!policy.should_retry(&HWSystemError::no_code_content("empty"), 0));
        assert!(!policy.should_retry(&HWSystemError::not_found("gone"), 0));
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let policy = policy(3);
        for retries in 0..4 {
            let base = 100u64 * 2u64.pow(retries);
            let delay = policy.delay_for(retries).as_millis() as u64;
            assert!(delay >= base && delay <= base + 50, "retries={retries} delay={delay}");
        }
    }

    #[test]
    fn test_in_flight_guard() {
        let set = Arc::new(DashSet::new());
        let guard = InFlightGuard::acquire(&set, 1).unwrap();
        assert!(InFlightGuard::acquire(&set, 1).is_none());
        assert!(InFlightGuard::acquire(&set, 2).is_some());
        drop(guard);
        assert!(InFlightGuard::acquire(&set, 1).is_some());
    }

    async fn wait_for<F>(storage: &Arc<dyn Storage>, id: i64, done: F) -> Submission
    where
        F: Fn(&Submission) -> bool,
    {
        for _ in 0..100 {
            let submission = storage.get_submission_by_id(id).await.unwrap().unwrap();
            if done(&submission) {
                return submission;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("submission {id} did not reach the expected state");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pool_grades_scheduled_submissions() {
        let storage = storage().await;
        let hw = homework(&storage).await;
        let first = editor_submission(&storage, hw.id, "print(1)").await;
        let second = editor_submission(&storage, hw.id, "print(2)").await;

        let config = queue_config("memory");
        let queue: Arc<dyn GradingQueue> = Arc::new(MemoryGradingQueue::new(config.capacity));
        let scheduler = GradingScheduler::new(storage.clone(), queue.clone());
        let scorer = Arc::new(ScriptedScorer::always(85.0));
        let pool = GradingWorkerPool::spawn(
            2,
            queue,
            orchestrator(storage.clone(), MemoryFileStore::default(), scorer),
            &config,
        );
        assert_eq!(pool.size(), 2);

        scheduler.schedule(first.id).await.unwrap();
        scheduler.schedule(second.id).await.unwrap();

        for id in [first.id, second.id] {
            let graded = wait_for(&storage, id, |s| s.automated_grade.is_some()).await;
            assert_eq!(graded.status, SubmissionStatus::Reviewed);
            assert_eq!(graded.automated_grade, Some(85.0));
        }

        pool.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_transient_failure_is_retried() {
        let storage = storage().await;
        let hw = homework(&storage).await;
        let submission = editor_submission(&storage, hw.id, "print(1)").await;

        let config = queue_config("memory");
        let queue: Arc<dyn GradingQueue> = Arc::new(MemoryGradingQueue::new(config.capacity));
        let scheduler = GradingScheduler::new(storage.clone(), queue.clone());
        // 第一次不可用，第二次成功
        let scorer = Arc::new(ScriptedScorer::new(vec![None], Some(evaluation(72.0))));
        let pool = GradingWorkerPool::spawn(
            1,
            queue,
            orchestrator(storage.clone(), MemoryFileStore::default(), scorer.clone()),
            &config,
        );

        scheduler.schedule(submission.id).await.unwrap();
        let graded = wait_for(&storage, submission.id, |s| s.automated_grade.is_some()).await;
        assert_eq!(graded.automated_grade, Some(72.0));
        assert_eq!(scorer.calls(), 2);

        pool.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_gives_up_after_max_retries() {
        let storage = storage().await;
        let hw = homework(&storage).await;
        let submission = editor_submission(&storage, hw.id, "print(1)").await;

        let config = queue_config("memory");
        let queue: Arc<dyn GradingQueue> = Arc::new(MemoryGradingQueue::new(config.capacity));
        let scheduler = GradingScheduler::new(storage.clone(), queue.clone());
        let scorer = Arc::new(ScriptedScorer::unavailable());
        let pool = GradingWorkerPool::spawn(
            1,
            queue.clone(),
            orchestrator(storage.clone(), MemoryFileStore::default(), scorer.clone()),
            &config,
        );

        scheduler.schedule(submission.id).await.unwrap();

        // max_retries = 2：首次执行加两次重试
        for _ in 0..100 {
            if scorer.calls() >= 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(scorer.calls(), 3);
        assert!(queue.is_empty().await.unwrap());

        let reloaded = storage.get_submission_by_id(submission.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, SubmissionStatus::Pending);
        assert!(reloaded.automated_grade.is_none());

        pool.shutdown().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_shutdown_requeues_pending_retries() {
        let storage = storage().await;
        let hw = homework(&storage).await;
        let submission = editor_submission(&storage, hw.id, "print(1)").await;

        let mut config = queue_config("memory");
        config.retry_base_delay_ms = 60_000;
        let queue: Arc<dyn GradingQueue> = Arc::new(MemoryGradingQueue::new(config.capacity));
        let scheduler = GradingScheduler::new(storage.clone(), queue.clone());
        let scorer = Arc::new(ScriptedScorer::unavailable());
        let pool = GradingWorkerPool::spawn(
            1,
            queue.clone(),
            orchestrator(storage.clone(), MemoryFileStore::default(), scorer.clone()),
            &config,
        );

        let scheduled = scheduler.schedule(submission.id).await.unwrap();
        for _ in 0..100 {
            if scorer.calls() >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(scorer.calls(), 1);
        assert!(queue.is_empty().await.unwrap());

        tokio::time::timeout(Duration::from_secs(5), pool.shutdown())
            .await
            .expect("shutdown should not wait for the retry delay");

        let requeued = queue.pop(Duration::from_millis(10)).await.unwrap().unwrap();
        assert_eq!(requeued.task_id, scheduled.task_id);
        assert_eq!(requeued.retries, 1);
        assert_eq!(scorer.calls(), 1);
    }
}
