//! 自动评分流程
//!
//! 一次评分：解析代码 → 读取题目上下文 → 调用评分服务 →
//! 单事务写入评分结果并同步提交的自动评分字段与最终成绩。

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, info};

use super::client::ScorerClient;
use crate::errors::{HWSystemError, Result};
use crate::models::grading::entities::{GradingResult, NewGradingResult};
use crate::models::homeworks::entities::ProblemContext;
use crate::models::submissions::entities::Submission;
use crate::queue::GradingTask;
use crate::storage::{FileStore, Storage};

/// 评分任务执行结果
#[derive(Debug)]
pub enum TaskOutcome {
    /// 生成了新的评分结果
    Graded(GradingResult),
    /// 任务被跳过，没有写入
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 已有更新的评分批次
    Superseded { current_attempt: i32 },
    /// 该批次已有评分结果（重复投递）
    AlreadyGraded,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Superseded { current_attempt } => {
                write!(f, "superseded by attempt {current_attempt}")
            }
            SkipReason::AlreadyGraded => write!(f, "attempt already graded"),
        }
    }
}

pub struct GradingOrchestrator {
    storage: Arc<dyn Storage>,
    files: Arc<dyn FileStore>,
    scorer: Arc<dyn ScorerClient>,
    contexts: Cache<i64, ProblemContext>,
}

impl GradingOrchestrator {
    pub fn new(
        storage: Arc<dyn Storage>,
        files: Arc<dyn FileStore>,
        scorer: Arc<dyn ScorerClient>,
        context_ttl: Duration,
        context_capacity: u64,
    ) -> Self {
        let contexts = Cache::builder()
            .max_capacity(context_capacity)
            .time_to_live(context_ttl)
            .build();

        Self {
            storage,
            files,
            scorer,
            contexts,
        }
    }

    /// 解析提交的代码内容
    ///
    /// 优先使用编辑器内容，其次读取上传文件，两者都没有时返回 `NoCodeContent`。
    pub async fn resolve_code(&self, submission: &Submission) -> Result<String> {
        if let Some(code) = submission
            .code_content
            .as_deref()
            .filter(|code| !code.is_empty())
        {
            return Ok(code.to_string());
        }

        if let Some(path) = submission
            .file_path
            .as_deref()
            .filter(|path| !path.is_empty())
        {
            return self.files.read_to_string(path).await;
        }

        Err(HWSystemError::no_code_content(format!(
            "submission {} has neither editor content nor a file",
            submission.id
        )))
    }

    /// 读取题目上下文（带缓存）
    pub async fn problem_context(&self, homework_id: i64) -> Result<ProblemContext> {
        let storage = self.storage.clone();
        self.contexts
            .try_get_with(homework_id, async move {
                storage
                    .get_homework_by_id(homework_id)
                    .await?
                    .map(|hw| ProblemContext::from(&hw))
                    .ok_or_else(|| {
                        HWSystemError::not_found(format!("homework {homework_id} not found"))
                    })
            })
            .await
            .map_err(|e| e.as_ref().clone())
    }

    /// 对提交执行一次自动评分
    ///
    /// 使用提交当前的评分批次号写入结果；评分服务不可用时不写入任何数据。
    /// 已有教师评分时，最终成绩随评分结果在同一事务中写入。
    pub async fn grade_submission(&self, submission: &Submission) -> Result<GradingResult> {
        let code = self.resolve_code(submission).await?;
        let context = self.problem_context(submission.homework_id).await?;

        let evaluation = self
            .scorer
            .evaluate(
                &context.statement,
                &context.input_spec,
                &context.output_spec,
                &code,
                &context.language,
            )
            .await
            .ok_or_else(|| {
                HWSystemError::grading_unavailable(format!(
                    "scorer gave no result for submission {}",
                    submission.id
                ))
            })?;

        let result = self
            .storage
            .record_grading_result(NewGradingResult {
                submission_id: submission.id,
                attempt: submission.grading_attempt,
                evaluation,
            })
            .await?;

        Ok(result)
    }

    /// 执行队列中的评分任务
    ///
    /// 从存储重新加载提交，过期或重复的任务直接跳过。
    pub async fn run_task(&self, task: &GradingTask) -> Result<TaskOutcome> {
        let submission = self
            .storage
            .get_submission_by_id(task.submission_id)
            .await?
            .ok_or_else(|| {
                HWSystemError::not_found(format!("submission {} not found", task.submission_id))
            })?;

        if submission.grading_attempt != task.attempt {
            debug!(
                submission_id = submission.id,
                task_attempt = task.attempt,
                current_attempt = submission.grading_attempt,
                "Skipping superseded grading task"
            );
            return Ok(TaskOutcome::Skipped(SkipReason::Superseded {
                current_attempt: submission.grading_attempt,
            }));
        }

        if self
            .storage
            .get_grading_result_by_attempt(submission.id, task.attempt)
            .await?
            .is_some()
        {
            return Ok(TaskOutcome::Skipped(SkipReason::AlreadyGraded));
        }

        match self.grade_submission(&submission).await {
            Ok(result) => {
                info!(
                    submission_id = submission.id,
                    task_id = %task.task_id,
                    attempt = task.attempt,
                    grade = result.grade,
                    "Submission graded"
                );
                Ok(TaskOutcome::Graded(result))
            }
            // 并发执行同一批次时，后提交的一方在事务中被拒绝
            Err(HWSystemError::StaleAttempt(msg)) => {
                debug!(submission_id = submission.id, "{}", msg);
                Ok(TaskOutcome::Skipped(SkipReason::AlreadyGraded))
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::testing::{
        MemoryFileStore, ScriptedScorer, editor_submission, homework, orchestrator, storage,
    };
    use crate::models::homeworks::entities::{CreateHomeworkRequest, Homework};
    use crate::models::submissions::entities::{SubmissionKind, SubmissionStatus};
    use crate::models::submissions::requests::CreateSubmissionRequest;

    async fn scheduled_task(storage: &Arc<dyn Storage>, submission_id: i64) -> GradingTask {
        let attempt = storage
            .next_grading_attempt(submission_id)
            .await
            .unwrap()
            .unwrap();
        GradingTask::new(submission_id, attempt)
    }

    #[tokio::test]
    async fn test_editor_submission_is_graded() {
        let storage = storage().await;
        let hw = homework(&storage).await;
        let submission = editor_submission(&storage, hw.id, "print(1)").await;
        let scorer = Arc::new(ScriptedScorer::always(85.0));
        let orchestrator = orchestrator(storage.clone(), MemoryFileStore::default(), scorer.clone());

        let task = scheduled_task(&storage, submission.id).await;
        let outcome = orchestrator.run_task(&task).await.unwrap();

        let result = match outcome {
            TaskOutcome::Graded(result) => result,
            other => panic!("expected graded outcome, got {other:?}"),
        };
        assert_eq!(result.grade, 85.0);
        assert_eq!(result.attempt, 1);
        assert_eq!(result.comments, "Good job");
        assert_eq!(scorer.last_code().await.as_deref(), Some("print(1)"));

        let reloaded = storage.get_submission_by_id(submission.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, SubmissionStatus::Reviewed);
        assert_eq!(reloaded.automated_grade, Some(85.0));
        assert!(reloaded.final_grade.is_none());
    }

    #[tokio::test]
    async fn test_file_submission_reads_stored_file() {
        let storage = storage().await;
        let hw = homework(&storage).await;
        let submission = storage
            .create_submission(CreateSubmissionRequest {
                homework_id: hw.id,
                creator_id: 3,
                kind: SubmissionKind::File,
                code_content: None,
                file_path: Some("3/main.py".to_string()),
            })
            .await
            .unwrap();
        let scorer = Arc::new(ScriptedScorer::always(70.0));
        let files = MemoryFileStore::default().with_file("3/main.py", "print(42)\n");
        let orchestrator = orchestrator(storage.clone(), files, scorer.clone());

        let task = scheduled_task(&storage, submission.id).await;
        let outcome = orchestrator.run_task(&task).await.unwrap();

        assert!(matches!(outcome, TaskOutcome::Graded(_)));
        assert_eq!(scorer.last_code().await.as_deref(), Some("print(42)\n"));
    }

    #[tokio::test]
    async fn test_missing_code_is_rejected_without_scoring() {
        let storage = storage().await;
        let hw = homework(&storage).await;
        let submission = editor_submission(&storage, hw.id, "").await;
        let scorer = Arc::new(ScriptedScorer::always(85.0));
        let orchestrator = orchestrator(storage.clone(), MemoryFileStore::default(), scorer.clone());

        let task = scheduled_task(&storage, submission.id).await;
        let err = orchestrator.run_task(&task).await.unwrap_err();

        assert!(matches!(err, HWSystemError::NoCodeContent(_)));
        assert!(!err.is_transient());
        assert_eq!(scorer.calls(), 0);
    }

    #[tokio::test]
    async fn test_unavailable_scorer_writes_nothing() {
        let storage = storage().await;
        let hw = homework(&storage).await;
        let submission = editor_submission(&storage, hw.id, "print(1)").await;
        let scorer = Arc::new(ScriptedScorer::unavailable());
        let orchestrator = orchestrator(storage.clone(), MemoryFileStore::default(), scorer);

        let task = scheduled_task(&storage, submission.id).await;
        let err = orchestrator.run_task(&task).await.unwrap_err();
        assert!(matches!(err, HWSystemError::GradingUnavailable(_)));
        assert!(err.is_transient());

        let reloaded = storage.get_submission_by_id(submission.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, SubmissionStatus::Pending);
        assert!(reloaded.automated_grade.is_none());
        assert!(
            storage
                .list_grading_results(submission.id, 10)
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_superseded_task_is_skipped() {
        let storage = storage().await;
        let hw = homework(&storage).await;
        let submission = editor_submission(&storage, hw.id, "print(1)").await;
        let scorer = Arc::new(ScriptedScorer::always(85.0));
        let orchestrator = orchestrator(storage.clone(), MemoryFileStore::default(), scorer.clone());

        let stale = scheduled_task(&storage, submission.id).await;
        let _fresh = scheduled_task(&storage, submission.id).await;

        let outcome = orchestrator.run_task(&stale).await.unwrap();
        assert!(matches!(
            outcome,
            TaskOutcome::Skipped(SkipReason::Superseded { current_attempt: 2 })
        ));
        assert_eq!(scorer.calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_delivery_is_skipped() {
        let storage = storage().await;
        let hw = homework(&storage).await;
        let submission = editor_submission(&storage, hw.id, "print(1)").await;
        let scorer = Arc::new(ScriptedScorer::always(85.0));
        let orchestrator = orchestrator(storage.clone(), MemoryFileStore::default(), scorer.clone());

        let task = scheduled_task(&storage, submission.id).await;
        assert!(matches!(
            orchestrator.run_task(&task).await.unwrap(),
            TaskOutcome::Graded(_)
        ));
        assert!(matches!(
            orchestrator.run_task(&task).await.unwrap(),
            TaskOutcome::Skipped(SkipReason::AlreadyGraded)
        ));
        assert_eq!(scorer.calls(), 1);
        assert_eq!(
            storage.list_grading_results(submission.id, 10).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_regrade_after_teacher_grade_sets_final_grade() {
        let storage = storage().await;
        let hw = homework(&storage).await;
        let submission = editor_submission(&storage, hw.id, "print(1)").await;
        let scorer = Arc::new(ScriptedScorer::always(85.0));
        let orchestrator = orchestrator(storage.clone(), MemoryFileStore::default(), scorer);

        storage
            .apply_human_grade(submission.id, 80.0, Some("Nice structure".to_string()))
            .await
            .unwrap();

        let task = scheduled_task(&storage, submission.id).await;
        orchestrator.run_task(&task).await.unwrap();

        let reloaded = storage.get_submission_by_id(submission.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, SubmissionStatus::Graded);
        assert_eq!(reloaded.human_grade, Some(80.0));
        assert_eq!(reloaded.automated_grade, Some(85.0));
        assert_eq!(reloaded.final_grade, Some(81.5));
    }

    /// 在评分结果写入前插入一次教师改分
    struct RegradeBeforeRecord {
        inner: Arc<dyn Storage>,
        human_grade: f64,
    }

    #[async_trait::async_trait]
    impl Storage for RegradeBeforeRecord {
        async fn create_homework(&self, homework: CreateHomeworkRequest) -> Result<Homework> {
            self.inner.create_homework(homework).await
        }

        async fn get_homework_by_id(&self, homework_id: i64) -> Result<Option<Homework>> {
            self.inner.get_homework_by_id(homework_id).await
        }

        async fn create_submission(&self, submission: CreateSubmissionRequest) -> Result<Submission> {
            self.inner.create_submission(submission).await
        }

        async fn get_submission_by_id(&self, submission_id: i64) -> Result<Option<Submission>> {
            self.inner.get_submission_by_id(submission_id).await
        }

        async fn next_grading_attempt(&self, submission_id: i64) -> Result<Option<i32>> {
            self.inner.next_grading_attempt(submission_id).await
        }

        async fn revert_grading_attempt(&self, submission_id: i64, attempt: i32) -> Result<bool> {
            self.inner.revert_grading_attempt(submission_id, attempt).await
        }

        async fn apply_human_grade(
            &self,
            submission_id: i64,
            human_grade: f64,
            feedback: Option<String>,
        ) -> Result<Option<Submission>> {
            self.inner
                .apply_human_grade(submission_id, human_grade, feedback)
                .await
        }

        async fn record_grading_result(&self, result: NewGradingResult) -> Result<GradingResult> {
            self.inner
                .apply_human_grade(result.submission_id, self.human_grade, None)
                .await?;
            self.inner.record_grading_result(result).await
        }

        async fn get_grading_result_by_attempt(
            &self,
            submission_id: i64,
            attempt: i32,
        ) -> Result<Option<GradingResult>> {
            self.inner
                .get_grading_result_by_attempt(submission_id, attempt)
                .await
        }

        async fn list_grading_results(
            &self,
            submission_id: i64,
            limit: u64,
        ) -> Result<Vec<GradingResult>> {
            self.inner.list_grading_results(submission_id, limit).await
        }
    }

    #[tokio::test]
    async fn test_teacher_regrade_during_scoring_uses_latest_grade() {
        let inner = storage().await;
        let hw = homework(&inner).await;
        let submission = editor_submission(&inner, hw.id, "print(1)").await;
        inner
            .apply_human_grade(submission.id, 80.0, None)
            .await
            .unwrap();

        let storage: Arc<dyn Storage> = Arc::new(RegradeBeforeRecord {
            inner: inner.clone(),
            human_grade: 60.0,
        });
        let scorer = Arc::new(ScriptedScorer::always(90.0));
        let orchestrator = orchestrator(storage.clone(), MemoryFileStore::default(), scorer);

        let task = scheduled_task(&storage, submission.id).await;
        let outcome = orchestrator.run_task(&task).await.unwrap();
        assert!(matches!(outcome, TaskOutcome::Graded(_)));

        let reloaded = inner.get_submission_by_id(submission.id).await.unwrap().unwrap();
        assert_eq!(reloaded.human_grade, Some(60.0));
        assert_eq!(reloaded.automated_grade, Some(90.0));
        assert_eq!(reloaded.final_grade, Some(69.0));
    }

    #[tokio::test]
    async fn test_missing_submission_and_homework() {
        let storage = storage().await;
        let orchestrator = orchestrator(
            storage,
            MemoryFileStore::default(),
            Arc::new(ScriptedScorer::always(85.0)),
        );

        let err = orchestrator
            .run_task(&GradingTask::new(404, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, HWSystemError::NotFound(_)));

        let err = orchestrator.problem_context(404).await.unwrap_err();
        assert!(matches!(err, HWSystemError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_problem_context_from_homework() {
        let storage = storage().await;
        let hw = homework(&storage).await;
        let orchestrator = orchestrator(
            storage,
            MemoryFileStore::default(),
            Arc::new(ScriptedScorer::always(85.0)),
        );

        let context = orchestrator.problem_context(hw.id).await.unwrap();
        assert_eq!(context.statement, "Sum two integers");
        assert_eq!(context.language, "python");
        assert_eq!(orchestrator.problem_context(hw.id).await.unwrap(), context);
    }
}
