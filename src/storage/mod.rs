use std::sync::Arc;

use crate::models::{
    grading::entities::{GradingResult, NewGradingResult},
    homeworks::entities::{CreateHomeworkRequest, Homework},
    submissions::{entities::Submission, requests::CreateSubmissionRequest},
};

use crate::errors::Result;

pub mod file_store;
pub mod sea_orm_storage;

pub use file_store::{FileStore, LocalFileStore};

#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// 作业管理方法
    // 创建作业
    async fn create_homework(&self, homework: CreateHomeworkRequest) -> Result<Homework>;
    // 通过ID获取作业（题目上下文）
    async fn get_homework_by_id(&self, homework_id: i64) -> Result<Option<Homework>>;

    /// 提交管理方法
    // 创建提交
    async fn create_submission(&self, submission: CreateSubmissionRequest) -> Result<Submission>;
    // 通过ID获取提交
    async fn get_submission_by_id(&self, submission_id: i64) -> Result<Option<Submission>>;
    // 开启新的评分批次，返回批次号
    async fn next_grading_attempt(&self, submission_id: i64) -> Result<Option<i32>>;
    // 撤销未能入队的评分批次（批次号未变时）
    async fn revert_grading_attempt(&self, submission_id: i64, attempt: i32) -> Result<bool>;
    // 写入教师评分，状态置为 graded，已有自动评分时同时写入最终成绩（单事务）
    async fn apply_human_grade(
        &self,
        submission_id: i64,
        human_grade: f64,
        feedback: Option<String>,
    ) -> Result<Option<Submission>>;

    /// 自动评分方法
    // 写入评分结果并同步提交的自动评分字段与最终成绩（单事务）
    async fn record_grading_result(&self, result: NewGradingResult) -> Result<GradingResult>;
    // 获取某批次的评分结果
    async fn get_grading_result_by_attempt(
        &self,
        submission_id: i64,
        attempt: i32,
    ) -> Result<Option<GradingResult>>;
    // 列出最近的评分结果
    async fn list_grading_results(
        &self,
        submission_id: i64,
        limit: u64,
    ) -> Result<Vec<GradingResult>>;
}

pub async fn create_storage() -> Result<Arc<dyn Storage>> {
    let storage = sea_orm_storage::SeaOrmStorage::new_async().await?;
    Ok(Arc::new(storage))
}
