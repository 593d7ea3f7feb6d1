use serde::Serialize;

use super::entities::{Submission, SubmissionKind, SubmissionStatus};
use crate::models::grading::entities::GradingResult;

/// 提交详情响应
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub id: i64,
    pub homework_id: i64,
    pub creator_id: i64,
    pub kind: SubmissionKind,
    pub status: SubmissionStatus,
    pub automated_grade: Option<f64>,
    pub human_grade: Option<f64>,
    pub feedback: Option<String>,
    pub final_grade: Option<f64>,
    pub submitted_at: String,
    pub latest_result: Option<GradingResult>,
}

impl SubmissionResponse {
    pub fn new(submission: Submission, latest_result: Option<GradingResult>) -> Self {
        Self {
            id: submission.id,
            homework_id: submission.homework_id,
            creator_id: submission.creator_id,
            kind: submission.kind,
            status: submission.status,
            automated_grade: submission.automated_grade,
            human_grade: submission.human_grade,
            feedback: submission.feedback,
            final_grade: submission.final_grade,
            submitted_at: submission.submitted_at.to_rfc3339(),
            latest_result,
        }
    }
}

/// 最终成绩响应
#[derive(Debug, Serialize)]
pub struct FinalGradeResponse {
    pub submission_id: i64,
    pub automated_grade: f64,
    pub human_grade: f64,
    pub final_grade: f64,
}

/// 评分任务已排队响应
#[derive(Debug, Serialize)]
pub struct GradingScheduledResponse {
    pub submission_id: i64,
    pub task_id: String,
    pub attempt: i32,
}

/// 创建提交响应
#[derive(Debug, Serialize)]
pub struct SubmissionCreatedResponse {
    pub submission: SubmissionResponse,
    // 评分任务入队失败时为空
    pub grading: Option<GradingScheduledResponse>,
}
