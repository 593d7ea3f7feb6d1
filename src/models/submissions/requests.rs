use serde::Deserialize;

use super::entities::SubmissionKind;

// 创建提交请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubmissionRequest {
    pub homework_id: i64,
    pub creator_id: i64,
    pub kind: SubmissionKind,
    pub code_content: Option<String>,
    pub file_path: Option<String>,
}

// 教师评分请求
#[derive(Debug, Clone, Deserialize)]
pub struct GradeSubmissionRequest {
    pub human_grade: f64,
    pub feedback: Option<String>,
}

// 自动评分结果查询参数
#[derive(Debug, Clone, Deserialize)]
pub struct GradingResultQuery {
    pub limit: Option<u64>,
}

impl GradingResultQuery {
    pub const DEFAULT_LIMIT: u64 = 10;
    pub const MAX_LIMIT: u64 = 50;

    pub fn effective_limit(&self) -> u64 {
        self.limit
            .unwrap_or(Self::DEFAULT_LIMIT)
            .clamp(1, Self::MAX_LIMIT)
    }
}
