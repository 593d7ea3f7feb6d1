use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 外部评分服务返回的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub grade: f64,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub comments: String,
}

/// 自动评分记录，创建后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradingResult {
    pub id: i64,
    pub submission_id: i64,
    pub attempt: i32,
    pub grade: f64,
    pub metrics: BTreeMap<String, f64>,
    pub comments: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// 待写入的自动评分记录
#[derive(Debug, Clone)]
pub struct NewGradingResult {
    pub submission_id: i64,
    pub attempt: i32,
    pub evaluation: Evaluation,
}
