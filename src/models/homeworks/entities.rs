use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Homework {
    // 唯一 ID
    pub id: i64,
    // 作业标题
    pub title: String,
    // 题目描述
    pub statement: String,
    // 输入说明
    pub input_spec: String,
    // 输出说明
    pub output_spec: String,
    // 提交代码所用语言
    pub language: String,
    // 作业创建时间
    pub created_at: chrono::DateTime<chrono::Utc>,
    // 作业更新时间
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// 创建作业请求（用于存储层）
#[derive(Debug, Clone, Deserialize)]
pub struct CreateHomeworkRequest {
    pub title: String,
    pub statement: String,
    pub input_spec: String,
    pub output_spec: String,
    pub language: String,
}

/// 评分所需的题目上下文
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemContext {
    pub statement: String,
    pub input_spec: String,
    pub output_spec: String,
    pub language: String,
}

impl From<&Homework> for ProblemContext {
    fn from(hw: &Homework) -> Self {
        Self {
            statement: hw.statement.clone(),
            input_spec: hw.input_spec.clone(),
            output_spec: hw.output_spec.clone(),
            language: hw.language.clone(),
        }
    }
}
