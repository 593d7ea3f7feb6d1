use serde::{Deserialize, Serialize};

// 提交方式
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    File,   // 上传代码文件
    Editor, // 在线编辑器
}

impl SubmissionKind {
    pub const FILE: &'static str = "file";
    pub const EDITOR: &'static str = "editor";
}

impl<'de> Deserialize<'de> for SubmissionKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|_| {
            serde::de::Error::custom(format!("无效的提交方式: '{s}'. 支持的方式: file, editor"))
        })
    }
}

impl std::fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionKind::File => write!(f, "{}", SubmissionKind::FILE),
            SubmissionKind::Editor => write!(f, "{}", SubmissionKind::EDITOR),
        }
    }
}

impl std::str::FromStr for SubmissionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            SubmissionKind::FILE => Ok(SubmissionKind::File),
            SubmissionKind::EDITOR => Ok(SubmissionKind::Editor),
            _ => Err(format!("Invalid submission kind: {s}")),
        }
    }
}

// 提交状态
//
// 只能单向推进：pending → reviewed（已有自动评分）→ graded（教师已评分）
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,  // 待评分
    Reviewed, // 已自动评分
    Graded,   // 教师已评分
}

impl SubmissionStatus {
    pub const PENDING: &'static str = "pending";
    pub const REVIEWED: &'static str = "reviewed";
    pub const GRADED: &'static str = "graded";
}

impl<'de> Deserialize<'de> for SubmissionStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|_| {
            serde::de::Error::custom(format!(
                "无效的提交状态: '{s}'. 支持的状态: pending, reviewed, graded"
            ))
        })
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionStatus::Pending => write!(f, "{}", SubmissionStatus::PENDING),
            SubmissionStatus::Reviewed => write!(f, "{}", SubmissionStatus::REVIEWED),
            SubmissionStatus::Graded => write!(f, "{}", SubmissionStatus::GRADED),
        }
    }
}

impl std::str::FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            SubmissionStatus::PENDING => Ok(SubmissionStatus::Pending),
            SubmissionStatus::REVIEWED => Ok(SubmissionStatus::Reviewed),
            SubmissionStatus::GRADED => Ok(SubmissionStatus::Graded),
            _ => Err(format!("Invalid submission status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    // 唯一 ID
    pub id: i64,
    // 关联的作业 ID
    pub homework_id: i64,
    // 提交学生 ID
    pub creator_id: i64,
    // 提交方式
    pub kind: SubmissionKind,
    // 编辑器提交的代码
    pub code_content: Option<String>,
    // 上传文件的存储路径
    pub file_path: Option<String>,
    // 评分状态
    pub status: SubmissionStatus,
    // 自动评分（0-100）
    pub automated_grade: Option<f64>,
    // 教师评分（0-100）
    pub human_grade: Option<f64>,
    // 教师评语
    pub feedback: Option<String>,
    // 加权后的最终成绩
    pub final_grade: Option<f64>,
    // 当前评分批次
    pub grading_attempt: i32,
    // 提交时间
    pub submitted_at: chrono::DateTime<chrono::Utc>,
    // 更新时间
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
