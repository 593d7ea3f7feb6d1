//! 最终成绩加权规则
//!
//! 最终成绩 = 教师评分 × 70% + 自动评分 × 30%，保留两位小数。

use crate::errors::{HWSystemError, Result};
use crate::models::submissions::entities::Submission;

/// 教师评分权重
pub const HUMAN_WEIGHT: f64 = 0.7;
/// 自动评分权重
pub const AUTOMATED_WEIGHT: f64 = 0.3;

/// 四舍五入到两位小数（远离零方向），先抵消二进制表示误差
pub fn round2(value: f64) -> f64 {
    let scaled = value * 100.0;
    (scaled + scaled.signum() * 1e-9).round() / 100.0
}

/// 按固定权重合成最终成绩
pub fn blend(human_grade: f64, automated_grade: f64) -> f64 {
    round2(human_grade * HUMAN_WEIGHT + automated_grade * AUTOMATED_WEIGHT)
}

/// 计算提交的最终成绩
///
/// 纯函数，不写库；两项评分缺一时返回 `IncompleteGrades`。
pub fn compute_final_grade(submission: &Submission) -> Result<f64> {
    match (submission.human_grade, submission.automated_grade) {
        (Some(human), Some(automated)) => Ok(blend(human, automated)),
        (human, automated) => Err(HWSystemError::incomplete_grades(format!(
            "submission {}: human grade {}, automated grade {}",
            submission.id,
            if human.is_some() { "present" } else { "missing" },
            if automated.is_some() { "present" } else { "missing" },
        ))),
    }
}
