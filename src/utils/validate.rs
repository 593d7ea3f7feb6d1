use crate::models::submissions::entities::SubmissionKind;
use crate::models::submissions::requests::CreateSubmissionRequest;

/// 评语最短长度（字符）
pub const FEEDBACK_MIN_CHARS: usize = 10;
/// 评语最长长度（字符）
pub const FEEDBACK_MAX_CHARS: usize = 1000;

pub fn validate_human_grade(grade: f64) -> Result<(), &'static str> {
    // 分数范围校验：0 <= x <= 100
    if !grade.is_finite() || !(0.0..=100.0).contains(&grade) {
        return Err("Grade must be between 0 and 100");
    }
    // 步长校验：必须是 0.5 的整数倍
    if (grade * 2.0).fract() != 0.0 {
        return Err("Grade must be a multiple of 0.5");
    }
    Ok(())
}

pub fn validate_feedback(feedback: &str) -> Result<(), &'static str> {
    // 按字符计数，中文评语不按字节算
    let len = feedback.chars().count();
    if len < FEEDBACK_MIN_CHARS {
        return Err("Feedback must be at least 10 characters long");
    }
    if len > FEEDBACK_MAX_CHARS {
        return Err("Feedback must be at most 1000 characters long");
    }
    Ok(())
}

/// 校验提交内容
///
/// 编辑器提交必须带非空代码，文件提交必须带文件路径，两者不能同时出现。
pub fn validate_submission_payload(req: &CreateSubmissionRequest) -> Result<(), &'static str> {
    let has_code = req.code_content.as_deref().is_some_and(|c| !c.trim().is_empty());
    let has_file = req.file_path.as_deref().is_some_and(|p| !p.trim().is_empty());

    match (req.kind, has_code, has_file) {
        (_, true, true) => Err("Submission must contain either code or a file, not both"),
        (SubmissionKind::Editor, true, false) => Ok(()),
        (SubmissionKind::Editor, false, _) => Err("Editor submission requires code content"),
        (SubmissionKind::File, false, true) => Ok(()),
        (SubmissionKind::File, _, false) => Err("File submission requires a file path"),
    }
}
