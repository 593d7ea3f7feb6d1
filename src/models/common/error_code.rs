use crate::errors::HWSystemError;

/// API 业务错误码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,

    // 通用错误
    BadRequest = 1000,
    NotFound = 1004,
    Conflict = 1009,
    InternalServerError = 1500,

    // 作业相关
    HomeworkNotFound = 3000,

    // 提交相关
    SubmissionNotFound = 4000,
    SubmissionInvalid = 4001,
    GradeInvalid = 4002,
    GradesIncomplete = 4003,

    // 评分任务相关
    GradingEnqueueFailed = 5000,
}

impl ErrorCode {
    /// 将内部错误映射为 API 错误码
    pub fn from_error(err: &HWSystemError) -> Self {
        match err {
            HWSystemError::Validation(_) => ErrorCode::BadRequest,
            HWSystemError::NotFound(_) => ErrorCode::NotFound,
            HWSystemError::NoCodeContent(_) => ErrorCode::SubmissionInvalid,
            HWSystemError::IncompleteGrades(_) => ErrorCode::GradesIncomplete,
            HWSystemError::StaleAttempt(_) => ErrorCode::Conflict,
            HWSystemError::Queue(_) | HWSystemError::QueuePluginNotFound(_) => {
                ErrorCode::GradingEnqueueFailed
            }
            _ => ErrorCode::InternalServerError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_error() {
        assert_eq!(
            ErrorCode::from_error(&HWSystemError::incomplete_grades("x")),
            ErrorCode::GradesIncomplete
        );
        assert_eq!(
            ErrorCode::from_error(&HWSystemError::not_found("x")),
            ErrorCode::NotFound
        );
        assert_eq!(
            ErrorCode::from_error(&HWSystemError::database_operation("x")),
            ErrorCode::InternalServerError
        );
    }
}
