use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::SubmissionService;
use crate::errors::HWSystemError;
use crate::models::submissions::responses::GradingScheduledResponse;
use crate::models::{ApiResponse, ErrorCode};

/// 手动重新评分：开启新的评分批次，旧批次的排队任务将被跳过
/// POST /submissions/{id}/regrade
pub async fn regrade_submission(
    service: &SubmissionService,
    request: &HttpRequest,
    submission_id: i64,
) -> ActixResult<HttpResponse> {
    let scheduler = service.get_scheduler(request);

    match scheduler.schedule(submission_id).await {
        Ok(task) => Ok(HttpResponse::Accepted().json(ApiResponse::success(
            GradingScheduledResponse {
                submission_id,
                task_id: task.task_id.to_string(),
                attempt: task.attempt,
            },
            "已加入评分队列",
        ))),
        Err(HWSystemError::NotFound(_)) => Ok(HttpResponse::NotFound().json(
            ApiResponse::error_empty(ErrorCode::SubmissionNotFound, "提交不存在"),
        )),
        Err(e @ (HWSystemError::Queue(_) | HWSystemError::QueuePluginNotFound(_))) => Ok(
            HttpResponse::ServiceUnavailable().json(ApiResponse::error_empty(
                ErrorCode::GradingEnqueueFailed,
                format!("评分任务排队失败: {}", e.message()),
            )),
        ),
        Err(e) => Ok(
            HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::InternalServerError,
                format!("安排评分失败: {e}"),
            )),
        ),
    }
}
