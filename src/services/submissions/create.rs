use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::error;

use super::SubmissionService;
use crate::models::submissions::requests::CreateSubmissionRequest;
use crate::models::submissions::responses::{
    GradingScheduledResponse, SubmissionCreatedResponse, SubmissionResponse,
};
use crate::models::{ApiResponse, ErrorCode};
use crate::utils::validate::validate_submission_payload;

pub async fn create_submission(
    service: &SubmissionService,
    request: &HttpRequest,
    req: CreateSubmissionRequest,
) -> ActixResult<HttpResponse> {
    if let Err(msg) = validate_submission_payload(&req) {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::SubmissionInvalid, msg)));
    }

    let storage = service.get_storage(request);

    // 作业必须存在
    match storage.get_homework_by_id(req.homework_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::HomeworkNotFound,
                "作业不存在",
            )));
        }
        Err(e) => {
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    format!("查询作业失败: {e}"),
                )),
            );
        }
    }

    let submission = match storage.create_submission(req).await {
        Ok(sub) => sub,
        Err(e) => {
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    format!("创建提交失败: {e}"),
                )),
            );
        }
    };

    // 入队失败不影响提交本身，可以稍后手动重新评分
    let grading = match service.get_scheduler(request).schedule(submission.id).await {
        Ok(task) => Some(GradingScheduledResponse {
            submission_id: submission.id,
            task_id: task.task_id.to_string(),
            attempt: task.attempt,
        }),
        Err(e) => {
            error!(
                submission_id = submission.id,
                error_type = e.error_type(),
                "Failed to schedule grading: {}",
                e.message()
            );
            None
        }
    };

    let message = if grading.is_some() {
        "提交成功，已加入评分队列"
    } else {
        "提交成功，评分任务排队失败"
    };

    Ok(HttpResponse::Created().json(ApiResponse::success(
        SubmissionCreatedResponse {
            submission: SubmissionResponse::new(submission, None),
            grading,
        },
        message,
    )))
}
