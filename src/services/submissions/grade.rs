use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use tracing::info;

use super::SubmissionService;
use crate::models::submissions::requests::GradeSubmissionRequest;
use crate::models::submissions::responses::SubmissionResponse;
use crate::models::{ApiResponse, ErrorCode};
use crate::utils::validate::{validate_feedback, validate_human_grade};

/// 教师评分
/// PUT /submissions/{id}/grade
///
/// 只写教师评分和评语，状态置为 graded；已有自动评分时同时写入最终成绩。
pub async fn grade_submission(
    service: &SubmissionService,
    request: &HttpRequest,
    submission_id: i64,
    req: GradeSubmissionRequest,
) -> ActixResult<HttpResponse> {
    if let Err(msg) = validate_human_grade(req.human_grade) {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::GradeInvalid, msg)));
    }
    if let Some(feedback) = &req.feedback
        && let Err(msg) = validate_feedback(feedback)
    {
        return Ok(HttpResponse::BadRequest()
            .json(ApiResponse::error_empty(ErrorCode::GradeInvalid, msg)));
    }

    let storage = service.get_storage(request);

    let updated = match storage
        .apply_human_grade(submission_id, req.human_grade, req.feedback)
        .await
    {
        Ok(Some(sub)) => sub,
        Ok(None) => {
            return Ok(HttpResponse::NotFound().json(ApiResponse::error_empty(
                ErrorCode::SubmissionNotFound,
                "提交不存在",
            )));
        }
        Err(e) => {
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    format!("保存评分失败: {e}"),
                )),
            );
        }
    };

    info!(
        submission_id,
        human_grade = req.human_grade,
        final_grade = ?updated.final_grade,
        "Submission graded by teacher"
    );

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        SubmissionResponse::new(updated, None),
        "评分成功",
    )))
}
