use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::SubmissionService;
use crate::grading::policy::compute_final_grade;
use crate::models::submissions::responses::FinalGradeResponse;
use crate::models::{ApiResponse, ErrorCode};

/// 即时计算最终成绩，不写库
/// GET /submissions/{id}/final-grade
pub async fn get_final_grade(
    service: &SubmissionService,
    request: &HttpRequest,
    submission_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    let submission = match storage.get_submission_by_id(submission_id).await {
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
                    format!("查询提交失败: {e}"),
                )),
            );
        }
    };

    match (
        compute_final_grade(&submission),
        submission.human_grade,
        submission.automated_grade,
    ) {
        (Ok(final_grade), Some(human_grade), Some(automated_grade)) => {
            Ok(HttpResponse::Ok().json(ApiResponse::success(
                FinalGradeResponse {
                    submission_id,
                    automated_grade,
                    human_grade,
                    final_grade,
                },
                "查询成功",
            )))
        }
        (Err(e), _, _) => Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
            ErrorCode::from_error(&e),
            e.message(),
        ))),
        _ => Ok(HttpResponse::Conflict().json(ApiResponse::error_empty(
            ErrorCode::GradesIncomplete,
            "评分不完整",
        ))),
    }
}
