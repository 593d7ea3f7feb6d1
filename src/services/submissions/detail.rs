use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::SubmissionService;
use crate::grading::policy::compute_final_grade;
use crate::models::submissions::responses::SubmissionResponse;
use crate::models::{ApiResponse, ErrorCode};

pub async fn get_submission(
    service: &SubmissionService,
    request: &HttpRequest,
    submission_id: i64,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    let mut submission = match storage.get_submission_by_id(submission_id).await {
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

    let latest_result = match storage.list_grading_results(submission_id, 1).await {
        Ok(mut results) => results.pop(),
        Err(e) => {
            return Ok(
                HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                    ErrorCode::InternalServerError,
                    format!("查询评分结果失败: {e}"),
                )),
            );
        }
    };

    // 最终成绩尚未落库时按当前评分即时计算
    if submission.final_grade.is_none() {
        submission.final_grade = compute_final_grade(&submission).ok();
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(
        SubmissionResponse::new(submission, latest_result),
        "查询成功",
    )))
}
