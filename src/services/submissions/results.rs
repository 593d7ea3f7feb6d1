use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};

use super::SubmissionService;
use crate::models::submissions::requests::GradingResultQuery;
use crate::models::{ApiResponse, ErrorCode};

/// 列出提交最近的自动评分结果（新的在前）
/// GET /submissions/{id}/grading-results?limit=n
pub async fn list_grading_results(
    service: &SubmissionService,
    request: &HttpRequest,
    submission_id: i64,
    query: GradingResultQuery,
) -> ActixResult<HttpResponse> {
    let storage = service.get_storage(request);

    match storage.get_submission_by_id(submission_id).await {
        Ok(Some(_)) => {}
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
    }

    match storage
        .list_grading_results(submission_id, query.effective_limit())
        .await
    {
        Ok(results) => Ok(HttpResponse::Ok().json(ApiResponse::success(results, "查询成功"))),
        Err(e) => Ok(
            HttpResponse::InternalServerError().json(ApiResponse::error_empty(
                ErrorCode::InternalServerError,
                format!("查询评分结果失败: {e}"),
            )),
        ),
    }
}
