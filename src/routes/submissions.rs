use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::models::submissions::requests::{
    CreateSubmissionRequest, GradeSubmissionRequest, GradingResultQuery,
};
use crate::services::SubmissionService;

// 懒加载的全局 SubmissionService 实例
static SUBMISSION_SERVICE: Lazy<SubmissionService> = Lazy::new(SubmissionService::new_lazy);

// 创建提交
pub async fn create_submission(
    req: HttpRequest,
    body: web::Json<CreateSubmissionRequest>,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .create_submission(&req, body.into_inner())
        .await
}

// 获取提交详情
pub async fn get_submission(req: HttpRequest, path: web::Path<i64>) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .get_submission(&req, path.into_inner())
        .await
}

// 获取自动评分结果
pub async fn list_grading_results(
    req: HttpRequest,
    path: web::Path<i64>,
    query: web::Query<GradingResultQuery>,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .list_grading_results(&req, path.into_inner(), query.into_inner())
        .await
}

// 获取最终成绩
pub async fn get_final_grade(req: HttpRequest, path: web::Path<i64>) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .get_final_grade(&req, path.into_inner())
        .await
}

// 教师评分
pub async fn grade_submission(
    req: HttpRequest,
    path: web::Path<i64>,
    body: web::Json<GradeSubmissionRequest>,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .grade_submission(&req, path.into_inner(), body.into_inner())
        .await
}

// 重新评分
pub async fn regrade_submission(
    req: HttpRequest,
    path: web::Path<i64>,
) -> ActixResult<HttpResponse> {
    SUBMISSION_SERVICE
        .regrade_submission(&req, path.into_inner())
        .await
}

// 配置路由
pub fn configure_submissions_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/submissions")
            .route("", web::post().to(create_submission))
            .route("/{id}", web::get().to(get_submission))
            .route("/{id}/grading-results", web::get().to(list_grading_results))
            .route("/{id}/final-grade", web::get().to(get_final_grade))
            .route("/{id}/grade", web::put().to(grade_submission))
            .route("/{id}/regrade", web::post().to(regrade_submission)),
    );
}
