pub mod create;
pub mod detail;
pub mod final_grade;
pub mod grade;
pub mod regrade;
pub mod results;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::models::submissions::requests::{
    CreateSubmissionRequest, GradeSubmissionRequest, GradingResultQuery,
};
use crate::queue::GradingScheduler;
use crate::storage::Storage;

pub struct SubmissionService {
    storage: Option<Arc<dyn Storage>>,
}

impl SubmissionService {
    pub fn new_lazy() -> Self {
        Self { storage: None }
    }

    pub(crate) fn get_storage(&self, request: &HttpRequest) -> Arc<dyn Storage> {
        if let Some(storage) = &self.storage {
            storage.clone()
        } else {
            request
                .app_data::<actix_web::web::Data<Arc<dyn Storage>>>()
                .expect("Storage not found in app data")
                .get_ref()
                .clone()
        }
    }

    pub(crate) fn get_scheduler(&self, request: &HttpRequest) -> GradingScheduler {
        request
            .app_data::<actix_web::web::Data<GradingScheduler>>()
            .expect("GradingScheduler not found in app data")
            .get_ref()
            .clone()
    }

    /// 创建提交并安排自动评分
    pub async fn create_submission(
        &self,
        request: &HttpRequest,
        req: CreateSubmissionRequest,
    ) -> ActixResult<HttpResponse> {
        create::create_submission(self, request, req).await
    }

    /// 获取提交详情
    pub async fn get_submission(
        &self,
        request: &HttpRequest,
        submission_id: i64,
    ) -> ActixResult<HttpResponse> {
        detail::get_submission(self, request, submission_id).await
    }

    /// 列出自动评分结果
    pub async fn list_grading_results(
        &self,
        request: &HttpRequest,
        submission_id: i64,
        query: GradingResultQuery,
    ) -> ActixResult<HttpResponse> {
        results::list_grading_results(self, request, submission_id, query).await
    }

    /// 计算最终成绩
    pub async fn get_final_grade(
        &self,
        request: &HttpRequest,
        submission_id: i64,
    ) -> ActixResult<HttpResponse> {
        final_grade::get_final_grade(self, request, submission_id).await
    }

    /// 教师评分
    pub async fn grade_submission(
        &self,
        request: &HttpRequest,
        submission_id: i64,
        req: GradeSubmissionRequest,
    ) -> ActixResult<HttpResponse> {
        grade::grade_submission(self, request, submission_id, req).await
    }

    /// 手动重新评分
    pub async fn regrade_submission(
        &self,
        request: &HttpRequest,
        submission_id: i64,
    ) -> ActixResult<HttpResponse> {
        regrade::regrade_submission(self, request, submission_id).await
    }
}
