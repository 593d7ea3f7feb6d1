pub mod health;

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::models::AppStartTime;
use crate::queue::GradingQueue;

pub struct SystemService;

impl SystemService {
    pub fn new_lazy() -> Self {
        Self
    }

    pub(crate) fn get_config(&self) -> &AppConfig {
        AppConfig::get()
    }

    pub(crate) fn get_queue(&self, request: &HttpRequest) -> Arc<dyn GradingQueue> {
        request
            .app_data::<actix_web::web::Data<Arc<dyn GradingQueue>>>()
            .expect("GradingQueue not found in app data")
            .get_ref()
            .clone()
    }

    pub(crate) fn get_start_time(&self, request: &HttpRequest) -> Option<AppStartTime> {
        request
            .app_data::<actix_web::web::Data<AppStartTime>>()
            .map(|data| data.get_ref().clone())
    }

    /// 健康检查
    pub async fn get_health(&self, request: &HttpRequest) -> ActixResult<HttpResponse> {
        health::get_health(self, request).await
    }
}
