use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use once_cell::sync::Lazy;

use crate::services::SystemService;

// 懒加载的全局 SystemService 实例
static SYSTEM_SERVICE: Lazy<SystemService> = Lazy::new(SystemService::new_lazy);

pub async fn get_health(request: HttpRequest) -> ActixResult<HttpResponse> {
    SYSTEM_SERVICE.get_health(&request).await
}

// 配置路由
pub fn configure_system_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/v1/system").route("/health", web::get().to(get_health)));
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, test};
    use serde_json::Value;

    use super::*;
    use crate::models::AppStartTime;
    use crate::queue::backends::memory::MemoryGradingQueue;
    use crate::queue::{GradingQueue, GradingTask};

    #[actix_web::test]
    async fn test_health_reports_queue_length() {
        let queue: Arc<dyn GradingQueue> = Arc::new(MemoryGradingQueue::new(8));
        queue.push(GradingTask::new(1, 1)).await.unwrap();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(queue.clone()))
                .app_data(web::Data::new(AppStartTime {
                    start_datetime: chrono::Utc::now(),
                }))
                .configure(configure_system_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/system/health")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["code"], 0);
        assert_eq!(body["data"]["status"], "ok");
        assert_eq!(body["data"]["queue_backend"], "memory");
        assert_eq!(body["data"]["queue_length"], 1);
        assert!(body["data"]["uptime_seconds"].as_i64().is_some());
    }
}
