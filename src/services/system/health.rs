use actix_web::{HttpRequest, HttpResponse, Result as ActixResult};
use serde::Serialize;
use tracing::warn;

use super::SystemService;
use crate::models::ApiResponse;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub system_name: String,
    pub version: &'static str,
    pub uptime_seconds: Option<i64>,
    pub queue_backend: &'static str,
    // 队列不可达时为空
    pub queue_length: Option<usize>,
}

/// GET /system/health
pub async fn get_health(service: &SystemService, request: &HttpRequest) -> ActixResult<HttpResponse> {
    let queue = service.get_queue(request);

    let queue_length = match queue.len().await {
        Ok(len) => Some(len),
        Err(e) => {
            warn!(backend = queue.backend_name(), "Failed to read queue length: {}", e);
            None
        }
    };

    let uptime_seconds = service.get_start_time(request).map(|start| {
        chrono::Utc::now()
            .signed_duration_since(start.start_datetime)
            .num_seconds()
    });

    let response = HealthResponse {
        status: if queue_length.is_some() { "ok" } else { "degraded" },
        system_name: service.get_config().app.system_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
        queue_backend: queue.backend_name(),
        queue_length,
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(response, "服务正常")))
}
