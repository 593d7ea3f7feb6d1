//! 外部评分服务客户端
//!
//! 协议：`POST {base_url}/predict`，请求体
//! `{statement, input_spec, output_spec, code_submission, language}`，
//! 成功响应 `{grade, metrics, comments}`。
//!
//! 网络错误、超时、非 2xx 响应、响应无法解析时均返回 `None`，
//! 由调用方决定是否重试。客户端本身不做重试。

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ScorerConfig;
use crate::errors::{HWSystemError, Result};
use crate::models::grading::entities::Evaluation;

/// 评分服务抽象
#[async_trait]
pub trait ScorerClient: Send + Sync {
    /// 请求评分，失败时返回 `None`
    async fn evaluate(
        &self,
        statement: &str,
        input_spec: &str,
        output_spec: &str,
        code: &str,
        language: &str,
    ) -> Option<Evaluation>;
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    statement: &'a str,
    input_spec: &'a str,
    output_spec: &'a str,
    code_submission: &'a str,
    language: &'a str,
}

/// 基于 HTTP 的评分服务客户端
pub struct HttpScorerClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpScorerClient {
    pub fn new(base_url: &str, timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| HWSystemError::validation(format!("评分客户端初始化失败: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/predict", base_url.trim_end_matches('/')),
        })
    }

    pub fn from_config(config: &ScorerConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
            Duration::from_secs(config.connect_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ScorerClient for HttpScorerClient {
    async fn evaluate(
        &self,
        statement: &str,
        input_spec: &str,
        output_spec: &str,
        code: &str,
        language: &str,
    ) -> Option<Evaluation> {
        let body = PredictRequest {
            statement,
            input_spec,
            output_spec,
            code_submission: code,
            language,
        };

        let response = match self.client.post(&self.endpoint).json(&body).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(
                    endpoint = %self.endpoint,
                    timeout = e.is_timeout(),
                    "Scorer request failed: {}",
                    e
                );
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            warn!(
                endpoint = %self.endpoint,
                status = status.as_u16(),
                "Scorer returned an error status: {}",
                detail.chars().take(200).collect::<String>()
            );
            return None;
        }

        match response.json::<Evaluation>().await {
            Ok(evaluation) => {
                let evaluation = sanitize(evaluation)?;
                debug!(grade = evaluation.grade, "Scorer evaluation received");
                Some(evaluation)
            }
            Err(e) => {
                warn!(endpoint = %self.endpoint, "Failed to decode scorer response: {}", e);
                None
            }
        }
    }
}

/// 评分限制在 [0, 100]，丢弃非有限数值的指标
fn sanitize(mut evaluation: Evaluation) -> Option<Evaluation> {
    if !evaluation.grade.is_finite() {
        warn!("Scorer returned a non-finite grade");
        return None;
    }
    evaluation.grade = evaluation.grade.clamp(0.0, 100.0);
    evaluation.metrics.retain(|_, v| v.is_finite());
    Some(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, HttpServer, web};
    use serde_json::{Value, json};

    async fn predict_ok(body: web::Json<Value>) -> HttpResponse {
        // 请求体字段必须齐全
        for key in [
            "statement",
            "input_spec",
            "output_spec",
            "code_submission",
            "language",
        ] {
            if !body.get(key).is_some_and(Value::is_string) {
                return HttpResponse::BadRequest().finish();
            }
        }
        HttpResponse::Ok().json(json!({
            "grade": 85,
            "metrics": {"correctness": 90, "efficiency": 80, "style": 85},
            "comments": "Good job"
        }))
    }

    async fn predict_error() -> HttpResponse {
        HttpResponse::ServiceUnavailable().body("model is loading")
    }

    async fn predict_garbage() -> HttpResponse {
        HttpResponse::Ok().body("not json")
    }

    async fn predict_slow() -> HttpResponse {
        tokio::time::sleep(Duration::from_secs(3)).await;
        HttpResponse::Ok().json(json!({"grade": 1, "metrics": {}, "comments": ""}))
    }

    /// 启动本地模拟评分服务，返回 base_url
    fn spawn_scorer(path: &'static str) -> String {
        let server = HttpServer::new(move || {
            App::new()
                .route("/ok/predict", web::post().to(predict_ok))
                .route("/error/predict", web::post().to(predict_error))
                .route("/garbage/predict", web::post().to(predict_garbage))
                .route("/slow/predict", web::post().to(predict_slow))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .expect("bind mock scorer");
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        format!("http://{addr}/{path}")
    }

    fn client(base_url: &str, timeout_ms: u64) -> HttpScorerClient {
        HttpScorerClient::new(
            base_url,
            Duration::from_millis(timeout_ms),
            Duration::from_millis(500),
        )
        .unwrap()
    }

    async fn evaluate(client: &HttpScorerClient) -> Option<Evaluation> {
        client
            .evaluate("Sum", "a b", "a+b", "print(1)", "python")
            .await
    }

    #[actix_web::test]
    async fn test_successful_evaluation() {
        let base = spawn_scorer("ok");
        let evaluation = evaluate(&client(&base, 2000)).await.expect("evaluation");

        assert_eq!(evaluation.grade, 85.0);
        assert_eq!(evaluation.metrics.len(), 3);
        assert_eq!(evaluation.metrics["correctness"], 90.0);
        assert_eq!(evaluation.metrics["efficiency"], 80.0);
        assert_eq!(evaluation.metrics["style"], 85.0);
        assert_eq!(evaluation.comments, "Good job");
    }

    #[actix_web::test]
    async fn test_error_status_is_unavailable() {
        let base = spawn_scorer("error");
        assert!(evaluate(&client(&base, 2000)).await.is_none());
    }

    #[actix_web::test]
    async fn test_undecodable_body_is_unavailable() {
        let base = spawn_scorer("garbage");
        assert!(evaluate(&client(&base, 2000)).await.is_none());
    }

    #[actix_web::test]
    async fn test_timeout_is_unavailable() {
        let base = spawn_scorer("slow");
        assert!(evaluate(&client(&base, 200)).await.is_none());
    }

    #[actix_web::test]
    async fn test_connection_refused_is_unavailable() {
        // 端口 9 (discard) 通常无人监听
        assert!(evaluate(&client("http://127.0.0.1:9", 500)).await.is_none());
    }

    #[test]
    fn test_endpoint_trailing_slash() {
        let c = client("http://scorer.local:8000/", 1000);
        assert_eq!(c.endpoint(), "http://scorer.local:8000/predict");
    }

    #[test]
    fn test_sanitize_clamps_grade() {
        let evaluation = Evaluation {
            grade: 120.0,
            metrics: [("style".to_string(), f64::NAN), ("correctness".to_string(), 70.0)]
                .into_iter()
                .collect(),
            comments: String::new(),
        };
        let sanitized = sanitize(evaluation).unwrap();
        assert_eq!(sanitized.grade, 100.0);
        assert_eq!(sanitized.metrics.len(), 1);

        let nan = Evaluation {
            grade: f64::NAN,
            metrics: Default::default(),
            comments: String::new(),
        };
        assert!(sanitize(nan).is_none());
    }
}
