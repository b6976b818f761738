use axum::{Json, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const SERVICE_NAME: &str = "product-service";

/// 健康检查响应
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    /// 服务器时间
    pub time: DateTime<Utc>,
}

/// 健康检查接口
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        time: Utc::now(),
    })
}
