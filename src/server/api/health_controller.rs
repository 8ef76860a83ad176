use axum::Extension;
use axum::Json;
use chrono::Utc;

use crate::server::dtos::health_dto::{HealthResponse, HealthStatus};
use crate::server::services::EdgeServices;
use crate::server::{get_app_version, get_uptime_seconds};

/// there is nothing stateful to check, if this answers the relay is up
pub async fn health_endpoint(Extension(services): Extension<EdgeServices>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        timestamp: Utc::now(),
        uptime_seconds: get_uptime_seconds(),
        version: get_app_version().to_string(),
        environment: services.config.cargo_env.as_str().to_string(),
    })
}
