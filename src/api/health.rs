use crate::api::AppState;
use crate::health::{HealthState, HealthStatus};
use axum::{extract::State, http::StatusCode, Json};
use tracing::{error, info};

pub async fn root() -> &'static str {
    info!("📍 Root endpoint accessed");
    "Welcome to the Travel Booking API"
}

/// 503 only when a component is down; degraded still serves traffic.
pub async fn health(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, (StatusCode, Json<HealthStatus>)> {
    let health_status = state.health_checker.check_health().await;

    if health_status.status == HealthState::Unhealthy {
        error!("❌ Health check failed - service unhealthy");
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(health_status)))
    } else {
        info!(status = ?health_status.status, "✅ Health check passed");
        Ok(Json(health_status))
    }
}

pub async fn readiness(
    state: State<AppState>,
) -> Result<Json<HealthStatus>, (StatusCode, Json<HealthStatus>)> {
    health(state).await
}

pub async fn liveness() -> &'static str {
    "OK"
}
