//! Health check module
//! Provides health status for the application and its dependencies

use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::services::notification::QueueDispatcher;

/// Health status response
#[derive(Debug, Serialize, Clone)]
pub struct HealthStatus {
    pub status: HealthState,
    pub checks: HashMap<String, ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Overall health state
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health status
#[derive(Debug, Serialize, Clone)]
pub struct ComponentHealth {
    pub status: ComponentState,
    pub response_time_ms: Option<u128>,
    pub details: Option<String>,
}

/// Component state
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub enum ComponentState {
    Up,
    Down,
    Warning,
}

impl HealthStatus {
    pub fn new() -> Self {
        Self {
            status: HealthState::Healthy,
            checks: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self.status, HealthState::Healthy)
    }

    fn record(&mut self, name: &str, health: ComponentHealth) {
        let worse = match (&self.status, &health.status) {
            (_, ComponentState::Down) => Some(HealthState::Unhealthy),
            (HealthState::Healthy, ComponentState::Warning) => Some(HealthState::Degraded),
            _ => None,
        };
        if let Some(state) = worse {
            self.status = state;
        }
        self.checks.insert(name.to_string(), health);
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentHealth {
    pub fn up(response_time_ms: Option<u128>) -> Self {
        Self {
            status: ComponentState::Up,
            response_time_ms,
            details: None,
        }
    }

    pub fn down(details: Option<String>) -> Self {
        Self {
            status: ComponentState::Down,
            response_time_ms: None,
            details,
        }
    }

    pub fn warning(response_time_ms: Option<u128>, details: Option<String>) -> Self {
        Self {
            status: ComponentState::Warning,
            response_time_ms,
            details,
        }
    }
}

/// Health checker for the application
#[derive(Clone)]
pub struct HealthChecker {
    db_pool: Option<sqlx::PgPool>,
    notifications: Option<QueueDispatcher>,
}

impl HealthChecker {
    pub fn new(db_pool: Option<sqlx::PgPool>, notifications: Option<QueueDispatcher>) -> Self {
        Self {
            db_pool,
            notifications,
        }
    }

    /// Perform comprehensive health check
    pub async fn check_health(&self) -> HealthStatus {
        let mut health_status = HealthStatus::new();

        match &self.db_pool {
            Some(pool) => {
                match timeout(Duration::from_secs(5), check_database_health(pool)).await {
                    Ok(Ok(response_time)) => {
                        health_status.record("database", ComponentHealth::up(Some(response_time)));
                        info!("Database health check: OK ({}ms)", response_time);
                    }
                    Ok(Err(e)) => {
                        health_status
                            .record("database", ComponentHealth::down(Some(e.to_string())));
                        error!("Database health check failed: {}", e);
                    }
                    Err(_) => {
                        health_status
                            .record("database", ComponentHealth::down(Some("Timeout".to_string())));
                        error!("Database health check timed out");
                    }
                }
            }
            None => {
                health_status.record(
                    "database",
                    ComponentHealth::warning(None, Some("running on in-memory store".to_string())),
                );
            }
        }

        if let Some(queue) = &self.notifications {
            let health = check_notification_queue(queue);
            if health.status != ComponentState::Up {
                warn!(details = ?health.details, "Notification queue health check not OK");
            }
            health_status.record("notification_queue", health);
        }

        health_status
    }
}

pub async fn check_database_health(
    pool: &sqlx::PgPool,
) -> Result<u128, crate::database::error::DatabaseError> {
    let start = Instant::now();
    crate::database::health_check(pool).await?;
    Ok(start.elapsed().as_millis())
}

/// Closed queue is down, a full one is a warning.
pub fn check_notification_queue(queue: &QueueDispatcher) -> ComponentHealth {
    if queue.is_closed() {
        return ComponentHealth::down(Some("notification worker is not running".to_string()));
    }
    let free = queue.available_slots();
    if free == 0 {
        return ComponentHealth::warning(
            None,
            Some(format!("queue full ({} jobs waiting)", queue.max_slots())),
        );
    }
    ComponentHealth::up(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_status_creation() {
        let health_status = HealthStatus::new();
        assert!(matches!(health_status.status, HealthState::Healthy));
        assert!(health_status.checks.is_empty());
        assert!(health_status.timestamp <= chrono::Utc::now());
    }

    #[test]
    fn test_component_health_states() {
        let up_health = ComponentHealth::up(Some(100));
        assert!(matches!(up_health.status, ComponentState::Up));
        assert_eq!(up_health.response_time_ms, Some(100));

        let down_health = ComponentHealth::down(Some("Test error".to_string()));
        assert!(matches!(down_health.status, ComponentState::Down));
        assert_eq!(down_health.details, Some("Test error".to_string()));
    }

    #[test]
    fn overall_state_takes_the_worst_component() {
        let mut status = HealthStatus::new();
        status.record("a", ComponentHealth::up(None));
        assert_eq!(status.status, HealthState::Healthy);
        status.record("b", ComponentHealth::warning(None, None));
        assert_eq!(status.status, HealthState::Degraded);
        status.record("c", ComponentHealth::down(None));
        assert_eq!(status.status, HealthState::Unhealthy);
        status.record("d", ComponentHealth::warning(None, None));
        assert_eq!(status.status, HealthState::Unhealthy);
    }

    #[tokio::test]
    async fn in_memory_mode_is_degraded_not_down() {
        let (queue, _rx) = QueueDispatcher::channel(2);
        let checker = HealthChecker::new(None, Some(queue));
        let status = checker.check_health().await;

        assert_eq!(status.status, HealthState::Degraded);
        assert_eq!(status.checks["notification_queue"].status, ComponentState::Up);
    }

    #[test]
    fn closed_queue_is_down() {
        let (queue, rx) = QueueDispatcher::channel(2);
        drop(rx);
        assert_eq!(check_notification_queue(&queue).status, ComponentState::Down);
    }
}
