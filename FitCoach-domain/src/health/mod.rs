//! Domain layer health check functionality

use std::collections::BTreeMap;
use std::time::Instant;

use async_trait::async_trait;
use tracing::warn;

use fit_coach_data::database::{get_connection_info, DbPool};

/// System health status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    /// All components are healthy
    Healthy,
    /// Some components are degraded but the system is functional
    Degraded,
    /// System is not functioning properly
    Unhealthy,
}

impl SystemStatus {
    /// Wire name: `ok`, `degraded` or `error`
    pub fn as_str(&self) -> &'static str {
        match self {
            SystemStatus::Healthy => "ok",
            SystemStatus::Degraded => "degraded",
            SystemStatus::Unhealthy => "error",
        }
    }
}

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Healthy => "ok",
            ComponentStatus::Degraded => "degraded",
            ComponentStatus::Unhealthy => "error",
        }
    }
}

/// Represents a health component with status and optional details
#[derive(Debug, Clone)]
pub struct HealthComponent {
    pub status: ComponentStatus,
    pub details: Option<String>,
}

/// Represents the overall health of the system
#[derive(Debug, Clone)]
pub struct SystemHealth {
    pub status: SystemStatus,
    /// Component name to health, ordered by name
    pub components: BTreeMap<String, HealthComponent>,
    pub environment: String,
    pub uptime_seconds: u64,
}

/// Trait for health services
#[async_trait]
pub trait HealthServiceTrait: Send + Sync {
    /// Get the overall system health
    async fn get_system_health(&self) -> SystemHealth;
}

/// Health of the database and the billing integration
pub struct HealthService {
    pool: DbPool,
    billing_configured: bool,
    environment: String,
    started_at: Instant,
}

impl HealthService {
    pub fn new(pool: DbPool, billing_configured: bool, environment: impl Into<String>) -> Self {
        Self {
            pool,
            billing_configured,
            environment: environment.into(),
            started_at: Instant::now(),
        }
    }

    fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    fn database_component(&self) -> HealthComponent {
        match get_connection_info(&self.pool) {
            Ok(info) => HealthComponent { status: ComponentStatus::Healthy, details: Some(info) },
            Err(e) => {
                warn!("Database health check failed: {}", e);
                HealthComponent {
                    status: ComponentStatus::Unhealthy,
                    details: Some(format!("Database connection error: {}", e)),
                }
            }
        }
    }

    /// Missing billing credentials only degrade a production deployment
    fn billing_component(&self) -> HealthComponent {
        if self.billing_configured {
            HealthComponent { status: ComponentStatus::Healthy, details: None }
        } else {
            HealthComponent {
                status: if self.is_production() { ComponentStatus::Degraded } else { ComponentStatus::Healthy },
                details: Some("Billing is not configured".to_string()),
            }
        }
    }
}

/// Worst component status wins
pub fn overall_status<'a>(components: impl IntoIterator<Item = &'a HealthComponent>) -> SystemStatus {
    let mut status = SystemStatus::Healthy;
    for component in components {
        match component.status {
            ComponentStatus::Unhealthy => return SystemStatus::Unhealthy,
            ComponentStatus::Degraded => status = SystemStatus::Degraded,
            ComponentStatus::Healthy => {}
        }
    }
    status
}

#[async_trait]
impl HealthServiceTrait for HealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let mut components = BTreeMap::new();
        components.insert("database".to_string(), self.database_component());
        components.insert("billing".to_string(), self.billing_component());

        SystemHealth {
            status: overall_status(components.values()),
            components,
            environment: self.environment.clone(),
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fit_coach_data::database::create_in_memory_pool;

    #[tokio::test]
    async fn test_healthy_in_development_without_billing() {
        let service = HealthService::new(create_in_memory_pool().unwrap(), false, "development");
        let health = service.get_system_health().await;

        assert_eq!(health.status, SystemStatus::Healthy);
        assert!(health.components.contains_key("database"));
        assert_eq!(health.components["billing"].details.as_deref(), Some("Billing is not configured"));
    }

    #[tokio::test]
    async fn test_degraded_in_production_without_billing() {
        let service = HealthService::new(create_in_memory_pool().unwrap(), false, "production");
        let health = service.get_system_health().await;

        assert_eq!(health.status, SystemStatus::Degraded);
        assert_eq!(health.status.as_str(), "degraded");
    }

    #[test]
    fn test_unhealthy_component_wins() {
        let components = [
            HealthComponent { status: ComponentStatus::Degraded, details: None },
            HealthComponent { status: ComponentStatus::Unhealthy, details: None },
        ];
        assert_eq!(overall_status(components.iter()), SystemStatus::Unhealthy);
    }
}
