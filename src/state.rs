//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use crate::clients::{AiIntegration, EntityClient};
use crate::config::EnvironmentConfig;
use crate::middleware::rate_limit::RateLimitState;
use crate::repositories::{
    MachineRepository, PartRequestRepository, ServiceOrderRepository, UserRepository,
};
use crate::services::extraction_service::AttemptTracker;
use crate::services::jwt_service::{JwtConfig, JwtService};
use crate::services::notification_service::NotificationHub;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EnvironmentConfig>,
    pub entities: Arc<dyn EntityClient>,
    pub ai: Arc<dyn AiIntegration>,
    pub jwt: Arc<JwtService>,
    pub notifications: NotificationHub,
    pub rate_limit: RateLimitState,
    pub extraction_attempts: AttemptTracker,
}

impl AppState {
    pub fn new(
        config: EnvironmentConfig,
        entities: Arc<dyn EntityClient>,
        ai: Arc<dyn AiIntegration>,
    ) -> Self {
        let jwt = Arc::new(JwtService::new(JwtConfig::from_environment(&config)));
        Self {
            rate_limit: RateLimitState::from_config(&config),
            extraction_attempts: AttemptTracker::default(),
            notifications: NotificationHub::new(Arc::clone(&entities)),
            config: Arc::new(config),
            entities,
            ai,
            jwt,
        }
    }

    pub fn machines(&self) -> MachineRepository {
        MachineRepository::new(Arc::clone(&self.entities))
    }

    pub fn service_orders(&self) -> ServiceOrderRepository {
        ServiceOrderRepository::new(Arc::clone(&self.entities))
    }

    pub fn part_requests(&self) -> PartRequestRepository {
        PartRequestRepository::new(Arc::clone(&self.entities))
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(Arc::clone(&self.entities))
    }
}
