//! Configuración del backend externo
//!
//! Las entidades, la subida de ficheros y la extracción por IA viven en un
//! backend-as-a-service. Aquí se decide qué cliente de entidades usar y con
//! qué credenciales.

use anyhow::{anyhow, Result};
use std::env;
use std::time::Duration;

use super::environment::parse_var;

/// Implementación del cliente de entidades
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityBackend {
    /// API REST del backend-as-a-service
    Rest,
    /// Almacén en memoria, solo para desarrollo local y tests
    Memory,
}

impl std::str::FromStr for EntityBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rest" => Ok(EntityBackend::Rest),
            "memory" => Ok(EntityBackend::Memory),
            other => Err(anyhow!("unknown ENTITY_BACKEND '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub entity_backend: EntityBackend,
    pub base_url: String,
    pub app_id: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub ai_timeout: Duration,
    pub change_feed_interval: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            entity_backend: EntityBackend::Memory,
            base_url: String::new(),
            app_id: String::new(),
            api_key: None,
            request_timeout: Duration::from_secs(30),
            ai_timeout: Duration::from_secs(120),
            change_feed_interval: Duration::from_secs(10),
        }
    }
}

impl BackendConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let entity_backend = match env::var("ENTITY_BACKEND") {
            Ok(raw) => raw.parse()?,
            Err(_) => EntityBackend::Rest,
        };

        Ok(Self {
            entity_backend,
            base_url: env::var("BACKEND_URL")
                .unwrap_or_default()
                .trim_end_matches('/')
                .to_string(),
            app_id: env::var("BACKEND_APP_ID").unwrap_or_default(),
            api_key: env::var("BACKEND_API_KEY").ok().filter(|k| !k.is_empty()),
            request_timeout: Duration::from_secs(parse_var(
                "BACKEND_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            ai_timeout: Duration::from_secs(parse_var(
                "AI_TIMEOUT_SECS",
                defaults.ai_timeout.as_secs(),
            )?),
            change_feed_interval: Duration::from_secs(parse_var(
                "CHANGE_FEED_POLL_SECS",
                defaults.change_feed_interval.as_secs(),
            )?),
        })
    }

    /// `{base}/api/apps/{app_id}`
    pub fn app_url(&self) -> String {
        format!("{}/api/apps/{}", self.base_url, self.app_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_backend_from_str() {
        assert_eq!("REST".parse::<EntityBackend>().unwrap(), EntityBackend::Rest);
        assert_eq!("memory".parse::<EntityBackend>().unwrap(), EntityBackend::Memory);
        assert!("sqlite".parse::<EntityBackend>().is_err());
    }

    #[test]
    fn test_app_url() {
        let config = BackendConfig {
            base_url: "https://backend.example".to_string(),
            app_id: "watcher".to_string(),
            ..Default::default()
        };
        assert_eq!(config.app_url(), "https://backend.example/api/apps/watcher");
    }
}
