//! Configuración de cache
//!
//! Este módulo contiene la configuración para el sistema de cache. Redis es
//! opcional: sin `REDIS_URL` el servicio trabaja directamente contra el
//! backend de entidades.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

use crate::config::environment::parse_var;

/// Configuración del cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub redis_url: Option<String>,
    pub default_ttl: u64,
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            default_ttl: 10,
            key_prefix: "the_watcher".to_string(),
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            redis_url: env::var("REDIS_URL").ok().filter(|u| !u.trim().is_empty()),
            default_ttl: parse_var("CACHE_TTL_SECS", defaults.default_ttl)?,
            key_prefix: env::var("CACHE_KEY_PREFIX").unwrap_or(defaults.key_prefix),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.redis_url.is_some()
    }
}
