//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno: servidor, JWT, CORS,
//! rate limiting, técnicos y tabla de contraseñas de perfil.

use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::env;

use super::backend::{BackendConfig, EntityBackend};
use crate::cache::CacheConfig;

/// Clave de la contraseña de administrador en la tabla de perfiles
pub const ADMIN_PROFILE_KEY: &str = "admin";

const DEV_JWT_SECRET: &str = "the-watcher-dev-secret-change-in-production";

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub log_level: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub cors_origins: Vec<String>,
    pub rate_limit_requests: u32,
    pub rate_limit_window: u64,
    pub max_concurrent_requests: usize,
    /// Límite de cuerpo para fotos de chapas y ficheros de backup
    pub max_upload_bytes: usize,
    /// Usar `X-Forwarded-For` como IP del cliente (sólo detrás de un proxy)
    pub trust_forwarded_for: bool,
    /// Identificadores dos técnicos da oficina, na ordem das colunas do quadro
    pub technicians: Vec<String>,
    /// Hash bcrypt por perfil (`admin` ou id do técnico)
    pub profile_passwords: HashMap<String, String>,
    pub notification_poll_secs: u64,
    pub backend: BackendConfig,
    pub cache: CacheConfig,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            log_level: "debug".to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expiration: 12 * 3600,
            cors_origins: Vec::new(),
            rate_limit_requests: 10,
            rate_limit_window: 60,
            max_concurrent_requests: 256,
            max_upload_bytes: 25 * 1024 * 1024,
            trust_forwarded_for: false,
            technicians: Vec::new(),
            profile_passwords: HashMap::new(),
            notification_poll_secs: 15,
            backend: BackendConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

impl EnvironmentConfig {
    /// Cargar la configuración desde variables de entorno
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let environment = env::var("ENVIRONMENT").unwrap_or(defaults.environment);
        let is_production = environment == "production";

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => secret,
            _ if is_production => return Err(anyhow!("JWT_SECRET must be set in production")),
            _ => defaults.jwt_secret,
        };

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| {
            if is_production { "info".to_string() } else { defaults.log_level.clone() }
        });

        let config = Self {
            port: parse_var("PORT", defaults.port)?,
            host: env::var("HOST").unwrap_or(defaults.host),
            log_level,
            jwt_secret,
            jwt_expiration: parse_var("JWT_EXPIRATION", defaults.jwt_expiration)?,
            cors_origins: list_var("CORS_ORIGINS"),
            rate_limit_requests: parse_var("RATE_LIMIT_REQUESTS", defaults.rate_limit_requests)?,
            rate_limit_window: parse_var("RATE_LIMIT_WINDOW", defaults.rate_limit_window)?,
            max_concurrent_requests: parse_var(
                "MAX_CONCURRENT_REQUESTS",
                defaults.max_concurrent_requests,
            )?,
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            trust_forwarded_for: parse_var("TRUST_PROXY", defaults.trust_forwarded_for)?,
            technicians: list_var("TECHNICIANS")
                .into_iter()
                .map(|t| t.to_lowercase())
                .collect(),
            profile_passwords: parse_profile_passwords(
                &env::var("PROFILE_PASSWORDS").unwrap_or_default(),
            )?,
            notification_poll_secs: parse_var(
                "NOTIFICATION_POLL_SECS",
                defaults.notification_poll_secs,
            )?,
            backend: BackendConfig::from_env()?,
            cache: CacheConfig::from_env()?,
            environment,
        };

        if config.backend.entity_backend == EntityBackend::Rest && config.backend.base_url.is_empty() {
            return Err(anyhow!("BACKEND_URL must be set when ENTITY_BACKEND=rest"));
        }

        Ok(config)
    }

    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// ¿Es un técnico configurado?
    pub fn is_known_technician(&self, technician: &str) -> bool {
        self.technicians.iter().any(|t| t == technician)
    }

    /// Nivel de log para `tracing_subscriber`
    pub fn tracing_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

/// Leer una variable numérica con valor por defecto
pub(crate) fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{} must be a valid value: {}", key, e)),
        _ => Ok(default),
    }
}

fn list_var(key: &str) -> Vec<String> {
    env::var(key)
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// `admin:$2b$12$...,nuno:$2b$12$...`
pub fn parse_profile_passwords(raw: &str) -> Result<HashMap<String, String>> {
    let mut table = HashMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (profile, hash) = entry
            .split_once(':')
            .with_context(|| format!("invalid PROFILE_PASSWORDS entry '{}'", entry))?;
        let profile = profile.trim().to_lowercase();
        if profile.is_empty() || !hash.trim().starts_with("$2") {
            return Err(anyhow!("invalid PROFILE_PASSWORDS entry for profile '{}'", profile));
        }
        table.insert(profile, hash.trim().to_string());
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_profile_passwords() {
        let table = parse_profile_passwords(
            "admin:$2b$04$abcdefghijklmnopqrstuv, Nuno:$2b$04$zyxwvutsrqponmlkjihgfe",
        )
        .unwrap();
        assert_eq!(table.len(), 2);
        assert!(table["nuno"].starts_with("$2b$"));
    }

    #[test]
    fn test_parse_profile_passwords_rejects_plaintext() {
        assert!(parse_profile_passwords("admin:1234").is_err());
        assert!(parse_profile_passwords("admin").is_err());
    }

    #[test]
    fn test_defaults_are_development() {
        let config = EnvironmentConfig::default();
        assert!(config.is_development());
        assert_eq!(config.server_url(), "0.0.0.0:3000");
        assert_eq!(config.tracing_level(), tracing::Level::DEBUG);
        assert!(config.max_upload_bytes > 2 * 1024 * 1024);
        assert!(!config.trust_forwarded_for);
    }
}
