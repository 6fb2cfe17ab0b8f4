//! Cache
//!
//! Este módulo contiene el cliente Redis y el decorador que cachea las
//! lecturas del cliente de entidades.

pub mod cache_config;
pub mod cached_entity_client;
pub mod redis_client;

pub use cache_config::CacheConfig;
pub use cached_entity_client::CachedEntityClient;
pub use redis_client::{CacheOperations, RedisClient};
