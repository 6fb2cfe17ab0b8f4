//! Cliente de entidades con cache Redis
//!
//! Decorador sobre cualquier `EntityClient`: `list` y `filter` se sirven desde
//! Redis durante el TTL, bajo una generación por colección que se incrementa
//! en cada escritura. Varios visores que sondean la misma colección comparten
//! así una sola llamada al backend por ventana de TTL.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::warn;

use super::{CacheOperations, RedisClient};
use crate::clients::{Collection, EntityChange, EntityClient, EntityQuery, EntityResult, Sort};

pub struct CachedEntityClient {
    inner: Arc<dyn EntityClient>,
    redis: RedisClient,
}

impl CachedEntityClient {
    pub fn new(inner: Arc<dyn EntityClient>, redis: RedisClient) -> Self {
        Self { inner, redis }
    }

    fn generation_key(&self, collection: Collection) -> String {
        self.redis.make_key("gen", collection.as_str())
    }

    async fn generation(&self, collection: Collection) -> u64 {
        match self.redis.get::<u64>(&self.generation_key(collection)).await {
            Ok(generation) => generation.unwrap_or(0),
            Err(e) => {
                warn!("⚠️ Geração de cache ilegível para {}: {}", collection, e);
                0
            }
        }
    }

    async fn invalidate(&self, collection: Collection) {
        if let Err(e) = self.redis.incr(&self.generation_key(collection)).await {
            warn!("⚠️ Não foi possível invalidar a cache de {}: {}", collection, e);
        }
    }

    async fn cached<F>(&self, collection: Collection, fingerprint: String, load: F) -> EntityResult<Vec<Value>>
    where
        F: std::future::Future<Output = EntityResult<Vec<Value>>> + Send,
    {
        let generation = self.generation(collection).await;
        let key = self.redis.make_key(
            "q",
            &format!("{}:{}:{}", collection, generation, fingerprint),
        );

        if let Ok(Some(records)) = self.redis.get::<Vec<Value>>(&key).await {
            return Ok(records);
        }

        let records = load.await?;
        if let Err(e) = self.redis.set(&key, &records, self.redis.default_ttl()).await {
            warn!("⚠️ Resultado de {} não guardado em cache: {}", collection, e);
        }
        Ok(records)
    }
}

/// Huella md5 de una consulta de lectura
pub fn query_fingerprint(query: Option<&EntityQuery>, sort: Option<&Sort>, limit: Option<usize>) -> String {
    let query = query
        .map(|q| serde_json::to_string(q).unwrap_or_default())
        .unwrap_or_default();
    let sort = sort.map(Sort::to_param).unwrap_or_default();
    let limit = limit.map(|l| l.to_string()).unwrap_or_default();
    format!("{:x}", md5::compute(format!("{}|{}|{}", query, sort, limit)))
}

#[async_trait]
impl EntityClient for CachedEntityClient {
    async fn list(
        &self,
        collection: Collection,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> EntityResult<Vec<Value>> {
        let fingerprint = query_fingerprint(None, sort, limit);
        self.cached(collection, fingerprint, self.inner.list(collection, sort, limit))
            .await
    }

    async fn filter(
        &self,
        collection: Collection,
        query: &EntityQuery,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> EntityResult<Vec<Value>> {
        let fingerprint = query_fingerprint(Some(query), sort, limit);
        self.cached(
            collection,
            fingerprint,
            self.inner.filter(collection, query, sort, limit),
        )
        .await
    }

    async fn get(&self, collection: Collection, id: &str) -> EntityResult<Option<Value>> {
        self.inner.get(collection, id).await
    }

    async fn create(&self, collection: Collection, fields: Value) -> EntityResult<Value> {
        let record = self.inner.create(collection, fields).await?;
        self.invalidate(collection).await;
        Ok(record)
    }

    async fn update(&self, collection: Collection, id: &str, patch: Value) -> EntityResult<Value> {
        let record = self.inner.update(collection, id, patch).await?;
        self.invalidate(collection).await;
        Ok(record)
    }

    async fn delete(&self, collection: Collection, id: &str) -> EntityResult<()> {
        self.inner.delete(collection, id).await?;
        self.invalidate(collection).await;
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<EntityChange> {
        self.inner.subscribe()
    }
}
