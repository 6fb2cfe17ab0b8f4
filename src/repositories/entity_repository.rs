//! Repositorio genérico sobre el cliente de entidades
//!
//! Traduce entre los registros JSON del backend y los modelos tipados.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::warn;

use crate::clients::entity_client::strip_system_fields;
use crate::clients::{Collection, EntityClient, EntityError, EntityQuery, Sort};
use crate::utils::errors::{not_found_error, AppError};

/// Modelo guardado en una colección del backend
pub trait Entity: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    fn id(&self) -> &str;
}

pub struct EntityRepository<T: Entity> {
    client: Arc<dyn EntityClient>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for EntityRepository<T> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.client))
    }
}

fn decode<T: Entity>(record: Value) -> Result<T, AppError> {
    serde_json::from_value(record).map_err(|e| AppError::from(EntityError::Decode(e)))
}

/// Registros ilegibles se saltan con aviso para no romper los listados
fn decode_all<T: Entity>(records: Vec<Value>) -> Vec<T> {
    records
        .into_iter()
        .filter_map(|record| {
            let id = record.get("id").and_then(Value::as_str).unwrap_or("?").to_string();
            match serde_json::from_value(record) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!("⚠️ Registo {} '{}' ignorado: {}", T::COLLECTION, id, e);
                    None
                }
            }
        })
        .collect()
}

impl<T: Entity> EntityRepository<T> {
    pub fn new(client: Arc<dyn EntityClient>) -> Self {
        Self {
            client,
            _entity: PhantomData,
        }
    }

    pub fn client(&self) -> &Arc<dyn EntityClient> {
        &self.client
    }

    pub async fn list(&self, sort: Option<&Sort>) -> Result<Vec<T>, AppError> {
        let records = self.client.list(T::COLLECTION, sort, None).await?;
        Ok(decode_all(records))
    }

    pub async fn filter(
        &self,
        query: &EntityQuery,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> Result<Vec<T>, AppError> {
        let records = self.client.filter(T::COLLECTION, query, sort, limit).await?;
        Ok(decode_all(records))
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<T>, AppError> {
        match self.client.get(T::COLLECTION, id).await? {
            Some(record) => decode(record).map(Some),
            None => Ok(None),
        }
    }

    /// Como `find_by_id` pero con 404 si no existe
    pub async fn get(&self, id: &str) -> Result<T, AppError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| not_found_error(T::COLLECTION.as_str(), id))
    }

    pub async fn create(&self, entity: &T) -> Result<T, AppError> {
        let fields = strip_system_fields(&serde_json::to_value(entity).map_err(EntityError::Decode)?);
        decode(self.client.create(T::COLLECTION, fields).await?)
    }

    /// Escritura parcial; solo los campos de `patch` cambian
    pub async fn update(&self, id: &str, patch: Value) -> Result<T, AppError> {
        decode(self.client.update(T::COLLECTION, id, patch).await?)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.client.delete(T::COLLECTION, id).await?;
        Ok(())
    }
}
