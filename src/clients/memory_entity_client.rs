//! Cliente de entidades en memoria
//!
//! Implementa el contrato completo sobre un `RwLock`. Se usa en los tests y
//! con `ENTITY_BACKEND=memory` para desarrollo local sin backend.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;
use uuid::Uuid;

use super::entity_client::{
    ChangeKind, Collection, EntityChange, EntityClient, EntityError, EntityQuery, EntityResult,
    Sort,
};

pub struct InMemoryEntityClient {
    collections: RwLock<HashMap<Collection, Vec<Value>>>,
    changes: broadcast::Sender<EntityChange>,
}

impl Default for InMemoryEntityClient {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEntityClient {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            collections: RwLock::new(HashMap::new()),
            changes,
        }
    }

    fn publish(&self, collection: Collection, kind: ChangeKind, id: &str, record: Option<Value>) {
        // Sin suscriptores el envío falla y no pasa nada
        let _ = self.changes.send(EntityChange {
            collection,
            kind,
            id: id.to_string(),
            record,
        });
    }

    /// Número de registros de una colección
    pub async fn count(&self, collection: Collection) -> usize {
        self.collections
            .read()
            .await
            .get(&collection)
            .map_or(0, Vec::len)
    }
}

fn compare_field(a: &Value, b: &Value, field: &str) -> Ordering {
    match (a.get(field), b.get(field)) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn sorted_and_limited(mut records: Vec<Value>, sort: Option<&Sort>, limit: Option<usize>) -> Vec<Value> {
    if let Some(sort) = sort {
        records.sort_by(|a, b| {
            let ordering = compare_field(a, b, &sort.field);
            if sort.descending { ordering.reverse() } else { ordering }
        });
    }
    if let Some(limit) = limit {
        records.truncate(limit);
    }
    records
}

#[async_trait]
impl EntityClient for InMemoryEntityClient {
    async fn list(
        &self,
        collection: Collection,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> EntityResult<Vec<Value>> {
        let records = self
            .collections
            .read()
            .await
            .get(&collection)
            .cloned()
            .unwrap_or_default();
        Ok(sorted_and_limited(records, sort, limit))
    }

    async fn filter(
        &self,
        collection: Collection,
        query: &EntityQuery,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> EntityResult<Vec<Value>> {
        let records: Vec<Value> = self
            .collections
            .read()
            .await
            .get(&collection)
            .map(|records| records.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();
        Ok(sorted_and_limited(records, sort, limit))
    }

    async fn get(&self, collection: Collection, id: &str) -> EntityResult<Option<Value>> {
        Ok(self
            .collections
            .read()
            .await
            .get(&collection)
            .and_then(|records| {
                records
                    .iter()
                    .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
                    .cloned()
            }))
    }

    async fn create(&self, collection: Collection, fields: Value) -> EntityResult<Value> {
        let mut record = match fields {
            Value::Object(map) => map,
            other => {
                return Err(EntityError::InvalidRecord(format!(
                    "expected object for {}, got {}",
                    collection, other
                )))
            }
        };

        let id = Uuid::new_v4().to_string();
        let now = Value::String(Utc::now().to_rfc3339());
        record.insert("id".to_string(), Value::String(id.clone()));
        record.insert("created_date".to_string(), now.clone());
        record.insert("updated_date".to_string(), now);
        let record = Value::Object(record);

        self.collections
            .write()
            .await
            .entry(collection)
            .or_default()
            .push(record.clone());

        debug!("🆕 {} {} criado em memória", collection, id);
        self.publish(collection, ChangeKind::Create, &id, Some(record.clone()));
        Ok(record)
    }

    async fn update(&self, collection: Collection, id: &str, patch: Value) -> EntityResult<Value> {
        let patch: Map<String, Value> = match patch {
            Value::Object(map) => map,
            other => {
                return Err(EntityError::InvalidRecord(format!(
                    "expected object patch for {}, got {}",
                    collection, other
                )))
            }
        };

        let updated = {
            let mut collections = self.collections.write().await;
            let record = collections
                .get_mut(&collection)
                .and_then(|records| {
                    records
                        .iter_mut()
                        .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
                })
                .ok_or_else(|| EntityError::not_found(collection, id))?;

            if let Value::Object(fields) = record {
                for (key, value) in patch {
                    if key != "id" {
                        fields.insert(key, value);
                    }
                }
                fields.insert(
                    "updated_date".to_string(),
                    Value::String(Utc::now().to_rfc3339()),
                );
            }
            record.clone()
        };

        self.publish(collection, ChangeKind::Update, id, Some(updated.clone()));
        Ok(updated)
    }

    async fn delete(&self, collection: Collection, id: &str) -> EntityResult<()> {
        {
            let mut collections = self.collections.write().await;
            let records = collections
                .get_mut(&collection)
                .ok_or_else(|| EntityError::not_found(collection, id))?;
            let before = records.len();
            records.retain(|r| r.get("id").and_then(Value::as_str) != Some(id));
            if records.len() == before {
                return Err(EntityError::not_found(collection, id));
            }
        }

        self.publish(collection, ChangeKind::Delete, id, None);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<EntityChange> {
        self.changes.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_assigns_system_fields() {
        let client = InMemoryEntityClient::new();
        let created = client
            .create(Collection::Machines, json!({"serie": "ABC123"}))
            .await
            .unwrap();
        assert!(created["id"].as_str().is_some());
        assert!(created["created_date"].as_str().is_some());
        assert_eq!(client.count(Collection::Machines).await, 1);
    }

    #[tokio::test]
    async fn test_update_merges_and_last_write_wins() {
        let client = InMemoryEntityClient::new();
        let created = client
            .create(Collection::Machines, json!({"serie": "A1", "estado": "a-fazer"}))
            .await
            .unwrap();
        let id = created["id"].as_str().unwrap();

        client
            .update(Collection::Machines, id, json!({"estado": "em-preparacao-nuno"}))
            .await
            .unwrap();
        let updated = client
            .update(Collection::Machines, id, json!({"estado": "concluida-nuno", "tecnico": "nuno"}))
            .await
            .unwrap();

        assert_eq!(updated["serie"], "A1");
        assert_eq!(updated["estado"], "concluida-nuno");
        assert_eq!(updated["id"], id);
    }

    #[tokio::test]
    async fn test_filter_sort_limit() {
        let client = InMemoryEntityClient::new();
        for (n, status) in [(1, "pendente"), (2, "concluido"), (3, "pendente")] {
            client
                .create(Collection::PartRequests, json!({"numeroPedido": n, "status": status}))
                .await
                .unwrap();
        }

        let pending = client
            .filter(
                Collection::PartRequests,
                &EntityQuery::new().eq("status", "pendente"),
                Some(&Sort::desc("numeroPedido")),
                None,
            )
            .await
            .unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0]["numeroPedido"], 3);

        let limited = client
            .list(Collection::PartRequests, Some(&Sort::asc("numeroPedido")), Some(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0]["numeroPedido"], 1);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let client = InMemoryEntityClient::new();
        let err = client.delete(Collection::Machines, "nope").await.unwrap_err();
        assert!(matches!(err, EntityError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_subscribe_receives_changes() {
        let client = InMemoryEntityClient::new();
        let mut rx = client.subscribe();
        let created = client
            .create(Collection::Notifications, json!({"message": "olá"}))
            .await
            .unwrap();
        let change = rx.recv().await.unwrap();
        assert_eq!(change.kind, ChangeKind::Create);
        assert_eq!(change.collection, Collection::Notifications);
        assert_eq!(Some(change.id.as_str()), created["id"].as_str());
    }
}
