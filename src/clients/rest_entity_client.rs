//! Cliente HTTP de entidades (backend-as-a-service)
//!
//! `GET/POST {app}/entities/{Colección}` y `GET/PUT/DELETE .../{id}`.
//! Las escrituras hechas a través de este cliente se publican en el feed de
//! cambios; `start_change_feed` detecta además los cambios externos
//! comparando instantáneas periódicas.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::entity_client::{
    record_id, ChangeKind, Collection, EntityChange, EntityClient, EntityError, EntityQuery,
    EntityResult, Sort,
};
use crate::config::BackendConfig;

pub struct RestEntityClient {
    client: Client,
    app_url: String,
    api_key: Option<String>,
    changes: broadcast::Sender<EntityChange>,
}

impl RestEntityClient {
    pub fn new(config: &BackendConfig) -> EntityResult<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::with_client(client, config.app_url(), config.api_key.clone()))
    }

    pub fn with_client(client: Client, app_url: String, api_key: Option<String>) -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            client,
            app_url,
            api_key,
            changes,
        }
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/entities/{}", self.app_url, collection)
    }

    fn record_url(&self, collection: Collection, id: &str) -> String {
        format!("{}/{}", self.collection_url(collection), urlencoding::encode(id))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header("api_key", key),
            None => builder,
        }
    }

    fn publish(&self, collection: Collection, kind: ChangeKind, id: &str, record: Option<Value>) {
        let _ = self.changes.send(EntityChange {
            collection,
            kind,
            id: id.to_string(),
            record,
        });
    }

    async fn send(&self, builder: RequestBuilder, what: &str) -> EntityResult<Response> {
        let response = builder.send().await.map_err(|e| classify(e, what))?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("message")
                    .or_else(|| v.get("detail"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or(body);
        Err(EntityError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// Arranca el sondeo de cambios externos para las colecciones dadas
    pub fn start_change_feed(
        self: &Arc<Self>,
        collections: Vec<Collection>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move {
            info!("📡 Feed de mudanças activo ({:?}) a cada {:?}", collections, interval);
            let mut snapshots: HashMap<Collection, HashMap<String, Value>> = HashMap::new();
            let mut ticker = tokio::time::interval(interval);

            loop {
                ticker.tick().await;
                for collection in &collections {
                    match client.list(*collection, None, None).await {
                        Ok(records) => {
                            let current = index_by_id(records);
                            if let Some(previous) = snapshots.get(collection) {
                                for change in diff_snapshots(*collection, previous, &current) {
                                    let _ = client.changes.send(change);
                                }
                            }
                            snapshots.insert(*collection, current);
                        }
                        Err(e) => warn!("⚠️ Feed de mudanças falhou para {}: {}", collection, e),
                    }
                }
            }
        })
    }
}

fn classify(err: reqwest::Error, what: &str) -> EntityError {
    if err.is_timeout() {
        EntityError::Timeout(what.to_string())
    } else {
        EntityError::Http(err)
    }
}

fn index_by_id(records: Vec<Value>) -> HashMap<String, Value> {
    records
        .into_iter()
        .filter_map(|r| record_id(&r).map(str::to_string).map(|id| (id, r)))
        .collect()
}

/// Cambios entre dos instantáneas de una colección
pub fn diff_snapshots(
    collection: Collection,
    previous: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
) -> Vec<EntityChange> {
    let mut changes = Vec::new();
    for (id, record) in current {
        let kind = match previous.get(id) {
            None => Some(ChangeKind::Create),
            Some(old) if old.get("updated_date") != record.get("updated_date") || old != record => {
                Some(ChangeKind::Update)
            }
            Some(_) => None,
        };
        if let Some(kind) = kind {
            changes.push(EntityChange {
                collection,
                kind,
                id: id.clone(),
                record: Some(record.clone()),
            });
        }
    }
    for id in previous.keys().filter(|id| !current.contains_key(*id)) {
        changes.push(EntityChange {
            collection,
            kind: ChangeKind::Delete,
            id: id.clone(),
            record: None,
        });
    }
    changes
}

fn list_params(sort: Option<&Sort>, limit: Option<usize>) -> Vec<(&'static str, String)> {
    let mut params = Vec::new();
    if let Some(sort) = sort {
        params.push(("sort", sort.to_param()));
    }
    if let Some(limit) = limit {
        params.push(("limit", limit.to_string()));
    }
    params
}

#[async_trait]
impl EntityClient for RestEntityClient {
    async fn list(
        &self,
        collection: Collection,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> EntityResult<Vec<Value>> {
        let url = self.collection_url(collection);
        let builder = self.request(Method::GET, &url).query(&list_params(sort, limit));
        let response = self.send(builder, &format!("list {}", collection)).await?;
        let records: Vec<Value> = response.json().await?;
        debug!("📥 {} {} registos", collection, records.len());
        Ok(records)
    }

    async fn filter(
        &self,
        collection: Collection,
        query: &EntityQuery,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> EntityResult<Vec<Value>> {
        let url = self.collection_url(collection);
        let mut params = list_params(sort, limit);
        params.push(("q", serde_json::to_string(query)?));
        let builder = self.request(Method::GET, &url).query(&params);
        let response = self.send(builder, &format!("filter {}", collection)).await?;
        Ok(response.json().await?)
    }

    async fn get(&self, collection: Collection, id: &str) -> EntityResult<Option<Value>> {
        let url = self.record_url(collection, id);
        match self.send(self.request(Method::GET, &url), &format!("get {}", collection)).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(EntityError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn create(&self, collection: Collection, fields: Value) -> EntityResult<Value> {
        let url = self.collection_url(collection);
        let builder = self.request(Method::POST, &url).json(&fields);
        let response = self.send(builder, &format!("create {}", collection)).await?;
        let record: Value = response.json().await?;
        let id = record_id(&record)
            .ok_or_else(|| EntityError::InvalidRecord(format!("{} created without id", collection)))?
            .to_string();
        self.publish(collection, ChangeKind::Create, &id, Some(record.clone()));
        Ok(record)
    }

    async fn update(&self, collection: Collection, id: &str, patch: Value) -> EntityResult<Value> {
        let url = self.record_url(collection, id);
        let builder = self.request(Method::PUT, &url).json(&patch);
        let record: Value = match self.send(builder, &format!("update {}", collection)).await {
            Ok(response) => response.json().await?,
            Err(EntityError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                return Err(EntityError::not_found(collection, id))
            }
            Err(e) => {
                error!("❌ Falha ao actualizar {} {}: {}", collection, id, e);
                return Err(e);
            }
        };
        self.publish(collection, ChangeKind::Update, id, Some(record.clone()));
        Ok(record)
    }

    async fn delete(&self, collection: Collection, id: &str) -> EntityResult<()> {
        let url = self.record_url(collection, id);
        match self.send(self.request(Method::DELETE, &url), &format!("delete {}", collection)).await {
            Ok(_) => {}
            Err(EntityError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                return Err(EntityError::not_found(collection, id))
            }
            Err(e) => return Err(e),
        }
        self.publish(collection, ChangeKind::Delete, id, None);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<EntityChange> {
        self.changes.subscribe()
    }
}
