//! Contrato del cliente de entidades
//!
//! Todas las entidades (máquinas, ordens de serviço, pedidos, notificações,
//! utilizadores) se guardan en el backend-as-a-service. Este módulo define
//! el contrato genérico list/filter/create/update/delete/subscribe que el
//! resto del sistema consume.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use tokio::sync::broadcast;

/// Colecciones conocidas del backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    #[serde(rename = "FrotaACP")]
    Machines,
    #[serde(rename = "OrdemServico")]
    ServiceOrders,
    #[serde(rename = "Pedido")]
    PartRequests,
    #[serde(rename = "Notificacao")]
    Notifications,
    #[serde(rename = "User")]
    Users,
    #[serde(rename = "Personalizacao")]
    Customizations,
}

impl Collection {
    pub const ALL: [Collection; 6] = [
        Collection::Machines,
        Collection::ServiceOrders,
        Collection::PartRequests,
        Collection::Notifications,
        Collection::Users,
        Collection::Customizations,
    ];

    /// Nombre de la colección en el backend
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Machines => "FrotaACP",
            Collection::ServiceOrders => "OrdemServico",
            Collection::PartRequests => "Pedido",
            Collection::Notifications => "Notificacao",
            Collection::Users => "User",
            Collection::Customizations => "Personalizacao",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orden de listado, `-created_date` para descendente
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub descending: bool,
}

impl Sort {
    pub fn asc(field: &str) -> Self {
        Self { field: field.to_string(), descending: false }
    }

    pub fn desc(field: &str) -> Self {
        Self { field: field.to_string(), descending: true }
    }

    /// Más recientes primero
    pub fn newest_first() -> Self {
        Self::desc("created_date")
    }

    pub fn to_param(&self) -> String {
        if self.descending {
            format!("-{}", self.field)
        } else {
            self.field.clone()
        }
    }
}

/// Predicado de igualdad por campo, tal como lo acepta `filter`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EntityQuery(pub Map<String, Value>);

impl EntityQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    /// ¿El registro cumple todas las igualdades?
    pub fn matches(&self, record: &Value) -> bool {
        self.0
            .iter()
            .all(|(field, expected)| record.get(field).unwrap_or(&Value::Null) == expected)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Tipo de cambio publicado por `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

/// Evento del feed de cambios
#[derive(Debug, Clone, Serialize)]
pub struct EntityChange {
    pub collection: Collection,
    pub kind: ChangeKind,
    pub id: String,
    /// Registro tras el cambio; `None` en borrados
    pub record: Option<Value>,
}

/// Errores del cliente de entidades
#[derive(Error, Debug)]
pub enum EntityError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend responded {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{collection} '{id}' not found")]
    NotFound { collection: String, id: String },

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

impl EntityError {
    pub fn not_found(collection: Collection, id: &str) -> Self {
        EntityError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

pub type EntityResult<T> = Result<T, EntityError>;

/// Cliente genérico de entidades del backend
#[async_trait]
pub trait EntityClient: Send + Sync {
    async fn list(
        &self,
        collection: Collection,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> EntityResult<Vec<Value>>;

    async fn filter(
        &self,
        collection: Collection,
        query: &EntityQuery,
        sort: Option<&Sort>,
        limit: Option<usize>,
    ) -> EntityResult<Vec<Value>>;

    async fn get(&self, collection: Collection, id: &str) -> EntityResult<Option<Value>>;

    async fn create(&self, collection: Collection, fields: Value) -> EntityResult<Value>;

    /// Merge superficial de `patch` sobre el registro; el último en escribir gana
    async fn update(&self, collection: Collection, id: &str, patch: Value) -> EntityResult<Value>;

    async fn delete(&self, collection: Collection, id: &str) -> EntityResult<()>;

    fn subscribe(&self) -> broadcast::Receiver<EntityChange>;
}

/// Campos que el backend gestiona y que no se reenvían al recrear
pub const SYSTEM_FIELDS: [&str; 4] = ["id", "created_date", "updated_date", "created_by"];

/// Quitar los campos de sistema de un registro
pub fn strip_system_fields(record: &Value) -> Value {
    match record {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| !SYSTEM_FIELDS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Id de un registro
pub fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}
