//! Modelo de Pedido de peças (`Pedido`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::clients::Collection;
use crate::repositories::Entity;
use crate::utils::dates;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PartRequestStatus {
    #[default]
    Pendente,
    Concluido,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartRequest {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(deserialize_with = "numero_as_string")]
    pub numero_pedido: String,
    pub maquina_id: String,
    pub maquina_serie: String,
    pub maquina_modelo: String,
    pub tecnico: Option<String>,
    pub status: PartRequestStatus,
    #[serde(with = "dates::option_flexible")]
    pub data_conclusao: Option<DateTime<Utc>>,
    #[serde(rename = "created_date", skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
}

/// `numeroPedido` aparece como texto o como número
fn numero_as_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

impl Entity for PartRequest {
    const COLLECTION: Collection = Collection::PartRequests;

    fn id(&self) -> &str {
        &self.id
    }
}

impl PartRequest {
    pub fn is_pending(&self) -> bool {
        self.status == PartRequestStatus::Pendente
    }
}
