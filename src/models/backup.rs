//! Formato de cópia de segurança JSON

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const BACKUP_VERSION: &str = "1.0";

/// Documento `{version, timestamp, data: {machines, pedidos, customizations}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupDocument {
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub data: BackupData,
}

/// Registos em bruto, tal como o backend os devolve
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackupData {
    #[serde(default)]
    pub machines: Vec<Value>,
    #[serde(default)]
    pub pedidos: Vec<Value>,
    #[serde(default)]
    pub customizations: Vec<Value>,
}

/// Resultado de uma importação por coleção
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionImport {
    pub collection: String,
    pub deleted: usize,
    pub created: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub collections: Vec<CollectionImport>,
    /// Linhas CSV rejeitadas (número de linha, motivo)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected_rows: Vec<(usize, String)>,
}

impl ImportSummary {
    pub fn created(&self) -> usize {
        self.collections.iter().map(|c| c.created).sum()
    }
}
