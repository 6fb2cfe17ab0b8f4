//! Modelo de Ordem de Serviço (`OrdemServico`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::clients::Collection;
use crate::repositories::Entity;
use crate::utils::dates;

/// Columna del quadro de ordens de serviço
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum OrderStatus {
    #[default]
    AFazer,
    Priorizado,
    EmProgresso,
    Aguardando,
    Concluido,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::AFazer,
        OrderStatus::Priorizado,
        OrderStatus::EmProgresso,
        OrderStatus::Aguardando,
        OrderStatus::Concluido,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::AFazer => "a-fazer",
            OrderStatus::Priorizado => "priorizado",
            OrderStatus::EmProgresso => "em-progresso",
            OrderStatus::Aguardando => "aguardando",
            OrderStatus::Concluido => "concluido",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderPriority {
    #[default]
    Normal,
    Alta,
    Urgente,
}

impl OrderPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderPriority::Normal => "normal",
            OrderPriority::Alta => "alta",
            OrderPriority::Urgente => "urgente",
        }
    }

    /// Orden en el quadro: urgente primero
    pub fn rank(&self) -> u8 {
        match self {
            OrderPriority::Urgente => 0,
            OrderPriority::Alta => 1,
            OrderPriority::Normal => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTask {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

/// Entrada del histórico de una O.S.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderHistoryEntry {
    pub acao: String,
    #[serde(default)]
    pub autor: String,
    #[serde(with = "dates::flexible")]
    pub data: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detalhes: Option<String>,
}

impl OrderHistoryEntry {
    pub fn new(acao: &str, autor: &str, data: DateTime<Utc>) -> Self {
        Self {
            acao: acao.to_string(),
            autor: autor.to_string(),
            data,
            detalhes: None,
        }
    }

    pub fn with_details(mut self, detalhes: impl Into<String>) -> Self {
        self.detalhes = Some(detalhes.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceOrder {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub modelo: String,
    pub serie: String,
    pub ano: Option<i32>,
    pub cliente: String,
    #[serde(with = "dates::option_flexible")]
    pub data_entrega: Option<DateTime<Utc>>,
    pub prioridade: OrderPriority,
    pub tipo_trabalho: Option<String>,
    pub observacoes: Option<String>,
    /// Acessório -> número de série
    pub acessorios: BTreeMap<String, String>,
    pub tasks: Vec<OrderTask>,
    pub status: OrderStatus,
    pub acp_machine_id: Option<String>,
    pub tecnico: Option<String>,
    pub historico: Vec<OrderHistoryEntry>,
    #[serde(rename = "created_date", skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
    #[serde(rename = "updated_date", skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<String>,
}

impl Entity for ServiceOrder {
    const COLLECTION: Collection = Collection::ServiceOrders;

    fn id(&self) -> &str {
        &self.id
    }
}

impl ServiceOrder {
    /// Orden del quadro: prioridad y después fecha de entrega (sin fecha al final)
    pub fn board_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.prioridade
            .rank()
            .cmp(&other.prioridade.rank())
            .then_with(|| match (self.data_entrega, other.data_entrega) {
                (Some(a), Some(b)) => a.cmp(&b),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_value(OrderStatus::EmProgresso).unwrap(), json!("em-progresso"));
        let status: OrderStatus = serde_json::from_value(json!("a-fazer")).unwrap();
        assert_eq!(status, OrderStatus::AFazer);
    }

    #[test]
    fn test_board_order() {
        let urgent: ServiceOrder = serde_json::from_value(json!({"prioridade": "urgente"})).unwrap();
        let early: ServiceOrder =
            serde_json::from_value(json!({"prioridade": "normal", "dataEntrega": "2024-03-01"})).unwrap();
        let undated: ServiceOrder = serde_json::from_value(json!({"prioridade": "normal"})).unwrap();

        let mut orders = vec![undated.clone(), early.clone(), urgent.clone()];
        orders.sort_by(|a, b| a.board_cmp(b));
        assert_eq!(orders, vec![urgent, early, undated]);
    }
}
