use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::models::service_order::OrderTask;
use crate::models::{OrderPriority, OrderStatus, ServiceOrder};
use crate::utils::dates;

// Request para criar uma O.S.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceOrderRequest {
    #[validate(length(min = 1, max = 100))]
    pub modelo: String,
    #[validate(custom = "crate::utils::validation::validate_serie")]
    pub serie: String,
    #[validate(range(min = 1950, max = 2100))]
    pub ano: Option<i32>,
    #[validate(custom = "crate::utils::validation::validate_not_empty")]
    pub cliente: String,
    #[serde(default, with = "dates::option_flexible")]
    pub data_entrega: Option<DateTime<Utc>>,
    #[serde(default)]
    pub prioridade: OrderPriority,
    pub tipo_trabalho: Option<String>,
    pub observacoes: Option<String>,
    #[serde(default)]
    pub acessorios: BTreeMap<String, String>,
    #[serde(default)]
    pub tasks: Vec<OrderTask>,
    pub acp_machine_id: Option<String>,
    #[validate(custom = "crate::utils::validation::validate_technician_id")]
    pub tecnico: Option<String>,
}

// Request para actualizar uma O.S.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServiceOrderRequest {
    #[validate(length(min = 1, max = 100))]
    pub modelo: Option<String>,
    #[validate(custom = "crate::utils::validation::validate_serie")]
    pub serie: Option<String>,
    #[validate(range(min = 1950, max = 2100))]
    pub ano: Option<i32>,
    pub cliente: Option<String>,
    #[serde(default, with = "dates::option_flexible")]
    pub data_entrega: Option<DateTime<Utc>>,
    pub prioridade: Option<OrderPriority>,
    pub tipo_trabalho: Option<String>,
    pub observacoes: Option<String>,
    pub acessorios: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
pub struct MoveOrderRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignOrderRequest {
    #[validate(custom = "crate::utils::validation::validate_technician_id")]
    pub tecnico: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OrderTaskRequest {
    #[validate(custom = "crate::utils::validation::validate_not_empty")]
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServiceOrderListQuery {
    pub status: Option<OrderStatus>,
    pub tecnico: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderColumn {
    pub status: OrderStatus,
    pub ordens: Vec<ServiceOrder>,
}
