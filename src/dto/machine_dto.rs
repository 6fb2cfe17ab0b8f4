use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::machine::{Caracteristicas, Recondicao, Tarefa};
use crate::models::{Machine, Origem};
use crate::utils::dates;

// Request para criar uma máquina
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMachineRequest {
    #[validate(length(min = 1, max = 100))]
    pub modelo: String,
    #[validate(custom = "crate::utils::validation::validate_serie")]
    pub serie: String,
    #[validate(range(min = 1950, max = 2100))]
    pub ano: Option<i32>,
    #[serde(default)]
    pub origem: Origem,
    pub estado: Option<String>,
    pub categoria: Option<String>,
    pub caracteristicas: Option<Caracteristicas>,
    #[serde(default)]
    pub tarefas: Vec<Tarefa>,
    #[serde(default)]
    pub prioridade: bool,
    #[serde(default, with = "dates::option_flexible")]
    pub data_inicio_aluguer: Option<DateTime<Utc>>,
    /// Criar mesmo havendo outra máquina com a mesma série
    #[serde(default)]
    pub permitir_duplicado: bool,
}

/// Resultado da criação: criada, ou confirmação de regresso de aluguer
#[derive(Debug, Serialize)]
#[serde(tag = "resultado", rename_all = "camelCase")]
pub enum CreateMachineOutcome {
    Criada { maquina: Machine },
    ConfirmarRetorno { maquina: Machine, mensagem: String },
}

// Request para actualizar uma máquina
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMachineRequest {
    #[validate(length(min = 1, max = 100))]
    pub modelo: Option<String>,
    #[validate(custom = "crate::utils::validation::validate_serie")]
    pub serie: Option<String>,
    #[validate(range(min = 1950, max = 2100))]
    pub ano: Option<i32>,
    pub origem: Option<Origem>,
    pub categoria: Option<String>,
    pub caracteristicas: Option<Caracteristicas>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct MoveMachineRequest {
    #[validate(length(min = 1))]
    pub estado: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssignMachineRequest {
    #[validate(custom = "crate::utils::validation::validate_technician_id")]
    pub tecnico: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteMachineRequest {
    /// Conclusão geral (apenas admin)
    #[serde(default)]
    pub geral: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRentalRequest {
    #[serde(default, with = "dates::option_flexible")]
    pub data_inicio: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TextRequest {
    #[validate(custom = "crate::utils::validation::validate_not_empty")]
    pub texto: String,
}

#[derive(Debug, Deserialize)]
pub struct PriorityRequest {
    pub prioridade: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwaitingPartsRequest {
    pub aguarda_pecas: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReservationRequest {
    #[validate(custom = "crate::utils::validation::validate_not_empty")]
    pub cliente: String,
    #[serde(default, with = "dates::option_flexible")]
    pub data: Option<DateTime<Utc>>,
    pub comercial: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReconditioningRequest {
    pub bronze: Option<bool>,
    pub prata: Option<bool>,
}

impl ReconditioningRequest {
    pub fn apply(&self, current: &Recondicao) -> Recondicao {
        Recondicao {
            bronze: self.bronze.unwrap_or(current.bronze),
            prata: self.prata.unwrap_or(current.prata),
        }
    }
}

/// Coluna de um técnico no quadro
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianColumn {
    pub tecnico: String,
    pub em_preparacao: Vec<Machine>,
    pub concluidas: Vec<Machine>,
}

/// Quadro Kanban da oficina
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineBoard {
    pub a_fazer: Vec<Machine>,
    pub tecnicos: Vec<TechnicianColumn>,
    pub concluida_geral: Vec<Machine>,
    pub outros: Vec<Machine>,
}
