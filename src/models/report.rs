//! Relatório de utilização

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPeriod {
    pub desde: DateTime<Utc>,
    pub ate: DateTime<Utc>,
}

/// Contagem da frota por balde de estado
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateBuckets {
    pub a_fazer: usize,
    pub em_preparacao: usize,
    pub concluida: usize,
    pub em_aluguer: usize,
    pub disponivel: usize,
    pub outros: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    pub total: usize,
    pub por_origem: BTreeMap<String, usize>,
    pub por_estado: StateBuckets,
    pub prioritarias: usize,
    pub aguardam_pecas: usize,
    pub reservadas: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianStats {
    pub tecnico: String,
    pub atribuidas: usize,
    pub em_preparacao: usize,
    pub concluidas_no_periodo: usize,
    /// Média de horas entre atribuição e conclusão
    pub media_horas_preparacao: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalStats {
    pub origem: String,
    pub total: usize,
    pub em_aluguer: usize,
    pub media_dias_aluguer: Option<f64>,
    pub taxa_utilizacao: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOrderSummary {
    pub total: usize,
    pub por_status: BTreeMap<String, usize>,
    pub por_prioridade: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartRequestSummary {
    pub pendentes: usize,
    pub concluidos: usize,
    pub concluidos_no_periodo: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtilizationReport {
    pub periodo: ReportPeriod,
    pub origem: Option<String>,
    pub frota: FleetSummary,
    pub tecnicos: Vec<TechnicianStats>,
    pub aluguer: Vec<RentalStats>,
    pub ordens_servico: ServiceOrderSummary,
    pub pedidos: PartRequestSummary,
    pub gerado_em: DateTime<Utc>,
}
