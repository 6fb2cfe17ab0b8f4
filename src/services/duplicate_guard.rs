//! Control de números de série duplicados
//!
//! La série no es única en el backend. Al crear una máquina:
//! - si una duplicada está "Em Aluguer" en la frota STS/UTS se pide confirmar
//!   el regreso de aluguer en lugar de crear otra ficha;
//! - cualquier otra duplicada se rechaza salvo `permitirDuplicado`, y en ese
//!   caso la nueva ficha guarda el linaje en `historicoCriacoes`.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::models::machine::{Machine, MachineState, MovimentoHistorico, RegistoCriacao, TipoMovimento};
use crate::utils::validation::normalize_serie;

#[derive(Debug, Clone, PartialEq)]
pub enum SerialCheck {
    Unique,
    ReturnFromRental(Box<Machine>),
    Duplicate(Vec<Machine>),
}

/// Comparar `serie` contra todas las máquinas existentes
pub fn check_serial(existing: &[Machine], serie: &str) -> SerialCheck {
    let wanted = normalize_serie(serie);
    let duplicates: Vec<&Machine> = existing
        .iter()
        .filter(|m| normalize_serie(&m.serie) == wanted)
        .collect();

    if duplicates.is_empty() {
        return SerialCheck::Unique;
    }
    if let Some(rented) = duplicates.iter().find(|m| m.is_rental_return_candidate()) {
        return SerialCheck::ReturnFromRental(Box::new((*rented).clone()));
    }
    SerialCheck::Duplicate(duplicates.into_iter().cloned().collect())
}

/// Vidas anteriores para `historicoCriacoes`, más antigua primero
pub fn lineage(duplicates: &[Machine]) -> Vec<RegistoCriacao> {
    let mut records: Vec<RegistoCriacao> = duplicates
        .iter()
        .flat_map(|m| {
            m.historico_criacoes.iter().cloned().chain(std::iter::once(RegistoCriacao {
                maquina_id: m.id.clone(),
                estado: m.estado.to_string(),
                origem: m.origem,
                data_criacao: m.created_at(),
            }))
        })
        .collect();
    records.sort_by_key(|r| r.data_criacao);
    records.dedup_by(|a, b| a.maquina_id == b.maquina_id);
    records
}

/// Patch que confirma el regreso de aluguer
pub fn return_from_rental_patch(machine: &Machine, autor: &str, now: DateTime<Utc>) -> Value {
    let target = MachineState::available();
    let mut historico = machine.historico.clone();
    historico.push(
        MovimentoHistorico::new(TipoMovimento::RetornoAluguer, autor, now)
            .between(machine.estado.to_string(), target.to_string()),
    );
    json!({
        "estado": target,
        "dataInicioAluguer": Value::Null,
        "historico": historico,
    })
}
