//! Modelo de Máquina (`FrotaACP`)
//!
//! Este módulo contiene la máquina de la frota con sus sub-registos
//! (tarefas, observações, reserva, características, histórico) y el estado
//! tipado que sustituye al string libre `estado`.

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

use crate::clients::Collection;
use crate::repositories::Entity;
use crate::utils::dates;

pub const ESTADO_A_FAZER: &str = "a-fazer";
pub const ESTADO_CONCLUIDA_GERAL: &str = "concluida-geral";
pub const ESTADO_EM_ALUGUER: &str = "Em Aluguer";
pub const ESTADO_DISPONIVEL: &str = "Disponível";

const PREFIX_EM_PREPARACAO: &str = "em-preparacao-";
const PREFIX_CONCLUIDA: &str = "concluida-";

/// Estado de una máquina
///
/// `a-fazer`, `em-preparacao-<técnico>`, `concluida-<técnico>`,
/// `concluida-geral`, o cualquier otro estado libre (aluguer, disponível).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum MachineState {
    #[default]
    Todo,
    InPreparation(String),
    DoneByTechnician(String),
    DoneGeneral,
    Other(String),
}

impl MachineState {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw == ESTADO_A_FAZER {
            return MachineState::Todo;
        }
        // concluida-geral antes del prefijo concluida-
        if raw == ESTADO_CONCLUIDA_GERAL {
            return MachineState::DoneGeneral;
        }
        if let Some(tech) = raw.strip_prefix(PREFIX_EM_PREPARACAO).filter(|t| !t.is_empty()) {
            return MachineState::InPreparation(tech.to_string());
        }
        if let Some(tech) = raw.strip_prefix(PREFIX_CONCLUIDA).filter(|t| !t.is_empty()) {
            return MachineState::DoneByTechnician(tech.to_string());
        }
        MachineState::Other(raw.to_string())
    }

    /// Técnico implicado por el estado
    pub fn technician(&self) -> Option<&str> {
        match self {
            MachineState::InPreparation(t) | MachineState::DoneByTechnician(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, MachineState::DoneByTechnician(_) | MachineState::DoneGeneral)
    }

    pub fn is_in_rental(&self) -> bool {
        matches!(self, MachineState::Other(s) if s == ESTADO_EM_ALUGUER)
    }

    pub fn is_available(&self) -> bool {
        matches!(self, MachineState::Other(s) if s == ESTADO_DISPONIVEL)
    }

    pub fn rental() -> Self {
        MachineState::Other(ESTADO_EM_ALUGUER.to_string())
    }

    pub fn available() -> Self {
        MachineState::Other(ESTADO_DISPONIVEL.to_string())
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineState::Todo => f.write_str(ESTADO_A_FAZER),
            MachineState::InPreparation(t) => write!(f, "{}{}", PREFIX_EM_PREPARACAO, t),
            MachineState::DoneByTechnician(t) => write!(f, "{}{}", PREFIX_CONCLUIDA, t),
            MachineState::DoneGeneral => f.write_str(ESTADO_CONCLUIDA_GERAL),
            MachineState::Other(s) => f.write_str(s),
        }
    }
}

impl Serialize for MachineState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MachineState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.map(|s| MachineState::parse(&s)).unwrap_or_default())
    }
}

/// Origen de la máquina
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Origem {
    #[default]
    #[serde(alias = "Nova", alias = "NOVA")]
    Nova,
    #[serde(alias = "STS", alias = "Sts")]
    Sts,
    #[serde(alias = "UTS", alias = "Uts")]
    Uts,
}

impl Origem {
    pub const ALL: [Origem; 3] = [Origem::Nova, Origem::Sts, Origem::Uts];

    pub fn as_str(&self) -> &'static str {
        match self {
            Origem::Nova => "nova",
            Origem::Sts => "sts",
            Origem::Uts => "uts",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "nova" => Some(Origem::Nova),
            "sts" => Some(Origem::Sts),
            "uts" => Some(Origem::Uts),
            _ => None,
        }
    }

    /// Frota de aluguer (STS/UTS)
    pub fn is_rental_fleet(&self) -> bool {
        matches!(self, Origem::Sts | Origem::Uts)
    }
}

impl fmt::Display for Origem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tarefa {
    pub texto: String,
    #[serde(default)]
    pub concluida: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observacao {
    pub texto: String,
    #[serde(default)]
    pub autor: String,
    #[serde(default, with = "dates::option_flexible")]
    pub data: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recondicao {
    #[serde(default)]
    pub bronze: bool,
    #[serde(default)]
    pub prata: bool,
}

/// Reserva (anotación independiente del estado)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reserva {
    pub cliente: String,
    #[serde(default, with = "dates::option_flexible")]
    pub data: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comercial: Option<String>,
}

/// Características técnicas; los campos conocidos alimentan los sinónimos
/// de pesquisa, el resto se conserva tal cual
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caracteristicas {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mastro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_string")]
    pub vias_mastro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cor_pneus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "lenient_bool")]
    pub joystick: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acessorio: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `viasMastro` llega como número o como texto
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "sim" | "true" | "s" => Some(true),
            "nao" | "não" | "false" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// Tipo de evento del histórico
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipoMovimento {
    Criacao,
    MudancaEstado,
    InicioAluguer,
    RetornoAluguer,
    Prioridade,
    Reserva,
    AguardaPecas,
    Recondicao,
    Edicao,
    #[serde(other)]
    Outro,
}

/// Evento de movimiento de la máquina
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovimentoHistorico {
    pub tipo: TipoMovimento,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub de: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub para: Option<String>,
    #[serde(default)]
    pub autor: String,
    #[serde(with = "dates::flexible")]
    pub data: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detalhes: Option<String>,
}

impl MovimentoHistorico {
    pub fn new(tipo: TipoMovimento, autor: &str, data: DateTime<Utc>) -> Self {
        Self {
            tipo,
            de: None,
            para: None,
            autor: autor.to_string(),
            data,
            detalhes: None,
        }
    }

    pub fn between(mut self, de: impl Into<String>, para: impl Into<String>) -> Self {
        self.de = Some(de.into());
        self.para = Some(para.into());
        self
    }

    pub fn with_details(mut self, detalhes: impl Into<String>) -> Self {
        self.detalhes = Some(detalhes.into());
        self
    }
}

/// Vida anterior de una máquina con el mismo número de série
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistoCriacao {
    pub maquina_id: String,
    pub estado: String,
    pub origem: Origem,
    #[serde(default, with = "dates::option_flexible")]
    pub data_criacao: Option<DateTime<Utc>>,
}

/// Máquina de la frota
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Machine {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub modelo: String,
    pub serie: String,
    pub ano: Option<i32>,
    pub origem: Origem,
    pub categoria: Option<String>,
    pub estado: MachineState,
    pub tecnico: Option<String>,
    pub tarefas: Vec<Tarefa>,
    pub observacoes: Vec<Observacao>,
    pub recondicao: Recondicao,
    pub prioridade: bool,
    pub aguarda_pecas: bool,
    pub reserva: Option<Reserva>,
    pub caracteristicas: Caracteristicas,
    pub historico: Vec<MovimentoHistorico>,
    #[serde(with = "dates::option_flexible")]
    pub data_atribuicao: Option<DateTime<Utc>>,
    #[serde(with = "dates::option_flexible")]
    pub data_conclusao: Option<DateTime<Utc>>,
    #[serde(with = "dates::option_flexible")]
    pub data_inicio_aluguer: Option<DateTime<Utc>>,
    pub historico_criacoes: Vec<RegistoCriacao>,
    #[serde(rename = "created_date", skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
    #[serde(rename = "updated_date", skip_serializing_if = "Option::is_none")]
    pub updated_date: Option<String>,
}

impl Entity for Machine {
    const COLLECTION: Collection = Collection::Machines;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Machine {
    /// ¿Candidata a regressar de aluguer? (Em Aluguer na frota STS/UTS)
    pub fn is_rental_return_candidate(&self) -> bool {
        self.estado.is_in_rental() && self.origem.is_rental_fleet()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_date.as_deref().and_then(dates::parse_flexible)
    }

    pub fn reservada(&self) -> bool {
        self.reserva.is_some()
    }
}

lazy_static! {
    /// Prefijo de modelo -> categoría; el primero que encaja gana
    static ref CATEGORY_PREFIXES: Vec<(Regex, &'static str)> = vec![
        (r"^(RT|FRE|ETV|ESR|R)\d", "Retrátil"),
        (r"^(EJE|ERE|HPT|MT|T)\d", "Porta-Paletes"),
        (r"^(ERC|EJC|SX|SW|L)\d", "Stacker"),
        (r"^(EFG|FB|RX20|8FBE|E)\d", "Empilhador Elétrico"),
        (r"^(DFG|TFG|FD|FG|RX70|8FD|H)\d", "Empilhador Térmico"),
    ]
    .into_iter()
    .filter_map(|(pattern, categoria)| {
        Regex::new(&format!("(?i){}", pattern)).ok().map(|re| (re, categoria))
    })
    .collect();
}

pub const CATEGORIA_OUTROS: &str = "Outros";

/// Categoria derivada do prefixo do modelo
pub fn derive_categoria(modelo: &str) -> &'static str {
    let modelo = modelo.trim();
    CATEGORY_PREFIXES
        .iter()
        .find(|(re, _)| re.is_match(modelo))
        .map(|(_, categoria)| *categoria)
        .unwrap_or(CATEGORIA_OUTROS)
}
