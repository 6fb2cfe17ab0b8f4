//! Modelo de Notificação (`Notificacao`)

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use super::auth::SessionContext;
use super::machine::Machine;
use crate::clients::Collection;
use crate::repositories::Entity;

/// Tipo de evento notificado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OsAtribuida,
    MaquinaAtribuida,
    MaquinaConcluida,
    PrioridadeAlterada,
    PecasChegaram,
    NovaObservacao,
    NovaMaquina,
    ReservaAlterada,
    /// Tipos criados por outros clientes do backend
    #[serde(other)]
    Outro,
}

/// Destinatario: un técnico, el administrador o todos
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NotificationTarget {
    Technician(String),
    Admin,
    All,
}

impl fmt::Display for NotificationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationTarget::Technician(t) => f.write_str(t),
            NotificationTarget::Admin => f.write_str("admin"),
            NotificationTarget::All => f.write_str("all"),
        }
    }
}

impl Serialize for NotificationTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NotificationTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(match raw.as_str() {
            "admin" => NotificationTarget::Admin,
            "all" => NotificationTarget::All,
            other => NotificationTarget::Technician(other.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub user_id: NotificationTarget,
    pub message: String,
    #[serde(default)]
    pub machine_id: Option<String>,
    #[serde(default)]
    pub machine_serie: Option<String>,
    #[serde(default)]
    pub technician_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default, rename = "created_date", skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
}

impl Entity for Notification {
    const COLLECTION: Collection = Collection::Notifications;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Notification {
    pub fn new(target: NotificationTarget, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            user_id: target,
            message: message.into(),
            machine_id: None,
            machine_serie: None,
            technician_name: None,
            kind,
            is_read: false,
            created_date: None,
        }
    }

    pub fn about_machine(mut self, machine: &Machine) -> Self {
        self.machine_id = Some(machine.id.clone()).filter(|id| !id.is_empty());
        self.machine_serie = Some(machine.serie.clone());
        self
    }

    pub fn by_technician(mut self, technician: impl Into<String>) -> Self {
        self.technician_name = Some(technician.into());
        self
    }

    /// Un técnico ve lo suyo y `all`; el admin ve `admin` y `all`
    pub fn visible_to(&self, session: &SessionContext) -> bool {
        match &self.user_id {
            NotificationTarget::All => true,
            NotificationTarget::Admin => session.is_admin(),
            NotificationTarget::Technician(t) => session.is_technician(t),
        }
    }
}
