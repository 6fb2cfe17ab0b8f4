//! Modelo de Utilizador (`User`)
//!
//! Los campos siguen el formato snake_case del backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::auth::Role;
use crate::clients::Collection;
use crate::repositories::Entity;
use crate::utils::dates;

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub perfil: Option<Role>,
    #[serde(default)]
    pub nome_tecnico: Option<String>,
    #[serde(default = "default_active")]
    pub ativo: bool,
    #[serde(default, with = "dates::option_flexible")]
    pub ultimo_acesso: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
}

impl Entity for User {
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> &str {
        &self.id
    }
}

impl User {
    pub fn new(email: &str, full_name: Option<String>) -> Self {
        Self {
            id: String::new(),
            email: email.trim().to_lowercase(),
            full_name,
            perfil: None,
            nome_tecnico: None,
            ativo: true,
            ultimo_acesso: None,
            created_date: None,
        }
    }

    /// Nombre para mostrar: nombre completo o email
    pub fn display_name(&self) -> String {
        self.full_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| self.email.clone())
    }
}
