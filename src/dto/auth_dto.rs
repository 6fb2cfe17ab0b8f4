use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{Permissions, Role, SessionContext};

// Selección de perfil
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileLoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(max = 120))]
    pub nome_completo: Option<String>,
    pub perfil: Role,
    #[validate(custom = "crate::utils::validation::validate_technician_id")]
    pub nome_tecnico: Option<String>,
    #[validate(length(min = 1))]
    pub password: String,
}

// Login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub sessao: SessionContext,
    pub permissoes: Permissions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub sessao: SessionContext,
    pub permissoes: Permissions,
}
