//! Servicio de autenticación
//!
//! Selección de perfil: la contraseña del perfil (admin o técnico) se
//! verifica con bcrypt contra la tabla configurada, el usuario se busca o se
//! crea por email y se emite un JWT con la sesión.

use bcrypt::verify;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use validator::Validate;

use crate::config::{EnvironmentConfig, ADMIN_PROFILE_KEY};
use crate::dto::auth_dto::{LoginResponse, ProfileLoginRequest, SessionResponse};
use crate::models::{Role, SessionContext, User};
use crate::repositories::UserRepository;
use crate::services::jwt_service::JwtService;
use crate::services::permission_service::permissions_for;
use crate::utils::errors::{AppError, AppResult};

pub struct AuthService {
    users: UserRepository,
    jwt: Arc<JwtService>,
    config: Arc<EnvironmentConfig>,
}

impl AuthService {
    pub fn new(users: UserRepository, jwt: Arc<JwtService>, config: Arc<EnvironmentConfig>) -> Self {
        Self { users, jwt, config }
    }

    /// Clave del perfil en la tabla de contraseñas
    fn profile_key(&self, request: &ProfileLoginRequest) -> AppResult<(String, Option<String>)> {
        match request.perfil {
            Role::Admin => Ok((ADMIN_PROFILE_KEY.to_string(), None)),
            Role::Tecnico => {
                let technician = request
                    .nome_tecnico
                    .as_deref()
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| AppError::BadRequest("nomeTecnico é obrigatório para o perfil técnico".to_string()))?;
                if !self.config.technicians.is_empty() && !self.config.is_known_technician(&technician) {
                    return Err(AppError::BadRequest(format!("Técnico '{}' desconhecido", technician)));
                }
                Ok((technician.clone(), Some(technician)))
            }
        }
    }

    /// Autentica el perfil y abre la sesión
    pub async fn login(&self, request: ProfileLoginRequest) -> AppResult<LoginResponse> {
        request.validate()?;
        let (key, technician) = self.profile_key(&request)?;

        let hash = self.config.profile_passwords.get(&key).ok_or_else(|| {
            warn!("🔒 Perfil '{}' sem palavra-passe configurada", key);
            AppError::Unauthorized("Credenciais inválidas".to_string())
        })?;
        if !verify(&request.password, hash)? {
            warn!("🔒 Palavra-passe errada para o perfil '{}'", key);
            return Err(AppError::Unauthorized("Credenciais inválidas".to_string()));
        }

        let full_name = request
            .nome_completo
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        let user = match self.users.find_by_email(&request.email).await? {
            Some(user) => user,
            None => {
                info!("👤 Novo utilizador {}", request.email);
                self.users.create(&User::new(&request.email, full_name.clone())).await?
            }
        };
        if !user.ativo {
            return Err(AppError::Forbidden("Utilizador inativo".to_string()));
        }

        let mut patch = json!({
            "perfil": request.perfil,
            "nome_tecnico": technician,
            "ultimo_acesso": Utc::now().to_rfc3339(),
        });
        if let Some(name) = &full_name {
            patch["full_name"] = json!(name);
        }
        let user = self.users.update(&user.id, patch).await?;

        let session = SessionContext {
            user_id: user.id.clone(),
            email: user.email.clone(),
            role: request.perfil,
            technician,
            display_name: user.display_name(),
        };
        let token = self.jwt.generate_access_token(&session)?;
        info!("✅ Sessão aberta: {} como {}", session.email, key);

        Ok(LoginResponse {
            token,
            expires_in: self.jwt.expires_in(),
            permissoes: permissions_for(&session),
            sessao: session,
        })
    }

    /// Limpia el perfil elegido
    pub async fn logout(&self, session: &SessionContext) -> AppResult<()> {
        self.users
            .update(&session.user_id, json!({ "perfil": null, "nome_tecnico": null }))
            .await?;
        info!("👋 Sessão terminada: {}", session.email);
        Ok(())
    }

    pub fn me(&self, session: SessionContext) -> SessionResponse {
        SessionResponse {
            permissoes: permissions_for(&session),
            sessao: session,
        }
    }
}
