use std::sync::Arc;

use crate::dto::auth_dto::{LoginResponse, ProfileLoginRequest, SessionResponse};
use crate::models::SessionContext;
use crate::services::AuthService;
use crate::state::AppState;
use crate::utils::errors::AppResult;

/// Controlador de sesiones por perfil
pub struct AuthController {
    service: AuthService,
}

impl AuthController {
    pub fn new(state: &AppState) -> Self {
        Self {
            service: AuthService::new(state.users(), Arc::clone(&state.jwt), Arc::clone(&state.config)),
        }
    }

    pub async fn login(&self, request: ProfileLoginRequest) -> AppResult<LoginResponse> {
        self.service.login(request).await
    }

    pub async fn logout(&self, session: &SessionContext) -> AppResult<()> {
        self.service.logout(session).await
    }

    pub fn me(&self, session: SessionContext) -> SessionResponse {
        self.service.me(session)
    }
}
