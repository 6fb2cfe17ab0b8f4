//! Middleware de autenticación JWT
//!
//! Extrae el bearer token, lo valida y deja la `SessionContext` en las
//! extensions del request. Los handlers la reciben con `Extension`.
//!
//! El token sólo vale mientras el utilizador siga activo y con el perfil
//! con que se abrió la sesión: logout o desactivación lo invalidan.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
    Extension,
};

use crate::models::SessionContext;
use crate::state::AppState;
use crate::utils::errors::{forbidden_error, AppError};

fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Middleware de autenticación: exige un token válido
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)
        .ok_or_else(|| AppError::Unauthorized("Token de autorização em falta".to_string()))?;
    let session = state.jwt.session_from_token(token)?;
    ensure_session_open(&state, &session).await?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

async fn ensure_session_open(state: &AppState, session: &SessionContext) -> Result<(), AppError> {
    let user = state
        .users()
        .find_by_id(&session.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Sessão inválida".to_string()))?;

    if !user.ativo {
        return Err(AppError::Forbidden("Utilizador inativo".to_string()));
    }
    if user.perfil != Some(session.role) || user.nome_tecnico != session.technician {
        return Err(AppError::Unauthorized("Sessão terminada".to_string()));
    }
    Ok(())
}

/// Middleware para verificar permisos de admin
pub async fn require_admin(
    Extension(session): Extension<SessionContext>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !session.is_admin() {
        return Err(forbidden_error(
            "access admin area",
            "administrator profile required",
        ));
    }

    Ok(next.run(request).await)
}

/// 403 cuando la capacidad requerida falta
pub fn ensure_allowed(allowed: bool, operation: &str) -> Result<(), AppError> {
    if allowed {
        Ok(())
    } else {
        Err(forbidden_error(operation, "missing permission for this profile"))
    }
}
