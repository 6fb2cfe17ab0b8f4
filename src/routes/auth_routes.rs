use axum::{
    extract::State,
    middleware::from_fn_with_state,
    routing::{get, post},
    Extension, Json, Router,
};

use crate::controllers::auth_controller::AuthController;
use crate::dto::auth_dto::{LoginResponse, ProfileLoginRequest, SessionResponse};
use crate::dto::ApiResponse;
use crate::middleware::{rate_limit_middleware, require_session};
use crate::models::SessionContext;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Rutas de sesión: `/profile` es pública (con rate limit), el resto exige token
pub fn create_auth_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(me))
        .route("/logout", post(logout))
        .route_layer(from_fn_with_state(state.clone(), require_session))
        .route(
            "/profile",
            post(login).layer(from_fn_with_state(state.clone(), rate_limit_middleware)),
        )
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<ProfileLoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let controller = AuthController::new(&state);
    let response = controller.login(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = AuthController::new(&state);
    controller.logout(&session).await?;
    Ok(Json(ApiResponse::message("Sessão terminada".to_string())))
}

async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Json<ApiResponse<SessionResponse>> {
    let controller = AuthController::new(&state);
    Json(ApiResponse::success(controller.me(session)))
}
