use axum::{
    extract::{Path, State},
    routing::{get, put},
    Extension, Json, Router,
};

use crate::controllers::user_controller::UserController;
use crate::dto::user_dto::UpdateUserRequest;
use crate::dto::ApiResponse;
use crate::models::{SessionContext, User};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_user_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", put(update_user).patch(update_user))
}

async fn list_users(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<User>>>, AppError> {
    let controller = UserController::new(&state);
    let users = controller.list().await?;
    Ok(Json(ApiResponse::success(users)))
}

async fn update_user(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<User>>, AppError> {
    let controller = UserController::new(&state);
    let user = controller.set_active(&session, &id, request.ativo).await?;
    Ok(Json(ApiResponse::success(user)))
}
