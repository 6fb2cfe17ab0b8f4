use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Extension, Json, Router,
};

use crate::controllers::part_request_controller::PartRequestController;
use crate::dto::part_request_dto::{CreatePartRequestRequest, PartRequestListQuery};
use crate::dto::ApiResponse;
use crate::models::{PartRequest, SessionContext};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_part_request_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_part_requests).post(create_part_request))
        .route("/:id", delete(delete_part_request))
        .route("/:id/complete", post(complete_part_request))
}

async fn list_part_requests(
    State(state): State<AppState>,
    Query(query): Query<PartRequestListQuery>,
) -> Result<Json<ApiResponse<Vec<PartRequest>>>, AppError> {
    let controller = PartRequestController::new(&state);
    let requests = controller.list(&query).await?;
    Ok(Json(ApiResponse::success(requests)))
}

async fn create_part_request(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(request): Json<CreatePartRequestRequest>,
) -> Result<Json<ApiResponse<PartRequest>>, AppError> {
    let controller = PartRequestController::new(&state);
    let created = controller.create(&session, request).await?;
    Ok(Json(ApiResponse::success_with_message(
        created,
        "Pedido de peças registado".to_string(),
    )))
}

async fn complete_part_request(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PartRequest>>, AppError> {
    let controller = PartRequestController::new(&state);
    let completed = controller.complete(&session, &id).await?;
    Ok(Json(ApiResponse::success(completed)))
}

async fn delete_part_request(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = PartRequestController::new(&state);
    controller.delete(&session, &id).await?;
    Ok(Json(ApiResponse::message("Pedido eliminado".to_string())))
}
