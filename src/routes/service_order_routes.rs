use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use validator::Validate;

use crate::controllers::service_order_controller::ServiceOrderController;
use crate::dto::service_order_dto::{
    AssignOrderRequest, CreateServiceOrderRequest, MoveOrderRequest, OrderColumn, OrderTaskRequest,
    ServiceOrderListQuery, UpdateServiceOrderRequest,
};
use crate::dto::ApiResponse;
use crate::models::{ServiceOrder, SessionContext};
use crate::state::AppState;
use crate::utils::errors::AppError;

type OrderResponse = Result<Json<ApiResponse<ServiceOrder>>, AppError>;

pub fn create_service_order_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/board", get(order_board))
        .route("/:id", get(get_order).put(update_order).delete(delete_order))
        .route("/:id/move", post(move_order))
        .route("/:id/assign", post(assign_order))
        .route("/:id/tasks", post(add_task))
        .route("/:id/tasks/:index", put(toggle_task))
}

async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ServiceOrderListQuery>,
) -> Result<Json<ApiResponse<Vec<ServiceOrder>>>, AppError> {
    let controller = ServiceOrderController::new(&state);
    let orders = controller.list(&query).await?;
    Ok(Json(ApiResponse::success(orders)))
}

async fn order_board(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<OrderColumn>>>, AppError> {
    let controller = ServiceOrderController::new(&state);
    let board = controller.board().await?;
    Ok(Json(ApiResponse::success(board)))
}

async fn get_order(State(state): State<AppState>, Path(id): Path<String>) -> OrderResponse {
    let controller = ServiceOrderController::new(&state);
    let order = controller.get(&id).await?;
    Ok(Json(ApiResponse::success(order)))
}

async fn create_order(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(request): Json<CreateServiceOrderRequest>,
) -> OrderResponse {
    let controller = ServiceOrderController::new(&state);
    let order = controller.create(&session, request).await?;
    Ok(Json(ApiResponse::success_with_message(order, "O.S. criada".to_string())))
}

async fn update_order(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(request): Json<UpdateServiceOrderRequest>,
) -> OrderResponse {
    let controller = ServiceOrderController::new(&state);
    let order = controller.update(&session, &id, request).await?;
    Ok(Json(ApiResponse::success(order)))
}

async fn delete_order(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = ServiceOrderController::new(&state);
    controller.delete(&session, &id).await?;
    Ok(Json(ApiResponse::message("O.S. eliminada".to_string())))
}

async fn move_order(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(request): Json<MoveOrderRequest>,
) -> OrderResponse {
    let controller = ServiceOrderController::new(&state);
    let order = controller.move_to(&session, &id, request.status).await?;
    Ok(Json(ApiResponse::success(order)))
}

async fn assign_order(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(request): Json<AssignOrderRequest>,
) -> OrderResponse {
    request.validate()?;
    let controller = ServiceOrderController::new(&state);
    let order = controller.assign(&session, &id, &request.tecnico).await?;
    Ok(Json(ApiResponse::success(order)))
}

async fn add_task(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(request): Json<OrderTaskRequest>,
) -> OrderResponse {
    request.validate()?;
    let controller = ServiceOrderController::new(&state);
    let order = controller.add_task(&session, &id, &request.text).await?;
    Ok(Json(ApiResponse::success(order)))
}

async fn toggle_task(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path((id, index)): Path<(String, usize)>,
) -> OrderResponse {
    let controller = ServiceOrderController::new(&state);
    let order = controller.toggle_task(&session, &id, index).await?;
    Ok(Json(ApiResponse::success(order)))
}
