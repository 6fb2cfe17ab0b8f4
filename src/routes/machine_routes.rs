use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use validator::Validate;

use crate::controllers::machine_controller::MachineController;
use crate::dto::machine_dto::{
    AssignMachineRequest, AwaitingPartsRequest, CompleteMachineRequest, CreateMachineOutcome,
    CreateMachineRequest, MachineBoard, MoveMachineRequest, PriorityRequest, ReconditioningRequest,
    ReservationRequest, StartRentalRequest, TextRequest, UpdateMachineRequest,
};
use crate::dto::ApiResponse;
use crate::models::{Machine, SessionContext};
use crate::services::search_service::MachineFilters;
use crate::state::AppState;
use crate::utils::errors::AppError;

type MachineResponse = Result<Json<ApiResponse<Machine>>, AppError>;

pub fn create_machine_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_machines).post(create_machine))
        .route("/board", get(machine_board))
        .route("/:id", get(get_machine).put(update_machine).delete(delete_machine))
        .route("/:id/move", post(move_machine))
        .route("/:id/assign", post(assign_machine))
        .route("/:id/complete", post(complete_machine))
        .route("/:id/return-to-queue", post(return_to_queue))
        .route("/:id/confirm-return", post(confirm_return))
        .route("/:id/rental", post(start_rental))
        .route("/:id/tasks", post(add_task))
        .route("/:id/tasks/:index", put(toggle_task).delete(remove_task))
        .route("/:id/observations", post(add_observation))
        .route("/:id/priority", put(set_priority))
        .route("/:id/awaiting-parts", put(set_awaiting_parts))
        .route("/:id/reservation", put(set_reservation).delete(clear_reservation))
        .route("/:id/reconditioning", put(set_reconditioning))
}

async fn list_machines(
    State(state): State<AppState>,
    Query(filters): Query<MachineFilters>,
) -> Result<Json<ApiResponse<Vec<Machine>>>, AppError> {
    let controller = MachineController::new(&state);
    let machines = controller.list(&filters).await?;
    Ok(Json(ApiResponse::success(machines)))
}

async fn machine_board(
    State(state): State<AppState>,
    Query(filters): Query<MachineFilters>,
) -> Result<Json<ApiResponse<MachineBoard>>, AppError> {
    let controller = MachineController::new(&state);
    let board = controller.board(&filters).await?;
    Ok(Json(ApiResponse::success(board)))
}

async fn get_machine(State(state): State<AppState>, Path(id): Path<String>) -> MachineResponse {
    let controller = MachineController::new(&state);
    let machine = controller.get(&id).await?;
    Ok(Json(ApiResponse::success(machine)))
}

async fn create_machine(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Json(request): Json<CreateMachineRequest>,
) -> Result<Json<ApiResponse<CreateMachineOutcome>>, AppError> {
    let controller = MachineController::new(&state);
    let response = controller.create(&session, request).await?;
    Ok(Json(response))
}

async fn update_machine(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(request): Json<UpdateMachineRequest>,
) -> MachineResponse {
    let controller = MachineController::new(&state);
    let machine = controller.update(&session, &id, request).await?;
    Ok(Json(ApiResponse::success_with_message(machine, "Máquina atualizada".to_string())))
}

async fn delete_machine(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let controller = MachineController::new(&state);
    controller.delete(&session, &id).await?;
    Ok(Json(ApiResponse::message("Máquina eliminada".to_string())))
}

async fn move_machine(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(request): Json<MoveMachineRequest>,
) -> MachineResponse {
    request.validate()?;
    let controller = MachineController::new(&state);
    let machine = controller.move_to(&session, &id, &request.estado).await?;
    Ok(Json(ApiResponse::success(machine)))
}

async fn assign_machine(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(request): Json<AssignMachineRequest>,
) -> MachineResponse {
    request.validate()?;
    let controller = MachineController::new(&state);
    let machine = controller.assign(&session, &id, &request.tecnico).await?;
    Ok(Json(ApiResponse::success(machine)))
}

async fn complete_machine(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    request: Option<Json<CompleteMachineRequest>>,
) -> MachineResponse {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let controller = MachineController::new(&state);
    let machine = controller.complete(&session, &id, request.geral).await?;
    Ok(Json(ApiResponse::success(machine)))
}

async fn return_to_queue(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> MachineResponse {
    let controller = MachineController::new(&state);
    let machine = controller.return_to_queue(&session, &id).await?;
    Ok(Json(ApiResponse::success(machine)))
}

async fn confirm_return(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> MachineResponse {
    let controller = MachineController::new(&state);
    let machine = controller.confirm_return(&session, &id).await?;
    Ok(Json(ApiResponse::success_with_message(
        machine,
        "Regresso de aluguer confirmado".to_string(),
    )))
}

async fn start_rental(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    request: Option<Json<StartRentalRequest>>,
) -> MachineResponse {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let controller = MachineController::new(&state);
    let machine = controller.start_rental(&session, &id, request.data_inicio).await?;
    Ok(Json(ApiResponse::success(machine)))
}

async fn add_task(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(request): Json<TextRequest>,
) -> MachineResponse {
    request.validate()?;
    let controller = MachineController::new(&state);
    let machine = controller.add_task(&session, &id, &request.texto).await?;
    Ok(Json(ApiResponse::success(machine)))
}

async fn toggle_task(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path((id, index)): Path<(String, usize)>,
) -> MachineResponse {
    let controller = MachineController::new(&state);
    let machine = controller.toggle_task(&session, &id, index).await?;
    Ok(Json(ApiResponse::success(machine)))
}

async fn remove_task(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path((id, index)): Path<(String, usize)>,
) -> MachineResponse {
    let controller = MachineController::new(&state);
    let machine = controller.remove_task(&session, &id, index).await?;
    Ok(Json(ApiResponse::success(machine)))
}

async fn add_observation(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(request): Json<TextRequest>,
) -> MachineResponse {
    request.validate()?;
    let controller = MachineController::new(&state);
    let machine = controller.add_observation(&session, &id, &request.texto).await?;
    Ok(Json(ApiResponse::success(machine)))
}

async fn set_priority(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(request): Json<PriorityRequest>,
) -> MachineResponse {
    let controller = MachineController::new(&state);
    let machine = controller.set_priority(&session, &id, request.prioridade).await?;
    Ok(Json(ApiResponse::success(machine)))
}

async fn set_awaiting_parts(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(request): Json<AwaitingPartsRequest>,
) -> MachineResponse {
    let controller = MachineController::new(&state);
    let machine = controller
        .set_awaiting_parts(&session, &id, request.aguarda_pecas)
        .await?;
    Ok(Json(ApiResponse::success(machine)))
}

async fn set_reservation(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(request): Json<ReservationRequest>,
) -> MachineResponse {
    let controller = MachineController::new(&state);
    let machine = controller.set_reservation(&session, &id, request).await?;
    Ok(Json(ApiResponse::success(machine)))
}

async fn clear_reservation(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> MachineResponse {
    let controller = MachineController::new(&state);
    let machine = controller.clear_reservation(&session, &id).await?;
    Ok(Json(ApiResponse::success(machine)))
}

async fn set_reconditioning(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
    Json(request): Json<ReconditioningRequest>,
) -> MachineResponse {
    let controller = MachineController::new(&state);
    let machine = controller.set_reconditioning(&session, &id, request).await?;
    Ok(Json(ApiResponse::success(machine)))
}
