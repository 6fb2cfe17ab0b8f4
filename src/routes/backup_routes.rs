use axum::{
    extract::{DefaultBodyLimit, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::Utc;

use crate::controllers::backup_controller::BackupController;
use crate::dto::ApiResponse;
use crate::models::backup::{BackupDocument, ImportSummary};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_backup_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/json", get(export_json).post(import_json))
        .route("/csv", get(export_csv).post(import_csv))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
}

async fn export_json(State(state): State<AppState>) -> Result<Json<BackupDocument>, AppError> {
    let controller = BackupController::new(&state);
    Ok(Json(controller.export_json().await?))
}

async fn import_json(
    State(state): State<AppState>,
    Json(document): Json<BackupDocument>,
) -> Result<Json<ApiResponse<ImportSummary>>, AppError> {
    let controller = BackupController::new(&state);
    let summary = controller.import_json(document).await?;
    Ok(Json(ApiResponse::success_with_message(
        summary,
        "Cópia de segurança restaurada".to_string(),
    )))
}

async fn export_csv(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let controller = BackupController::new(&state);
    let body = controller.export_csv().await?;
    let disposition = format!(
        "attachment; filename=\"maquinas_{}.csv\"",
        Utc::now().format("%Y%m%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

async fn import_csv(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<ApiResponse<ImportSummary>>, AppError> {
    let controller = BackupController::new(&state);
    let summary = controller.import_csv(&body).await?;
    Ok(Json(ApiResponse::success(summary)))
}
