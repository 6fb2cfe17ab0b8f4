use axum::{
    extract::{DefaultBodyLimit, State},
    routing::post,
    Json, Router,
};

use crate::controllers::extraction_controller::ExtractionController;
use crate::dto::extraction_dto::{ExtractionResponse, ImageExtractionRequest, TextExtractionRequest};
use crate::dto::ApiResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Las fotos llegan en base64 dentro del JSON; el límite por defecto de axum no llega
pub fn create_extraction_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/image", post(extract_from_image))
        .route("/text", post(extract_from_text))
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
}

async fn extract_from_image(
    State(state): State<AppState>,
    Json(request): Json<ImageExtractionRequest>,
) -> Result<Json<ApiResponse<ExtractionResponse>>, AppError> {
    let controller = ExtractionController::new(&state);
    let response = controller.from_image(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn extract_from_text(
    State(state): State<AppState>,
    Json(request): Json<TextExtractionRequest>,
) -> Result<Json<ApiResponse<ExtractionResponse>>, AppError> {
    let controller = ExtractionController::new(&state);
    let response = controller.from_text(request).await?;
    Ok(Json(ApiResponse::success(response)))
}
