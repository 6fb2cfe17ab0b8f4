use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::controllers::report_controller::ReportController;
use crate::dto::report_dto::ReportQuery;
use crate::dto::ApiResponse;
use crate::models::report::UtilizationReport;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_report_router() -> Router<AppState> {
    Router::new().route("/utilization", get(utilization_report))
}

async fn utilization_report(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ApiResponse<UtilizationReport>>, AppError> {
    let controller = ReportController::new(&state);
    let report = controller.utilization(&query).await?;
    Ok(Json(ApiResponse::success(report)))
}
