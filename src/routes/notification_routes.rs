use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Extension, Json, Router,
};
use futures::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tracing::{info, warn};

use crate::controllers::notification_controller::NotificationController;
use crate::dto::notification_dto::NotificationListQuery;
use crate::dto::{ApiResponse, CountResponse};
use crate::models::{Notification, SessionContext};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_notification_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/stream", get(stream_notifications))
        .route("/read-all", post(mark_all_read))
        .route("/:id/read", post(mark_read))
}

async fn list_notifications(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Query(query): Query<NotificationListQuery>,
) -> Result<Json<ApiResponse<Vec<Notification>>>, AppError> {
    let controller = NotificationController::new(&state);
    let notifications = controller.list(&session, &query).await?;
    Ok(Json(ApiResponse::success(notifications)))
}

async fn unread_count(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<ApiResponse<CountResponse>>, AppError> {
    let controller = NotificationController::new(&state);
    let count = controller.unread_count(&session).await?;
    Ok(Json(ApiResponse::success(CountResponse { count })))
}

async fn mark_read(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Notification>>, AppError> {
    let controller = NotificationController::new(&state);
    let notification = controller.mark_read(&session, &id).await?;
    Ok(Json(ApiResponse::success(notification)))
}

async fn mark_all_read(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<ApiResponse<CountResponse>>, AppError> {
    let controller = NotificationController::new(&state);
    let count = controller.mark_all_read(&session).await?;
    Ok(Json(ApiResponse::success(CountResponse { count })))
}

/// Server-Sent Events con las notificaciones visibles para la sesión
async fn stream_notifications(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("📡 Visor de notificações ligado: {}", session.email);
    let controller = NotificationController::new(&state);
    let events = controller.stream(session).map(|notification| {
        let event = Event::default()
            .event("notificacao")
            .id(notification.id.clone())
            .json_data(&notification)
            .unwrap_or_else(|e| {
                warn!("⚠️ Notificação {} não serializável: {}", notification.id, e);
                Event::default().comment("notificação ilegível")
            });
        Ok(event)
    });
    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
