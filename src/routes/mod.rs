//! Rutas HTTP
//!
//! `/health` y `/api/auth/profile` son públicas; todo lo demás bajo `/api`
//! pasa por `require_session`, y backup, informes y usuarios además por
//! `require_admin`.

pub mod auth_routes;
pub mod backup_routes;
pub mod extraction_routes;
pub mod machine_routes;
pub mod notification_routes;
pub mod part_request_routes;
pub mod report_routes;
pub mod service_order_routes;
pub mod user_routes;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::middleware::{require_admin, require_session};
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let admin = Router::new()
        .nest("/api/backup", backup_routes::create_backup_router(&state))
        .nest("/api/reports", report_routes::create_report_router())
        .nest("/api/users", user_routes::create_user_router())
        .route_layer(from_fn(require_admin));

    let protected = Router::new()
        .nest("/api/machines", machine_routes::create_machine_router())
        .nest("/api/service-orders", service_order_routes::create_service_order_router())
        .nest("/api/part-requests", part_request_routes::create_part_request_router())
        .nest("/api/notifications", notification_routes::create_notification_router())
        .nest("/api/extraction", extraction_routes::create_extraction_router(&state))
        .merge(admin)
        .route_layer(from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes::create_auth_router(&state))
        .merge(protected)
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
