pub mod tasks;

use axum::{routing::get, Json, Router};

use crate::state::{AppState, HealthResponse};

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/tasks", get(tasks::list_tasks))
        .route("/tasks/scan", get(tasks::scan_all))
        .route("/tasks/scan/:library", get(tasks::scan_library))
        .route("/tasks/clean", get(tasks::clean_all))
        .route("/tasks/clean/:library", get(tasks::clean_library))
        .route("/tasks/refresh-metadata", get(tasks::refresh_all))
        .route("/tasks/refresh-metadata/:library", get(tasks::refresh_library))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
