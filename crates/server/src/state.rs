use std::sync::Arc;

use axum::http::StatusCode;
use axum::Json;
use library::{Catalog, Synchronizer};
use serde::{Deserialize, Serialize};

use crate::tasks::{TaskRecord, TaskRunner};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub sync: Synchronizer,
    pub tasks: TaskRunner,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct TasksResponse {
    pub running: usize,
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshQuery {
    pub force: Option<bool>,
}

pub type JsonResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;
