use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    Json,
};
use common::{Identifier, Library};
use library::CatalogError;

use crate::state::{AppState, ErrorResponse, JsonResult, RefreshQuery, StatusResponse, TasksResponse};
use crate::tasks::TaskKind;
use crate::utils::json_error;

pub async fn list_tasks(State(state): State<AppState>) -> Json<TasksResponse> {
    Json(TasksResponse {
        running: state.tasks.running(),
        tasks: state.tasks.records(),
    })
}

pub async fn scan_all(State(state): State<AppState>) -> JsonResult<StatusResponse> {
    let libraries = all_libraries(&state)?;
    for library in &libraries {
        enqueue(&state, TaskKind::Scan, library, false);
    }
    Ok(status(format!("Scanning {} libraries", libraries.len())))
}

pub async fn scan_library(
    State(state): State<AppState>,
    AxumPath(library): AxumPath<String>,
) -> JsonResult<StatusResponse> {
    let library = find_library(&state, &library)?;
    enqueue(&state, TaskKind::Scan, &library, false);
    Ok(status(format!("Scanning library '{}'", library.slug)))
}

pub async fn clean_all(State(state): State<AppState>) -> JsonResult<StatusResponse> {
    let libraries = all_libraries(&state)?;
    for library in &libraries {
        enqueue(&state, TaskKind::Clean, library, false);
    }
    Ok(status(format!("Cleaning {} libraries", libraries.len())))
}

pub async fn clean_library(
    State(state): State<AppState>,
    AxumPath(library): AxumPath<String>,
) -> JsonResult<StatusResponse> {
    let library = find_library(&state, &library)?;
    enqueue(&state, TaskKind::Clean, &library, false);
    Ok(status(format!("Cleaning library '{}'", library.slug)))
}

pub async fn refresh_all(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> JsonResult<StatusResponse> {
    let force = query.force.unwrap_or(false);
    let libraries = all_libraries(&state)?;
    for library in &libraries {
        enqueue(&state, TaskKind::RefreshMetadata, library, force);
    }
    Ok(status(format!(
        "Refreshing metadata of {} libraries",
        libraries.len()
    )))
}

pub async fn refresh_library(
    State(state): State<AppState>,
    AxumPath(library): AxumPath<String>,
    Query(query): Query<RefreshQuery>,
) -> JsonResult<StatusResponse> {
    let library = find_library(&state, &library)?;
    enqueue(
        &state,
        TaskKind::RefreshMetadata,
        &library,
        query.force.unwrap_or(false),
    );
    Ok(status(format!(
        "Refreshing metadata of library '{}'",
        library.slug
    )))
}

fn enqueue(state: &AppState, kind: TaskKind, library: &Library, force: bool) -> String {
    let sync = state.sync.clone();
    let target = library.clone();
    state.tasks.submit(kind, &library.slug, move || {
        let outcome = match kind {
            TaskKind::Scan => sync
                .register_new_files(&target)
                .map(|files| format!("registered {} files", files.len())),
            TaskKind::Clean => sync
                .unregister_unavailable_files(&target)
                .map(|files| format!("removed {} files", files.len())),
            TaskKind::RefreshMetadata => sync
                .resync_all_metadata(&target, force)
                .map(|files| format!("refreshed {} files", files.len())),
        };
        outcome.map_err(|err| err.to_string())
    })
}

fn all_libraries(state: &AppState) -> Result<Vec<Library>, (StatusCode, Json<ErrorResponse>)> {
    state.catalog.list_libraries().map_err(|err| {
        json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("library error: {}", err),
        )
    })
}

fn find_library(state: &AppState, value: &str) -> Result<Library, (StatusCode, Json<ErrorResponse>)> {
    match state.catalog.get_library(&Identifier::parse(value)) {
        Ok(library) => Ok(library),
        Err(CatalogError::NotFound { .. }) => Err(json_error(
            StatusCode::NOT_FOUND,
            format!("library '{}' not found", value),
        )),
        Err(err) => Err(json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("library error: {}", err),
        )),
    }
}

fn status(message: String) -> Json<StatusResponse> {
    Json(StatusResponse { status: message })
}
