//! HTTP request handlers.

use super::AppState;
use crate::history::{normalize_with, report, HistoryStore};
use crate::store::{to_pretty_json, StoreError};

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;

/// Load the history and normalize it at the current instant, without writing back.
fn current_history(state: &AppState) -> Result<HistoryStore, StoreError> {
    let stored = state.file.load()?;
    Ok(normalize_with(&stored, Utc::now(), &state.config.retention)?)
}

fn internal_error(e: impl std::fmt::Display) -> Response {
    tracing::error!("Request failed: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
}

// ============================================================================
// History
// ============================================================================

pub async fn handle_data(State(state): State<AppState>) -> Response {
    let history = match current_history(&state) {
        Ok(h) => h,
        Err(e) => return internal_error(e),
    };

    match to_pretty_json(&history) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => internal_error(e),
    }
}

// ============================================================================
// API: Targets
// ============================================================================

pub async fn handle_get_targets(State(state): State<AppState>) -> Response {
    match state.file.load() {
        Ok(history) => Json(history.keys().cloned().collect::<Vec<_>>()).into_response(),
        Err(e) => internal_error(e),
    }
}

pub async fn handle_target_status(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    let history = match current_history(&state) {
        Ok(h) => h,
        Err(e) => return internal_error(e),
    };

    match history.get(&name) {
        Some(record) => Json(report(&name, record)).into_response(),
        None => (StatusCode::NOT_FOUND, format!("unknown target: {}", name)).into_response(),
    }
}
