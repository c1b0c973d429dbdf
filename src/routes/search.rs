// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Airport lookup and search analytics routes.

use crate::middleware::auth::CallerIdentity;
use crate::models::{Airport, SearchLogEntry, SearchLogRequest};
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/airports", get(search_airports))
        .route("/api/search/log", post(log_search))
}

#[derive(Debug, Deserialize)]
pub struct AirportQuery {
    #[serde(default)]
    pub q: Option<String>,
}

#[derive(Serialize)]
pub struct SearchLogResponse {
    pub success: bool,
}

/// Airports matching `q`, at most ten.
async fn search_airports(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AirportQuery>,
) -> Json<Vec<Airport>> {
    Json(state.airports.search(query.q.as_deref().unwrap_or("")))
}

/// Record a search for analytics.
///
/// The body is parsed leniently and delivery happens in the background, so
/// this always reports success.
async fn log_search(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    body: Bytes,
) -> Json<SearchLogResponse> {
    let request: SearchLogRequest = serde_json::from_slice(&body).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Unparseable search log body");
        SearchLogRequest::default()
    });

    let entry = SearchLogEntry::from_request(
        request,
        caller.user_id().map(str::to_string),
        chrono::Utc::now(),
    );

    if entry.airport_code.is_empty() {
        tracing::debug!("Search log without airport code ignored");
    } else {
        // Drops are counted and logged by the queue.
        state.search_log.enqueue(entry);
    }

    Json(SearchLogResponse { success: true })
}
