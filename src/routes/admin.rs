// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin dashboard routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::CallerIdentity;
use crate::models::AdminStats;
use crate::services::AccessDecision;
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/stats", get(get_stats))
        .route("/api/admin/auth", get(check_auth))
}

#[derive(Serialize)]
pub struct AdminAuthResponse {
    pub authenticated: bool,
}

/// Site-wide review and business counts plus search log delivery counters.
async fn get_stats(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
) -> Result<Json<AdminStats>> {
    let decision = state
        .access
        .check_admin(&state.identity, caller.0.as_ref())
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("admin check failed: {e}")))?;

    match decision {
        AccessDecision::NotAuthenticated => return Err(AppError::Unauthorized),
        AccessDecision::NotAdmin => {
            return Err(AppError::Forbidden("Admin access required".to_string()))
        }
        AccessDecision::Admin(grants) => {
            tracing::info!(user_id = %grants.user_id, "Admin stats requested");
        }
    }

    let parts = state.db.get_admin_stats().await?;
    let mut stats = AdminStats::from_parts(parts);
    stats.search_logging = Some(state.search_log.metrics());

    Ok(Json(stats))
}

/// Whether the caller holds admin capability.
async fn check_auth(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
) -> Json<AdminAuthResponse> {
    let authenticated = state
        .access
        .is_authorized(&state.identity, caller.0.as_ref())
        .await;
    Json(AdminAuthResponse { authenticated })
}
