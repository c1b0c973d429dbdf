// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Search analytics records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Payload for `POST /api/search/log`. Every field is optional so a
/// malformed client never turns analytics into an error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLogRequest {
    #[serde(default)]
    pub airport_code: Option<String>,
    #[serde(default)]
    pub location_searched: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// A row destined for the `search_logs` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLogEntry {
    pub user_id: Option<String>,
    pub airport_code: String,
    pub location_searched: Option<String>,
    pub category: Option<String>,
    pub searched_at: DateTime<Utc>,
}

impl SearchLogEntry {
    pub fn from_request(
        request: SearchLogRequest,
        user_id: Option<String>,
        searched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            airport_code: request
                .airport_code
                .map(|c| c.trim().to_ascii_uppercase())
                .unwrap_or_default(),
            location_searched: request.location_searched,
            category: request.category,
            searched_at,
        }
    }
}
