// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Review records: the `reviews.json` collection and the Postgres `reviews` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::models::BusinessType;

/// Default status for reviews that have not been moderated.
pub const STATUS_PUBLISHED: &str = "published";

/// A review as stored in the `reviews.json` collection document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub business_type: BusinessType,
    pub business_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub is_quick_log: bool,
    #[serde(default)]
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_status() -> String {
    STATUS_PUBLISHED.to_string()
}

/// Payload for `POST /api/reviews/add`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub business_type: BusinessType,
    #[validate(length(min = 1, max = 64))]
    pub business_id: String,
    #[serde(default)]
    pub category: Option<String>,
    #[validate(range(min = 1, max = 5))]
    pub rating: u8,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub is_quick_log: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewReview {
    /// Build the collection record, stamping the caller's identity when known.
    pub fn into_review(
        self,
        user_id: Option<String>,
        user_email: Option<String>,
        created_at: String,
    ) -> Review {
        let mut extra = self.extra;
        for owned in ["id", "userId", "userEmail", "status", "createdAt", "updatedAt"] {
            extra.remove(owned);
        }

        Review {
            id: String::new(),
            business_type: self.business_type,
            business_id: self.business_id,
            user_id,
            user_email,
            category: self.category,
            rating: self.rating,
            comment: self.comment,
            status: default_status(),
            is_quick_log: self.is_quick_log,
            created_at,
            updated_at: None,
            extra,
        }
    }
}

/// Payload for `PUT /api/reviews/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewUpdate {
    #[validate(range(min = 1, max = 5))]
    #[serde(default)]
    pub rating: Option<u8>,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_quick_log: Option<bool>,
}

/// A row of the Postgres `reviews` table, with `status` and `updated_at`
/// already coalesced by the query.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ReviewRow {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: i64,
    pub business_type: String,
    pub business_id: String,
    pub user_id: String,
    pub user_email: Option<String>,
    pub category: Option<String>,
    pub rating: i32,
    pub comment: Option<String>,
    pub status: String,
    pub is_quick_log: bool,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: DateTime<Utc>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}
