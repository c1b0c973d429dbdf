// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Admin dashboard aggregates.
//!
//! Each count comes from its own query; the queries run concurrently and
//! are assembled here once all of them have completed.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::services::search_log::SearchLogMetrics;

/// Review count for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CategoryCount {
    pub category: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub count: i64,
}

/// Aggregate statistics returned by `GET /api/admin/stats`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AdminStats {
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_reviews: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub total_businesses: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub unique_users: i64,
    /// Ordered by count, highest first
    pub reviews_by_category: Vec<CategoryCount>,
    /// Reviews created in the last 7 days
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub recent_reviews: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub pending_businesses: i64,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub flagged_reviews: i64,
    /// Delivery counters of the search log queue
    #[cfg_attr(feature = "binding-generation", ts(skip))]
    pub search_logging: Option<SearchLogMetrics>,
}

/// Raw results of the seven stats queries.
#[derive(Debug, Clone, Default)]
pub struct StatsParts {
    pub total_reviews: i64,
    pub total_businesses: i64,
    pub unique_users: i64,
    pub reviews_by_category: Vec<CategoryCount>,
    pub recent_reviews: i64,
    pub pending_businesses: i64,
    pub flagged_reviews: i64,
}

impl AdminStats {
    /// Assemble the summary. The category breakdown is re-sorted so the
    /// ordering holds regardless of what the database returned; ties are
    /// broken by name.
    pub fn from_parts(parts: StatsParts) -> Self {
        let mut reviews_by_category = parts.reviews_by_category;
        reviews_by_category.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.category.cmp(&b.category))
        });

        Self {
            total_reviews: parts.total_reviews,
            total_businesses: parts.total_businesses,
            unique_users: parts.unique_users,
            reviews_by_category,
            recent_reviews: parts.recent_reviews,
            pending_businesses: parts.pending_businesses,
            flagged_reviews: parts.flagged_reviews,
            search_logging: None,
        }
    }
}
