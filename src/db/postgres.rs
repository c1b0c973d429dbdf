// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Postgres (Neon) access for reviews, admin stats and search analytics.
//!
//! Expected tables (managed outside this service):
//! - `reviews`: one row per signed-in review, owned by `user_id`
//! - `businesses`: moderation queue, `status = 'pending'` until approved
//! - `search_logs`: airport searches, `user_id` nullable

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

use crate::error::AppError;
use crate::models::review::STATUS_PUBLISHED;
use crate::models::stats::StatsParts;
use crate::models::{CategoryCount, Review, ReviewRow, ReviewUpdate, SearchLogEntry};

const MAX_CONNECTIONS: u32 = 5;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Postgres client.
#[derive(Clone)]
pub struct PgDb {
    pool: Option<PgPool>,
}

impl PgDb {
    /// Create a pool that connects on first use.
    pub fn new(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_lazy(database_url)
            .map_err(|e| AppError::Database(format!("Invalid DATABASE_URL: {}", e)))?;

        tracing::info!(max_connections = MAX_CONNECTIONS, "Postgres pool configured");

        Ok(Self { pool: Some(pool) })
    }

    /// Create a mock client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { pool: None }
    }

    /// Helper to get the pool or return an error if offline.
    fn pool(&self) -> Result<&PgPool, AppError> {
        self.pool
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    // ─── Review Operations ───────────────────────────────────────

    /// All reviews written by `user_id`, most recently touched first.
    pub async fn get_user_reviews(&self, user_id: &str) -> Result<Vec<ReviewRow>, AppError> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, business_type, business_id, user_id, user_email, category, rating,
                   comment, COALESCE(status, 'published') AS status, is_quick_log,
                   created_at, COALESCE(updated_at, created_at) AS updated_at
            FROM reviews
            WHERE user_id = $1
            ORDER BY COALESCE(updated_at, created_at) DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool()?)
        .await?;

        Ok(rows)
    }

    /// A single review by id, whoever wrote it.
    pub async fn get_review(&self, review_id: i64) -> Result<Option<ReviewRow>, AppError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r#"
            SELECT id, business_type, business_id, user_id, user_email, category, rating,
                   comment, COALESCE(status, 'published') AS status, is_quick_log,
                   created_at, COALESCE(updated_at, created_at) AS updated_at
            FROM reviews
            WHERE id = $1
            "#,
        )
        .bind(review_id)
        .fetch_optional(self.pool()?)
        .await?;

        Ok(row)
    }

    /// Apply an owner's edit. `None` when the row is absent or not theirs.
    pub async fn update_review(
        &self,
        review_id: i64,
        user_id: &str,
        update: &ReviewUpdate,
    ) -> Result<Option<ReviewRow>, AppError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r#"
            UPDATE reviews
            SET rating = COALESCE($3, rating),
                comment = COALESCE($4, comment),
                category = COALESCE($5, category),
                is_quick_log = COALESCE($6, is_quick_log),
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING id, business_type, business_id, user_id, user_email, category, rating,
                      comment, COALESCE(status, 'published') AS status, is_quick_log,
                      created_at, COALESCE(updated_at, created_at) AS updated_at
            "#,
        )
        .bind(review_id)
        .bind(user_id)
        .bind(update.rating.map(i32::from))
        .bind(update.comment.as_deref())
        .bind(update.category.as_deref())
        .bind(update.is_quick_log)
        .fetch_optional(self.pool()?)
        .await?;

        Ok(row)
    }

    /// Record a signed-in review so it shows up in history and stats.
    pub async fn insert_review(
        &self,
        review: &Review,
        user_id: &str,
        created_at: DateTime<Utc>,
    ) -> Result<ReviewRow, AppError> {
        let row = sqlx::query_as::<_, ReviewRow>(
            r#"
            INSERT INTO reviews
                (business_type, business_id, user_id, user_email, category, rating,
                 comment, status, is_quick_log, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, business_type, business_id, user_id, user_email, category, rating,
                      comment, COALESCE(status, 'published') AS status, is_quick_log,
                      created_at, COALESCE(updated_at, created_at) AS updated_at
            "#,
        )
        .bind(review.business_type.to_string())
        .bind(&review.business_id)
        .bind(user_id)
        .bind(review.user_email.as_deref())
        .bind(review.category.as_deref())
        .bind(i32::from(review.rating))
        .bind(review.comment.as_deref())
        .bind(STATUS_PUBLISHED)
        .bind(review.is_quick_log)
        .bind(created_at)
        .fetch_one(self.pool()?)
        .await?;

        Ok(row)
    }

    // ─── Admin Stats ─────────────────────────────────────────────

    /// Run the seven dashboard queries concurrently.
    ///
    /// Any single failure fails the whole aggregate.
    pub async fn get_admin_stats(&self) -> Result<StatsParts, AppError> {
        let pool = self.pool()?;

        let (
            total_reviews,
            total_businesses,
            unique_users,
            reviews_by_category,
            recent_reviews,
            pending_businesses,
            flagged_reviews,
        ) = tokio::try_join!(
            count(pool, "SELECT COUNT(*) FROM reviews"),
            count(pool, "SELECT COUNT(*) FROM businesses"),
            count(pool, "SELECT COUNT(DISTINCT user_id) FROM reviews"),
            sqlx::query_as::<_, CategoryCount>(
                r#"
                SELECT COALESCE(category, business_type) AS category, COUNT(*) AS count
                FROM reviews
                GROUP BY 1
                ORDER BY count DESC
                "#,
            )
            .fetch_all(pool),
            count(
                pool,
                "SELECT COUNT(*) FROM reviews WHERE created_at > now() - INTERVAL '7 days'",
            ),
            count(
                pool,
                "SELECT COUNT(*) FROM businesses WHERE status = 'pending'",
            ),
            count(pool, "SELECT COUNT(*) FROM reviews WHERE status = 'flagged'"),
        )?;

        Ok(StatsParts {
            total_reviews,
            total_businesses,
            unique_users,
            reviews_by_category,
            recent_reviews,
            pending_businesses,
            flagged_reviews,
        })
    }

    // ─── Search Analytics ────────────────────────────────────────

    /// Insert one search log row.
    pub async fn insert_search_log(&self, entry: &SearchLogEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO search_logs (user_id, airport_code, location_searched, category, searched_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.user_id.as_deref())
        .bind(&entry.airport_code)
        .bind(entry.location_searched.as_deref())
        .bind(entry.category.as_deref())
        .bind(entry.searched_at)
        .execute(self.pool()?)
        .await?;

        Ok(())
    }
}

async fn count(pool: &PgPool, sql: &'static str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await
}
