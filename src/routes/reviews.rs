// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Review routes: the public `reviews.json` collection and the caller's own
//! relational review history.

use crate::db::collections;
use crate::error::{AppError, Result};
use crate::middleware::auth::{AuthUser, CallerIdentity};
use crate::models::{BusinessType, NewReview, Review, ReviewRow, ReviewUpdate};
use crate::routes::businesses::validate_record_id;
use crate::services::access::Capabilities;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use validator::Validate;

/// Routes that resolve identity but don't require it.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reviews/add", post(add_review))
        // The first segment is shared with the owner routes below, so it
        // carries the same parameter name.
        .route("/api/reviews/{id}/{business_id}", get(business_reviews))
}

/// Routes that must sit behind `require_auth`.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/reviews/{id}/expand", get(expand_review))
        .route("/api/reviews/{id}", axum::routing::put(update_review))
        .route("/api/user/reviews", get(user_reviews))
}

#[derive(Serialize)]
pub struct AddReviewResponse {
    pub success: bool,
    pub review: Review,
}

#[derive(Serialize)]
pub struct UserReviewsResponse {
    pub reviews: Vec<ReviewRow>,
}

/// Published reviews for one business, newest first. Reviewer emails are
/// not exposed on this public listing.
async fn business_reviews(
    State(state): State<Arc<AppState>>,
    Path((business_type, business_id)): Path<(String, String)>,
) -> Result<Json<Vec<Review>>> {
    let business_type: BusinessType = business_type.parse().map_err(AppError::BadRequest)?;
    validate_record_id(&business_id)?;

    let collection = state.collections.load::<Review>(collections::REVIEWS).await?;
    Ok(Json(reviews_for(collection.records, business_type, &business_id)))
}

pub(crate) fn reviews_for(
    reviews: Vec<Review>,
    business_type: BusinessType,
    business_id: &str,
) -> Vec<Review> {
    let mut matching: Vec<Review> = reviews
        .into_iter()
        .filter(|r| r.business_type == business_type && r.business_id == business_id)
        .map(|mut r| {
            r.user_email = None;
            r
        })
        .collect();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    matching
}

/// Append a review. Signed-in reviews are also recorded in Postgres so they
/// appear in the author's history and the admin stats.
async fn add_review(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<CallerIdentity>,
    body: std::result::Result<Json<NewReview>, JsonRejection>,
) -> Result<(StatusCode, Json<AddReviewResponse>)> {
    let Json(payload) = body?;
    payload.validate()?;

    let now = chrono::Utc::now();
    let identity = caller.0;
    let review = payload.into_review(
        identity.as_ref().map(|i| i.user_id.clone()),
        identity.as_ref().and_then(|i| i.email.clone()),
        format_utc_rfc3339(now),
    );

    let added = state.collections.add(collections::REVIEWS, review).await?;
    tracing::info!(
        review_id = %added.id,
        business_type = %added.business_type,
        business_id = %added.business_id,
        signed_in = identity.is_some(),
        "Review added"
    );

    if let Some(identity) = identity {
        // The collection write already succeeded; a history miss is logged
        // rather than failing the request.
        if let Err(e) = state.db.insert_review(&added, &identity.user_id, now).await {
            tracing::error!(
                error = %e,
                review_id = %added.id,
                user_id = %identity.user_id,
                "Failed to record review history"
            );
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(AddReviewResponse {
            success: true,
            review: added,
        }),
    ))
}

fn parse_review_id(id: &str) -> Result<i64> {
    id.parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid review id: {id}")))
}

/// The row, if `caller` owns it. Someone else's review is reported as absent.
fn owned_review(
    caller: &impl Capabilities,
    row: Option<ReviewRow>,
    review_id: i64,
) -> Result<ReviewRow> {
    row.filter(|r| caller.is_owner(&r.user_id))
        .ok_or_else(|| AppError::NotFound(format!("Review {review_id} not found")))
}

/// One of the caller's own reviews.
async fn expand_review(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<ReviewRow>> {
    let review_id = parse_review_id(&id)?;
    let row = state.db.get_review(review_id).await?;
    Ok(Json(owned_review(&user.grants(), row, review_id)?))
}

/// Owner edit of rating, comment, category or quick-log flag.
async fn update_review(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    body: std::result::Result<Json<ReviewUpdate>, JsonRejection>,
) -> Result<Json<ReviewRow>> {
    let review_id = parse_review_id(&id)?;
    let Json(update) = body?;
    update.validate()?;

    let existing = state.db.get_review(review_id).await?;
    owned_review(&user.grants(), existing, review_id)?;

    // The update stays scoped to the owner in case the row changed hands
    // between the two queries.
    let row = state
        .db
        .update_review(review_id, &user.user_id, &update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Review {review_id} not found")))?;

    tracing::info!(review_id, user_id = %user.user_id, "Review updated");
    Ok(Json(row))
}

/// The caller's review history.
async fn user_reviews(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserReviewsResponse>> {
    let reviews = state.db.get_user_reviews(&user.user_id).await?;
    Ok(Json(UserReviewsResponse { reviews }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::access::Grants;
    use serde_json::Map;

    fn review(id: &str, business_type: BusinessType, business_id: &str, created_at: &str) -> Review {
        Review {
            id: id.to_string(),
            business_type,
            business_id: business_id.to_string(),
            user_id: Some("user_1".to_string()),
            user_email: Some("pilot@example.com".to_string()),
            category: None,
            rating: 4,
            comment: None,
            status: "published".to_string(),
            is_quick_log: false,
            created_at: created_at.to_string(),
            updated_at: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_reviews_for_filters_and_sorts() {
        let all = vec![
            review("1", BusinessType::Hotel, "100", "2024-06-01T00:00:00.000Z"),
            review("2", BusinessType::Restaurant, "100", "2024-06-02T00:00:00.000Z"),
            review("3", BusinessType::Hotel, "100", "2024-06-03T00:00:00.000Z"),
            review("4", BusinessType::Hotel, "200", "2024-06-04T00:00:00.000Z"),
        ];

        let matching = reviews_for(all, BusinessType::Hotel, "100");
        let ids: Vec<&str> = matching.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
        assert!(matching.iter().all(|r| r.user_email.is_none()));
    }

    fn row(id: i64, user_id: &str) -> ReviewRow {
        let at = chrono::DateTime::parse_from_rfc3339("2024-06-10T06:13:20Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        ReviewRow {
            id,
            business_type: "hotel".to_string(),
            business_id: "100".to_string(),
            user_id: user_id.to_string(),
            user_email: None,
            category: None,
            rating: 4,
            comment: None,
            status: "published".to_string(),
            is_quick_log: false,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_owned_review_hides_other_owners() {
        let owner = Grants::signed_in("user_1");
        assert_eq!(owned_review(&owner, Some(row(7, "user_1")), 7).unwrap().id, 7);
        assert!(matches!(
            owned_review(&owner, Some(row(7, "user_2")), 7),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            owned_review(&owner, None, 7),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_parse_review_id() {
        assert_eq!(parse_review_id("42").unwrap(), 42);
        assert!(matches!(
            parse_review_id("forty-two"),
            Err(AppError::BadRequest(_))
        ));
    }
}
