// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Business collection routes: list, get and add for each business type.

use crate::error::{AppError, Result};
use crate::models::{Business, BusinessType, NewBusiness};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use validator::Validate;

/// `/api/{hotels,restaurants,rentals,fbos}` routes, registered per type.
pub fn routes() -> Router<Arc<AppState>> {
    BusinessType::ALL
        .into_iter()
        .fold(Router::new(), |router, kind| {
            let base = format!("/api/{}", kind.plural());
            router
                .route(
                    &base,
                    get(move |state: State<Arc<AppState>>| list_businesses(state, kind)),
                )
                .route(
                    &format!("{base}/add"),
                    post(
                        move |state: State<Arc<AppState>>,
                              body: std::result::Result<Json<NewBusiness>, JsonRejection>| {
                            add_business(state, kind, body)
                        },
                    ),
                )
                .route(
                    &format!("{base}/{{id}}"),
                    get(move |state: State<Arc<AppState>>, id: Path<String>| {
                        get_business(state, kind, id)
                    }),
                )
        })
}

/// Record ids are millisecond timestamps.
pub(crate) fn validate_record_id(id: &str) -> Result<()> {
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::BadRequest(format!("Invalid id: {id}")));
    }
    Ok(())
}

/// Full collection for one business type.
async fn list_businesses(
    State(state): State<Arc<AppState>>,
    kind: BusinessType,
) -> Result<Json<Vec<Business>>> {
    let collection = state.collections.load::<Business>(kind.collection()).await?;
    tracing::debug!(kind = %kind, count = collection.records.len(), "Listed businesses");
    Ok(Json(collection.records))
}

/// One business by id.
async fn get_business(
    State(state): State<Arc<AppState>>,
    kind: BusinessType,
    Path(id): Path<String>,
) -> Result<Json<Business>> {
    validate_record_id(&id)?;

    let business = state
        .collections
        .get::<Business>(kind.collection(), &id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{kind} {id} not found")))?;

    Ok(Json(business))
}

/// Append a business to its collection.
async fn add_business(
    State(state): State<Arc<AppState>>,
    kind: BusinessType,
    body: std::result::Result<Json<NewBusiness>, JsonRejection>,
) -> Result<(StatusCode, Json<Business>)> {
    let Json(payload) = body?;
    let payload = payload.normalized();
    payload.validate()?;

    let business = payload.into_business(format_utc_rfc3339(chrono::Utc::now()));
    let added = state.collections.add(kind.collection(), business).await?;

    tracing::info!(kind = %kind, id = %added.id, name = %added.name, "Business added");
    Ok((StatusCode::CREATED, Json(added)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_record_id() {
        assert!(validate_record_id("1718000000000").is_ok());
        assert!(matches!(
            validate_record_id("abc"),
            Err(AppError::BadRequest(_))
        ));
        assert!(validate_record_id("").is_err());
        assert!(validate_record_id("12a").is_err());
    }
}
