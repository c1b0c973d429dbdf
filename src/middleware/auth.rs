// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Clerk session authentication middleware.

use crate::error::AppError;
use crate::services::access::Grants;
use crate::services::identity::{IdentityError, VerifiedIdentity};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Cookie Clerk stores the session token in.
pub const SESSION_COOKIE: &str = "__session";

/// The caller's identity, if they presented a valid session.
///
/// Inserted for every request by [`attach_identity`].
#[derive(Debug, Clone, Default)]
pub struct CallerIdentity(pub Option<VerifiedIdentity>);

impl CallerIdentity {
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_ref().map(|i| i.user_id.as_str())
    }
}

/// Authenticated user, inserted by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub identity: VerifiedIdentity,
}

impl AuthUser {
    pub fn grants(&self) -> Grants {
        Grants::signed_in(self.user_id.clone())
    }
}

/// Session token from the `__session` cookie, falling back to a Bearer header.
fn session_token(jar: &CookieJar, request: &Request) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string)
}

/// Middleware that resolves the caller's identity without requiring one.
///
/// Invalid or expired sessions are treated as anonymous.
pub async fn attach_identity(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = match session_token(&jar, &request) {
        Some(token) => match state.identity.verify_session(&token).await {
            Ok(identity) => Some(identity),
            Err(IdentityError::Invalid(reason)) => {
                tracing::debug!(reason = %reason, "Ignoring invalid session");
                None
            }
            Err(IdentityError::Transient(reason)) => {
                tracing::error!(reason = %reason, "Session verification unavailable");
                None
            }
        },
        None => None,
    };

    request.extensions_mut().insert(CallerIdentity(identity));
    next.run(request).await
}

/// Middleware that requires a verified session.
pub async fn require_auth(mut request: Request, next: Next) -> Result<Response, AppError> {
    let identity = request
        .extensions()
        .get::<CallerIdentity>()
        .and_then(|caller| caller.0.clone())
        .ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(AuthUser {
        user_id: identity.user_id.clone(),
        identity,
    });

    Ok(next.run(request).await)
}
