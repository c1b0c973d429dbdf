// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Authorization: admin and ownership capabilities.
//!
//! A caller is admin if their session carries `role = "admin"` or their
//! primary verified email equals the configured admin address (exact,
//! case-sensitive match). Ownership is a plain user-id comparison.

use crate::services::identity::{ClerkVerifier, IdentityError, VerifiedIdentity};

/// Session role that grants admin capability.
pub const ADMIN_ROLE: &str = "admin";

/// What an authenticated caller may do.
pub trait Capabilities {
    fn is_admin(&self) -> bool;
    fn is_owner(&self, owner_id: &str) -> bool;
}

/// Resolved capabilities of one caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grants {
    pub user_id: String,
    pub admin: bool,
}

impl Capabilities for Grants {
    fn is_admin(&self) -> bool {
        self.admin
    }

    fn is_owner(&self, owner_id: &str) -> bool {
        self.user_id == owner_id
    }
}

impl Grants {
    /// A signed-in caller whose admin status hasn't been looked up. Enough
    /// for ownership checks.
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            admin: false,
        }
    }
}

/// Outcome of an admin check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    NotAuthenticated,
    NotAdmin,
    Admin(Grants),
}

impl AccessDecision {
    pub fn is_admin(&self) -> bool {
        matches!(self, AccessDecision::Admin(_))
    }
}

/// Admin gate in front of the stats endpoints.
#[derive(Debug, Clone)]
pub struct AccessGate {
    admin_email: String,
}

impl AccessGate {
    pub fn new(admin_email: impl Into<String>) -> Self {
        Self {
            admin_email: admin_email.into(),
        }
    }

    /// Resolve the capabilities of a verified caller.
    pub async fn grants(
        &self,
        verifier: &ClerkVerifier,
        identity: &VerifiedIdentity,
    ) -> Result<Grants, IdentityError> {
        let admin = if identity.role.as_deref() == Some(ADMIN_ROLE) {
            true
        } else {
            verifier
                .primary_email(identity)
                .await?
                .is_some_and(|email| email == self.admin_email)
        };

        Ok(Grants {
            user_id: identity.user_id.clone(),
            admin,
        })
    }

    /// Admin check distinguishing anonymous callers from non-admin ones.
    pub async fn check_admin(
        &self,
        verifier: &ClerkVerifier,
        identity: Option<&VerifiedIdentity>,
    ) -> Result<AccessDecision, IdentityError> {
        let Some(identity) = identity else {
            return Ok(AccessDecision::NotAuthenticated);
        };

        let grants = self.grants(verifier, identity).await?;
        if grants.is_admin() {
            Ok(AccessDecision::Admin(grants))
        } else {
            tracing::info!(user_id = %identity.user_id, "Admin access denied");
            Ok(AccessDecision::NotAdmin)
        }
    }

    /// Boolean form of [`AccessGate::check_admin`]. Lookup failures count as
    /// "not authorized".
    pub async fn is_authorized(
        &self,
        verifier: &ClerkVerifier,
        identity: Option<&VerifiedIdentity>,
    ) -> bool {
        match self.check_admin(verifier, identity).await {
            Ok(decision) => decision.is_admin(),
            Err(e) => {
                tracing::warn!(error = %e, "Admin check failed");
                false
            }
        }
    }
}
