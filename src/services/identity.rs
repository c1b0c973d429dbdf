// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Clerk session verification and user lookup.
//!
//! Session tokens arrive in the `__session` cookie or as a Bearer header.
//! They are RS256 JWTs verified against Clerk's JWKS (cached), or against a
//! PEM public key when `CLERK_JWT_KEY` is configured. Tests use an HS256
//! shared secret instead.

use crate::config::Config;
use anyhow::Context;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

/// Identity extracted from a valid session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Clerk user id (`user_...`)
    pub user_id: String,
    /// Primary email, when the session token template includes it
    pub email: Option<String>,
    /// Role from the user's public metadata, when present
    pub role: Option<String>,
}

/// Identity verification error categories.
#[derive(Debug, Clone, thiserror::Error)]
pub enum IdentityError {
    /// The token is missing/invalid or claims do not match expectations.
    #[error("invalid session: {0}")]
    Invalid(String),
    /// A transient infrastructure failure occurred.
    #[error("identity provider unavailable: {0}")]
    Transient(String),
}

#[derive(Clone)]
enum VerifierMode {
    Jwks { jwks_url: String },
    StaticKey { decoding_key: Arc<DecodingKey> },
    SharedSecret { decoding_key: Arc<DecodingKey> },
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for Clerk session tokens.
pub struct ClerkVerifier {
    http_client: reqwest::Client,
    mode: VerifierMode,
    api_url: String,
    secret_key: Option<String>,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl ClerkVerifier {
    /// Build a verifier from configuration.
    ///
    /// Preference: HS256 test secret, then PEM public key, then JWKS.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building Clerk HTTP client")?;

        let mode = if let Some(secret) = &config.session_signing_key {
            VerifierMode::SharedSecret {
                decoding_key: Arc::new(DecodingKey::from_secret(secret)),
            }
        } else if let Some(pem) = &config.clerk_jwt_key {
            let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                .context("CLERK_JWT_KEY is not a valid RSA public key")?;
            VerifierMode::StaticKey {
                decoding_key: Arc::new(key),
            }
        } else {
            VerifierMode::Jwks {
                jwks_url: config.clerk_jwks_url.clone(),
            }
        };

        let mode_name = match &mode {
            VerifierMode::Jwks { .. } => "jwks",
            VerifierMode::StaticKey { .. } => "static_key",
            VerifierMode::SharedSecret { .. } => "shared_secret",
        };
        tracing::info!(mode = mode_name, "Initialized Clerk session verifier");

        Ok(Self {
            http_client,
            mode,
            api_url: config.clerk_api_url.trim_end_matches('/').to_string(),
            secret_key: config.clerk_secret_key.clone(),
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Verify a raw session token.
    pub async fn verify_session(&self, token: &str) -> Result<VerifiedIdentity, IdentityError> {
        if token.is_empty() {
            return Err(IdentityError::Invalid("empty session token".to_string()));
        }

        let header = decode_header(token)
            .map_err(|e| IdentityError::Invalid(format!("invalid JWT header: {e}")))?;

        let (algorithm, decoding_key) = match &self.mode {
            VerifierMode::SharedSecret { decoding_key } => (Algorithm::HS256, decoding_key.clone()),
            VerifierMode::StaticKey { decoding_key } => (Algorithm::RS256, decoding_key.clone()),
            VerifierMode::Jwks { .. } => {
                let kid = header
                    .kid
                    .as_deref()
                    .ok_or_else(|| IdentityError::Invalid("missing JWT kid".to_string()))?;
                (Algorithm::RS256, self.decoding_key_for_kid(kid).await?)
            }
        };

        if header.alg != algorithm {
            return Err(IdentityError::Invalid(format!(
                "unexpected JWT alg: {:?}",
                header.alg
            )));
        }

        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.validate_aud = false;
        validation.validate_nbf = true;
        validation.leeway = CLOCK_SKEW_SECS;

        let claims = decode::<SessionClaims>(token, decoding_key.as_ref(), &validation)
            .map_err(|e| IdentityError::Invalid(format!("JWT validation failed: {e}")))?
            .claims;

        if claims.sub.trim().is_empty() {
            return Err(IdentityError::Invalid("empty sub claim".to_string()));
        }

        tracing::debug!(
            user_id = %claims.sub,
            session_id = claims.sid.as_deref().unwrap_or("<none>"),
            has_email = claims.email.is_some(),
            "Verified Clerk session"
        );

        Ok(VerifiedIdentity {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }

    /// The caller's primary email, but only if Clerk marks it verified.
    ///
    /// Uses the session claim when present, otherwise the Backend API (when a
    /// secret key is configured).
    pub async fn primary_email(
        &self,
        identity: &VerifiedIdentity,
    ) -> Result<Option<String>, IdentityError> {
        if let Some(email) = &identity.email {
            return Ok(Some(email.clone()));
        }

        let Some(secret_key) = &self.secret_key else {
            return Ok(None);
        };

        let url = format!(
            "{}/users/{}",
            self.api_url,
            urlencoding::encode(&identity.user_id)
        );
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(secret_key)
            .send()
            .await
            .map_err(|e| IdentityError::Transient(format!("Clerk user lookup failed: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(IdentityError::Transient(format!(
                "Clerk user lookup returned status {}",
                response.status()
            )));
        }

        let user: ClerkUser = response
            .json()
            .await
            .map_err(|e| IdentityError::Transient(format!("invalid Clerk user JSON: {e}")))?;

        Ok(user.primary_verified_email())
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, IdentityError> {
        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(IdentityError::Invalid(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), IdentityError> {
        let VerifierMode::Jwks { jwks_url } = &self.mode else {
            return Ok(());
        };

        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        tracing::debug!(jwks_url = %jwks_url, "Refreshing Clerk JWKS cache");

        let mut request = self.http_client.get(jwks_url);
        if let Some(secret_key) = &self.secret_key {
            request = request.bearer_auth(secret_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| IdentityError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(IdentityError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| IdentityError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let mut keys_by_kid: HashMap<String, Arc<DecodingKey>> = HashMap::new();

        for jwk in jwks.keys {
            if jwk.kty != "RSA" || jwk.kid.trim().is_empty() {
                continue;
            }

            if jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
                continue;
            }

            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys_by_kid.insert(jwk.kid, Arc::new(key));
                }
                Err(e) => {
                    tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
                }
            }
        }

        if keys_by_kid.is_empty() {
            return Err(IdentityError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        *self.jwks_cache.write().await = Some(JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        });

        tracing::debug!(ttl_secs = ttl.as_secs(), "Clerk JWKS cache refreshed");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
}

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    #[serde(default)]
    sid: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClerkUser {
    primary_email_address_id: Option<String>,
    #[serde(default)]
    email_addresses: Vec<ClerkEmailAddress>,
}

#[derive(Debug, Deserialize)]
struct ClerkEmailAddress {
    id: String,
    email_address: String,
    verification: Option<ClerkVerification>,
}

#[derive(Debug, Deserialize)]
struct ClerkVerification {
    status: String,
}

impl ClerkUser {
    fn primary_verified_email(self) -> Option<String> {
        let primary_id = self.primary_email_address_id?;
        self.email_addresses
            .into_iter()
            .find(|e| e.id == primary_id)
            .filter(|e| {
                e.verification
                    .as_ref()
                    .is_some_and(|v| v.status == "verified")
            })
            .map(|e| e.email_address)
    }
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
        .map(Duration::from_secs)
        .unwrap_or(fallback)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    value
        .split(',')
        .filter_map(|directive| directive.trim().strip_prefix("max-age="))
        .find_map(|raw| raw.trim_matches('"').parse::<u64>().ok())
}
