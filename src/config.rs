// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Credentials for Neon, Vercel Blob and Clerk are injected by the hosting
//! platform as environment variables; a `.env` file is honored for local dev.

use std::env;

/// Admin address used when `ADMIN_EMAIL` is not set.
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@crewintel.app";

/// Default Vercel Blob API endpoint.
pub const DEFAULT_BLOB_API_URL: &str = "https://blob.vercel-storage.com";

/// Default Clerk JWKS endpoint (Backend API).
pub const DEFAULT_CLERK_JWKS_URL: &str = "https://api.clerk.com/v1/jwks";

/// Default Clerk Backend API base URL.
pub const DEFAULT_CLERK_API_URL: &str = "https://api.clerk.com/v1";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Path to the static airport list
    pub airports_path: String,
    /// Vercel Blob API endpoint
    pub blob_api_url: String,
    /// Clerk JWKS endpoint
    pub clerk_jwks_url: String,
    /// Clerk Backend API base URL
    pub clerk_api_url: String,
    /// Email granted admin capability
    pub admin_email: String,

    // --- Secrets ---
    /// Neon Postgres connection string
    pub database_url: String,
    /// Vercel Blob read/write token
    pub blob_token: String,
    /// Clerk secret key for Backend API lookups
    pub clerk_secret_key: Option<String>,
    /// Clerk PEM public key for networkless session verification
    pub clerk_jwt_key: Option<String>,
    /// HS256 session secret; only used by tests and local tooling
    pub session_signing_key: Option<Vec<u8>>,
}

impl Config {
    /// Config for tests: offline endpoints and an HS256 session secret.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:3000".to_string(),
            port: 8080,
            airports_path: "data/airports.json".to_string(),
            blob_api_url: "http://127.0.0.1:9".to_string(),
            clerk_jwks_url: "http://127.0.0.1:9/jwks".to_string(),
            clerk_api_url: "http://127.0.0.1:9".to_string(),
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            database_url: "postgres://localhost/crewintel_test".to_string(),
            blob_token: "test_blob_token".to_string(),
            clerk_secret_key: None,
            clerk_jwt_key: None,
            session_signing_key: Some(b"test_session_key_32_bytes_min!!".to_vec()),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            airports_path: env::var("AIRPORTS_PATH")
                .unwrap_or_else(|_| "data/airports.json".to_string()),
            blob_api_url: env::var("BLOB_API_URL")
                .unwrap_or_else(|_| DEFAULT_BLOB_API_URL.to_string()),
            clerk_jwks_url: env::var("CLERK_JWKS_URL")
                .unwrap_or_else(|_| DEFAULT_CLERK_JWKS_URL.to_string()),
            clerk_api_url: env::var("CLERK_API_URL")
                .unwrap_or_else(|_| DEFAULT_CLERK_API_URL.to_string()),
            admin_email: env::var("ADMIN_EMAIL")
                .map(|v| v.trim().to_string())
                .unwrap_or_else(|_| DEFAULT_ADMIN_EMAIL.to_string()),

            database_url: env::var("DATABASE_URL")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
            blob_token: env::var("BLOB_READ_WRITE_TOKEN")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("BLOB_READ_WRITE_TOKEN"))?,
            clerk_secret_key: non_empty_var("CLERK_SECRET_KEY"),
            clerk_jwt_key: non_empty_var("CLERK_JWT_KEY"),
            session_signing_key: None,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
