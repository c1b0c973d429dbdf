// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Object storage client.
//!
//! The collection store only needs four primitives (list, fetch, put,
//! delete), so they sit behind [`BlobStore`]. [`VercelBlobStore`] talks to the
//! Vercel Blob HTTP API; [`crate::db::MemoryBlobStore`] backs tests and local
//! development.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

const API_VERSION: &str = "7";
const LIST_LIMIT: &str = "1000";

/// A stored document as reported by the blob service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobEntry {
    /// Logical name (e.g. `hotels.json`)
    pub pathname: String,
    /// Public URL the document is served from
    pub url: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub uploaded_at: Option<String>,
}

/// Errors from blob storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Blob request failed: {0}")]
    Transport(String),

    #[error("Blob service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid blob response: {0}")]
    InvalidResponse(String),

    #[error("Failed to encode collection {collection}: {reason}")]
    Encode { collection: String, reason: String },

    #[error("Blob storage unavailable")]
    Unavailable,

    /// The collection changed between read and write.
    #[error("Collection {collection} changed (expected version {expected}, found {found})")]
    Conflict {
        collection: String,
        expected: String,
        found: String,
    },
}

/// Minimal object storage interface used by the collection store.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// List documents whose pathname starts with `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, StoreError>;

    /// Download a document's bytes, bypassing any cache.
    async fn fetch(&self, entry: &BlobEntry) -> Result<Vec<u8>, StoreError>;

    /// Upload a document under an exact pathname.
    async fn put(&self, pathname: &str, body: Vec<u8>) -> Result<BlobEntry, StoreError>;

    /// Delete a previously listed document.
    async fn delete(&self, entry: &BlobEntry) -> Result<(), StoreError>;
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    blobs: Vec<BlobEntry>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    url: String,
    pathname: String,
}

/// Vercel Blob REST client.
#[derive(Clone)]
pub struct VercelBlobStore {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl VercelBlobStore {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// Turn a non-success response into a `StoreError::Status`.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl BlobStore for VercelBlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, StoreError> {
        let response = self
            .http
            .get(format!("{}/", self.base_url))
            .bearer_auth(&self.token)
            .header("x-api-version", API_VERSION)
            .query(&[("prefix", prefix), ("limit", LIST_LIMIT)])
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let listing: ListResponse = Self::check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        Ok(listing.blobs)
    }

    async fn fetch(&self, entry: &BlobEntry) -> Result<Vec<u8>, StoreError> {
        let response = self
            .http
            .get(&entry.url)
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let bytes = Self::check_response(response)
            .await?
            .bytes()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(bytes.to_vec())
    }

    async fn put(&self, pathname: &str, body: Vec<u8>) -> Result<BlobEntry, StoreError> {
        let size = body.len() as u64;
        let response = self
            .http
            .put(format!(
                "{}/{}",
                self.base_url,
                urlencoding::encode(pathname)
            ))
            .bearer_auth(&self.token)
            .header("x-api-version", API_VERSION)
            .header("x-add-random-suffix", "0")
            .header("x-allow-overwrite", "1")
            .header("x-content-type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let uploaded: PutResponse = Self::check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::InvalidResponse(e.to_string()))?;

        tracing::debug!(pathname = %uploaded.pathname, size, "Uploaded blob");

        Ok(BlobEntry {
            pathname: uploaded.pathname,
            url: uploaded.url,
            size,
            uploaded_at: None,
        })
    }

    async fn delete(&self, entry: &BlobEntry) -> Result<(), StoreError> {
        let response = self
            .http
            .post(format!("{}/delete", self.base_url))
            .bearer_auth(&self.token)
            .header("x-api-version", API_VERSION)
            .json(&serde_json::json!({ "urls": [entry.url] }))
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        match Self::check_response(response).await {
            Ok(_) => Ok(()),
            // Already gone: the end state is what we wanted.
            Err(StoreError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                tracing::debug!(pathname = %entry.pathname, "Blob already deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
