// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! JSON collection documents with optimistic concurrency.
//!
//! Each collection (`hotels.json`, `reviews.json`, ...) is a single JSON array
//! in blob storage. Writes are whole-document read-modify-write:
//!
//! 1. list documents and locate the collection by pathname
//! 2. fetch and parse it (missing document = empty collection)
//! 3. apply the change in memory
//! 4. delete the old document, upload the new one under the same name
//!
//! The stored array is schemaless. Elements are kept as raw JSON and only
//! converted to typed records when read; an element that doesn't fit the
//! record type is skipped on read and written back untouched.
//!
//! Every load carries a [`CollectionVersion`] (SHA-256 of the document bytes).
//! `save` re-reads the document and refuses to write if the version moved,
//! so a writer holding stale state gets `StoreError::Conflict` instead of
//! silently dropping someone else's record. Writers inside this process are
//! also serialized per collection.

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::db::blob::{BlobEntry, BlobStore, StoreError};
use crate::models::{Business, Review};

const DEFAULT_CONFLICT_RETRIES: u32 = 3;

/// A record that lives in a collection document.
pub trait CollectionRecord: Serialize + DeserializeOwned + Clone + Send + Sync {
    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
}

impl CollectionRecord for Business {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

impl CollectionRecord for Review {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Version token of a collection document as it was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionVersion {
    /// No document exists yet.
    Empty,
    /// Hex SHA-256 of the document bytes.
    Hash(String),
}

impl CollectionVersion {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        CollectionVersion::Hash(hex::encode(Sha256::digest(bytes)))
    }
}

impl fmt::Display for CollectionVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionVersion::Empty => f.write_str("empty"),
            CollectionVersion::Hash(hash) => f.write_str(hash),
        }
    }
}

/// A loaded collection plus the version it was read at.
#[derive(Debug, Clone)]
pub struct Collection<T> {
    /// Elements that converted to `T`, in document order
    pub records: Vec<T>,
    /// Elements that didn't
    pub skipped: usize,
    pub version: CollectionVersion,
}

impl<T: CollectionRecord> Collection<T> {
    /// Linear scan for a record by id.
    pub fn find(&self, id: &str) -> Option<&T> {
        self.records.iter().find(|r| r.id() == id)
    }
}

/// The document currently stored under a collection name.
struct Snapshot {
    entry: Option<BlobEntry>,
    bytes: Option<Vec<u8>>,
    version: CollectionVersion,
}

/// Shared per-collection write locks.
pub type WriteLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Read-modify-write access to JSON collections in blob storage.
#[derive(Clone)]
pub struct CollectionStore {
    blob: Arc<dyn BlobStore>,
    write_locks: WriteLocks,
    max_conflict_retries: u32,
}

impl CollectionStore {
    pub fn new(blob: Arc<dyn BlobStore>) -> Self {
        Self {
            blob,
            write_locks: Arc::new(DashMap::new()),
            max_conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }

    /// Override how many times `add` re-reads after a conflict.
    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.max_conflict_retries = retries;
        self
    }

    /// Load a collection strictly: storage failures and a document that
    /// isn't a JSON array are errors. A missing document is an empty
    /// collection.
    pub async fn load<T: CollectionRecord>(&self, name: &str) -> Result<Collection<T>, StoreError> {
        let snapshot = self.snapshot(name).await?;
        let values = match &snapshot.bytes {
            Some(bytes) => parse_document(bytes)
                .map_err(|e| StoreError::InvalidResponse(format!("{name}: {e}")))?,
            None => Vec::new(),
        };

        let (records, skipped) = typed_records(name, values);
        Ok(Collection {
            records,
            skipped,
            version: snapshot.version,
        })
    }

    /// Fetch one record by id. `Ok(None)` when the document or record is absent.
    pub async fn get<T: CollectionRecord>(
        &self,
        name: &str,
        id: &str,
    ) -> Result<Option<T>, StoreError> {
        let collection = self.load::<T>(name).await?;
        Ok(collection.find(id).cloned())
    }

    /// Write `records` as the new contents of `name`, provided the stored
    /// document is still at `expected`.
    pub async fn save<T: CollectionRecord>(
        &self,
        name: &str,
        records: &[T],
        expected: &CollectionVersion,
    ) -> Result<CollectionVersion, StoreError> {
        let values = records
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Encode {
                collection: name.to_string(),
                reason: e.to_string(),
            })?;

        let lock = self.write_lock(name);
        let _guard = lock.lock().await;
        self.save_locked(name, &values, expected).await
    }

    /// Append one record, assigning it a fresh id.
    ///
    /// Existing elements are written back unchanged, whether or not they
    /// fit `T`. A document that isn't a JSON array is replaced. On a
    /// version conflict the whole cycle is retried.
    pub async fn add<T: CollectionRecord>(&self, name: &str, record: T) -> Result<T, StoreError> {
        let lock = self.write_lock(name);
        let _guard = lock.lock().await;

        let mut attempt = 0;
        loop {
            let (mut values, version) = self.load_for_update(name).await?;

            let mut added = record.clone();
            let taken: HashSet<String> = values.iter().filter_map(element_id).collect();
            added.set_id(next_id(&taken, chrono::Utc::now().timestamp_millis()));
            values.push(serde_json::to_value(&added).map_err(|e| StoreError::Encode {
                collection: name.to_string(),
                reason: e.to_string(),
            })?);

            match self.save_locked(name, &values, &version).await {
                Ok(new_version) => {
                    tracing::info!(
                        collection = name,
                        id = added.id(),
                        records = values.len(),
                        version = %new_version,
                        "Record added"
                    );
                    return Ok(added);
                }
                Err(StoreError::Conflict { .. }) if attempt < self.max_conflict_retries => {
                    attempt += 1;
                    tracing::warn!(collection = name, attempt, "Collection changed during add, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn write_lock(&self, name: &str) -> Arc<Mutex<()>> {
        self.write_locks
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Load raw elements for a write. Only a document that isn't a JSON
    /// array degrades to empty; storage failures propagate.
    async fn load_for_update(
        &self,
        name: &str,
    ) -> Result<(Vec<Value>, CollectionVersion), StoreError> {
        let snapshot = self.snapshot(name).await?;
        let values = match &snapshot.bytes {
            Some(bytes) => parse_document(bytes).unwrap_or_else(|e| {
                tracing::warn!(collection = name, error = %e, "Collection is not a JSON array, starting empty");
                Vec::new()
            }),
            None => Vec::new(),
        };
        Ok((values, snapshot.version))
    }

    async fn save_locked(
        &self,
        name: &str,
        values: &[Value],
        expected: &CollectionVersion,
    ) -> Result<CollectionVersion, StoreError> {
        let current = self.snapshot(name).await?;
        if current.version != *expected {
            return Err(StoreError::Conflict {
                collection: name.to_string(),
                expected: expected.to_string(),
                found: current.version.to_string(),
            });
        }

        let body = serde_json::to_vec(values).map_err(|e| StoreError::Encode {
            collection: name.to_string(),
            reason: e.to_string(),
        })?;
        let new_version = CollectionVersion::of_bytes(&body);

        if let Some(entry) = &current.entry {
            self.blob.delete(entry).await?;
        }
        self.blob.put(name, body).await?;

        Ok(new_version)
    }

    /// Read the current document.
    async fn snapshot(&self, name: &str) -> Result<Snapshot, StoreError> {
        let entry = self
            .blob
            .list(name)
            .await?
            .into_iter()
            .find(|e| e.pathname == name);

        let Some(entry) = entry else {
            return Ok(Snapshot {
                entry: None,
                bytes: None,
                version: CollectionVersion::Empty,
            });
        };

        let bytes = self.blob.fetch(&entry).await?;
        Ok(Snapshot {
            version: CollectionVersion::of_bytes(&bytes),
            bytes: Some(bytes),
            entry: Some(entry),
        })
    }
}

fn parse_document(bytes: &[u8]) -> Result<Vec<Value>, serde_json::Error> {
    serde_json::from_slice(bytes)
}

/// Convert elements one by one, skipping those that don't fit `T`.
fn typed_records<T: CollectionRecord>(name: &str, values: Vec<Value>) -> (Vec<T>, usize) {
    let mut records = Vec::with_capacity(values.len());
    let mut skipped = 0;
    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<T>(value) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                tracing::warn!(collection = name, index, error = %e, "Skipping malformed record");
            }
        }
    }
    (records, skipped)
}

/// Id of a raw element; numeric ids count too.
fn element_id(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Millisecond-timestamp id, bumped until it is not in `taken`.
pub fn next_id(taken: &HashSet<String>, now_millis: i64) -> String {
    let mut candidate = now_millis;
    while taken.contains(&candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}
