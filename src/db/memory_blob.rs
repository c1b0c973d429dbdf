// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-memory blob store for tests and offline development.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::db::blob::{BlobEntry, BlobStore, StoreError};

/// Blob store holding documents in a map keyed by pathname.
#[derive(Default)]
pub struct MemoryBlobStore {
    docs: Mutex<BTreeMap<String, Vec<u8>>>,
    offline: AtomicBool,
    puts: AtomicU64,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful uploads so far.
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }

    /// Seed a document directly, bypassing the collection store.
    pub fn insert_raw(&self, pathname: &str, body: impl Into<Vec<u8>>) {
        self.docs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(pathname.to_string(), body.into());
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }

    fn entry_for(pathname: &str, size: usize) -> BlobEntry {
        BlobEntry {
            pathname: pathname.to_string(),
            url: format!("memory://{pathname}"),
            size: size as u64,
            uploaded_at: None,
        }
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn list(&self, prefix: &str) -> Result<Vec<BlobEntry>, StoreError> {
        self.check_online()?;
        let docs = self.docs.lock().unwrap_or_else(|e| e.into_inner());
        Ok(docs
            .iter()
            .filter(|(name, _)| name.starts_with(prefix))
            .map(|(name, body)| Self::entry_for(name, body.len()))
            .collect())
    }

    async fn fetch(&self, entry: &BlobEntry) -> Result<Vec<u8>, StoreError> {
        self.check_online()?;
        self.docs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&entry.pathname)
            .cloned()
            .ok_or_else(|| StoreError::Status {
                status: 404,
                body: format!("{} not found", entry.pathname),
            })
    }

    async fn put(&self, pathname: &str, body: Vec<u8>) -> Result<BlobEntry, StoreError> {
        self.check_online()?;
        let entry = Self::entry_for(pathname, body.len());
        self.docs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(pathname.to_string(), body);
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(entry)
    }

    async fn delete(&self, entry: &BlobEntry) -> Result<(), StoreError> {
        self.check_online()?;
        self.docs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&entry.pathname);
        Ok(())
    }
}
