// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Background delivery of search analytics.
//!
//! Handlers hand entries to a bounded queue and return immediately. A worker
//! task drains the queue into Postgres, retrying each entry with exponential
//! backoff. Nothing is reported back to the caller; instead every outcome is
//! counted so dropped or failed logs show up in the admin stats.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::db::PgDb;
use crate::error::AppError;
use crate::models::SearchLogEntry;

const DEFAULT_CAPACITY: usize = 1024;

/// Destination for search log entries.
#[async_trait]
pub trait SearchLogSink: Send + Sync + 'static {
    async fn write(&self, entry: &SearchLogEntry) -> Result<(), AppError>;
}

#[async_trait]
impl SearchLogSink for PgDb {
    async fn write(&self, entry: &SearchLogEntry) -> Result<(), AppError> {
        self.insert_search_log(entry).await
    }
}

/// Per-entry retry policy.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base, 2x base, 4x base...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// Snapshot of the queue counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLogMetrics {
    pub enqueued: u64,
    pub written: u64,
    pub retried: u64,
    pub failed: u64,
    pub dropped: u64,
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    written: AtomicU64,
    retried: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> SearchLogMetrics {
        SearchLogMetrics {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Handle to the search log queue. Cheap to clone.
#[derive(Clone)]
pub struct SearchLogQueue {
    sender: mpsc::Sender<SearchLogEntry>,
    counters: Arc<Counters>,
}

impl SearchLogQueue {
    /// Spawn the worker with default capacity and retry policy.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S: SearchLogSink>(sink: S) -> Self {
        Self::start_with(sink, DEFAULT_CAPACITY, RetryPolicy::default())
    }

    pub fn start_with<S: SearchLogSink>(sink: S, capacity: usize, policy: RetryPolicy) -> Self {
        let (sender, receiver) = mpsc::channel(capacity);
        let counters = Arc::new(Counters::default());

        tokio::spawn(run_worker(receiver, sink, policy, counters.clone()));

        Self { sender, counters }
    }

    /// Queue an entry without waiting. Returns `false` if it was dropped.
    pub fn enqueue(&self, entry: SearchLogEntry) -> bool {
        match self.sender.try_send(entry) {
            Ok(()) => {
                self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(TrySendError::Full(entry)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(airport = %entry.airport_code, "Search log queue full, dropping entry");
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::error!("Search log worker has stopped, dropping entry");
                false
            }
        }
    }

    pub fn metrics(&self) -> SearchLogMetrics {
        self.counters.snapshot()
    }
}

async fn run_worker<S: SearchLogSink>(
    mut receiver: mpsc::Receiver<SearchLogEntry>,
    sink: S,
    policy: RetryPolicy,
    counters: Arc<Counters>,
) {
    tracing::debug!(max_attempts = policy.max_attempts, "Search log worker started");

    while let Some(entry) = receiver.recv().await {
        deliver(&sink, &entry, policy, &counters).await;
    }

    tracing::debug!("Search log worker stopped");
}

async fn deliver<S: SearchLogSink>(
    sink: &S,
    entry: &SearchLogEntry,
    policy: RetryPolicy,
    counters: &Counters,
) {
    let mut attempt = 1;
    loop {
        match sink.write(entry).await {
            Ok(()) => {
                counters.written.fetch_add(1, Ordering::Relaxed);
                return;
            }
            Err(e) if attempt < policy.max_attempts => {
                counters.retried.fetch_add(1, Ordering::Relaxed);
                let delay = policy.delay_for(attempt);
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, error = %e, "Retrying search log write");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    attempts = attempt,
                    airport = %entry.airport_code,
                    error = %e,
                    "Search log write failed, giving up"
                );
                return;
            }
        }
    }
}
