// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod access;
pub mod airports;
pub mod identity;
pub mod search_log;

pub use access::{AccessDecision, AccessGate, Capabilities, Grants};
pub use airports::AirportService;
pub use identity::{ClerkVerifier, IdentityError, VerifiedIdentity};
pub use search_log::{RetryPolicy, SearchLogMetrics, SearchLogQueue, SearchLogSink};
