// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod airport;
pub mod business;
pub mod review;
pub mod search;
pub mod stats;

pub use airport::Airport;
pub use business::{Business, BusinessType, NewBusiness};
pub use review::{NewReview, Review, ReviewRow, ReviewUpdate};
pub use search::{SearchLogEntry, SearchLogRequest};
pub use stats::{AdminStats, CategoryCount};
