// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! CrewIntel: ground-service directory and reviews for airline crews
//!
//! This crate provides the backend API and list pages for looking up and
//! reviewing hotels, restaurants, car rentals and FBOs near airports.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{CollectionStore, PgDb};
use services::{AccessGate, AirportService, ClerkVerifier, SearchLogQueue};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: PgDb,
    pub collections: CollectionStore,
    pub identity: ClerkVerifier,
    pub access: AccessGate,
    pub airports: AirportService,
    pub search_log: SearchLogQueue,
}
