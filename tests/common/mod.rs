// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use crewintel::config::Config;
use crewintel::db::{CollectionStore, MemoryBlobStore, PgDb};
use crewintel::routes::create_router;
use crewintel::services::{AccessGate, AirportService, ClerkVerifier, RetryPolicy, SearchLogQueue};
use crewintel::AppState;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Check if a test database is available via environment variable.
#[allow(dead_code)]
pub fn database_available() -> bool {
    std::env::var("TEST_DATABASE_URL").is_ok()
}

/// Skip test with message if no test database is configured.
#[macro_export]
macro_rules! require_database {
    () => {
        if !crate::common::database_available() {
            eprintln!("⚠️  Skipping: TEST_DATABASE_URL not set");
            return;
        }
    };
}

/// Connect to the test database and make sure the tables exist.
#[allow(dead_code)]
pub async fn test_db() -> PgDb {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL not set");

    let pool = sqlx::PgPool::connect(&url)
        .await
        .expect("Failed to connect to test database");
    sqlx::raw_sql(include_str!("../fixtures/schema.sql"))
        .execute(&pool)
        .await
        .expect("Failed to apply test schema");
    pool.close().await;

    PgDb::new(&url).expect("Failed to configure test pool")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> PgDb {
    PgDb::new_mock()
}

/// Router plus handles on the in-memory pieces behind it.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub blob: Arc<MemoryBlobStore>,
}

/// Create a test app with offline mock dependencies.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default(), test_db_offline())
}

/// Create a test app around the given configuration and database.
#[allow(dead_code)]
pub fn create_test_app_with(config: Config, db: PgDb) -> TestApp {
    let blob = Arc::new(MemoryBlobStore::new());
    let collections = CollectionStore::new(blob.clone());
    let identity = ClerkVerifier::new(&config).expect("Failed to build verifier");
    let access = AccessGate::new(config.admin_email.clone());
    let airports =
        AirportService::load_from_file(&config.airports_path).expect("Failed to load airports");
    let search_log = SearchLogQueue::start_with(
        db.clone(),
        64,
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
        },
    );

    let state = Arc::new(AppState {
        config,
        db,
        collections,
        identity,
        access,
        airports,
        search_log,
    });

    TestApp {
        router: create_router(state.clone()),
        state,
        blob,
    }
}

/// Create an HS256 session token the test verifier accepts.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, email: Option<&str>, role: Option<&str>) -> String {
    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: usize,
        iat: usize,
        #[serde(skip_serializing_if = "Option::is_none")]
        email: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        role: Option<String>,
    }

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: now + 3600,
        iat: now,
        email: email.map(String::from),
        role: role.map(String::from),
    };

    let key = Config::test_default()
        .session_signing_key
        .expect("test config has a signing key");

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(&key),
    )
    .unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Read a response body as text.
#[allow(dead_code)]
pub async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
