// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wire-level tests for the blob storage and Clerk HTTP clients.

use crewintel::config::Config;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use crewintel::error::AppError;
use crewintel::db::{BlobStore, CollectionStore, StoreError, VercelBlobStore};
use crewintel::models::Business;
use crewintel::services::{ClerkVerifier, VerifiedIdentity};
use serde_json::{json, Map};
use std::sync::Arc;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "vercel_blob_rw_test";

fn listing(server: &MockServer, pathname: &str) -> serde_json::Value {
    json!({
        "blobs": [{
            "pathname": pathname,
            "url": format!("{}/files/{pathname}", server.uri()),
            "size": 2,
            "uploadedAt": "2024-06-10T06:13:20.005Z"
        }]
    })
}

#[tokio::test]
async fn test_list_sends_auth_and_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("prefix", "hotels.json"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(header("x-api-version", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&server, "hotels.json")))
        .expect(1)
        .mount(&server)
        .await;

    let store = VercelBlobStore::new(server.uri(), TOKEN);
    let blobs = store.list("hotels.json").await.unwrap();

    assert_eq!(blobs.len(), 1);
    assert_eq!(blobs[0].pathname, "hotels.json");
    assert_eq!(blobs[0].uploaded_at.as_deref(), Some("2024-06-10T06:13:20.005Z"));
}

#[tokio::test]
async fn test_error_status_surfaces() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(403).set_body_string("bad token"))
        .mount(&server)
        .await;

    let store = VercelBlobStore::new(server.uri(), TOKEN);
    let err = store.list("hotels.json").await.unwrap_err();

    match err {
        StoreError::Status { status, body } => {
            assert_eq!(status, 403);
            assert_eq!(body, "bad token");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_delete_missing_blob_is_ok() {
    let server = MockServer::start().await;
    let entry_url = format!("{}/files/hotels.json", server.uri());
    Mock::given(method("POST"))
        .and(path("/delete"))
        .and(body_json(json!({"urls": [entry_url.clone()]})))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let store = VercelBlobStore::new(server.uri(), TOKEN);
    let entry = crewintel::db::BlobEntry {
        pathname: "hotels.json".to_string(),
        url: entry_url,
        size: 0,
        uploaded_at: None,
    };

    store.delete(&entry).await.unwrap();
}

#[tokio::test]
async fn test_collection_add_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("prefix", "hotels.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&server, "hotels.json")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/hotels.json"))
        .and(header("cache-control", "no-cache"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/delete"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/hotels.json"))
        .and(header("x-add-random-suffix", "0"))
        .and(header("x-allow-overwrite", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": format!("{}/files/hotels.json", server.uri()),
            "pathname": "hotels.json"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = CollectionStore::new(Arc::new(VercelBlobStore::new(server.uri(), TOKEN)));
    let added = store
        .add(
            "hotels.json",
            Business {
                id: String::new(),
                name: "Crew Rest Inn".to_string(),
                airport_code: Some("DEN".to_string()),
                city: None,
                address: None,
                created_at: "2024-06-10T06:13:20.005Z".to_string(),
                extra: Map::new(),
            },
        )
        .await
        .unwrap();
    assert!(!added.id.is_empty());

    let requests = server.received_requests().await.unwrap();
    let put = requests
        .iter()
        .find(|r| r.method.as_str() == "PUT")
        .unwrap();
    let uploaded: Vec<serde_json::Value> = serde_json::from_slice(&put.body).unwrap();
    assert_eq!(uploaded.len(), 1);
    assert_eq!(uploaded[0]["name"], "Crew Rest Inn");
    assert_eq!(uploaded[0]["id"], added.id.as_str());
}

#[tokio::test]
async fn test_collection_add_stops_when_download_fails() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(&server, "hotels.json")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/hotels.json"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/delete"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = CollectionStore::new(Arc::new(VercelBlobStore::new(server.uri(), TOKEN)));
    let err = store
        .add(
            "hotels.json",
            Business {
                id: String::new(),
                name: "Crew Rest Inn".to_string(),
                airport_code: None,
                city: None,
                address: None,
                created_at: "2024-06-10T06:13:20.005Z".to_string(),
                extra: Map::new(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Status { status: 503, .. }));
    let response = AppError::from(err).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

fn clerk_config(server: &MockServer) -> Config {
    Config {
        clerk_api_url: server.uri(),
        clerk_secret_key: Some("sk_test_123".to_string()),
        ..Config::test_default()
    }
}

fn identity_without_email() -> VerifiedIdentity {
    VerifiedIdentity {
        user_id: "user_2abc".to_string(),
        email: None,
        role: None,
    }
}

#[tokio::test]
async fn test_primary_email_lookup_requires_verification() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/user_2abc"))
        .and(header("authorization", "Bearer sk_test_123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "user_2abc",
            "primary_email_address_id": "idn_1",
            "email_addresses": [
                {"id": "idn_0", "email_address": "old@example.com", "verification": {"status": "verified"}},
                {"id": "idn_1", "email_address": "captain@example.com", "verification": {"status": "verified"}}
            ]
        })))
        .mount(&server)
        .await;

    let verifier = ClerkVerifier::new(&clerk_config(&server)).unwrap();
    let email = verifier
        .primary_email(&identity_without_email())
        .await
        .unwrap();

    assert_eq!(email.as_deref(), Some("captain@example.com"));
}

#[tokio::test]
async fn test_unverified_primary_email_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/user_2abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "primary_email_address_id": "idn_1",
            "email_addresses": [
                {"id": "idn_1", "email_address": "captain@example.com", "verification": {"status": "unverified"}}
            ]
        })))
        .mount(&server)
        .await;

    let verifier = ClerkVerifier::new(&clerk_config(&server)).unwrap();
    let email = verifier
        .primary_email(&identity_without_email())
        .await
        .unwrap();

    assert_eq!(email, None);
}

#[tokio::test]
async fn test_clerk_outage_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let verifier = ClerkVerifier::new(&clerk_config(&server)).unwrap();
    let err = verifier
        .primary_email(&identity_without_email())
        .await
        .unwrap_err();

    assert!(matches!(err, crewintel::services::IdentityError::Transient(_)));
}
