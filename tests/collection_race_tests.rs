// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lost-update tests for blob-backed collections.
//!
//! These tests verify that:
//! 1. Two writers replaying the bare list/fetch/put protocol lose a record
//! 2. A versioned save from a stale read is rejected
//! 3. Concurrent adds through the collection store all survive
//! 4. Elements that don't fit the record type survive an add

use crewintel::db::{BlobStore, CollectionStore, CollectionVersion, MemoryBlobStore, StoreError};
use crewintel::models::{Business, Review};
use serde_json::{json, Map};
use std::sync::Arc;

const HOTELS: &str = "hotels.json";

fn hotel(name: &str) -> Business {
    Business {
        id: String::new(),
        name: name.to_string(),
        airport_code: Some("DEN".to_string()),
        city: Some("Denver".to_string()),
        address: None,
        created_at: "2024-06-10T06:13:20.005Z".to_string(),
        extra: Map::new(),
    }
}

async fn read_raw(blob: &MemoryBlobStore) -> Vec<serde_json::Value> {
    let entry = blob
        .list(HOTELS)
        .await
        .unwrap()
        .into_iter()
        .find(|e| e.pathname == HOTELS)
        .unwrap();
    serde_json::from_slice(&blob.fetch(&entry).await.unwrap()).unwrap()
}

#[tokio::test]
async fn test_unconditional_overwrite_loses_update() {
    let blob = MemoryBlobStore::new();
    blob.insert_raw(HOTELS, serde_json::to_vec(&json!([{"id": "1", "name": "Seed"}])).unwrap());

    // Both writers read the same starting state
    let mut first = read_raw(&blob).await;
    let mut second = read_raw(&blob).await;

    first.push(json!({"id": "2", "name": "First Writer"}));
    second.push(json!({"id": "3", "name": "Second Writer"}));

    blob.put(HOTELS, serde_json::to_vec(&first).unwrap())
        .await
        .unwrap();
    blob.put(HOTELS, serde_json::to_vec(&second).unwrap())
        .await
        .unwrap();

    let stored = read_raw(&blob).await;
    let names: Vec<&str> = stored.iter().filter_map(|r| r["name"].as_str()).collect();
    assert_eq!(names, vec!["Seed", "Second Writer"]);
}

#[tokio::test]
async fn test_stale_versioned_save_rejected() {
    let blob = Arc::new(MemoryBlobStore::new());
    let store = CollectionStore::new(blob.clone());

    store.add(HOTELS, hotel("Seed Inn")).await.unwrap();

    // Writer A reads, then writer B commits first
    let stale = store.load::<Business>(HOTELS).await.unwrap();
    store.add(HOTELS, hotel("Writer B Suites")).await.unwrap();

    let puts_before = blob.put_count();
    let mut records = stale.records.clone();
    let mut late = hotel("Writer A Lodge");
    late.id = "1".to_string();
    records.push(late);

    let err = store
        .save(HOTELS, &records, &stale.version)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));
    assert_eq!(blob.put_count(), puts_before, "rejected save must not upload");

    let current = store.load::<Business>(HOTELS).await.unwrap();
    let names: Vec<&str> = current.records.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["Seed Inn", "Writer B Suites"]);
}

#[tokio::test]
async fn test_save_at_current_version_succeeds() {
    let blob = Arc::new(MemoryBlobStore::new());
    let store = CollectionStore::new(blob.clone());

    let empty = store.load::<Business>(HOTELS).await.unwrap();
    assert_eq!(empty.version, CollectionVersion::Empty);

    let mut record = hotel("Crew Rest Hotel");
    record.id = "1718000000000".to_string();
    let version = store
        .save(HOTELS, &[record.clone()], &empty.version)
        .await
        .unwrap();

    let loaded = store.load::<Business>(HOTELS).await.unwrap();
    assert_eq!(loaded.version, version);
    assert_eq!(loaded.records, vec![record]);
}

#[tokio::test]
async fn test_concurrent_adds_all_survive() {
    let blob = Arc::new(MemoryBlobStore::new());
    let store = CollectionStore::new(blob.clone());

    let mut handles = vec![];
    for i in 0..8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.add(HOTELS, hotel(&format!("Hotel {i}"))).await
        }));
    }

    let mut ids = vec![];
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id);
    }

    let stored = store.load::<Business>(HOTELS).await.unwrap();
    assert_eq!(stored.records.len(), 8);

    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8, "ids must be unique within the collection");
}

#[tokio::test]
async fn test_add_fails_while_storage_offline() {
    let blob = Arc::new(MemoryBlobStore::new());
    let store = CollectionStore::new(blob.clone()).with_conflict_retries(0);

    store.add(HOTELS, hotel("Seed Inn")).await.unwrap();
    blob.set_offline(true);

    assert!(store.add(HOTELS, hotel("Lost Inn")).await.is_err());

    blob.set_offline(false);
    let stored = store.load::<Business>(HOTELS).await.unwrap();
    assert_eq!(stored.records.len(), 1);
}

#[tokio::test]
async fn test_add_preserves_mixed_document() {
    let blob = Arc::new(MemoryBlobStore::new());
    let store = CollectionStore::new(blob.clone());
    blob.insert_raw(
        HOTELS,
        serde_json::to_vec(&json!([
            {"id": "1", "name": "Crew Inn", "createdAt": "2024-06-10T06:13:20.005Z"},
            {"id": "2", "airportCode": "DEN"},
            {"id": 3, "name": 42, "legacy": true}
        ]))
        .unwrap(),
    );

    let added = store.add(HOTELS, hotel("Layover Suites")).await.unwrap();

    let stored = read_raw(&blob).await;
    assert_eq!(stored.len(), 4);
    assert_eq!(stored[1], json!({"id": "2", "airportCode": "DEN"}));
    assert_eq!(stored[2], json!({"id": 3, "name": 42, "legacy": true}));
    assert_eq!(stored[3]["id"], added.id.as_str());

    let typed = store.load::<Business>(HOTELS).await.unwrap();
    let names: Vec<&str> = typed.records.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["Crew Inn", "Layover Suites"]);
    assert_eq!(typed.skipped, 2);
}

#[tokio::test]
async fn test_review_add_keeps_fractional_rating() {
    let blob = Arc::new(MemoryBlobStore::new());
    let store = CollectionStore::new(blob.clone());
    blob.insert_raw(
        "reviews.json",
        serde_json::to_vec(&json!([
            {"id": "1", "businessId": "10", "businessType": "hotel", "rating": 4.5, "comment": "ok"},
            {"id": "2", "businessId": "10", "businessType": "spaceport", "rating": 5}
        ]))
        .unwrap(),
    );

    let review: Review = serde_json::from_value(json!({
        "id": "",
        "businessId": "10",
        "businessType": "hotel",
        "rating": 4,
        "comment": "Quiet rooms",
        "createdAt": "2024-06-10T06:13:20.005Z"
    }))
    .unwrap();
    store.add("reviews.json", review).await.unwrap();

    let entry = blob
        .list("reviews.json")
        .await
        .unwrap()
        .into_iter()
        .find(|e| e.pathname == "reviews.json")
        .unwrap();
    let stored: Vec<serde_json::Value> =
        serde_json::from_slice(&blob.fetch(&entry).await.unwrap()).unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(stored[0]["rating"], 4.5);
    assert_eq!(stored[1]["businessType"], "spaceport");
}
