// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage layer: JSON collection documents in Vercel Blob, reviews and
//! analytics in Neon Postgres.

pub mod blob;
pub mod collection;
pub mod memory_blob;
pub mod postgres;

pub use blob::{BlobEntry, BlobStore, StoreError, VercelBlobStore};
pub use collection::{Collection, CollectionRecord, CollectionStore, CollectionVersion};
pub use memory_blob::MemoryBlobStore;
pub use postgres::PgDb;

/// Collection document names in blob storage.
pub mod collections {
    pub const HOTELS: &str = "hotels.json";
    pub const RESTAURANTS: &str = "restaurants.json";
    pub const RENTALS: &str = "rentals.json";
    pub const FBOS: &str = "fbos.json";
    pub const REVIEWS: &str = "reviews.json";
}
