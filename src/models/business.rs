// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Business records (hotels, restaurants, rentals, FBOs) stored as JSON
//! collection documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// The four business categories, each backed by one collection document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum BusinessType {
    Hotel,
    Restaurant,
    Rental,
    Fbo,
}

impl BusinessType {
    pub const ALL: [BusinessType; 4] = [
        BusinessType::Hotel,
        BusinessType::Restaurant,
        BusinessType::Rental,
        BusinessType::Fbo,
    ];

    /// Plural path segment used in URLs (`/api/hotels/...`).
    pub fn plural(self) -> &'static str {
        match self {
            BusinessType::Hotel => "hotels",
            BusinessType::Restaurant => "restaurants",
            BusinessType::Rental => "rentals",
            BusinessType::Fbo => "fbos",
        }
    }

    /// Name of the collection document in blob storage.
    pub fn collection(self) -> &'static str {
        match self {
            BusinessType::Hotel => crate::db::collections::HOTELS,
            BusinessType::Restaurant => crate::db::collections::RESTAURANTS,
            BusinessType::Rental => crate::db::collections::RENTALS,
            BusinessType::Fbo => crate::db::collections::FBOS,
        }
    }

    /// Human-readable heading for list pages.
    pub fn display_name(self) -> &'static str {
        match self {
            BusinessType::Hotel => "Hotels",
            BusinessType::Restaurant => "Restaurants",
            BusinessType::Rental => "Car Rentals",
            BusinessType::Fbo => "FBOs",
        }
    }
}

impl fmt::Display for BusinessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BusinessType::Hotel => "hotel",
            BusinessType::Restaurant => "restaurant",
            BusinessType::Rental => "rental",
            BusinessType::Fbo => "fbo",
        };
        f.write_str(name)
    }
}

impl FromStr for BusinessType {
    type Err = String;

    /// Accepts singular (`hotel`) or plural (`hotels`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.to_string() == lower || t.plural() == lower)
            .ok_or_else(|| format!("unknown business type: {s}"))
    }
}

/// A business record as stored in its collection document.
///
/// Category-specific attributes (`hasShuttle`, `crewRate`, `open24h`, ...)
/// are kept in `extra` and round-trip untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    /// Millisecond timestamp assigned at creation
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub airport_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Creation time (RFC 3339)
    #[serde(default)]
    pub created_at: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Payload for `POST /api/{type}/add`.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewBusiness {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 3, max = 4))]
    #[serde(default)]
    pub airport_code: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewBusiness {
    /// Trim the name and canonicalize the airport code. Validate after this,
    /// so length limits apply to what gets stored.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.airport_code = self
            .airport_code
            .map(|c| c.trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty());
        self
    }

    /// Build the stored record. The id is assigned by the collection store.
    pub fn into_business(self, created_at: String) -> Business {
        let NewBusiness {
            name,
            airport_code,
            city,
            address,
            mut extra,
        } = self.normalized();
        // Clients sometimes echo these back; the store owns them.
        extra.remove("id");
        extra.remove("createdAt");

        Business {
            id: String::new(),
            name,
            airport_code,
            city,
            address,
            created_at,
            extra,
        }
    }
}
