// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Airport list loading and lookup.

use crate::models::Airport;
use std::fs;
use std::path::Path;

/// Maximum number of airports returned by a search.
pub const MAX_RESULTS: usize = 10;

/// Static airport list, loaded once at startup.
#[derive(Default, Clone)]
pub struct AirportService {
    airports: Vec<Airport>,
}

impl AirportService {
    /// Load airports from a JSON file (array of airport objects).
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, AirportError> {
        let json_data =
            fs::read_to_string(path.as_ref()).map_err(|e| AirportError::IoError(e.to_string()))?;
        Self::load_from_json(&json_data)
    }

    /// Load airports from a JSON string.
    pub fn load_from_json(json_data: &str) -> Result<Self, AirportError> {
        let airports: Vec<Airport> =
            serde_json::from_str(json_data).map_err(|e| AirportError::ParseError(e.to_string()))?;

        tracing::info!(count = airports.len(), "Loaded airports");
        Ok(Self { airports })
    }

    pub fn from_airports(airports: Vec<Airport>) -> Self {
        Self { airports }
    }

    /// Get the full list.
    pub fn airports(&self) -> &[Airport] {
        &self.airports
    }

    /// Case-insensitive substring match on code, city or name, in file order.
    pub fn search(&self, query: &str) -> Vec<Airport> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        self.airports
            .iter()
            .filter(|a| {
                a.code.to_lowercase().contains(&needle)
                    || a.city.to_lowercase().contains(&needle)
                    || a.name.to_lowercase().contains(&needle)
            })
            .take(MAX_RESULTS)
            .cloned()
            .collect()
    }
}

/// Errors from airport loading.
#[derive(Debug, thiserror::Error)]
pub enum AirportError {
    #[error("Failed to read file: {0}")]
    IoError(String),

    #[error("Failed to parse airports JSON: {0}")]
    ParseError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airport(code: &str, name: &str, city: &str) -> Airport {
        Airport {
            code: code.to_string(),
            name: name.to_string(),
            city: city.to_string(),
            state: None,
            country: None,
        }
    }

    #[test]
    fn test_matches_code_city_and_name() {
        let service = AirportService::from_airports(vec![
            airport("DEN", "Denver International Airport", "Denver"),
            airport("ORD", "O'Hare International Airport", "Chicago"),
            airport("MDW", "Midway International Airport", "Chicago"),
        ]);

        assert_eq!(service.search("den")[0].code, "DEN");
        assert_eq!(service.search("CHICAGO").len(), 2);
        assert_eq!(service.search("o'hare")[0].code, "ORD");
        assert!(service.search("zzz").is_empty());
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let service =
            AirportService::from_airports(vec![airport("DEN", "Denver International", "Denver")]);
        assert!(service.search("   ").is_empty());
    }

    #[test]
    fn test_results_capped() {
        let airports = (0..25)
            .map(|i| airport(&format!("X{i:02}"), "Regional Airport", "Springfield"))
            .collect();
        let service = AirportService::from_airports(airports);
        assert_eq!(service.search("springfield").len(), MAX_RESULTS);
    }

    #[test]
    fn test_load_bundled_file() {
        let service = AirportService::load_from_file("data/airports.json").unwrap();
        assert!(!service.airports().is_empty());
    }

    #[test]
    fn test_invalid_json_rejected() {
        assert!(matches!(
            AirportService::load_from_json("{"),
            Err(AirportError::ParseError(_))
        ));
    }
}
