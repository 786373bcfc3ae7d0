//! Geocoding providers: the `GeocodeClient` seam and the Open-Meteo client.

use super::types::{Candidate, GeocodeError, GeocodeQuery};
use serde::Deserialize;
use std::time::Duration;

pub const OPEN_METEO_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";

const USER_AGENT: &str = "DistrictGeocoder/0.1 (district-geocoder)";

/// Anything that can turn a free-text place name into candidate rows.
pub trait GeocodeClient {
    fn search(&self, query: &GeocodeQuery) -> Result<Vec<Candidate>, GeocodeError>;
}

impl<T: GeocodeClient + ?Sized> GeocodeClient for &T {
    fn search(&self, query: &GeocodeQuery) -> Result<Vec<Candidate>, GeocodeError> {
        (**self).search(query)
    }
}

// ─── Open-Meteo provider ────────────────────────────────────────

#[derive(Deserialize, Debug)]
struct SearchResponse {
    /// Absent when nothing matched. Rows are decoded one by one.
    #[serde(default)]
    results: Vec<serde_json::Value>,
}

impl SearchResponse {
    /// Decodable rows, in response order; malformed rows are dropped.
    fn candidates(self) -> Vec<Candidate> {
        self.results
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<Candidate>(row) {
                Ok(c) => Some(c),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed geocoder row");
                    None
                }
            })
            .collect()
    }
}

/// Blocking client for the Open-Meteo geocoding API.
pub struct OpenMeteoClient {
    agent: ureq::Agent,
    endpoint: String,
}

impl OpenMeteoClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            endpoint: endpoint.into(),
        }
    }
}

impl GeocodeClient for OpenMeteoClient {
    fn search(&self, query: &GeocodeQuery) -> Result<Vec<Candidate>, GeocodeError> {
        let count = query.count.to_string();
        let response = self
            .agent
            .get(&self.endpoint)
            .query("name", &query.name)
            .query("count", &count)
            .query("language", &query.language)
            .query("format", "json")
            .call()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        let body: SearchResponse = response
            .into_json()
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        let candidates = body.candidates();
        tracing::debug!(query = %query.name, results = candidates.len(), "open-meteo search");
        Ok(candidates)
    }
}
