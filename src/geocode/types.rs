//! Core types for the geocoding subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A resolved latitude/longitude pair, rounded to 6 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    /// Build a coordinate, rounding both axes to 6 decimals.
    pub fn rounded(lat: f64, lng: f64) -> Self {
        Self {
            lat: round6(lat),
            lng: round6(lng),
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat, self.lng)
    }
}

fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}

/// A single geocoder result row. Every field is optional so a malformed
/// row can still be decoded and then skipped by the matcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    /// First-level administrative area (the state/il).
    #[serde(default)]
    pub admin1: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Candidate {
    /// The candidate's coordinate, if both axes are present and finite.
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) if lat.is_finite() && lng.is_finite() => {
                Some(Coordinate::rounded(lat, lng))
            }
            _ => None,
        }
    }
}

/// A free-text lookup sent to a [`GeocodeClient`](super::client::GeocodeClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeQuery {
    pub name: String,
    pub language: String,
    pub count: usize,
}

/// Which matcher tier picked a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    Exact,
    Partial,
    FirstResult,
}

/// How an item's coordinate was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Cache,
    Exact,
    Partial,
    FirstResult,
    Region,
    Default,
}

impl From<MatchTier> for Source {
    fn from(tier: MatchTier) -> Self {
        match tier {
            MatchTier::Exact => Self::Exact,
            MatchTier::Partial => Self::Partial,
            MatchTier::FirstResult => Self::FirstResult,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Exact => write!(f, "exact"),
            Self::Partial => write!(f, "partial"),
            Self::FirstResult => write!(f, "first result"),
            Self::Region => write!(f, "state center"),
            Self::Default => write!(f, "default"),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeocodeError>;

/// Geocoding errors.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid API response: {0}")]
    InvalidResponse(String),
    #[error("failed to persist progress to {}: {source}", path.display())]
    Persist { path: PathBuf, source: io::Error },
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("malformed JSON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

impl GeocodeError {
    /// Transport-level failures are recovered per query; everything else
    /// concerns local files.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Network(_) | Self::InvalidResponse(_))
    }
}
