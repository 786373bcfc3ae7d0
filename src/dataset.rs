//! District and state datasets (JSON arrays on disk).
//!
//! Districts are written back with every field they were read with, plus
//! `lat`/`lng`. Ids keep their JSON representation (number or string).

use crate::geocode::{Coordinate, GeocodeError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// A record id as found in the source JSON.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl RecordId {
    /// Textual key used by the progress file and state lookups.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// A district (the unit being geocoded).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct District {
    pub id: RecordId,
    pub name: String,
    pub state_id: RecordId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    /// Fields this tool does not interpret, kept for the round trip.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl District {
    pub fn new(id: impl Into<RecordId>, name: &str, state_id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            state_id: state_id.into(),
            lat: None,
            lng: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn coordinate(&self) -> Option<Coordinate> {
        Some(Coordinate {
            lat: self.lat?,
            lng: self.lng?,
        })
    }

    pub fn set_coordinate(&mut self, c: Coordinate) {
        self.lat = Some(c.lat);
        self.lng = Some(c.lng);
    }
}

/// A state (parent region of districts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    pub id: RecordId,
    pub name: String,
}

/// State id key → state name.
#[derive(Debug, Clone, Default)]
pub struct StateIndex {
    names: HashMap<String, String>,
}

impl StateIndex {
    pub fn new(states: &[State]) -> Self {
        let names = states.iter().map(|s| (s.id.key(), s.name.clone())).collect();
        Self { names }
    }

    /// The state's name, or `""` when the id is unknown.
    pub fn name_of(&self, id: &RecordId) -> &str {
        self.names.get(&id.key()).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

pub fn load_districts(path: &Path) -> Result<Vec<District>> {
    read_json(path)
}

pub fn load_states(path: &Path) -> Result<Vec<State>> {
    read_json(path)
}

/// Write districts as pretty-printed JSON with non-ASCII text unescaped.
pub fn save_districts(path: &Path, districts: &[District]) -> Result<()> {
    let write_err = |source: std::io::Error| GeocodeError::Write {
        path: path.to_path_buf(),
        source,
    };
    let json = serde_json::to_string_pretty(districts)
        .map_err(|e| write_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    fs::write(path, json + "\n").map_err(write_err)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path).map_err(|source| GeocodeError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| GeocodeError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_round_trip_keeps_unknown_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("districts.json");
        fs::write(
            &path,
            r#"[{"id": 1, "name": "Çankaya", "state_id": 6, "slug": "cankaya", "population": 925828}]"#,
        )
        .unwrap();

        let mut districts = load_districts(&path).unwrap();
        districts[0].set_coordinate(Coordinate::rounded(39.9179, 32.86268));
        save_districts(&path, &districts).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("Çankaya"), "non-ASCII should be written unescaped");
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        let row = &value[0];
        assert_eq!(row["id"], 1);
        assert_eq!(row["slug"], "cankaya");
        assert_eq!(row["population"], 925828);
        assert_eq!(row["lat"], 39.9179);
    }

    #[test]
    fn test_ids_keep_representation() {
        let districts: Vec<District> = serde_json::from_str(
            r#"[{"id": "a-1", "name": "X", "state_id": "s-1"}, {"id": 2, "name": "Y", "state_id": 3}]"#,
        )
        .unwrap();
        assert_eq!(districts[0].id, RecordId::Text("a-1".into()));
        assert_eq!(districts[1].id, RecordId::Number(2));
        assert_eq!(districts[1].id.key(), "2");
    }

    #[test]
    fn test_unprocessed_district_omits_coordinates() {
        let json = serde_json::to_value(District::new(5i64, "Kale", 20i64)).unwrap();
        assert!(json.get("lat").is_none());
        assert!(json.get("lng").is_none());
    }

    #[test]
    fn test_state_index_lookup() {
        let states = vec![
            State { id: RecordId::Number(6), name: "Ankara".into() },
            State { id: "34".into(), name: "İstanbul".into() },
        ];
        let index = StateIndex::new(&states);
        assert_eq!(index.name_of(&RecordId::Number(6)), "Ankara");
        // numeric and textual ids address the same state
        assert_eq!(index.name_of(&RecordId::Number(34)), "İstanbul");
        assert_eq!(index.name_of(&RecordId::Number(99)), "");
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = load_states(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, GeocodeError::Read { .. }));
    }
}
