//! Run settings. Defaults target Turkish districts on Open-Meteo.

use crate::geocode::client::OPEN_METEO_URL;
use crate::geocode::Coordinate;
use std::path::PathBuf;
use std::time::Duration;

/// Ankara, used when even the state-level lookup finds nothing.
pub const DEFAULT_COORDINATE: Coordinate = Coordinate {
    lat: 39.9334,
    lng: 32.8597,
};

#[derive(Debug, Clone)]
pub struct Settings {
    /// ISO 3166-1 alpha-2 code candidates must carry.
    pub country: String,
    /// Language hint sent with every query.
    pub language: String,
    pub item_result_count: usize,
    pub region_result_count: usize,
    pub timeout: Duration,
    /// Pause between consecutive remote queries.
    pub delay: Duration,
    /// Flush the progress store after this many processed districts.
    pub flush_every: usize,
    pub default_coordinate: Coordinate,
    pub endpoint: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            country: "TR".into(),
            language: "tr".into(),
            item_result_count: 10,
            region_result_count: 5,
            timeout: Duration::from_secs(10),
            delay: Duration::from_millis(150),
            flush_every: 50,
            default_coordinate: DEFAULT_COORDINATE,
            endpoint: OPEN_METEO_URL.into(),
        }
    }
}

impl Settings {
    /// Clamp values that would make a run misbehave.
    pub fn sanitized(mut self) -> Self {
        self.country = self.country.trim().to_uppercase();
        self.flush_every = self.flush_every.max(1);
        self.item_result_count = self.item_result_count.max(1);
        self.region_result_count = self.region_result_count.max(1);
        self
    }
}

/// Default progress file: `<cache dir>/district-geocoder/progress.json`.
pub fn default_progress_path() -> PathBuf {
    dirs::cache_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("district-geocoder")
        .join("progress.json")
}
