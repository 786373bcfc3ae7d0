//! Resumable district geocoder.
//!
//! Resolves coordinates for Turkish districts through Open-Meteo, with a
//! state-level fallback and a progress file that makes runs restartable.

pub mod config;
pub mod dataset;
pub mod geocode;
