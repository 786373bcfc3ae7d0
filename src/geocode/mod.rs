//! District geocoding subsystem.
//!
//! Provides Turkish-aware name folding, candidate matching, the resumable
//! progress store, and the two-pass resolution pipeline with state-level
//! fallback.

pub mod client;
pub mod matcher;
pub mod normalize;
pub mod pipeline;
pub mod progress;
pub mod types;

pub use client::{GeocodeClient, OpenMeteoClient};
pub use matcher::Match;
pub use pipeline::{FixedDelay, NoDelay, Pacer, Pipeline, RegionCache, Resolved, RunReport, Stage};
pub use progress::ProgressStore;
pub use types::{Candidate, Coordinate, GeocodeError, GeocodeQuery, MatchTier, Result, Source};
