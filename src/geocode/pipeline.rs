//! Resolution pipeline — orchestrates the fallback chain.
//!
//! Pass one, per district:  progress store → district query → matcher
//! Pass two, leftovers:     state cache → state query → default coordinate
//!
//! Every district leaves the pipeline with a coordinate, and every
//! coordinate is recorded in the progress store under the district id.

use super::client::GeocodeClient;
use super::matcher::{self, Match};
use super::progress::ProgressStore;
use super::types::{Candidate, Coordinate, GeocodeQuery, Source};
use crate::config::Settings;
use crate::dataset::{District, RecordId, StateIndex};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::thread;
use std::time::Duration;

// ─── Pacing ─────────────────────────────────────────────────────

/// Called before every remote query.
pub trait Pacer {
    fn before_query(&mut self);
}

impl<P: Pacer + ?Sized> Pacer for &mut P {
    fn before_query(&mut self) {
        (**self).before_query()
    }
}

/// Sleeps a fixed delay before each remote query except the first one.
pub struct FixedDelay {
    delay: Duration,
    issued: bool,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay, issued: false }
    }
}

impl Pacer for FixedDelay {
    fn before_query(&mut self) {
        if self.issued && !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.issued = true;
    }
}

/// No pacing at all.
pub struct NoDelay;

impl Pacer for NoDelay {
    fn before_query(&mut self) {}
}

// ─── State machine ──────────────────────────────────────────────

/// Where a district stands after pass one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stage {
    Cached(Coordinate),
    Geocoded(Match),
    FallbackPending,
}

impl Stage {
    fn resolved(self) -> Option<Resolved> {
        match self {
            Self::Cached(coordinate) => Some(Resolved {
                coordinate,
                source: Source::Cache,
            }),
            Self::Geocoded(m) => Some(Resolved {
                coordinate: m.coordinate,
                source: m.tier.into(),
            }),
            Self::FallbackPending => None,
        }
    }
}

/// A final coordinate and how it was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    pub coordinate: Coordinate,
    pub source: Source,
}

/// State-level results for one run, keyed by state id.
#[derive(Debug, Default)]
pub struct RegionCache {
    entries: HashMap<String, Resolved>,
}

impl RegionCache {
    pub fn get(&self, state_id: &RecordId) -> Option<Resolved> {
        self.entries.get(&state_id.key()).copied()
    }

    pub fn insert(&mut self, state_id: &RecordId, resolved: Resolved) {
        self.entries.insert(state_id.key(), resolved);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub total: usize,
    /// Districts whose entry was already in the store when the run started.
    pub cached: usize,
    /// Repeated district ids; they reuse the entry made earlier in this run.
    pub duplicates: usize,
    pub geocoded: usize,
    pub region_fallback: usize,
    pub default_fallback: usize,
    pub remote_queries: usize,
    pub transport_errors: usize,
    pub flush_failures: usize,
    /// Error from the closing flush, if it failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_flush_error: Option<String>,
    /// Districts that ended up with a state-level or default coordinate.
    pub fallback_districts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunReport {
    /// Districts holding a coordinate after the run.
    pub fn resolved(&self) -> usize {
        self.cached + self.duplicates + self.geocoded + self.region_fallback + self.default_fallback
    }
}

// ─── Pipeline ───────────────────────────────────────────────────

/// The two-pass district resolver.
pub struct Pipeline<C, P> {
    client: C,
    pacer: P,
    settings: Settings,
}

impl<C: GeocodeClient, P: Pacer> Pipeline<C, P> {
    pub fn new(client: C, pacer: P, settings: Settings) -> Self {
        Self {
            client,
            pacer,
            settings: settings.sanitized(),
        }
    }

    /// Resolve every district, writing `lat`/`lng` in place.
    pub fn run(
        &mut self,
        districts: &mut [District],
        states: &StateIndex,
        store: &mut ProgressStore,
    ) -> RunReport {
        let total = districts.len();
        let mut report = RunReport {
            total,
            ..RunReport::default()
        };
        let mut since_flush = 0;
        let mut seen = HashSet::new();

        // Pass one
        let mut stages = Vec::with_capacity(total);
        for (i, district) in districts.iter().enumerate() {
            let id = district.id.key();
            let state_name = states.name_of(&district.state_id);
            let repeated = !seen.insert(id.clone());
            let stage = self.resolve_district(&id, &district.name, state_name, store, &mut report);
            if matches!(stage, Stage::Cached(_)) {
                if repeated {
                    report.duplicates += 1;
                } else {
                    report.cached += 1;
                }
            }
            log_stage(i + 1, total, &id, &district.name, state_name, &stage, repeated);

            if !matches!(stage, Stage::Cached(_)) {
                self.tick(&mut since_flush, store, &mut report);
            }
            stages.push(stage);
        }

        // Pass two
        let mut regions = RegionCache::default();
        for (district, stage) in districts.iter_mut().zip(stages) {
            let resolved = match stage.resolved() {
                Some(r) => r,
                None => {
                    let id = district.id.key();
                    let state_name = states.name_of(&district.state_id);
                    let mut r = self.resolve_region(&district.state_id, state_name, &mut regions, &mut report);
                    if !store.record(&id, r.coordinate) {
                        if let Some(existing) = store.get(&id) {
                            r.coordinate = existing;
                        }
                    }

                    let outcome = match r.source {
                        Source::Default => {
                            report.default_fallback += 1;
                            "default_fallback"
                        }
                        _ => {
                            report.region_fallback += 1;
                            "region_fallback"
                        }
                    };
                    report.fallback_districts.push(district.name.clone());
                    tracing::info!(
                        id = %id,
                        district = %district.name,
                        state = %state_name,
                        outcome,
                        lat = r.coordinate.lat,
                        lng = r.coordinate.lng,
                        "fallback applied"
                    );

                    self.tick(&mut since_flush, store, &mut report);
                    r
                }
            };
            district.set_coordinate(resolved.coordinate);
        }

        if let Err(e) = store.flush() {
            tracing::error!(error = %e, "final progress flush failed");
            report.flush_failures += 1;
            report.final_flush_error = Some(e.to_string());
        }
        report.finished_at = Some(Utc::now());
        report
    }

    /// Pass one for a single district. Cache hits are left for the caller to count.
    pub fn resolve_district(
        &mut self,
        id: &str,
        name: &str,
        state_name: &str,
        store: &mut ProgressStore,
        report: &mut RunReport,
    ) -> Stage {
        if let Some(coordinate) = store.get(id) {
            return Stage::Cached(coordinate);
        }

        let query = GeocodeQuery {
            name: name.to_string(),
            language: self.settings.language.clone(),
            count: self.settings.item_result_count,
        };
        let Some(candidates) = self.query(&query, report) else {
            return Stage::FallbackPending;
        };

        match matcher::resolve(&candidates, state_name, &self.settings.country) {
            Some(m) => {
                store.record(id, m.coordinate);
                report.geocoded += 1;
                Stage::Geocoded(m)
            }
            None => Stage::FallbackPending,
        }
    }

    /// State-level coordinate, queried at most once per state per run.
    pub fn resolve_region(
        &mut self,
        state_id: &RecordId,
        state_name: &str,
        cache: &mut RegionCache,
        report: &mut RunReport,
    ) -> Resolved {
        if let Some(hit) = cache.get(state_id) {
            return hit;
        }
        let resolved = self.lookup_region(state_name, report);
        cache.insert(state_id, resolved);
        resolved
    }

    fn lookup_region(&mut self, state_name: &str, report: &mut RunReport) -> Resolved {
        let default = Resolved {
            coordinate: self.settings.default_coordinate,
            source: Source::Default,
        };
        if state_name.trim().is_empty() {
            tracing::warn!("unknown state; using default coordinate");
            return default;
        }

        let query = GeocodeQuery {
            name: state_name.to_string(),
            language: self.settings.language.clone(),
            count: self.settings.region_result_count,
        };
        let found = self
            .query(&query, report)
            .and_then(|candidates| matcher::first_in_country(&candidates, &self.settings.country));

        match found {
            Some(coordinate) => {
                tracing::info!(state = %state_name, lat = coordinate.lat, lng = coordinate.lng, "state center");
                Resolved {
                    coordinate,
                    source: Source::Region,
                }
            }
            None => {
                tracing::warn!(state = %state_name, "state not found; using default coordinate");
                default
            }
        }
    }

    /// One paced remote query. Transport failures are logged and become `None`.
    fn query(&mut self, query: &GeocodeQuery, report: &mut RunReport) -> Option<Vec<Candidate>> {
        self.pacer.before_query();
        report.remote_queries += 1;
        match self.client.search(query) {
            Ok(candidates) => Some(candidates),
            Err(e) => {
                report.transport_errors += 1;
                tracing::warn!(query = %query.name, error = %e, "geocode query failed");
                None
            }
        }
    }

    /// Count one processed district and flush once a batch is complete.
    fn tick(&self, since_flush: &mut usize, store: &ProgressStore, report: &mut RunReport) {
        *since_flush += 1;
        if *since_flush >= self.settings.flush_every {
            self.checkpoint(store, report);
            *since_flush = 0;
        }
    }

    fn checkpoint(&self, store: &ProgressStore, report: &mut RunReport) {
        match store.flush() {
            Ok(()) => tracing::info!(saved = store.len(), "progress saved"),
            Err(e) => {
                report.flush_failures += 1;
                tracing::warn!(error = %e, "progress flush failed; retrying at next checkpoint");
            }
        }
    }
}

fn log_stage(index: usize, total: usize, id: &str, name: &str, state: &str, stage: &Stage, repeated: bool) {
    match stage {
        Stage::Cached(c) if repeated => {
            tracing::info!(index, total, id, district = name, state, outcome = "duplicate", lat = c.lat, lng = c.lng, "duplicate id")
        }
        Stage::Cached(c) => {
            tracing::info!(index, total, id, district = name, state, outcome = "cached", lat = c.lat, lng = c.lng, "cache hit")
        }
        Stage::Geocoded(m) => tracing::info!(
            index,
            total,
            id,
            district = name,
            state,
            outcome = "resolved",
            tier = ?m.tier,
            lat = m.coordinate.lat,
            lng = m.coordinate.lng,
            "OK"
        ),
        Stage::FallbackPending => {
            tracing::info!(index, total, id, district = name, state, outcome = "not_found", "NOT FOUND")
        }
    }
}
