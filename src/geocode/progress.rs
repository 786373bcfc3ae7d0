//! Resumable progress file: district id → `{lat, lng}`.
//!
//! Entries are write-once. A missing file means a fresh run; a file that
//! exists but cannot be read or parsed is an error, never silently reset.
//! Flushing writes `<file>.tmp` and renames it over the target.

use super::types::{Coordinate, GeocodeError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The progress store.
#[derive(Debug, Default)]
pub struct ProgressStore {
    path: Option<PathBuf>,
    entries: BTreeMap<String, Coordinate>,
}

impl ProgressStore {
    /// Load the store backed by `path`. A missing file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(data) => serde_json::from_str(&data).map_err(|source| GeocodeError::Parse {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(GeocodeError::Read { path, source }),
        };
        Ok(Self {
            path: Some(path),
            entries,
        })
    }

    /// A store with no backing file; `flush` is a no-op.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn has(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<Coordinate> {
        self.entries.get(id).copied()
    }

    /// Insert an entry unless `id` is already present.
    /// Returns whether the entry was inserted.
    pub fn record(&mut self, id: &str, coordinate: Coordinate) -> bool {
        if self.entries.contains_key(id) {
            return false;
        }
        self.entries.insert(id.to_string(), coordinate);
        true
    }

    /// Durably write the current entries. On failure the in-memory map is
    /// kept as-is and the previous file is left intact.
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let persist_err = |source: io::Error| GeocodeError::Persist {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(persist_err)?;
        }
        let json = serde_json::to_string(&self.entries)
            .map_err(|e| persist_err(io::Error::new(io::ErrorKind::InvalidData, e)))?;

        let tmp = tmp_path(path);
        fs::write(&tmp, json).map_err(persist_err)?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(persist_err(e));
        }
        Ok(())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
