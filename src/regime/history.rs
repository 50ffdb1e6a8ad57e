// =============================================================================
// Regime History Store
// =============================================================================
//
// The only state that survives across runs: a date -> entry map recording the
// stabilised regime label (plus the raw classified label) for every evaluated
// date.  Writes are additive; re-writing a date replaces its entry.
//
// The file-backed store is a JSON object keyed by `YYYY-MM-DD`:
//
//   { "2024-03-01": { "label": "trend", "classified": "breakout",
//                     "timestamp": "2024-03-01T21:00:00Z" }, ... }
//
// A missing or unreadable file is an empty history, never an error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::persistence::write_atomic;
use crate::types::RegimeLabel;

/// One recorded evaluation date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeHistoryEntry {
    /// Stabilised label returned for the date.
    pub label: RegimeLabel,
    /// Label the classifier produced before debouncing.  Absent in files
    /// written before this field existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classified: Option<RegimeLabel>,
    pub timestamp: DateTime<Utc>,
}

impl RegimeHistoryEntry {
    pub fn new(label: RegimeLabel, classified: RegimeLabel) -> Self {
        Self {
            label,
            classified: Some(classified),
            timestamp: Utc::now(),
        }
    }

    /// Raw classified label, falling back to the recorded one.
    pub fn classified_label(&self) -> RegimeLabel {
        self.classified.unwrap_or(self.label)
    }
}

pub type RegimeHistory = BTreeMap<NaiveDate, RegimeHistoryEntry>;

/// Persisted regime history, injected into `RegimeHysteresis`.
pub trait RegimeHistoryStore: Send {
    /// Every entry, ordered by date.
    fn load_all(&self) -> &RegimeHistory;

    /// Insert or replace the entry for `date`.
    fn append(&mut self, date: NaiveDate, entry: RegimeHistoryEntry);

    /// Make pending writes durable.
    fn save(&mut self) -> Result<(), CoreError>;

    /// Up to `count` entries strictly before `date`, newest first.
    fn recent_before(&self, date: NaiveDate, count: usize) -> Vec<(NaiveDate, RegimeHistoryEntry)> {
        self.load_all()
            .range(..date)
            .rev()
            .take(count)
            .map(|(d, e)| (*d, e.clone()))
            .collect()
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Store with no durability, for tests and one-shot runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryHistoryStore {
    entries: RegimeHistory,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: RegimeHistory) -> Self {
        Self { entries }
    }
}

impl RegimeHistoryStore for InMemoryHistoryStore {
    fn load_all(&self) -> &RegimeHistory {
        &self.entries
    }

    fn append(&mut self, date: NaiveDate, entry: RegimeHistoryEntry) {
        self.entries.insert(date, entry);
    }

    fn save(&mut self) -> Result<(), CoreError> {
        Ok(())
    }
}

// =============================================================================
// JSON file store
// =============================================================================

/// Store persisted as one JSON object, saved with an atomic tmp + rename.
#[derive(Debug)]
pub struct JsonFileHistoryStore {
    path: PathBuf,
    entries: RegimeHistory,
    dirty: bool,
}

impl JsonFileHistoryStore {
    /// Open the store at `path`.  A missing or corrupt file starts empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::read_entries(&path);
        Self {
            path,
            entries,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(path: &Path) -> RegimeHistory {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no regime history yet, starting empty");
                return RegimeHistory::new();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "regime history unreadable, starting empty");
                return RegimeHistory::new();
            }
        };

        match serde_json::from_str::<RegimeHistory>(&content) {
            Ok(entries) => {
                info!(path = %path.display(), entries = entries.len(), "regime history loaded");
                entries
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "regime history corrupt, starting empty");
                RegimeHistory::new()
            }
        }
    }
}

impl RegimeHistoryStore for JsonFileHistoryStore {
    fn load_all(&self) -> &RegimeHistory {
        &self.entries
    }

    fn append(&mut self, date: NaiveDate, entry: RegimeHistoryEntry) {
        self.entries.insert(date, entry);
        self.dirty = true;
    }

    fn save(&mut self) -> Result<(), CoreError> {
        if !self.dirty {
            return Ok(());
        }
        let content = serde_json::to_string_pretty(&self.entries)
            .map_err(|e| CoreError::Persistence(format!("serialise regime history: {e}")))?;
        write_atomic(&self.path, &content)
            .map_err(|e| CoreError::Persistence(format!("{e:#}")))?;
        self.dirty = false;
        debug!(path = %self.path.display(), entries = self.entries.len(), "regime history saved");
        Ok(())
    }
}
