//! Append-only record store persisted as one JSON array.
//!
//! The whole sequence is held in memory behind an `RwLock`. Reads share the
//! lock; `append` holds the write lock while it persists, so at most one
//! append is in flight. The in-memory sequence only grows after the file
//! has been replaced, so readers never see a record that failed to persist.

use chrono::Local;
use mediscribe_core::util::write_atomic;
use mediscribe_core::{ExtractedRecord, RecordRepository};
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::id::next_id;

#[derive(Debug, Default)]
struct State {
    records: Vec<ExtractedRecord>,
    ids: HashSet<String>,
}

impl State {
    fn new(records: Vec<ExtractedRecord>) -> Self {
        let ids = records
            .iter()
            .filter_map(|r| r.record_id.clone())
            .collect();
        Self { records, ids }
    }
}

/// The stored sequence followed by one record not yet committed to memory.
struct WithPending<'a> {
    records: &'a [ExtractedRecord],
    pending: &'a ExtractedRecord,
}

impl Serialize for WithPending<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.records.iter().chain(std::iter::once(self.pending)))
    }
}

/// JSON-file backed store of extracted records.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    state: RwLock<State>,
}

impl RecordStore {
    /// Open the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    /// There is no partial recovery.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = load_records(&path)?;
        info!(
            "Record store opened at {} with {} record(s)",
            path.display(),
            records.len()
        );

        Ok(Self {
            path,
            state: RwLock::new(State::new(records)),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_state(&self) -> RwLockReadGuard<'_, State> {
        // State is only mutated after a successful persist, so a poisoned
        // guard still holds a consistent sequence.
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Assign a fresh identifier, append, and persist the full sequence.
    ///
    /// Any `record_id` already on `record` is replaced. On a persist
    /// failure nothing is appended.
    pub fn append(&self, mut record: ExtractedRecord) -> Result<String, StoreError> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;

        let record_id = next_id(&Local::now(), |id| state.ids.contains(id));
        record.record_id = Some(record_id.clone());

        write_records(
            &self.path,
            &WithPending {
                records: &state.records,
                pending: &record,
            },
        )?;
        state.records.push(record);
        state.ids.insert(record_id.clone());
        info!("Stored record {record_id} ({} total)", state.records.len());

        Ok(record_id)
    }

    /// The record with `record_id`, or `None` if there is none.
    #[must_use]
    pub fn get(&self, record_id: &str) -> Option<ExtractedRecord> {
        self.read_state()
            .records
            .iter()
            .find(|r| r.record_id.as_deref() == Some(record_id))
            .cloned()
    }

    /// Records whose `patient_name` equals `name` exactly, in store order.
    #[must_use]
    pub fn search_by_name(&self, name: &str) -> Vec<ExtractedRecord> {
        let found: Vec<ExtractedRecord> = self
            .read_state()
            .records
            .iter()
            .filter(|r| r.patient_name.as_deref() == Some(name))
            .cloned()
            .collect();
        debug!("Search for {name:?} matched {} record(s)", found.len());
        found
    }

    /// The first `limit` records in insertion order, or all of them.
    #[must_use]
    pub fn get_all(&self, limit: Option<usize>) -> Vec<ExtractedRecord> {
        self.read_state()
            .records
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read_state().records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_state().records.is_empty()
    }

    /// Write a copy of every record to `path` in the persisted format.
    pub fn export_to(&self, path: &Path) -> Result<(), StoreError> {
        let state = self.read_state();
        write_records(path, &state.records)?;
        info!(
            "Exported {} record(s) to {}",
            state.records.len(),
            path.display()
        );
        Ok(())
    }
}

impl RecordRepository for RecordStore {
    type Error = StoreError;

    fn append(&self, record: ExtractedRecord) -> Result<String, Self::Error> {
        Self::append(self, record)
    }

    fn get(&self, record_id: &str) -> Option<ExtractedRecord> {
        Self::get(self, record_id)
    }

    fn search_by_name(&self, name: &str) -> Vec<ExtractedRecord> {
        Self::search_by_name(self, name)
    }

    fn get_all(&self, limit: Option<usize>) -> Vec<ExtractedRecord> {
        Self::get_all(self, limit)
    }
}

fn load_records(path: &Path) -> Result<Vec<ExtractedRecord>, StoreError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_json::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn write_records<T: Serialize + ?Sized>(path: &Path, records: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let bytes = serde_json::to_vec_pretty(records).map_err(StoreError::Serialize)?;

    write_atomic(path, &bytes).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}
