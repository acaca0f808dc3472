//! Process-local audit backend.
//!
//! Mirrors the PostgreSQL backend's filter, ordering, search and purge
//! semantics. Used when no database is configured and by the test suite,
//! which drives failure paths through [`FaultConfig`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use domain::models::{AuditEntry, AuditLogQuery, NewAuditEntry};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use super::{AuditBackend, IndexSpec};
use crate::error::StoreError;

/// Failures to simulate.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultConfig {
    /// `prepare` fails on every attempt.
    pub unreachable: bool,
    /// `prepare` fails this many times before succeeding.
    pub fail_first_prepares: usize,
    /// `prepare` never completes, like a connect that is never refused.
    pub hang_prepares: bool,
    /// `insert` and `purge_expired` fail.
    pub fail_inserts: bool,
    pub fail_reads: bool,
    pub fail_indexes: bool,
}

#[derive(Debug)]
struct StoredEntry {
    seq: u64,
    entry: AuditEntry,
}

#[derive(Debug, Default)]
struct Collection {
    next_seq: u64,
    entries: Vec<StoredEntry>,
    indexes: Vec<&'static str>,
}

/// In-memory audit backend.
#[derive(Debug, Default)]
pub struct InMemoryAuditBackend {
    collection: RwLock<Collection>,
    faults: RwLock<FaultConfig>,
    prepare_calls: AtomicUsize,
}

impl InMemoryAuditBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults(faults: FaultConfig) -> Self {
        Self {
            faults: RwLock::new(faults),
            ..Self::default()
        }
    }

    /// A backend whose collection can never be acquired.
    pub fn unreachable() -> Self {
        Self::with_faults(FaultConfig {
            unreachable: true,
            ..FaultConfig::default()
        })
    }

    /// Replace the active fault configuration.
    pub fn set_faults(&self, faults: FaultConfig) {
        if let Ok(mut guard) = self.faults.write() {
            *guard = faults;
        }
    }

    /// How many times `prepare` has been called.
    pub fn prepare_calls(&self) -> usize {
        self.prepare_calls.load(Ordering::SeqCst)
    }

    /// Names of the indexes created so far.
    pub fn indexes(&self) -> Vec<&'static str> {
        self.collection
            .read()
            .map(|c| c.indexes.clone())
            .unwrap_or_default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.collection.read().map(|c| c.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn faults(&self) -> FaultConfig {
        self.faults.read().map(|f| *f).unwrap_or_default()
    }

    fn read_guard(&self) -> Result<std::sync::RwLockReadGuard<'_, Collection>, StoreError> {
        self.collection
            .read()
            .map_err(|_| StoreError::Unavailable("collection lock poisoned".into()))
    }

    fn write_guard(&self) -> Result<std::sync::RwLockWriteGuard<'_, Collection>, StoreError> {
        self.collection
            .write()
            .map_err(|_| StoreError::Unavailable("collection lock poisoned".into()))
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.faults().fail_reads {
            return Err(StoreError::Unavailable("simulated read failure".into()));
        }
        Ok(())
    }

    /// Entries matching the query's filters, newest first.
    fn matching<'a>(collection: &'a Collection, query: &AuditLogQuery) -> Vec<&'a StoredEntry> {
        let mut hits: Vec<&StoredEntry> = collection
            .entries
            .iter()
            .filter(|stored| matches_query(&stored.entry, query))
            .collect();
        hits.sort_by(|a, b| {
            b.entry
                .timestamp
                .cmp(&a.entry.timestamp)
                .then(b.seq.cmp(&a.seq))
        });
        hits
    }
}

fn matches_query(entry: &AuditEntry, query: &AuditLogQuery) -> bool {
    fn eq(filter: &Option<String>, value: &str) -> bool {
        filter.as_deref().map_or(true, |f| f == value)
    }

    eq(&query.entity_type, &entry.entity_type)
        && eq(&query.entity_id, &entry.entity_id)
        && eq(&query.action, &entry.action)
        && query
            .user_id
            .as_deref()
            .map_or(true, |u| entry.user_id.as_deref() == Some(u))
        && query.start_date.map_or(true, |start| entry.timestamp >= start)
        && query.end_date.map_or(true, |end| entry.timestamp <= end)
        && query
            .search
            .as_deref()
            .map_or(true, |term| matches_search(entry, term))
}

/// True when any scalar leaf of `value` contains `needle`. Object keys and
/// JSON nulls never match.
fn json_leaf_contains(value: &JsonValue, needle: &str) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::String(s) => s.to_lowercase().contains(needle),
        JsonValue::Bool(b) => b.to_string().contains(needle),
        JsonValue::Number(n) => n.to_string().contains(needle),
        JsonValue::Array(items) => items.iter().any(|v| json_leaf_contains(v, needle)),
        JsonValue::Object(map) => map.values().any(|v| json_leaf_contains(v, needle)),
    }
}

/// Case-insensitive substring match over the values in before, after,
/// metadata and over path.
fn matches_search(entry: &AuditEntry, term: &str) -> bool {
    let needle = term.to_lowercase();
    let json_hit = |value: &Option<JsonValue>| {
        value
            .as_ref()
            .is_some_and(|v| json_leaf_contains(v, &needle))
    };

    json_hit(&entry.before)
        || json_hit(&entry.after)
        || json_hit(&entry.metadata)
        || entry
            .path
            .as_deref()
            .is_some_and(|p| p.to_lowercase().contains(&needle))
}

#[async_trait::async_trait]
impl AuditBackend for InMemoryAuditBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn prepare(&self) -> Result<(), StoreError> {
        let call = self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        let faults = self.faults();
        if faults.hang_prepares {
            std::future::pending::<()>().await;
        }
        if faults.unreachable || call < faults.fail_first_prepares {
            return Err(StoreError::Unavailable("simulated unreachable backend".into()));
        }
        Ok(())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<(), StoreError> {
        if self.faults().fail_indexes {
            return Err(StoreError::Unavailable(format!(
                "simulated index failure: {}",
                spec.name
            )));
        }
        let mut collection = self.write_guard()?;
        if !collection.indexes.contains(&spec.name) {
            collection.indexes.push(spec.name);
        }
        Ok(())
    }

    async fn insert(
        &self,
        entry: NewAuditEntry,
        timestamp: DateTime<Utc>,
    ) -> Result<AuditEntry, StoreError> {
        if self.faults().fail_inserts {
            return Err(StoreError::Unavailable("simulated insert failure".into()));
        }
        let stored = entry.into_entry(Uuid::new_v4(), timestamp);
        let mut collection = self.write_guard()?;
        let seq = collection.next_seq;
        collection.next_seq += 1;
        collection.entries.push(StoredEntry {
            seq,
            entry: stored.clone(),
        });
        Ok(stored)
    }

    async fn find(&self, query: &AuditLogQuery) -> Result<Vec<AuditEntry>, StoreError> {
        self.check_reads()?;
        let collection = self.read_guard()?;
        let skip = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        Ok(Self::matching(&collection, query)
            .into_iter()
            .skip(skip)
            .take(query.limit as usize)
            .map(|stored| stored.entry.clone())
            .collect())
    }

    async fn count(&self, query: &AuditLogQuery) -> Result<u64, StoreError> {
        self.check_reads()?;
        let collection = self.read_guard()?;
        let total = collection
            .entries
            .iter()
            .filter(|stored| matches_query(&stored.entry, query))
            .count();
        Ok(total as u64)
    }

    async fn purge_expired(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        if self.faults().fail_inserts {
            return Err(StoreError::Unavailable("simulated delete failure".into()));
        }
        let mut collection = self.write_guard()?;
        let before = collection.entries.len();
        collection
            .entries
            .retain(|stored| stored.entry.timestamp >= cutoff);
        Ok((before - collection.entries.len()) as u64)
    }
}
