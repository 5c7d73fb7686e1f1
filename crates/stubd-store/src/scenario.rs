//! Persistent Scenario/Stub Store
//!
//! The store is the authoritative home of scenarios and their recorded
//! stubs, keyed by *qualified name* (`host:scenario`). The orchestration
//! core only ever talks to the [`ScenarioStore`] trait; the in-memory
//! implementation here backs the server and the test suites.
//!
//! Absence and failure are distinct: `find` returns `Ok(None)` for a missing
//! scenario, while `Err` means the backend itself failed. The rename protocol
//! depends on that distinction.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

use stubd_core::{FailureKind, ServiceError};

/// A scenario record: qualified name plus record timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    /// Qualified name, `host:scenario`. Globally unique in the store.
    pub name: String,
    /// Unix timestamp (seconds) when the scenario was created.
    pub recorded: u64,
}

/// One recorded request/response pairing belonging to a scenario.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StubRecord {
    /// Request body fragments that must all be present for a match
    pub matchers: Vec<String>,
    /// Recorded response body returned on match
    pub response: String,
    /// Optional delay policy name applied during playback
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_policy: Option<String>,
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        ServiceError::unclassified(FailureKind::Storage, err.to_string())
    }
}

/// Narrow interface onto the persistent scenario/stub store.
pub trait ScenarioStore: Send + Sync {
    /// Looks up a scenario by qualified name. `Ok(None)` when absent.
    fn find(&self, qualified: &str) -> Result<Option<Scenario>, StoreError>;

    /// Inserts a new scenario record. The caller checks for duplicates first;
    /// inserting an existing qualified name is a backend failure.
    fn insert(&self, qualified: &str) -> Result<Scenario, StoreError>;

    /// Removes a scenario and its stubs. Returns `false` when absent.
    fn remove(&self, qualified: &str) -> Result<bool, StoreError>;

    /// Renames a scenario record and all owned stubs, returning the number
    /// of stubs carried over. Stub membership is preserved; only identity
    /// changes.
    fn rename(&self, old_qualified: &str, new_qualified: &str) -> Result<usize, StoreError>;

    /// Appends a stub to a scenario, returning the new stub count.
    fn insert_stub(&self, qualified: &str, stub: StubRecord) -> Result<usize, StoreError>;

    /// All stubs for a scenario, in insertion order.
    fn stubs(&self, qualified: &str) -> Result<Vec<StubRecord>, StoreError>;

    /// Deletes all stubs for a scenario, returning how many were removed.
    fn delete_stubs(&self, qualified: &str) -> Result<usize, StoreError>;

    /// All scenarios whose qualified name is scoped to `host`, in creation
    /// order.
    fn list(&self, host: &str) -> Result<Vec<Scenario>, StoreError>;
}

#[derive(Debug, Clone)]
struct StoredScenario {
    record: Scenario,
    stubs: Vec<StubRecord>,
}

/// In-memory store implementation.
///
/// Insertion order is preserved for listings via a side vector of qualified
/// names.
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    scenarios: HashMap<String, StoredScenario>,
    order: Vec<String>,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("store lock poisoned".into()))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ScenarioStore for InMemoryStore {
    fn find(&self, qualified: &str) -> Result<Option<Scenario>, StoreError> {
        Ok(self.read()?.scenarios.get(qualified).map(|s| s.record.clone()))
    }

    fn insert(&self, qualified: &str) -> Result<Scenario, StoreError> {
        let mut inner = self.write()?;
        if inner.scenarios.contains_key(qualified) {
            return Err(StoreError::Backend(format!(
                "scenario already present: {}",
                qualified
            )));
        }
        let record = Scenario {
            name: qualified.to_string(),
            recorded: now_secs(),
        };
        inner.scenarios.insert(
            qualified.to_string(),
            StoredScenario {
                record: record.clone(),
                stubs: Vec::new(),
            },
        );
        inner.order.push(qualified.to_string());
        Ok(record)
    }

    fn remove(&self, qualified: &str) -> Result<bool, StoreError> {
        let mut inner = self.write()?;
        let removed = inner.scenarios.remove(qualified).is_some();
        if removed {
            inner.order.retain(|name| name != qualified);
        }
        Ok(removed)
    }

    fn rename(&self, old_qualified: &str, new_qualified: &str) -> Result<usize, StoreError> {
        let mut inner = self.write()?;
        if inner.scenarios.contains_key(new_qualified) {
            return Err(StoreError::Backend(format!(
                "target name already present: {}",
                new_qualified
            )));
        }
        let mut stored = inner
            .scenarios
            .remove(old_qualified)
            .ok_or_else(|| StoreError::Backend(format!("scenario not found: {}", old_qualified)))?;
        stored.record.name = new_qualified.to_string();
        let stub_count = stored.stubs.len();
        inner.scenarios.insert(new_qualified.to_string(), stored);
        for name in inner.order.iter_mut() {
            if name == old_qualified {
                *name = new_qualified.to_string();
            }
        }
        Ok(stub_count)
    }

    fn insert_stub(&self, qualified: &str, stub: StubRecord) -> Result<usize, StoreError> {
        let mut inner = self.write()?;
        let stored = inner
            .scenarios
            .get_mut(qualified)
            .ok_or_else(|| StoreError::Backend(format!("scenario not found: {}", qualified)))?;
        stored.stubs.push(stub);
        Ok(stored.stubs.len())
    }

    fn stubs(&self, qualified: &str) -> Result<Vec<StubRecord>, StoreError> {
        Ok(self
            .read()?
            .scenarios
            .get(qualified)
            .map(|s| s.stubs.clone())
            .unwrap_or_default())
    }

    fn delete_stubs(&self, qualified: &str) -> Result<usize, StoreError> {
        let mut inner = self.write()?;
        let stored = inner
            .scenarios
            .get_mut(qualified)
            .ok_or_else(|| StoreError::Backend(format!("scenario not found: {}", qualified)))?;
        let removed = stored.stubs.len();
        stored.stubs.clear();
        Ok(removed)
    }

    fn list(&self, host: &str) -> Result<Vec<Scenario>, StoreError> {
        let inner = self.read()?;
        let prefix = format!("{}:", host);
        Ok(inner
            .order
            .iter()
            .filter(|name| name.starts_with(&prefix))
            .filter_map(|name| inner.scenarios.get(name).map(|s| s.record.clone()))
            .collect())
    }
}
