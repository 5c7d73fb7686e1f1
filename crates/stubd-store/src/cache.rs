//! Per-Host Session Cache
//!
//! The cache maps sessions to fast-lookup playback data, scoped per host.
//! It is derived state: never authoritative, always reconstructible from the
//! persistent store. The scenario-rename protocol tears it down and rebuilds
//! it, so every operation here is exposed through the [`SessionCache`] trait
//! the orchestration core calls.
//!
//! Session entries are scoped by *unqualified* scenario name within the
//! cache's host, matching the store's `host:scenario` qualification at the
//! boundary above.
//!
//! Invariant: a newly created session entry defaults to `playback` status
//! (playback-ready). Callers that need a dormant entry — the rename rebuild
//! does — must end the session explicitly.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::RwLock;
use thiserror::Error;

use crate::delay::DelayPolicy;
use crate::scenario::StubRecord;
use stubd_core::{FailureKind, ServiceError};

/// Session status within the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Record,
    Playback,
    Dormant,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionStatus::Record => "record",
            SessionStatus::Playback => "playback",
            SessionStatus::Dormant => "dormant",
        };
        f.write_str(name)
    }
}

/// A cached session: scenario scope, status, and playback stubs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionEntry {
    /// Session name, unique within the host's namespace
    pub session: String,
    /// Unqualified scenario name the session belongs to
    pub scenario: String,
    /// Current status
    pub status: SessionStatus,
    /// Stubs loaded for playback lookups
    pub stubs: Vec<StubRecord>,
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend failure: {0}")]
    Backend(String),
}

impl From<CacheError> for ServiceError {
    fn from(err: CacheError) -> Self {
        ServiceError::unclassified(FailureKind::Cache, err.to_string())
    }
}

/// Narrow interface onto the per-host session cache.
pub trait SessionCache: Send + Sync {
    /// Host this cache is scoped to.
    fn host(&self) -> &str;

    /// `(session, status)` pairs for a scenario, in creation order.
    fn session_statuses(&self, scenario: &str)
        -> Result<Vec<(String, SessionStatus)>, CacheError>;

    /// Deletes every cache entry scoped to a scenario, returning the count.
    fn delete_all(&self, scenario: &str) -> Result<usize, CacheError>;

    /// Creates a fresh session entry under a scenario. New entries default
    /// to `playback` status with no stubs loaded.
    fn create_session_entry(&self, scenario: &str, session: &str) -> Result<(), CacheError>;

    /// Looks up a session by name. `Ok(None)` when absent.
    fn find_session(&self, session: &str) -> Result<Option<SessionEntry>, CacheError>;

    /// Sets a session's status. Returns `false` when the session is absent.
    fn set_status(&self, session: &str, status: SessionStatus) -> Result<bool, CacheError>;

    /// Idempotent transition to `dormant`. A missing session is a no-op.
    fn end_session(&self, session: &str) -> Result<(), CacheError>;

    /// Replaces the stubs loaded for a session's playback lookups.
    fn put_session_stubs(&self, session: &str, stubs: Vec<StubRecord>) -> Result<(), CacheError>;

    /// Stores a delay policy, returning `true` when the name is new.
    fn set_delay_policy(&self, policy: DelayPolicy) -> Result<bool, CacheError>;

    /// Fetches a delay policy by name.
    fn get_delay_policy(&self, name: &str) -> Result<Option<DelayPolicy>, CacheError>;

    /// All delay policies, in creation order.
    fn all_delay_policies(&self) -> Result<Vec<DelayPolicy>, CacheError>;

    /// Deletes a delay policy. Returns `false` when absent.
    fn delete_delay_policy(&self, name: &str) -> Result<bool, CacheError>;
}

/// In-memory cache implementation.
///
/// Entries are held in insertion order; all lookups scan. The cache is small
/// and rebuildable, so ordering fidelity matters more than lookup speed here.
pub struct InMemoryCache {
    host: String,
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    sessions: Vec<SessionEntry>,
    policies: Vec<DelayPolicy>,
}

impl InMemoryCache {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            inner: RwLock::new(Inner::default()),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, CacheError> {
        self.inner
            .read()
            .map_err(|_| CacheError::Backend("cache lock poisoned".into()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, CacheError> {
        self.inner
            .write()
            .map_err(|_| CacheError::Backend("cache lock poisoned".into()))
    }
}

impl SessionCache for InMemoryCache {
    fn host(&self) -> &str {
        &self.host
    }

    fn session_statuses(
        &self,
        scenario: &str,
    ) -> Result<Vec<(String, SessionStatus)>, CacheError> {
        Ok(self
            .read()?
            .sessions
            .iter()
            .filter(|e| e.scenario == scenario)
            .map(|e| (e.session.clone(), e.status))
            .collect())
    }

    fn delete_all(&self, scenario: &str) -> Result<usize, CacheError> {
        let mut inner = self.write()?;
        let before = inner.sessions.len();
        inner.sessions.retain(|e| e.scenario != scenario);
        Ok(before - inner.sessions.len())
    }

    fn create_session_entry(&self, scenario: &str, session: &str) -> Result<(), CacheError> {
        let mut inner = self.write()?;
        // An existing entry for the same session is replaced in place,
        // keeping its slot in the ordering.
        if let Some(existing) = inner.sessions.iter_mut().find(|e| e.session == session) {
            existing.scenario = scenario.to_string();
            existing.status = SessionStatus::Playback;
            existing.stubs.clear();
            return Ok(());
        }
        inner.sessions.push(SessionEntry {
            session: session.to_string(),
            scenario: scenario.to_string(),
            status: SessionStatus::Playback,
            stubs: Vec::new(),
        });
        Ok(())
    }

    fn find_session(&self, session: &str) -> Result<Option<SessionEntry>, CacheError> {
        Ok(self
            .read()?
            .sessions
            .iter()
            .find(|e| e.session == session)
            .cloned())
    }

    fn set_status(&self, session: &str, status: SessionStatus) -> Result<bool, CacheError> {
        let mut inner = self.write()?;
        match inner.sessions.iter_mut().find(|e| e.session == session) {
            Some(entry) => {
                entry.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn end_session(&self, session: &str) -> Result<(), CacheError> {
        self.set_status(session, SessionStatus::Dormant)?;
        Ok(())
    }

    fn put_session_stubs(&self, session: &str, stubs: Vec<StubRecord>) -> Result<(), CacheError> {
        let mut inner = self.write()?;
        if let Some(entry) = inner.sessions.iter_mut().find(|e| e.session == session) {
            entry.stubs = stubs;
        }
        Ok(())
    }

    fn set_delay_policy(&self, policy: DelayPolicy) -> Result<bool, CacheError> {
        let mut inner = self.write()?;
        if let Some(existing) = inner.policies.iter_mut().find(|p| p.name == policy.name) {
            *existing = policy;
            Ok(false)
        } else {
            inner.policies.push(policy);
            Ok(true)
        }
    }

    fn get_delay_policy(&self, name: &str) -> Result<Option<DelayPolicy>, CacheError> {
        Ok(self
            .read()?
            .policies
            .iter()
            .find(|p| p.name == name)
            .cloned())
    }

    fn all_delay_policies(&self) -> Result<Vec<DelayPolicy>, CacheError> {
        Ok(self.read()?.policies.clone())
    }

    fn delete_delay_policy(&self, name: &str) -> Result<bool, CacheError> {
        let mut inner = self.write()?;
        let before = inner.policies.len();
        inner.policies.retain(|p| p.name != name);
        Ok(inner.policies.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delay::DelayType;

    #[test]
    fn test_new_entry_defaults_to_playback() {
        let cache = InMemoryCache::new("localhost");
        cache.create_session_entry("foo", "bar").unwrap();
        let entry = cache.find_session("bar").unwrap().unwrap();
        assert_eq!(entry.status, SessionStatus::Playback);
        assert_eq!(entry.scenario, "foo");
        assert!(entry.stubs.is_empty());
    }

    #[test]
    fn test_session_statuses_ordered_and_scoped() {
        let cache = InMemoryCache::new("localhost");
        cache.create_session_entry("foo", "s1").unwrap();
        cache.create_session_entry("other", "x1").unwrap();
        cache.create_session_entry("foo", "s2").unwrap();
        cache.end_session("s2").unwrap();

        let statuses = cache.session_statuses("foo").unwrap();
        assert_eq!(
            statuses,
            vec![
                ("s1".to_string(), SessionStatus::Playback),
                ("s2".to_string(), SessionStatus::Dormant),
            ]
        );
    }

    #[test]
    fn test_delete_all_only_touches_scenario() {
        let cache = InMemoryCache::new("localhost");
        cache.create_session_entry("foo", "s1").unwrap();
        cache.create_session_entry("other", "x1").unwrap();
        assert_eq!(cache.delete_all("foo").unwrap(), 1);
        assert!(cache.find_session("s1").unwrap().is_none());
        assert!(cache.find_session("x1").unwrap().is_some());
    }

    #[test]
    fn test_end_session_is_idempotent() {
        let cache = InMemoryCache::new("localhost");
        cache.create_session_entry("foo", "s1").unwrap();
        cache.end_session("s1").unwrap();
        cache.end_session("s1").unwrap();
        assert_eq!(
            cache.find_session("s1").unwrap().unwrap().status,
            SessionStatus::Dormant
        );
        // Missing session is a no-op, not an error.
        cache.end_session("nope").unwrap();
    }

    #[test]
    fn test_delay_policy_new_then_updated() {
        let cache = InMemoryCache::new("localhost");
        let policy = DelayPolicy {
            name: "slow".into(),
            delay_type: DelayType::Fixed,
            milliseconds: Some(500),
            mean: None,
            stddev: None,
            delays: None,
        };
        assert!(cache.set_delay_policy(policy.clone()).unwrap());
        assert!(!cache.set_delay_policy(policy).unwrap());
        assert!(cache.get_delay_policy("slow").unwrap().is_some());
        assert!(cache.delete_delay_policy("slow").unwrap());
        assert!(!cache.delete_delay_policy("slow").unwrap());
    }
}
