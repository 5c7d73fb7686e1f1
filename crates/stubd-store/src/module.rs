//! Per-Host Module Registry
//!
//! Named modules (user-supplied transformation sources) loaded per host.
//! Module deletion is the demonstrated case for distributed command
//! propagation: the accepting node enqueues `delete/module?name=<name>`
//! commands for its peers before unloading locally.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// A loaded module: name plus source text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Module {
    pub name: String,
    pub source: String,
}

/// In-memory registry of modules keyed by host.
///
/// Listing order is insertion order per host.
pub struct ModuleRegistry {
    inner: RwLock<HashMap<String, Vec<Module>>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }

    /// Registers a module. Returns `false` when the name is already loaded
    /// for the host (the existing module is left untouched).
    pub fn insert(&self, host: &str, module: Module) -> bool {
        let Ok(mut inner) = self.inner.write() else {
            tracing::warn!("module registry lock poisoned, dropping insert");
            return false;
        };
        let modules = inner.entry(host.to_string()).or_default();
        if modules.iter().any(|m| m.name == module.name) {
            return false;
        }
        modules.push(module);
        true
    }

    /// Module names loaded for a host, in insertion order.
    pub fn names(&self, host: &str) -> Vec<String> {
        let Ok(inner) = self.inner.read() else {
            return Vec::new();
        };
        inner
            .get(host)
            .map(|modules| modules.iter().map(|m| m.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Unloads a module. Returns `false` when absent.
    pub fn remove(&self, host: &str, name: &str) -> bool {
        let Ok(mut inner) = self.inner.write() else {
            tracing::warn!("module registry lock poisoned, dropping remove");
            return false;
        };
        match inner.get_mut(host) {
            Some(modules) => {
                let before = modules.len();
                modules.retain(|m| m.name != name);
                modules.len() < before
            }
            None => false,
        }
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module(name: &str) -> Module {
        Module {
            name: name.to_string(),
            source: "pub fn transform() {}".to_string(),
        }
    }

    #[test]
    fn test_insert_and_list() {
        let registry = ModuleRegistry::new();
        assert!(registry.insert("localhost", module("a")));
        assert!(registry.insert("localhost", module("b")));
        assert_eq!(registry.names("localhost"), vec!["a", "b"]);
        assert!(registry.names("other").is_empty());
    }

    #[test]
    fn test_insert_duplicate_is_rejected() {
        let registry = ModuleRegistry::new();
        assert!(registry.insert("localhost", module("a")));
        assert!(!registry.insert("localhost", module("a")));
        assert_eq!(registry.names("localhost").len(), 1);
    }

    #[test]
    fn test_remove() {
        let registry = ModuleRegistry::new();
        registry.insert("localhost", module("a"));
        assert!(registry.remove("localhost", "a"));
        assert!(!registry.remove("localhost", "a"));
        assert!(!registry.remove("other", "a"));
    }
}
