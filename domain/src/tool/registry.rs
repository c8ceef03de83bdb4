//! Flat, name-keyed catalog of every tool the agent can dispatch.
//!
//! Registration is append-only for the lifetime of a registry and rejects
//! name collisions outright; remote tools avoid cross-server collisions by
//! carrying namespaced names (see [`super::contract::namespaced`]). The
//! registry holds contracts only: resolution tells the dispatcher *what*
//! a name is, never *how* to run it.

use std::collections::BTreeMap;

use thiserror::Error;

use super::contract::ToolContract;

/// Errors raised while populating a [`ToolRegistry`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A contract was registered under a name that is already taken.
    #[error("duplicate tool name: '{name}' is already registered")]
    DuplicateToolName { name: String },
}

/// Catalog of tool contracts keyed by exposed name.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    // BTreeMap keeps snapshots deterministically sorted by name.
    tools: BTreeMap<String, ToolContract>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    /// Registers a contract under its exposed name.
    ///
    /// Fails without modifying the registry if the name is already taken.
    pub fn register(&mut self, contract: ToolContract) -> Result<(), RegistryError> {
        if self.tools.contains_key(&contract.name) {
            return Err(RegistryError::DuplicateToolName {
                name: contract.name.clone(),
            });
        }
        self.tools.insert(contract.name.clone(), contract);
        Ok(())
    }

    /// Looks up a contract by exposed name.
    pub fn resolve(&self, name: &str) -> Option<&ToolContract> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All registered contracts, sorted by name.
    ///
    /// This is the exact set advertised to the model on each request, so
    /// the ordering must be stable across calls.
    pub fn snapshot(&self) -> Vec<ToolContract> {
        self.tools.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::schema::ParameterSchema;

    fn contract(name: &str) -> ToolContract {
        ToolContract::in_process(name, format!("{name} description"), ParameterSchema::empty())
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = ToolRegistry::new();
        registry.register(contract("time_now")).unwrap();

        let resolved = registry.resolve("time_now").unwrap();
        assert_eq!(resolved.name, "time_now");
        assert_eq!(resolved.description, "time_now description");
        assert!(registry.contains("time_now"));
        assert!(!registry.contains("time_later"));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(contract("read_file")).unwrap();

        let err = registry.register(contract("read_file")).unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateToolName {
                name: "read_file".to_string()
            }
        );
        // First registration survives intact
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_across_sources_rejected() {
        let mut registry = ToolRegistry::new();
        registry.register(contract("search")).unwrap();

        let remote =
            ToolContract::remote("indexer", "search", "remote search", ParameterSchema::empty());
        // Namespaced remote name does not collide with the local one
        registry.register(remote).unwrap();
        assert!(registry.contains("indexer__search"));

        // But an identical namespaced name does
        let again =
            ToolContract::remote("indexer", "search", "remote search", ParameterSchema::empty());
        assert!(registry.register(again).is_err());
    }

    #[test]
    fn test_snapshot_sorted_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(contract("zeta")).unwrap();
        registry.register(contract("alpha")).unwrap();
        registry.register(contract("midway")).unwrap();

        let names: Vec<_> = registry.snapshot().iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec!["alpha", "midway", "zeta"]);
    }

    #[test]
    fn test_snapshot_preserves_contract_fields() {
        let mut registry = ToolRegistry::new();
        let original = ToolContract::remote(
            "files",
            "read",
            "read a file from the workspace",
            ParameterSchema::empty(),
        );
        registry.register(original.clone()).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0], original);
    }

    #[test]
    fn test_empty_registry() {
        let registry = ToolRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.resolve("anything").is_none());
        assert!(registry.snapshot().is_empty());
    }
}
