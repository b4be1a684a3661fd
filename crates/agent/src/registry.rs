//! Agent type registry.
//!
//! An agent type is a named constructor producing an [`Agent`] from an
//! [`AgentConfig`]. The registry is an explicit value built once at startup
//! and passed to whoever needs it; there is no global state, so tests can
//! build isolated registries freely.

use crate::config::AgentConfig;
use crate::executor::TaskAgent;
use crate::locks::ResourceLockTable;
use flotilla_common::{Agent, FlotillaError, Result};
use std::collections::HashMap;
use std::sync::Arc;

pub type AgentConstructor =
    Arc<dyn Fn(AgentConfig, Arc<ResourceLockTable>) -> Result<Arc<dyn Agent>> + Send + Sync>;

#[derive(Default)]
pub struct AgentTypeRegistry {
    constructors: HashMap<String, AgentConstructor>,
}

impl AgentTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `"task"` type (a [`TaskAgent`] with the
    /// deterministic fallback planner).
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("task", |config, locks| {
            Ok(Arc::new(TaskAgent::new(config).with_lock_table(locks)) as Arc<dyn Agent>)
        });
        registry
    }

    pub fn register(
        &mut self,
        type_name: impl Into<String>,
        constructor: impl Fn(AgentConfig, Arc<ResourceLockTable>) -> Result<Arc<dyn Agent>>
            + Send
            + Sync
            + 'static,
    ) {
        self.constructors
            .insert(type_name.into(), Arc::new(constructor));
    }

    /// Build an agent of the named type sharing the given lock table.
    pub fn build(
        &self,
        type_name: &str,
        config: AgentConfig,
        locks: Arc<ResourceLockTable>,
    ) -> Result<Arc<dyn Agent>> {
        let constructor = self.constructors.get(type_name).ok_or_else(|| {
            FlotillaError::Validation(format!("unknown agent type: {type_name}"))
        })?;
        constructor(config, locks)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.constructors.contains_key(type_name)
    }

    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.constructors.keys().cloned().collect();
        types.sort();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_builds_task_agents() {
        let registry = AgentTypeRegistry::with_defaults();
        assert!(registry.contains("task"));

        let locks = Arc::new(ResourceLockTable::new());
        let agent = registry
            .build("task", AgentConfig::with_role("worker-1"), locks)
            .unwrap();
        assert_eq!(agent.role(), "worker-1");
    }

    #[test]
    fn unknown_type_is_a_validation_error() {
        let registry = AgentTypeRegistry::with_defaults();
        let locks = Arc::new(ResourceLockTable::new());
        let err = match registry.build("quantum", AgentConfig::default(), locks) {
            Ok(_) => panic!("expected build to fail for unknown agent type"),
            Err(e) => e,
        };
        assert!(matches!(err, FlotillaError::Validation(_)));
    }

    #[test]
    fn registries_are_isolated() {
        let mut first = AgentTypeRegistry::new();
        first.register("custom", |config, locks| {
            Ok(Arc::new(TaskAgent::new(config).with_lock_table(locks)) as Arc<dyn Agent>)
        });
        let second = AgentTypeRegistry::new();

        assert!(first.contains("custom"));
        assert!(!second.contains("custom"));
        assert_eq!(first.registered_types(), vec!["custom"]);
    }
}
