//! The table of named entry points.

use core_types::BridgeError;
use indexmap::IndexMap;
use script_engine::{Env, Handle};

/// A native entry point.
///
/// Runs on the scripting thread with the call's arguments. Errors and panics
/// are turned into script exceptions by [`invoke`](crate::invoke).
pub type EntryPoint = fn(&Env, &[Handle]) -> Result<Handle, BridgeError>;

/// Collects entry points before the registry is frozen.
#[derive(Default)]
pub struct RegistryBuilder {
    entries: IndexMap<&'static str, EntryPoint>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `entry` under `name`.
    ///
    /// Fails with [`BridgeError::ContractViolation`] if the name is empty or
    /// already taken.
    pub fn register(mut self, name: &'static str, entry: EntryPoint) -> Result<Self, BridgeError> {
        if name.is_empty() {
            return Err(BridgeError::ContractViolation(
                "entry point name must not be empty".to_string(),
            ));
        }
        if self.entries.contains_key(name) {
            return Err(BridgeError::ContractViolation(format!(
                "entry point '{}' registered twice",
                name
            )));
        }
        self.entries.insert(name, entry);
        Ok(self)
    }

    /// Freezes the registry.
    pub fn build(self) -> Registry {
        tracing::debug!(entries = self.entries.len(), "entry point registry built");
        Registry {
            entries: self.entries,
        }
    }
}

/// Read-only mapping of names to entry points, in registration order.
#[derive(Clone)]
pub struct Registry {
    entries: IndexMap<&'static str, EntryPoint>,
}

impl Registry {
    /// Starts building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Looks up an entry point.
    pub fn get(&self, name: &str) -> Option<EntryPoint> {
        self.entries.get(name).copied()
    }

    /// Returns the registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Iterates over `(name, entry)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, EntryPoint)> + '_ {
        self.entries.iter().map(|(name, entry)| (*name, *entry))
    }

    /// Number of entry points.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no entry point is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for RegistryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
