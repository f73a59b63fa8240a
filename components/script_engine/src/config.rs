//! Engine limits.

use serde::Deserialize;

/// Limits applied by an [`Env`](crate::Env).
///
/// Exceeding a limit makes the offending primitive fail with a
/// [`HostError`](crate::HostError) instead of growing without bound.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum number of heap slots over the engine's lifetime.
    ///
    /// The heap is append-only: every allocation consumes a slot for good,
    /// so this bounds the total work an engine can do before it must be
    /// replaced. Size it for a short-lived engine.
    pub max_heap_slots: usize,
    /// Maximum byte length of a single string
    pub max_string_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_heap_slots: 1 << 20,
            max_string_len: 64 * 1024 * 1024,
        }
    }
}
