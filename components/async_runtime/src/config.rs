//! Scheduler configuration.

use serde::Deserialize;
use std::time::Duration;

/// How the main-thread queue and the event loop are set up.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of main/worker threads draining the main-thread queue
    pub worker_threads: usize,
    /// Name prefix of the worker threads
    pub thread_name: String,
    /// How long [`EventLoop::run_until_idle`](crate::EventLoop::run_until_idle)
    /// waits for outstanding tasks before giving up, in milliseconds
    pub idle_timeout_ms: u64,
}

impl SchedulerConfig {
    /// Returns the idle timeout as a [`Duration`].
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: 1,
            thread_name: "bridge-main".to_string(),
            idle_timeout_ms: 30_000,
        }
    }
}
