//! Configuration file loading

use crate::error::{CliError, CliResult};
use crate::Cli;
use async_runtime::SchedulerConfig;
use script_engine::EngineConfig;
use serde::Deserialize;
use std::path::Path;

/// Everything needed to boot the bridge.
///
/// Every field is optional in the file:
///
/// ```json
/// { "engine": { "max_heap_slots": 65536 }, "scheduler": { "worker_threads": 2 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Engine limits
    pub engine: EngineConfig,
    /// Main-thread pool and event loop settings
    pub scheduler: SchedulerConfig,
}

impl BridgeConfig {
    /// Reads a JSON configuration file.
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| CliError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Loads the file named on the command line, if any, then applies the
    /// command-line overrides.
    pub fn from_cli(cli: &Cli) -> CliResult<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(workers) = cli.workers {
            config.scheduler.worker_threads = workers;
        }
        if let Some(timeout_ms) = cli.timeout_ms {
            config.scheduler.idle_timeout_ms = timeout_ms;
        }
        Ok(config)
    }
}
