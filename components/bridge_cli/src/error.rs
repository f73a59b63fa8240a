//! Error types for the CLI

use core_types::BridgeError;
use script_engine::HostError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Debug, Error)]
pub enum CliError {
    /// File I/O error
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("invalid configuration: {0}")]
    Config(String),

    /// `--arg` is not valid JSON
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No entry point has the requested name
    #[error("unknown entry point '{0}'")]
    UnknownEntry(String),

    /// The bridge itself failed
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The entry point raised an exception
    #[error("uncaught exception: {0}")]
    Exception(String),

    /// The returned promise was rejected
    #[error("promise rejected: {0}")]
    Rejected(String),
}

impl From<HostError> for CliError {
    fn from(err: HostError) -> Self {
        CliError::Bridge(err.into())
    }
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;
