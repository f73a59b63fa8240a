//! Bridge CLI Library
//!
//! Boots an engine with an event loop, installs the standard add-on and calls
//! one of its entry points with a JSON argument.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod cli;
pub mod config;
pub mod error;
pub mod runtime;

pub use cli::Cli;
pub use config::BridgeConfig;
pub use error::{CliError, CliResult};
pub use runtime::Runtime;
