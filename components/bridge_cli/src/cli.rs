//! Command-line arguments

use clap::Parser;
use std::path::PathBuf;

/// Calls a native add-on entry point and prints its result as JSON
#[derive(Debug, Parser)]
#[command(name = "bridge-echo", version, about)]
pub struct Cli {
    /// Entry point to call
    #[arg(short, long, default_value = "echo_async")]
    pub entry: String,

    /// JSON argument passed to the entry point
    #[arg(short, long)]
    pub arg: Option<String>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of main-thread workers (overrides the config file)
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Milliseconds to wait for outstanding tasks (overrides the config file)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// List the available entry points and exit
    #[arg(short, long)]
    pub list: bool,
}

impl Cli {
    /// Parses the `--arg` JSON, if any.
    pub fn parsed_arg(&self) -> Result<Option<serde_json::Value>, serde_json::Error> {
        self.arg.as_deref().map(serde_json::from_str).transpose()
    }
}
