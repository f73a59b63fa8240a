//! Bridge echo CLI
//!
//! Entry point for the bridge. Parses CLI arguments and delegates to the
//! Runtime for execution.

use bridge_cli::{BridgeConfig, Cli, CliError, Runtime};
use clap::Parser as ClapParser;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = BridgeConfig::from_cli(cli)?;
    let runtime = Runtime::new(config)?;

    if cli.list {
        for name in runtime.entry_names() {
            println!("{}", name);
        }
        return Ok(());
    }

    let arg = cli
        .parsed_arg()
        .map_err(|e| CliError::InvalidArgument(e.to_string()))?;
    let result = runtime.call(&cli.entry, arg)?;
    println!("{}", result);
    Ok(())
}
