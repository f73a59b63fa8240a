//! The standard entry points.

use crate::{EntryPoint, Registry};
use async_runtime::Task;
use core_types::{BridgeError, Value};
use script_engine::{Env, Handle};

/// Builds a registry holding `hello`, `echo` and `echo_async`.
pub fn standard_registry() -> Result<Registry, BridgeError> {
    let entries: [(&'static str, EntryPoint); 3] =
        [("hello", hello), ("echo", echo), ("echo_async", echo_async)];
    entries
        .into_iter()
        .try_fold(Registry::builder(), |builder, (name, entry)| {
            builder.register(name, entry)
        })
        .map(|builder| builder.build())
}

/// Returns the string `"hello world"`.
pub fn hello(env: &Env, _args: &[Handle]) -> Result<Handle, BridgeError> {
    Ok(env.create_string("hello world")?)
}

/// Returns a copy of its first argument, rebuilt from a captured [`Value`].
pub fn echo(env: &Env, args: &[Handle]) -> Result<Handle, BridgeError> {
    let value = Value::from_handle(env, first_argument("echo", args)?)?;
    value.convert(env)
}

/// Returns a promise that resolves with a copy of its first argument.
///
/// The argument is captured on the scripting thread, handed to a main-thread
/// handler and delivered back through a [`Task`].
pub fn echo_async(env: &Env, args: &[Handle]) -> Result<Handle, BridgeError> {
    let value = Value::from_handle(env, first_argument("echo_async", args)?)?;
    Task::spawn(env, move |_token| Ok(value))
}

fn first_argument(entry: &str, args: &[Handle]) -> Result<Handle, BridgeError> {
    args.first().copied().ok_or_else(|| {
        BridgeError::HostUnavailable(format!("{} expects 1 argument, got 0", entry))
    })
}
