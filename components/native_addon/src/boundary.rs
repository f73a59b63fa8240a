//! The engine-facing boundary of native entry points.
//!
//! No entry point may unwind into the engine or leave it without a return
//! value. [`invoke`] runs an entry point under `catch_unwind` and turns any
//! failure into an error value that is both returned and raised as the
//! pending exception.

use crate::{EntryPoint, Registry};
use core_types::BridgeError;
use script_engine::{Env, Handle};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// Calls `entry` with `args` and never fails.
///
/// On error or panic the returned handle is the error value and the same
/// value is raised with [`Env::throw`]. `fallback` is returned instead when
/// the engine cannot even allocate that error value.
pub fn invoke(env: &Env, name: &str, entry: EntryPoint, args: &[Handle], fallback: Handle) -> Handle {
    let _scope = env.open_scope();
    tracing::trace!(entry = name, argc = args.len(), "native entry point called");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| entry(env, args)))
        .unwrap_or_else(|payload| Err(BridgeError::from_panic(payload)));

    match outcome {
        Ok(handle) => handle,
        Err(error) => {
            tracing::warn!(entry = name, %error, "native entry point failed");
            let exception = error
                .to_value()
                .convert(env)
                .or_else(|_| env.create_error("Error", &error.to_string()).map_err(BridgeError::from))
                .unwrap_or_else(|e| {
                    tracing::error!(entry = name, error = %e, "could not allocate error value");
                    fallback
                });
            env.throw(exception);
            exception
        }
    }
}

/// Creates an exports object with one native function per registry entry.
///
/// # Errors
///
/// Fails if the engine cannot allocate the object or its functions.
pub fn install(env: &Env, registry: &Registry) -> Result<Handle, BridgeError> {
    let exports = env.create_object()?;
    let fallback = env.create_error("InternalError", "out of engine memory")?;

    for (name, entry) in registry.iter() {
        let function = env.create_function(
            name,
            Rc::new(move |env: &Env, args: &[Handle]| invoke(env, name, entry, args, fallback)),
        )?;
        env.set_named_property(exports, name, function)?;
    }

    tracing::debug!(entries = registry.len(), "add-on exports installed");
    Ok(exports)
}
