//! Runtime orchestration for one CLI invocation
//!
//! The Runtime owns the engine and its event loop, installs the standard
//! add-on and turns entry-point results back into JSON.

use crate::config::BridgeConfig;
use crate::error::{CliError, CliResult};
use async_runtime::EventLoop;
use core_types::Value;
use native_addon::{install, standard_registry, Registry};
use script_engine::{Env, Handle, HandleKind, PromiseState};

/// Engine, event loop and installed add-on exports
pub struct Runtime {
    event_loop: EventLoop,
    registry: Registry,
    exports: Handle,
}

impl Runtime {
    /// Boots the engine and installs the standard entry points.
    ///
    /// # Example
    /// ```
    /// use bridge_cli::{BridgeConfig, Runtime};
    ///
    /// let runtime = Runtime::new(BridgeConfig::default()).unwrap();
    /// let result = runtime.call("hello", None).unwrap();
    /// assert_eq!(result, serde_json::json!("hello world"));
    /// ```
    pub fn new(config: BridgeConfig) -> CliResult<Self> {
        let env = Env::new(config.engine);
        let event_loop = EventLoop::new(env, config.scheduler)?;
        let registry = standard_registry()?;
        let exports = install(event_loop.env(), &registry)?;
        Ok(Self {
            event_loop,
            registry,
            exports,
        })
    }

    /// Returns the names of the installed entry points.
    pub fn entry_names(&self) -> Vec<&'static str> {
        self.registry.names().collect()
    }

    /// Calls `entry` with `arg` (or no argument) and returns its result.
    ///
    /// A returned promise is awaited by running the event loop until idle.
    pub fn call(&self, entry: &str, arg: Option<serde_json::Value>) -> CliResult<serde_json::Value> {
        let env = self.event_loop.env();
        let function = env
            .get_named_property(self.exports, entry)?
            .ok_or_else(|| CliError::UnknownEntry(entry.to_string()))?;

        let args = match arg {
            Some(json) => vec![Value::from_json(json).convert(env)?],
            None => Vec::new(),
        };

        tracing::debug!(entry, argc = args.len(), "calling entry point");
        let result = env.call_function(function, &args)?;
        if let Some(exception) = env.take_exception() {
            return Err(CliError::Exception(describe(env, exception)));
        }

        let result = if env.type_of(result)? == HandleKind::Promise {
            self.await_promise(result)?
        } else {
            result
        };
        Ok(Value::from_handle(env, result)?.to_json()?)
    }

    fn await_promise(&self, promise: Handle) -> CliResult<Handle> {
        let ran = self.event_loop.run_until_idle()?;
        tracing::debug!(jobs = ran, "event loop drained");

        let env = self.event_loop.env();
        match env.promise_state(promise)? {
            PromiseState::Fulfilled(value) => Ok(value),
            PromiseState::Rejected(reason) => Err(CliError::Rejected(describe(env, reason))),
            PromiseState::Pending => Err(CliError::Rejected(
                "promise still pending after the event loop went idle".to_string(),
            )),
        }
    }
}

fn describe(env: &Env, handle: Handle) -> String {
    match Value::from_handle(env, handle) {
        Ok(Value::Error { name, message }) => format!("{}: {}", name, message),
        Ok(value) => value.to_string(),
        Err(e) => e.to_string(),
    }
}
