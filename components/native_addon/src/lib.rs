//! Native add-on surface for the bridge.
//!
//! An add-on is a set of named entry points installed as native functions on
//! an exports object:
//!
//! - [`Registry`] - the read-only table of entry points, built once
//! - [`invoke`] - the boundary every call crosses; it never unwinds into the engine
//! - [`install`] - creates the exports object
//! - [`functions`] - the standard entry points `hello`, `echo` and `echo_async`
//!
//! # Examples
//!
//! ```
//! use async_runtime::{EventLoop, SchedulerConfig};
//! use core_types::Value;
//! use native_addon::{install, standard_registry};
//! use script_engine::{EngineConfig, Env, PromiseState};
//!
//! let event_loop = EventLoop::new(Env::new(EngineConfig::default()), SchedulerConfig::default()).unwrap();
//! let env = event_loop.env();
//! let exports = install(env, &standard_registry().unwrap()).unwrap();
//!
//! let echo_async = env.get_named_property(exports, "echo_async").unwrap().unwrap();
//! let arg = Value::from("ping").convert(env).unwrap();
//! let promise = env.call_function(echo_async, &[arg]).unwrap();
//!
//! event_loop.run_until_idle().unwrap();
//! let PromiseState::Fulfilled(result) = env.promise_state(promise).unwrap() else {
//!     panic!("echo_async did not resolve");
//! };
//! assert_eq!(Value::from_handle(env, result).unwrap(), Value::from("ping"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod boundary;
pub mod functions;
pub mod registry;

pub use boundary::{install, invoke};
pub use functions::standard_registry;
pub use registry::{EntryPoint, Registry, RegistryBuilder};
