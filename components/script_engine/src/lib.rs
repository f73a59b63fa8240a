//! Single-threaded scripting engine used as the host side of the native bridge.
//!
//! The engine stores every script value in a slot heap and hands native code
//! opaque [`Handle`]s into it. All access goes through an [`Env`], which is
//! `!Send` and therefore pinned to the scripting thread.
//!
//! # Overview
//!
//! - [`Env`] - Engine instance: value creation, inspection, promises, calls
//! - [`Handle`] / [`HandleKind`] - Value references and their type tags
//! - [`Deferred`] / [`PromiseState`] - Promise settlement
//! - [`EngineConfig`] - Heap and string limits
//! - [`HostError`] - Failure status of engine primitives
//!
//! # Examples
//!
//! ```
//! use script_engine::{EngineConfig, Env, PromiseState};
//!
//! let env = Env::new(EngineConfig::default());
//! let (deferred, promise) = env.create_deferred().unwrap();
//! assert_eq!(env.promise_state(promise).unwrap(), PromiseState::Pending);
//!
//! let answer = env.create_number(42.0).unwrap();
//! env.resolve_deferred(&deferred, answer).unwrap();
//! assert_eq!(env.promise_state(promise).unwrap(), PromiseState::Fulfilled(answer));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod config;
mod env;
mod error;
mod handle;
mod heap;
mod promise;

pub use config::EngineConfig;
pub use env::{Env, HandleScope, NativeCallback};
pub use error::{HostError, HostResult};
pub use handle::{Handle, HandleKind};
pub use promise::{Deferred, PromiseState};
