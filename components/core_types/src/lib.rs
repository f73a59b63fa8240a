//! Engine-independent values and errors for the native bridge.
//!
//! This crate provides the types that let data leave the scripting thread:
//! a [`Value`] is a deep copy of a script value with no ties to the engine,
//! and a [`BridgeError`] is the one error type every bridge operation uses.
//!
//! # Overview
//!
//! - [`Value`] - Detached script value, safe to move across threads
//! - [`Value::from_handle`] / [`Value::convert`] - Capture and reconstruct
//! - [`Value::from_json`] / [`Value::to_json`] - JSON interop
//! - [`BridgeError`] / [`ErrorKind`] - Error taxonomy
//!
//! # Examples
//!
//! ```
//! use core_types::Value;
//! use script_engine::{EngineConfig, Env};
//!
//! let env = Env::new(EngineConfig::default());
//! let original = Value::from_json(serde_json::json!({"a": 1, "b": [true, null, "s"]}));
//!
//! let handle = original.convert(&env).unwrap();
//! let copy = Value::from_handle(&env, handle).unwrap();
//! assert_eq!(copy, original);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod convert;
mod error;
mod json;
mod value;

pub use convert::MAX_DEPTH;
pub use error::{BridgeError, ErrorKind};
pub use value::Value;
