//! Copying values out of and back into the engine.
//!
//! [`Value::from_handle`] must run on the scripting thread (it needs an
//! [`Env`]) and leaves nothing behind that refers to the engine.
//! [`Value::convert`] is its inverse and has the same thread requirement.

use crate::{BridgeError, Value};
use indexmap::IndexMap;
use script_engine::{Env, Handle, HandleKind};
use std::collections::HashSet;

/// Maximum nesting of arrays and objects accepted by [`Value::from_handle`].
pub const MAX_DEPTH: usize = 128;

impl Value {
    /// Deep-copies the engine value behind `handle`.
    ///
    /// Functions, externals and promises are captured as
    /// [`Value::Unsupported`]. Cyclic graphs and graphs nested deeper than
    /// [`MAX_DEPTH`] fail with [`BridgeError::Conversion`].
    ///
    /// # Examples
    ///
    /// ```
    /// use core_types::Value;
    /// use script_engine::{EngineConfig, Env};
    ///
    /// let env = Env::new(EngineConfig::default());
    /// let arr = env.create_array().unwrap();
    /// let t = env.create_boolean(true).unwrap();
    /// env.array_push(arr, t).unwrap();
    ///
    /// let value = Value::from_handle(&env, arr).unwrap();
    /// assert_eq!(value, Value::Array(vec![Value::Boolean(true)]));
    /// ```
    pub fn from_handle(env: &Env, handle: Handle) -> Result<Value, BridgeError> {
        let mut visiting = HashSet::new();
        capture(env, handle, &mut visiting, 0)
    }

    /// Rebuilds an engine value from this value.
    ///
    /// Fails with [`BridgeError::Conversion`] for [`Value::Unsupported`],
    /// anywhere in the tree.
    pub fn convert(&self, env: &Env) -> Result<Handle, BridgeError> {
        let handle = match self {
            Value::Undefined => env.create_undefined()?,
            Value::Null => env.create_null()?,
            Value::Boolean(b) => env.create_boolean(*b)?,
            Value::Number(n) => env.create_number(*n)?,
            Value::String(s) => env.create_string(s)?,
            Value::BigInt(n) => env.create_bigint(n.clone())?,
            Value::Array(items) => {
                let array = env.create_array()?;
                for item in items {
                    let element = item.convert(env)?;
                    env.array_push(array, element)?;
                }
                array
            }
            Value::Object(props) => {
                let object = env.create_object()?;
                for (key, value) in props {
                    let property = value.convert(env)?;
                    env.set_named_property(object, key, property)?;
                }
                object
            }
            Value::Error { name, message } => env.create_error(name, message)?,
            Value::Unsupported(kind) => {
                return Err(BridgeError::Conversion(format!(
                    "cannot reconstruct a value of kind {:?}",
                    kind
                )))
            }
        };
        Ok(handle)
    }
}

fn capture(
    env: &Env,
    handle: Handle,
    visiting: &mut HashSet<Handle>,
    depth: usize,
) -> Result<Value, BridgeError> {
    if depth > MAX_DEPTH {
        return Err(BridgeError::Conversion(format!(
            "value nested deeper than {} levels",
            MAX_DEPTH
        )));
    }

    let value = match env.type_of(handle)? {
        HandleKind::Undefined => Value::Undefined,
        HandleKind::Null => Value::Null,
        HandleKind::Boolean => Value::Boolean(env.get_boolean(handle)?),
        HandleKind::Number => Value::Number(env.get_number(handle)?),
        HandleKind::String => Value::String(env.get_string(handle)?),
        HandleKind::BigInt => Value::BigInt(env.get_bigint(handle)?),
        HandleKind::Error => {
            let (name, message) = env.error_parts(handle)?;
            Value::Error { name, message }
        }
        HandleKind::Array => {
            enter(visiting, handle)?;
            let elements = env.array_elements(handle)?;
            let mut items = Vec::with_capacity(elements.len());
            for element in elements {
                items.push(capture(env, element, visiting, depth + 1)?);
            }
            visiting.remove(&handle);
            Value::Array(items)
        }
        HandleKind::Object => {
            enter(visiting, handle)?;
            let entries = env.object_entries(handle)?;
            let mut props = IndexMap::with_capacity(entries.len());
            for (key, value) in entries {
                let value = capture(env, value, visiting, depth + 1)?;
                props.insert(key, value);
            }
            visiting.remove(&handle);
            Value::Object(props)
        }
        kind @ (HandleKind::Function | HandleKind::External | HandleKind::Promise) => {
            tracing::trace!(?kind, handle = handle.index(), "captured unsupported kind");
            Value::Unsupported(kind)
        }
    };
    Ok(value)
}

fn enter(visiting: &mut HashSet<Handle>, handle: Handle) -> Result<(), BridgeError> {
    if visiting.insert(handle) {
        Ok(())
    } else {
        Err(BridgeError::Conversion(
            "cannot capture circular reference".to_string(),
        ))
    }
}
