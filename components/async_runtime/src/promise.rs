//! Binding a task's outcome to the promise handed to scripts.

use core_types::{BridgeError, Value};
use script_engine::{Deferred, Env, Handle, HostError};
use std::cell::Cell;

/// Wraps the [`Deferred`] of one promise on the scripting thread.
///
/// The first successful [`resolve`](Self::resolve) or [`reject`](Self::reject)
/// consumes the deferred; any later attempt is a
/// [`BridgeError::ContractViolation`]. A failed attempt leaves the deferred in
/// place so the promise can still be settled another way.
///
/// # Examples
///
/// ```
/// use async_runtime::PromiseAdapter;
/// use core_types::Value;
/// use script_engine::{EngineConfig, Env, PromiseState};
///
/// let env = Env::new(EngineConfig::default());
/// let (deferred, promise) = env.create_deferred().unwrap();
/// let adapter = PromiseAdapter::new(deferred);
///
/// adapter.settle(&env, &Value::from("ok"), false).unwrap();
/// assert!(adapter.is_settled());
/// assert!(matches!(env.promise_state(promise).unwrap(), PromiseState::Fulfilled(_)));
/// ```
pub struct PromiseAdapter {
    id: u32,
    deferred: Cell<Option<Deferred>>,
}

impl std::fmt::Debug for PromiseAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromiseAdapter")
            .field("id", &self.id)
            .field("settled", &self.is_settled())
            .finish()
    }
}

impl PromiseAdapter {
    /// Takes ownership of a deferred.
    pub fn new(deferred: Deferred) -> Self {
        Self {
            id: deferred.id(),
            deferred: Cell::new(Some(deferred)),
        }
    }

    /// Returns the id of the wrapped deferred.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Returns true once the promise has been settled through this adapter.
    pub fn is_settled(&self) -> bool {
        let deferred = self.deferred.take();
        let settled = deferred.is_none();
        self.deferred.set(deferred);
        settled
    }

    /// Fulfils the promise with `value`.
    pub fn resolve(&self, env: &Env, value: Handle) -> Result<(), BridgeError> {
        self.with_deferred(|deferred| env.resolve_deferred(deferred, value))
    }

    /// Rejects the promise with `reason`.
    pub fn reject(&self, env: &Env, reason: Handle) -> Result<(), BridgeError> {
        self.with_deferred(|deferred| env.reject_deferred(deferred, reason))
    }

    /// Converts `value` into the engine and resolves, or rejects when
    /// `is_error` is set.
    ///
    /// A conversion failure leaves the promise unsettled and is returned.
    pub fn settle(&self, env: &Env, value: &Value, is_error: bool) -> Result<(), BridgeError> {
        let handle = value.convert(env)?;
        if is_error {
            self.reject(env, handle)
        } else {
            self.resolve(env, handle)
        }
    }

    fn with_deferred(
        &self,
        settle: impl FnOnce(&Deferred) -> Result<(), HostError>,
    ) -> Result<(), BridgeError> {
        let deferred = self.deferred.take().ok_or_else(|| {
            BridgeError::ContractViolation(format!("promise #{} already settled", self.id))
        })?;
        match settle(&deferred) {
            Ok(()) => Ok(()),
            Err(HostError::AlreadySettled(id)) => Err(BridgeError::ContractViolation(format!(
                "promise #{} already settled",
                id
            ))),
            Err(e) => {
                self.deferred.set(Some(deferred));
                Err(e.into())
            }
        }
    }
}
