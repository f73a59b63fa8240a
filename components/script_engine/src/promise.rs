//! Promises and the deferred tokens that settle them.

use crate::Handle;

/// The state of an engine promise.
///
/// Once settled (Fulfilled or Rejected), a promise cannot change state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    /// Neither fulfilled nor rejected yet
    Pending,
    /// Resolved with the given value
    Fulfilled(Handle),
    /// Rejected with the given reason
    Rejected(Handle),
}

impl PromiseState {
    /// Returns true while the promise has not settled.
    pub fn is_pending(&self) -> bool {
        matches!(self, PromiseState::Pending)
    }
}

/// The capability to settle one promise.
///
/// A `Deferred` is a bare id, so it can travel to other threads inside task
/// closures; settling it still requires the owning [`Env`](crate::Env), which
/// only exists on the scripting thread. It is not `Clone`, so exactly one
/// owner can settle a given promise.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Deferred(pub(crate) u32);

impl Deferred {
    /// Returns the id used to query the deferred's promise later.
    pub fn id(&self) -> u32 {
        self.0
    }
}
