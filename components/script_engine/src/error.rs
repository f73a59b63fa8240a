//! Status errors reported by engine primitives.
//!
//! Every engine call that can fail returns a [`HostError`]. These correspond to
//! the non-ok status codes a host embedding API hands back to native code.

use crate::HandleKind;

/// A failed engine primitive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The heap has no room for another slot
    #[error("engine heap exhausted ({limit} slots)")]
    HeapExhausted {
        /// Configured slot limit
        limit: usize,
    },
    /// A string exceeds the configured maximum length
    #[error("string of {len} bytes exceeds limit of {limit} bytes")]
    StringTooLong {
        /// Length of the rejected string
        len: usize,
        /// Configured byte limit
        limit: usize,
    },
    /// The handle does not name a live slot
    #[error("invalid handle #{0}")]
    InvalidHandle(u32),
    /// The handle names a slot of the wrong kind
    #[error("expected {expected:?}, found {found:?}")]
    TypeMismatch {
        /// Kind the operation needed
        expected: HandleKind,
        /// Kind actually stored in the slot
        found: HandleKind,
    },
    /// The deferred was already resolved or rejected
    #[error("deferred #{0} already settled")]
    AlreadySettled(u32),
    /// No deferred with this id was ever created
    #[error("unknown deferred #{0}")]
    UnknownDeferred(u32),
    /// Attempted to call a handle that is not a native function
    #[error("value is not a function")]
    NotAFunction,
    /// An exception is pending; the engine refuses further calls until it is taken
    #[error("an exception is pending")]
    PendingException,
}

/// Result alias for engine primitives.
pub type HostResult<T> = Result<T, HostError>;
