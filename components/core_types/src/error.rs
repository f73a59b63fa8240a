//! Bridge error taxonomy.
//!
//! Every failure that can happen while moving work between the scripting
//! thread and the main thread is a [`BridgeError`]. Errors never cross the
//! engine boundary as Rust errors or panics: they are turned into an
//! engine-representable [`Value::Error`] with [`BridgeError::to_value`].

use crate::Value;
use script_engine::HostError;
use std::any::Any;

/// The category of a [`BridgeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A value could not be represented or reconstructed
    Conversion,
    /// The task state machine was driven out of order
    ContractViolation,
    /// An engine primitive failed
    HostApi,
    /// The task was cancelled before its handler ran
    Cancelled,
    /// A native handler panicked
    Panicked,
    /// A native operation reported failure
    Operation,
}

impl ErrorKind {
    /// Returns the `name` given to errors of this kind when shown to scripts.
    pub fn error_name(self) -> &'static str {
        match self {
            ErrorKind::Conversion => "ConversionError",
            ErrorKind::ContractViolation => "ContractViolation",
            ErrorKind::HostApi => "HostApiError",
            ErrorKind::Cancelled => "CancelledError",
            ErrorKind::Panicked => "InternalError",
            ErrorKind::Operation => "Error",
        }
    }
}

/// A failure inside the native bridge.
///
/// # Examples
///
/// ```
/// use core_types::{BridgeError, ErrorKind, Value};
///
/// let err = BridgeError::Conversion("functions cannot cross threads".into());
/// assert_eq!(err.kind(), ErrorKind::Conversion);
/// assert_eq!(
///     err.to_value(),
///     Value::Error {
///         name: "ConversionError".into(),
///         message: "conversion error: functions cannot cross threads".into(),
///     }
/// );
/// ```
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// A value could not be represented or reconstructed
    #[error("conversion error: {0}")]
    Conversion(String),
    /// The task state machine was driven out of order
    #[error("contract violation: {0}")]
    ContractViolation(String),
    /// An engine primitive failed
    #[error("host api error: {0}")]
    HostApi(#[from] HostError),
    /// The host is missing something the bridge needs
    #[error("host api error: {0}")]
    HostUnavailable(String),
    /// The task was cancelled before its handler ran
    #[error("task cancelled")]
    Cancelled,
    /// A native handler panicked
    #[error("native handler panicked: {0}")]
    Panicked(String),
    /// A native operation reported failure
    #[error("{0}")]
    Operation(String),
}

impl BridgeError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Conversion(_) => ErrorKind::Conversion,
            BridgeError::ContractViolation(_) => ErrorKind::ContractViolation,
            BridgeError::HostApi(_) | BridgeError::HostUnavailable(_) => ErrorKind::HostApi,
            BridgeError::Cancelled => ErrorKind::Cancelled,
            BridgeError::Panicked(_) => ErrorKind::Panicked,
            BridgeError::Operation(_) => ErrorKind::Operation,
        }
    }

    /// Builds the engine-representable error value scripts will observe.
    pub fn to_value(&self) -> Value {
        Value::Error {
            name: self.kind().error_name().to_string(),
            message: self.to_string(),
        }
    }

    /// Turns a caught panic payload into a [`BridgeError::Panicked`].
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        BridgeError::Panicked(message)
    }
}
