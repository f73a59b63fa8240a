//! Engine handles and their runtime type tags.

use std::fmt;

/// A reference to one value living in an engine heap.
///
/// Handles are plain indices. They carry no ownership and are only meaningful
/// together with the [`Env`](crate::Env) that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(pub(crate) u32);

impl Handle {
    /// Returns the raw slot index.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The runtime type tag of an engine value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// `true` or `false`
    Boolean,
    /// IEEE 754 double
    Number,
    /// UTF-8 string
    String,
    /// Arbitrary precision integer
    BigInt,
    /// Ordered list of handles
    Array,
    /// String-keyed property bag
    Object,
    /// Error object with name and message
    Error,
    /// Native function
    Function,
    /// Opaque native resource
    External,
    /// Promise created through a deferred
    Promise,
}

impl HandleKind {
    /// Returns the `typeof` string scripts observe for this kind.
    ///
    /// ```
    /// use script_engine::HandleKind;
    ///
    /// assert_eq!(HandleKind::Null.type_of(), "object");
    /// assert_eq!(HandleKind::Function.type_of(), "function");
    /// ```
    pub fn type_of(self) -> &'static str {
        match self {
            HandleKind::Undefined => "undefined",
            HandleKind::Null => "object",
            HandleKind::Boolean => "boolean",
            HandleKind::Number => "number",
            HandleKind::String => "string",
            HandleKind::BigInt => "bigint",
            HandleKind::Function => "function",
            HandleKind::Array
            | HandleKind::Object
            | HandleKind::Error
            | HandleKind::External
            | HandleKind::Promise => "object",
        }
    }
}
