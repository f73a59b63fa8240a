//! Engine-independent value representation.
//!
//! A [`Value`] is a deep copy of a script value. It holds no handles into the
//! engine, so it can be moved to another thread and outlive the native call
//! that produced it.

use indexmap::IndexMap;
use num_bigint::BigInt;
use num_traits::Zero;
use script_engine::HandleKind;
use std::fmt;

/// A script value detached from the engine.
///
/// Moving a `Value` is a pure data move; cloning duplicates the whole payload.
/// Kinds that cannot be detached (functions, native resources, promises) are
/// kept as [`Value::Unsupported`] so that capturing never fails on them; only
/// reconstructing one is an error.
///
/// # Examples
///
/// ```
/// use core_types::Value;
///
/// let undefined = Value::Undefined;
/// let number = Value::Number(42.0);
///
/// assert!(!undefined.is_truthy());
/// assert!(number.is_truthy());
/// assert_eq!(number.type_of(), "number");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// `true` or `false`
    Boolean(bool),
    /// IEEE 754 double-precision number
    Number(f64),
    /// Owned UTF-8 string
    String(String),
    /// Arbitrary precision integer
    BigInt(BigInt),
    /// Ordered list of values
    Array(Vec<Value>),
    /// String-keyed properties in insertion order
    Object(IndexMap<String, Value>),
    /// Error object
    Error {
        /// Constructor name, e.g. `TypeError`
        name: String,
        /// Human-readable message
        message: String,
    },
    /// A kind that has no engine-independent form
    Unsupported(HandleKind),
}

impl Value {
    /// Returns the engine type tag this value reconstructs into.
    pub fn kind(&self) -> HandleKind {
        match self {
            Value::Undefined => HandleKind::Undefined,
            Value::Null => HandleKind::Null,
            Value::Boolean(_) => HandleKind::Boolean,
            Value::Number(_) => HandleKind::Number,
            Value::String(_) => HandleKind::String,
            Value::BigInt(_) => HandleKind::BigInt,
            Value::Array(_) => HandleKind::Array,
            Value::Object(_) => HandleKind::Object,
            Value::Error { .. } => HandleKind::Error,
            Value::Unsupported(kind) => *kind,
        }
    }

    /// Returns the `typeof` result scripts would see.
    ///
    /// ```
    /// use core_types::Value;
    ///
    /// assert_eq!(Value::Null.type_of(), "object");
    /// assert_eq!(Value::String("x".into()).type_of(), "string");
    /// ```
    pub fn type_of(&self) -> &'static str {
        self.kind().type_of()
    }

    /// Returns whether this value is truthy.
    ///
    /// `undefined`, `null`, `false`, `0`, `NaN`, `""` and `0n` are falsy;
    /// everything else, including every object, is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Number(n) => !n.is_nan() && *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::BigInt(n) => !n.is_zero(),
            Value::Array(_) | Value::Object(_) | Value::Error { .. } | Value::Unsupported(_) => {
                true
            }
        }
    }

    /// Returns true for [`Value::Unsupported`].
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Value::Unsupported(_))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<BigInt> for Value {
    fn from(value: BigInt) -> Self {
        Value::BigInt(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Array(value)
    }
}

/// String conversion following script `String()` rules.
///
/// ```
/// use core_types::Value;
///
/// assert_eq!(Value::Undefined.to_string(), "undefined");
/// assert_eq!(Value::Number(42.0).to_string(), "42");
/// assert_eq!(Value::Array(vec![1.into(), "a".into()]).to_string(), "1,a");
/// ```
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => {
                if n.is_nan() {
                    write!(f, "NaN")
                } else if n.is_infinite() {
                    if n.is_sign_positive() {
                        write!(f, "Infinity")
                    } else {
                        write!(f, "-Infinity")
                    }
                } else if n.fract() == 0.0 && n.abs() < 1e15 {
                    // Integer-valued doubles display without decimal point
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s),
            Value::BigInt(n) => write!(f, "{}", n),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    match item {
                        Value::Undefined | Value::Null => {}
                        other => write!(f, "{}", other)?,
                    }
                }
                Ok(())
            }
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Error { name, message } if message.is_empty() => write!(f, "{}", name),
            Value::Error { name, message } => write!(f, "{}: {}", name, message),
            Value::Unsupported(HandleKind::Function) => write!(f, "function () {{ [native code] }}"),
            Value::Unsupported(_) => write!(f, "[object Object]"),
        }
    }
}
