//! Dynamic values that flow through the container.
//!
//! Service ids are strings, so the values produced for them are carried in a
//! tagged [`Value`] enum: plain data variants plus a type-erased `Instance`
//! case for constructed objects. [`Literal`] is the serializable subset used
//! for prototype default values.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{DiResult, ErrorKind};

/// Type-erased shared instance.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Per-resolution override map: parameter or property name to value.
///
/// Overrides short-circuit type-based resolution and are accepted as-is,
/// without type checks.
pub type Overrides = HashMap<String, Value>;

/// A value produced by or fed into the container.
///
/// `Instance` holds a shared, type-erased object; everything else is plain
/// data. Instance identity is `Arc` pointer identity, exposed through
/// [`Value::same_instance`].
///
/// # Examples
///
/// ```rust
/// use wirecore::Value;
///
/// struct Logger;
///
/// let v = Value::instance(Logger);
/// assert!(v.downcast::<Logger>().is_some());
/// assert!(Value::from("hello").as_str().is_some());
/// assert!(Value::Null.is_null());
/// ```
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Instance(AnyArc),
}

impl Value {
    /// Wraps an owned object into an `Instance` value.
    pub fn instance<T: Send + Sync + 'static>(value: T) -> Self {
        Value::Instance(Arc::new(value))
    }

    /// Wraps an already-shared object into an `Instance` value.
    pub fn from_arc(arc: AnyArc) -> Self {
        Value::Instance(arc)
    }

    /// Downcasts an `Instance` value to a concrete type.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        match self {
            Value::Instance(arc) => arc.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    /// Downcasts an `Instance` value, reporting the expected type on failure.
    pub fn expect_instance<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        self.downcast::<T>().ok_or_else(|| {
            ErrorKind::InvalidDefinition {
                reason: format!(
                    "expected an instance of `{}`, found {}",
                    std::any::type_name::<T>(),
                    self.type_label()
                ),
            }
            .into()
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// True when both values are the same shared instance.
    ///
    /// Non-instance values never compare as the same instance.
    pub fn same_instance(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Instance(x), Value::Instance(y)) => Arc::ptr_eq(x, y),
            _ => false,
        }
    }

    /// A short label for diagnostics.
    pub fn type_label(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Instance(_) => "instance",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Instance(_) => write!(f, "Instance(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// The serializable subset of [`Value`] used for prototype defaults.
///
/// Defaults captured in a cached prototype must round-trip through the
/// file-backed cache, so instances are excluded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Literal>),
}

impl Literal {
    /// Converts the literal into a runtime [`Value`].
    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::Int(*i),
            Literal::Float(x) => Value::Float(*x),
            Literal::Str(s) => Value::Str(s.clone()),
            Literal::List(items) => Value::List(items.iter().map(Literal::to_value).collect()),
        }
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::Str(s.to_string())
    }
}

impl From<i64> for Literal {
    fn from(i: i64) -> Self {
        Literal::Int(i)
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}
