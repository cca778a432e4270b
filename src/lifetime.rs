//! Service lifetime definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Service lifetimes controlling instance caching behavior.
///
/// The lifetime decides which lifecycle store (if any) keeps the value
/// produced for a service id.
///
/// # Examples
///
/// ```rust
/// use wirecore::{Container, Lifetime, Value};
///
/// let container = Container::new();
/// container.singleton("answer").unwrap().to_value(Value::Int(42));
///
/// let def = container.definition("answer").unwrap();
/// assert_eq!(def.lifetime, Lifetime::Singleton);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Lifetime {
    /// One shared instance for the life of the container.
    Singleton,
    /// One shared instance per active scope; transient outside a scope.
    Scoped,
    /// A fresh instance on every resolution, never cached.
    #[default]
    Transient,
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lifetime::Singleton => write!(f, "singleton"),
            Lifetime::Scoped => write!(f, "scoped"),
            Lifetime::Transient => write!(f, "transient"),
        }
    }
}
