//! Service definitions: the blueprint records held by the store.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::container::Container;
use crate::error::{DiResult, ErrorKind};
use crate::lifetime::Lifetime;
use crate::value::{AnyArc, Overrides, Value};

/// Factory callable: invoked with the container and the caller's overrides,
/// its result is the final value for the requested id.
pub type FactoryFn = Arc<dyn Fn(&Container, &Overrides) -> DiResult<Value> + Send + Sync>;

/// Post-build extender: may wrap or replace the instance before lifecycle
/// storage.
pub type ExtenderFn = Arc<dyn Fn(Value, &Container) -> DiResult<Value> + Send + Sync>;

/// What is produced for an abstract id.
#[derive(Clone)]
pub enum Concrete {
    /// A type id to instantiate, or to delegate to when it differs from the
    /// requested id.
    Type(String),
    /// A factory callable whose result is the final value.
    Factory(FactoryFn),
    /// A literal value returned as-is.
    Literal(Value),
    /// A pre-built shared object.
    Instance(AnyArc),
}

impl Concrete {
    /// Convenience constructor for factory concretes.
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(&Container, &Overrides) -> DiResult<Value> + Send + Sync + 'static,
    {
        Concrete::Factory(Arc::new(f))
    }

}

impl fmt::Debug for Concrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Concrete::Type(id) => f.debug_tuple("Type").field(id).finish(),
            Concrete::Factory(_) => write!(f, "Factory(..)"),
            Concrete::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Concrete::Instance(_) => write!(f, "Instance(..)"),
        }
    }
}

impl From<&str> for Concrete {
    fn from(type_id: &str) -> Self {
        Concrete::Type(type_id.to_string())
    }
}

impl From<String> for Concrete {
    fn from(type_id: String) -> Self {
        Concrete::Type(type_id)
    }
}

impl From<Value> for Concrete {
    fn from(value: Value) -> Self {
        Concrete::Literal(value)
    }
}

/// A definition-level constructor argument: either a plain value or a
/// reference to another service resolved at build time.
#[derive(Debug, Clone)]
pub enum Argument {
    Value(Value),
    Service(String),
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Argument::Value(value)
    }
}

/// Immutable record of one service blueprint.
///
/// At most one definition exists per abstract id; re-registration replaces
/// the prior entry. Definitions are only mutated through the store during the
/// registration phase, never during resolution.
///
/// # Examples
///
/// ```rust
/// use wirecore::{Concrete, Lifetime, ServiceDefinition};
///
/// let def = ServiceDefinition::new("mailer")
///     .unwrap()
///     .with_concrete(Concrete::Type("smtp_mailer".into()))
///     .with_lifetime(Lifetime::Singleton);
/// assert_eq!(def.abstract_id, "mailer");
///
/// assert!(ServiceDefinition::new("").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    /// The unique id this definition is registered under.
    pub abstract_id: String,
    /// What to produce; `None` means "same as the abstract id".
    pub concrete: Option<Concrete>,
    pub lifetime: Lifetime,
    pub tags: Vec<String>,
    /// Constructor arguments keyed by parameter name.
    pub arguments: HashMap<String, Argument>,
    /// Explicit injection plan: property/method names injected in addition to
    /// marker-flagged members.
    pub injections: Vec<String>,
}

impl ServiceDefinition {
    /// Creates a definition for the given id. Empty ids are rejected.
    pub fn new(abstract_id: impl Into<String>) -> DiResult<Self> {
        let abstract_id = abstract_id.into();
        if abstract_id.is_empty() {
            return Err(ErrorKind::InvalidDefinition {
                reason: "service id must not be empty".into(),
            }
            .into());
        }
        Ok(Self {
            abstract_id,
            concrete: None,
            lifetime: Lifetime::default(),
            tags: Vec::new(),
            arguments: HashMap::new(),
            injections: Vec::new(),
        })
    }

    pub fn with_concrete(mut self, concrete: Concrete) -> Self {
        self.concrete = Some(concrete);
        self
    }

    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_argument(mut self, name: impl Into<String>, argument: impl Into<Argument>) -> Self {
        self.arguments.insert(name.into(), argument.into());
        self
    }

    pub fn with_injection(mut self, member: impl Into<String>) -> Self {
        self.injections.push(member.into());
        self
    }

    /// The type id this definition resolves to when no explicit concrete is
    /// set, or when the concrete is itself a type.
    pub fn target_type(&self) -> Option<&str> {
        match &self.concrete {
            None => Some(&self.abstract_id),
            Some(Concrete::Type(id)) => Some(id),
            Some(_) => None,
        }
    }
}
