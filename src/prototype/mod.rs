//! The prototype model: introspection-derived injection plans.
//!
//! A [`ServicePrototype`] is the reusable, pure-data plan for building one
//! type: constructor parameters, injectable properties, injectable methods.
//! Prototypes are immutable, comparable, serializable, and regeneratable
//! purely from registered type metadata — which is what makes the file-backed
//! cache safe to treat as disposable.

pub mod analyzer;
pub mod cache;

pub use analyzer::{PrototypeAnalyzer, Prototypes};
pub use cache::{FilePrototypeCache, MemoryPrototypeCache, PrototypeCache};

use serde::{Deserialize, Serialize};

use crate::value::Literal;

/// Injection plan for a single parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterPrototype {
    pub name: String,
    /// The selected class/interface id; `None` for scalar/mixed parameters.
    pub type_id: Option<String>,
    pub has_default: bool,
    pub default: Option<Literal>,
    pub allows_null: bool,
    pub required: bool,
    pub variadic: bool,
    /// For variadic parameters: collect services carrying this tag.
    pub tag_hint: Option<String>,
}

/// Injection plan for a single property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyPrototype {
    pub name: String,
    pub type_id: Option<String>,
    pub has_default: bool,
    pub default: Option<Literal>,
    pub allows_null: bool,
    /// Carries the injection marker.
    pub injected: bool,
    /// Whether a setter exists; read-only properties are never injectable.
    pub writable: bool,
}

/// Injection plan for the constructor or one injectable method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodPrototype {
    pub name: String,
    pub params: Vec<ParameterPrototype>,
    /// Carries the injection marker (unused for constructors).
    pub injected: bool,
}

/// The complete injection plan for one type.
///
/// Equal type metadata always analyzes to an equal prototype, so two analyses
/// of the same type id compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePrototype {
    pub type_id: String,
    pub instantiable: bool,
    pub constructor: Option<MethodPrototype>,
    /// Declared order is injection order.
    pub properties: Vec<PropertyPrototype>,
    pub methods: Vec<MethodPrototype>,
}

impl ServicePrototype {
    pub fn property(&self, name: &str) -> Option<&PropertyPrototype> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodPrototype> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Constructor parameters, empty when the type has no constructor.
    pub fn constructor_params(&self) -> &[ParameterPrototype] {
        self.constructor
            .as_ref()
            .map(|c| c.params.as_slice())
            .unwrap_or(&[])
    }
}
