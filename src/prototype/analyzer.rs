//! Reduction of registered type metadata to cached service prototypes.

use std::collections::HashSet;
use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::{debug, trace};

use crate::error::{DiResult, ErrorKind};
use crate::prototype::cache::PrototypeCache;
use crate::prototype::{MethodPrototype, ParameterPrototype, PropertyPrototype, ServicePrototype};
use crate::reflect::{ParamSpec, TypeRegistry, TypeSpec};

/// Scalar and pseudo-types that never name a resolvable service.
static BUILTIN_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "bool", "int", "float", "string", "array", "iterable", "callable", "object", "mixed",
        "null", "void", "self", "static",
    ]
    .into_iter()
    .collect()
});

fn is_builtin(type_id: &str) -> bool {
    BUILTIN_TYPES.contains(type_id)
}

/// Selects the injection type from union candidates: the first non-builtin
/// id wins; all-builtin unions (and empty ones) select nothing.
fn select_type(candidates: &[String]) -> Option<String> {
    candidates.iter().find(|t| !is_builtin(t)).cloned()
}

/// Builds [`ServicePrototype`]s from registered [`TypeSpec`]s.
///
/// The analyzer is pure: the same spec always yields an equal prototype, so
/// results can be memoised per type id and persisted to disk.
#[derive(Debug, Default)]
pub struct PrototypeAnalyzer;

impl PrototypeAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Analyzes one registered type.
    ///
    /// Fails with `InvalidInjectionPoint` when a property carries the
    /// injection marker but has no setter.
    pub fn analyze(&self, spec: &TypeSpec) -> DiResult<ServicePrototype> {
        trace!(type_id = %spec.id(), "analyzing type");

        let constructor = spec.construct.as_ref().map(|_| MethodPrototype {
            name: "new".into(),
            params: analyze_params(&spec.params),
            injected: false,
        });

        let mut properties = Vec::with_capacity(spec.properties.len());
        for prop in &spec.properties {
            let writable = prop.writable_target();
            if prop.inject && !writable {
                return Err(ErrorKind::InvalidInjectionPoint {
                    type_id: spec.id().to_string(),
                    member: prop.name.clone(),
                }
                .into());
            }
            properties.push(PropertyPrototype {
                name: prop.name.clone(),
                type_id: select_type(&prop.types),
                has_default: prop.default.is_some(),
                default: prop.default.clone(),
                allows_null: prop.nullable,
                injected: prop.inject,
                writable,
            });
        }

        let methods = spec
            .methods
            .iter()
            .map(|method| MethodPrototype {
                name: method.name.clone(),
                params: analyze_params(&method.params),
                injected: method.inject,
            })
            .collect();

        Ok(ServicePrototype {
            type_id: spec.id().to_string(),
            instantiable: spec.is_instantiable(),
            constructor,
            properties,
            methods,
        })
    }
}

fn analyze_params(params: &[ParamSpec]) -> Vec<ParameterPrototype> {
    params
        .iter()
        .map(|param| {
            let has_default = param.default.is_some();
            ParameterPrototype {
                name: param.name.clone(),
                type_id: select_type(&param.types),
                has_default,
                default: param.default.clone(),
                allows_null: param.nullable,
                required: !has_default && !param.nullable,
                variadic: param.variadic,
                tag_hint: param.tag_hint.clone(),
            }
        })
        .collect()
}

/// Analyzer plus cache: the memoising front the engine talks to.
pub struct Prototypes {
    analyzer: PrototypeAnalyzer,
    cache: Box<dyn PrototypeCache>,
}

impl Prototypes {
    pub fn new(cache: Box<dyn PrototypeCache>) -> Self {
        Self {
            analyzer: PrototypeAnalyzer::new(),
            cache,
        }
    }

    /// The prototype for a type id, analyzing and caching on first request.
    ///
    /// Fails with `AnalysisError` when the id is not registered.
    pub fn of(&self, registry: &TypeRegistry, type_id: &str) -> DiResult<Arc<ServicePrototype>> {
        if let Some(hit) = self.cache.get(type_id) {
            trace!(type_id, "prototype cache hit");
            return Ok(hit);
        }

        let spec = registry.get(type_id).ok_or_else(|| {
            crate::DiError::from(ErrorKind::Analysis {
                type_id: type_id.to_string(),
                reason: "no type metadata registered for this id".into(),
            })
        })?;

        let prototype = Arc::new(self.analyzer.analyze(&spec)?);
        self.cache.set(type_id, prototype.clone());
        debug!(type_id, "prototype analyzed and cached");
        Ok(prototype)
    }

    /// Drops one cached entry, forcing re-analysis on next request.
    pub fn invalidate(&self, type_id: &str) {
        self.cache.remove(type_id);
    }

    /// Drops every cached entry.
    pub fn clear(&self) {
        self.cache.clear();
    }
}
