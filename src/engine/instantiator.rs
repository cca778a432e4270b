//! Prototype-driven construction: build, property-inject, method-inject.

use std::sync::Arc;

use tracing::trace;

use crate::container::Container;
use crate::context::KernelContext;
use crate::engine::resolver::{self, PropertyOutcome};
use crate::error::{DiResult, ErrorKind};
use crate::reflect::ArgumentSet;
use crate::value::{AnyArc, Overrides, Value};

/// Builds an object for a type id: resolve constructor parameters, construct,
/// then run property and method injection in declared order.
///
/// Any required failure aborts the build; the partially-built object is
/// dropped with the error.
pub(crate) fn build(
    container: &Container,
    type_id: &str,
    overrides: &Overrides,
    plan: &[String],
    ctx: &Arc<KernelContext>,
) -> DiResult<Value> {
    let prototype = container.prototype_of(type_id)?;
    if !prototype.instantiable {
        return Err(ErrorKind::NotInstantiable {
            type_id: type_id.to_string(),
        }
        .into());
    }

    let spec = container.type_spec(type_id).ok_or_else(|| {
        crate::DiError::from(ErrorKind::Analysis {
            type_id: type_id.to_string(),
            reason: "type metadata disappeared between analysis and construction".into(),
        })
    })?;
    let construct = spec.construct.clone().ok_or_else(|| {
        crate::DiError::from(ErrorKind::NotInstantiable {
            type_id: type_id.to_string(),
        })
    })?;

    let params = prototype.constructor_params();
    let args = resolver::resolve_parameters(container, params, overrides, ctx)?;
    let names = params.iter().map(|p| p.name.clone()).collect();
    let mut target = construct(ArgumentSet::new(names, args))?;
    trace!(type_id, "constructed");

    // Property injection, declared order. In manual-injection mode only the
    // definition's explicit plan applies.
    for property in &prototype.properties {
        let planned = plan.iter().any(|name| name == &property.name);
        let marked = property.injected && !ctx.manual_injection();
        if !planned && !marked {
            continue;
        }
        if !property.writable {
            return Err(ErrorKind::InvalidInjectionPoint {
                type_id: type_id.to_string(),
                member: property.name.clone(),
            }
            .into());
        }
        match resolver::resolve_property(container, property, overrides, ctx)? {
            PropertyOutcome::Set(value) => {
                let setter = spec
                    .property_named(&property.name)
                    .and_then(|p| p.setter.clone())
                    .ok_or_else(|| {
                        crate::DiError::from(ErrorKind::InvalidInjectionPoint {
                            type_id: type_id.to_string(),
                            member: property.name.clone(),
                        })
                    })?;
                setter(target.as_mut(), value)?;
                trace!(type_id, property = %property.name, "property injected");
            }
            PropertyOutcome::Skip => {}
        }
    }

    // Method injection, declared order.
    for method in &prototype.methods {
        let planned = plan.iter().any(|name| name == &method.name);
        let marked = method.injected && !ctx.manual_injection();
        if !planned && !marked {
            continue;
        }
        let invoke = spec
            .method_named(&method.name)
            .map(|m| m.invoke.clone())
            .ok_or_else(|| {
                crate::DiError::from(ErrorKind::Analysis {
                    type_id: type_id.to_string(),
                    reason: format!("no invoker registered for method `{}`", method.name),
                })
            })?;
        let args = resolver::resolve_parameters(container, &method.params, overrides, ctx)?;
        let names = method.params.iter().map(|p| p.name.clone()).collect();
        invoke(target.as_mut(), ArgumentSet::new(names, args))?;
        trace!(type_id, method = %method.name, "method injected");
    }

    let arc: AnyArc = Arc::from(target);
    Ok(Value::Instance(arc))
}
