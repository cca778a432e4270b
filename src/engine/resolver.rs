//! Parameter and property resolution against the container, overrides, and
//! context.

use std::sync::Arc;

use tracing::trace;

use crate::container::Container;
use crate::context::KernelContext;
use crate::error::{DiError, DiResult, ErrorKind};
use crate::prototype::{ParameterPrototype, PropertyPrototype};
use crate::value::{Overrides, Value};

/// Outcome of one type-based lookup: a non-exceptional signal, so optional
/// parameters can fall through to their default without catching errors. The
/// original error is kept so required parameters propagate it untransformed.
enum ParamResolution {
    Found(Value),
    NotFound(DiError),
}

/// Outcome of resolving one injectable property. `Skip` leaves the current
/// value untouched and is never an error by itself.
pub(crate) enum PropertyOutcome {
    Set(Value),
    Skip,
}

/// Resolves an ordered parameter list.
///
/// Per parameter, strict priority: explicit override by name, type-based
/// resolution through a child context, declared default, nullable fallback,
/// required failure. Variadic parameters collect a named override or tagged
/// services into a list.
pub(crate) fn resolve_parameters(
    container: &Container,
    params: &[ParameterPrototype],
    overrides: &Overrides,
    ctx: &Arc<KernelContext>,
) -> DiResult<Vec<Value>> {
    let mut resolved = Vec::with_capacity(params.len());
    for param in params {
        resolved.push(resolve_parameter(container, param, overrides, ctx)?);
    }
    Ok(resolved)
}

fn resolve_parameter(
    container: &Container,
    param: &ParameterPrototype,
    overrides: &Overrides,
    ctx: &Arc<KernelContext>,
) -> DiResult<Value> {
    // Overrides win unconditionally and skip type checks: the escape hatch.
    if let Some(value) = overrides.get(&param.name) {
        trace!(parameter = %param.name, "parameter satisfied by override");
        return Ok(value.clone());
    }

    if param.variadic {
        return resolve_variadic(container, param, ctx);
    }

    if let Some(type_id) = &param.type_id {
        match resolve_typed(container, type_id, ctx)? {
            ParamResolution::Found(value) => return Ok(value),
            ParamResolution::NotFound(original) if param.required => {
                // Required parameters do not recover from a missing service.
                return Err(original);
            }
            ParamResolution::NotFound(_) => {}
        }
    }

    if param.has_default {
        if let Some(default) = &param.default {
            return Ok(default.to_value());
        }
    }

    if param.allows_null {
        return Ok(Value::Null);
    }

    Err(ErrorKind::UnresolvableDependency {
        parameter: param.name.clone(),
        consumer: ctx.service_id().to_string(),
    }
    .into())
}

/// Type-based resolution through a child context, preserving the parent
/// chain. The circular check runs before the nested call so the error carries
/// the full chain.
fn resolve_typed(
    container: &Container,
    type_id: &str,
    ctx: &Arc<KernelContext>,
) -> DiResult<ParamResolution> {
    if ctx.contains(type_id) {
        let mut cycle = ctx.path();
        cycle.push(type_id.to_string());
        return Err(ErrorKind::CircularDependency { cycle }.into());
    }

    match container.resolve_context(ctx.child(type_id)) {
        Ok(value) => Ok(ParamResolution::Found(value)),
        Err(e) if matches!(e.kind(), ErrorKind::NotFound { .. }) => {
            Ok(ParamResolution::NotFound(e))
        }
        Err(e) => Err(e),
    }
}

fn resolve_variadic(
    container: &Container,
    param: &ParameterPrototype,
    ctx: &Arc<KernelContext>,
) -> DiResult<Value> {
    if let Some(tag) = &param.tag_hint {
        let ids = container.tagged_ids(tag);
        let mut values = Vec::with_capacity(ids.len());
        for id in ids {
            values.push(container.resolve_context(ctx.child(&id))?);
        }
        return Ok(Value::List(values));
    }
    Ok(Value::List(Vec::new()))
}

/// Resolves one injectable property: overrides, then type resolution, then
/// default (skip), then nullable, then required failure.
pub(crate) fn resolve_property(
    container: &Container,
    property: &PropertyPrototype,
    overrides: &Overrides,
    ctx: &Arc<KernelContext>,
) -> DiResult<PropertyOutcome> {
    if let Some(value) = overrides.get(&property.name) {
        return Ok(PropertyOutcome::Set(value.clone()));
    }

    if let Some(type_id) = &property.type_id {
        match resolve_typed(container, type_id, ctx)? {
            ParamResolution::Found(value) => return Ok(PropertyOutcome::Set(value)),
            ParamResolution::NotFound(original)
                if !property.has_default && !property.allows_null =>
            {
                return Err(original);
            }
            ParamResolution::NotFound(_) => {}
        }
    }

    // With a default in place the constructed value already holds it.
    if property.has_default {
        return Ok(PropertyOutcome::Skip);
    }

    if property.allows_null {
        return Ok(PropertyOutcome::Set(Value::Null));
    }

    Err(ErrorKind::UnresolvableDependency {
        parameter: property.name.clone(),
        consumer: ctx.service_id().to_string(),
    }
    .into())
}
