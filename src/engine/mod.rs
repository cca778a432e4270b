//! The resolution pipeline: a stage machine from service id to value.
//!
//! Stages run in a fixed order — contextual lookup, definition lookup,
//! autowire, evaluate, instantiate — with a terminal fast path through the
//! lifecycle stores, a circular-dependency guard over the context's parent
//! chain, and depth/deadline guards against runaway graphs. Each stage
//! records a trace entry; failures leave the trace in the context metadata
//! and on the error.

pub(crate) mod instantiator;
pub(crate) mod resolver;

use std::cell::RefCell;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::trace;

use crate::container::{Container, ContainerCore};
use crate::context::KernelContext;
use crate::definition::{Argument, Concrete, ServiceDefinition};
use crate::error::{DiError, DiResult, ErrorKind};
use crate::lifetime::Lifetime;
use crate::scope::LifecycleStore;
use crate::trace::{Stage, StageOutcome, TraceEntry};
use crate::value::{Overrides, Value};

/// Engine guards: resolution depth cap and optional wall-clock deadline.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum resolution depth before aborting with `DepthExceeded`.
    pub max_depth: usize,
    /// Optional wall-clock budget for one root resolution.
    pub deadline: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: 256,
            deadline: None,
        }
    }
}

// Singleton builds in flight on this thread. A factory that re-enters the
// container for the id it is currently building would otherwise deadlock on
// the per-id build lock; the thread-local stack turns that into a circular
// dependency report.
thread_local! {
    static BUILDING: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

struct BuildGuard;

impl BuildGuard {
    fn enter(id: &str, ctx: &KernelContext) -> DiResult<Self> {
        let already = BUILDING.with(|stack| stack.borrow().iter().any(|b| b == id));
        if already {
            let mut cycle = ctx.path();
            cycle.push(id.to_string());
            return Err(ErrorKind::CircularDependency { cycle }.into());
        }
        BUILDING.with(|stack| stack.borrow_mut().push(id.to_string()));
        Ok(Self)
    }
}

impl Drop for BuildGuard {
    fn drop(&mut self) {
        BUILDING.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// The resolution state machine.
///
/// Holds a weak back-reference to the container core for nested resolution;
/// the container owns the engine, never the other way around.
pub(crate) struct Engine {
    core: Weak<ContainerCore>,
    config: EngineConfig,
}

impl Engine {
    pub(crate) fn new(core: Weak<ContainerCore>, config: EngineConfig) -> Self {
        Self { core, config }
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolves the context's service id to a value.
    pub(crate) fn resolve(&self, ctx: Arc<KernelContext>) -> DiResult<Value> {
        let core = self
            .core
            .upgrade()
            .ok_or_else(|| DiError::from(ErrorKind::ContainerNotInitialised))?;
        let container = Container::from_core(core);

        let result = self.run(&container, &ctx);
        match result {
            Ok(value) => {
                if ctx.depth() == 0 {
                    container
                        .telemetry()
                        .finished(ctx.trace_id(), ctx.service_id(), ctx.elapsed());
                }
                Ok(value)
            }
            Err(e) => {
                let e = e.with_path(ctx.path()).with_trace(ctx.trace().entries());
                ctx.set_metadata("resolution", "trace", ctx.trace().render());
                if ctx.depth() == 0 {
                    container
                        .telemetry()
                        .failed(ctx.trace_id(), ctx.service_id(), &e);
                }
                Err(e)
            }
        }
    }

    fn run(&self, container: &Container, ctx: &Arc<KernelContext>) -> DiResult<Value> {
        let id = ctx.service_id().to_string();

        if ctx.depth() >= self.config.max_depth {
            return Err(ErrorKind::DepthExceeded {
                limit: self.config.max_depth,
            }
            .into());
        }
        if let Some(limit) = self.config.deadline {
            let elapsed = ctx.elapsed();
            if elapsed > limit {
                return Err(ErrorKind::Timeout { elapsed, limit }.into());
            }
        }

        // The container resolves itself without touching the pipeline.
        if id == Container::SELF_ID {
            self.record(
                container,
                ctx,
                TraceEntry::new(&id, Stage::Success, StageOutcome::Hit, ctx.depth())
                    .with_note("container self-reference"),
            );
            return Ok(Value::instance(container.clone()));
        }

        // Stage: contextual lookup.
        let contextual = ctx
            .consumer()
            .and_then(|consumer| container.contextual_concrete(consumer, &id));
        self.record(
            container,
            ctx,
            TraceEntry::new(
                &id,
                Stage::ContextualLookup,
                if contextual.is_some() {
                    StageOutcome::Hit
                } else {
                    StageOutcome::Miss
                },
                ctx.depth(),
            ),
        );

        // Terminal fast path: a stored instance short-circuits every later
        // stage. A contextual hit bypasses the shared caches entirely.
        if contextual.is_none() {
            if let Some(value) = container.singletons().retrieve(&id) {
                self.record(
                    container,
                    ctx,
                    TraceEntry::new(&id, Stage::Success, StageOutcome::Hit, ctx.depth())
                        .with_note("singleton cache"),
                );
                return Ok(value);
            }
            if let Some(value) = container.scopes().retrieve(&id) {
                self.record(
                    container,
                    ctx,
                    TraceEntry::new(&id, Stage::Success, StageOutcome::Hit, ctx.depth())
                        .with_note("scope cache"),
                );
                return Ok(value);
            }
        }

        let definition = container.definition_of(&id);

        // At-most-one concurrent construction per singleton id: take the
        // build lock, re-check the cache, then run the pipeline.
        let is_singleton = contextual.is_none()
            && definition
                .as_ref()
                .is_some_and(|d| d.lifetime == Lifetime::Singleton);
        if is_singleton {
            let _build = BuildGuard::enter(&id, ctx)?;
            let lock = container.singletons().build_lock(&id);
            let _guard = lock.lock().unwrap();
            if let Some(value) = container.singletons().retrieve(&id) {
                self.record(
                    container,
                    ctx,
                    TraceEntry::new(&id, Stage::Success, StageOutcome::Hit, ctx.depth())
                        .with_note("singleton cache"),
                );
                return Ok(value);
            }
            return self.run_stages(container, ctx, &id, contextual, definition);
        }

        self.run_stages(container, ctx, &id, contextual, definition)
    }

    fn run_stages(
        &self,
        container: &Container,
        ctx: &Arc<KernelContext>,
        id: &str,
        contextual: Option<Concrete>,
        definition: Option<ServiceDefinition>,
    ) -> DiResult<Value> {
        let from_contextual = contextual.is_some();

        // Stages: definition lookup, then autowire.
        let candidate = if let Some(concrete) = contextual {
            concrete
        } else if let Some(def) = &definition {
            self.record(
                container,
                ctx,
                TraceEntry::new(id, Stage::DefinitionLookup, StageOutcome::Hit, ctx.depth()),
            );
            def.concrete
                .clone()
                .unwrap_or_else(|| Concrete::Type(id.to_string()))
        } else {
            self.record(
                container,
                ctx,
                TraceEntry::new(id, Stage::DefinitionLookup, StageOutcome::Miss, ctx.depth()),
            );
            if ctx.allow_autowire() && container.knows_type(id) {
                self.record(
                    container,
                    ctx,
                    TraceEntry::new(id, Stage::Autowire, StageOutcome::Hit, ctx.depth()),
                );
                Concrete::Type(id.to_string())
            } else {
                self.record(
                    container,
                    ctx,
                    TraceEntry::new(id, Stage::Autowire, StageOutcome::Miss, ctx.depth()),
                );
                self.record(
                    container,
                    ctx,
                    TraceEntry::new(id, Stage::NotFound, StageOutcome::NotFound, ctx.depth()),
                );
                return Err(DiError::from(ErrorKind::NotFound { id: id.to_string() })
                    .with_stage(Stage::NotFound));
            }
        };

        let overrides = self.effective_overrides(container, ctx, definition.as_ref())?;
        let mut plan: Vec<String> = definition
            .as_ref()
            .map(|d| d.injections.clone())
            .unwrap_or_default();
        for member in ctx.injection_plan() {
            if !plan.contains(member) {
                plan.push(member.clone());
            }
        }

        // Stage: evaluate the candidate.
        let produced = match candidate {
            Concrete::Literal(value) => {
                self.record_evaluate(container, ctx, id, "literal");
                value
            }
            Concrete::Instance(arc) => {
                self.record_evaluate(container, ctx, id, "instance");
                Value::Instance(arc)
            }
            Concrete::Factory(factory) => {
                let value = factory(container, &overrides)
                    .map_err(|e| e.with_path(ctx.path()).with_stage(Stage::Evaluate))?;
                self.record_evaluate(container, ctx, id, "factory");
                value
            }
            Concrete::Type(target) if target != id => {
                if ctx.contains(&target) {
                    let mut cycle = ctx.path();
                    cycle.push(target.clone());
                    return Err(DiError::from(ErrorKind::CircularDependency { cycle })
                        .with_stage(Stage::Evaluate));
                }
                self.record_evaluate(container, ctx, id, &format!("delegate to `{target}`"));
                // Delegation forwards the effective overrides and injection
                // plan so definition arguments reach the target's constructor.
                let child = ctx.delegate_child(&target, overrides.clone(), plan.clone());
                container.resolve_context(child)?
            }
            Concrete::Type(_) => {
                if let Some(parent) = ctx.parent() {
                    if parent.contains(id) {
                        let cycle = ctx.path();
                        return Err(DiError::from(ErrorKind::CircularDependency { cycle })
                            .with_stage(Stage::Evaluate));
                    }
                }
                self.record_evaluate(container, ctx, id, "construct");
                let value = instantiator::build(container, id, &overrides, &plan, ctx)
                    .map_err(|e| e.with_stage(Stage::Instantiate))?;
                self.record(
                    container,
                    ctx,
                    TraceEntry::new(id, Stage::Instantiate, StageOutcome::Success, ctx.depth()),
                );
                value
            }
        };

        // Extenders run after construction, before lifecycle storage, in
        // registration order. Returning a different value replaces the
        // instance.
        let mut value = produced;
        for extender in container.extenders_of(id) {
            value = extender(value, container)
                .map_err(|e| e.with_path(ctx.path()).with_stage(Stage::Evaluate))?;
        }

        ctx.set_instance(value.clone())?;

        if !from_contextual {
            let lifetime = definition
                .as_ref()
                .map(|d| d.lifetime)
                .unwrap_or(Lifetime::Transient);
            container.lifecycle_store(lifetime).store(id, value.clone());
        }

        self.record(
            container,
            ctx,
            TraceEntry::new(id, Stage::Success, StageOutcome::Success, ctx.depth()),
        );
        trace!(service_id = id, "resolved");
        Ok(value)
    }

    /// Merges definition arguments under the caller's overrides; the caller
    /// wins on conflicts. `Service` arguments resolve through a child context.
    fn effective_overrides(
        &self,
        container: &Container,
        ctx: &Arc<KernelContext>,
        definition: Option<&ServiceDefinition>,
    ) -> DiResult<Overrides> {
        let mut merged = Overrides::new();
        if let Some(def) = definition {
            for (name, argument) in &def.arguments {
                let value = match argument {
                    Argument::Value(value) => value.clone(),
                    Argument::Service(service_id) => {
                        container.resolve_context(ctx.child(service_id))?
                    }
                };
                merged.insert(name.clone(), value);
            }
        }
        for (name, value) in ctx.overrides() {
            merged.insert(name.clone(), value.clone());
        }
        Ok(merged)
    }

    fn record_evaluate(&self, container: &Container, ctx: &Arc<KernelContext>, id: &str, note: &str) {
        self.record(
            container,
            ctx,
            TraceEntry::new(id, Stage::Evaluate, StageOutcome::Success, ctx.depth())
                .with_note(note),
        );
    }

    fn record(&self, container: &Container, ctx: &Arc<KernelContext>, entry: TraceEntry) {
        let entry = ctx.trace().record(entry);
        let telemetry = container.telemetry();
        if !telemetry.is_empty() {
            telemetry.step(ctx.trace_id(), &entry);
        }
    }
}
