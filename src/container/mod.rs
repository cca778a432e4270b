//! The container façade: registration surface, resolution surface, and
//! scope control.

mod builders;

pub use builders::{BindingBuilder, ContextualBindingBuilder};

use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::context::KernelContext;
use crate::definition::{Concrete, ExtenderFn, ServiceDefinition};
use crate::engine::{Engine, EngineConfig};
use crate::error::{DiResult, ErrorKind};
use crate::lifetime::Lifetime;
use crate::prototype::{MemoryPrototypeCache, PrototypeCache, Prototypes, ServicePrototype};
use crate::reflect::{TypeRegistry, TypeSpec};
use crate::scope::{LifecycleStore, ScopeRegistry, SingletonStore, TransientStore};
use crate::store::DefinitionStore;
use crate::trace::{StepTelemetry, TelemetrySet};
use crate::value::{Overrides, Value};

static TRANSIENT: TransientStore = TransientStore;

pub(crate) struct ContainerCore {
    store: RwLock<DefinitionStore>,
    types: RwLock<TypeRegistry>,
    prototypes: Prototypes,
    singletons: SingletonStore,
    scopes: ScopeRegistry,
    telemetry: TelemetrySet,
    engine: Engine,
}

/// The public entry point: a cheaply clonable handle to one container.
///
/// The container exclusively owns its definition store, type registry,
/// prototype cache, lifecycle stores, and engine; the engine holds a weak
/// back-reference for nested resolution. Complete all registration before
/// publishing the container to other threads — reads are lock-light and
/// writes are expected only during setup.
///
/// # Examples
///
/// ```rust
/// use wirecore::reflect::{ParamSpec, TypeSpec};
/// use wirecore::Container;
///
/// struct Config {
///     url: String,
/// }
///
/// struct Repo {
///     config: std::sync::Arc<Config>,
/// }
///
/// let container = Container::new();
/// container
///     .register_type(TypeSpec::new("config").constructor(vec![], |_| {
///         Ok(Config {
///             url: "postgres://localhost".into(),
///         })
///     }))
///     .unwrap();
/// container
///     .register_type(TypeSpec::new("repo").constructor(
///         vec![ParamSpec::typed("config", "config")],
///         |args| {
///             Ok(Repo {
///                 config: args.instance("config")?,
///             })
///         },
///     ))
///     .unwrap();
///
/// let repo = container.get("repo").unwrap();
/// let repo = repo.downcast::<Repo>().unwrap();
/// assert_eq!(repo.config.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct Container {
    core: Arc<ContainerCore>,
}

impl Container {
    /// The well-known id under which the container resolves itself.
    pub const SELF_ID: &'static str = "container";

    /// A container with default configuration and an in-memory prototype
    /// cache.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Starts configuring a container.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::default()
    }

    pub(crate) fn from_core(core: Arc<ContainerCore>) -> Self {
        Self { core }
    }

    // ----- Registration surface -----

    /// Registers type metadata: the reflection substitute the analyzer and
    /// instantiator read. Re-registration replaces the spec and invalidates
    /// that id's cached prototype.
    pub fn register_type(&self, spec: TypeSpec) -> DiResult<()> {
        let id = spec.id().to_string();
        self.core.types.write().unwrap().register(spec)?;
        self.core.prototypes.invalidate(&id);
        debug!(type_id = %id, "type registered");
        Ok(())
    }

    /// Begins a transient binding for an id.
    pub fn bind(&self, id: &str) -> DiResult<BindingBuilder<'_>> {
        BindingBuilder::begin(self, id, Lifetime::Transient)
    }

    /// Begins a singleton binding for an id.
    pub fn singleton(&self, id: &str) -> DiResult<BindingBuilder<'_>> {
        BindingBuilder::begin(self, id, Lifetime::Singleton)
    }

    /// Begins a scoped binding for an id.
    pub fn scoped(&self, id: &str) -> DiResult<BindingBuilder<'_>> {
        BindingBuilder::begin(self, id, Lifetime::Scoped)
    }

    /// Registers a pre-built object, silently replacing any prior definition
    /// for the id.
    pub fn instance<T: Send + Sync + 'static>(&self, id: &str, value: T) -> DiResult<()> {
        let definition = ServiceDefinition::new(id)?
            .with_concrete(Concrete::Instance(Arc::new(value)))
            .with_lifetime(Lifetime::Singleton);
        self.core.store.write().unwrap().add(definition);
        Ok(())
    }

    /// Starts a contextual binding: `when(consumer).needs(id).give(impl)`.
    pub fn when(&self, consumer: &str) -> ContextualBindingBuilder<'_> {
        ContextualBindingBuilder::new(self, consumer)
    }

    /// Attaches tags to the given ids.
    pub fn tag(&self, ids: &[&str], tags: &[&str]) -> DiResult<()> {
        if ids.iter().any(|id| id.is_empty()) {
            return Err(ErrorKind::InvalidDefinition {
                reason: "tagged ids must not be empty".into(),
            }
            .into());
        }
        let mut store = self.core.store.write().unwrap();
        for id in ids {
            store.add_tags(id, tags);
        }
        Ok(())
    }

    /// Appends a post-build extender for an id.
    pub fn extend<F>(&self, id: &str, extender: F) -> DiResult<()>
    where
        F: Fn(Value, &Container) -> DiResult<Value> + Send + Sync + 'static,
    {
        if id.is_empty() {
            return Err(ErrorKind::InvalidDefinition {
                reason: "extended id must not be empty".into(),
            }
            .into());
        }
        self.core
            .store
            .write()
            .unwrap()
            .add_extender(id, Arc::new(extender));
        Ok(())
    }

    // ----- Resolution surface -----

    /// Resolves an id to a value.
    pub fn get(&self, id: &str) -> DiResult<Value> {
        self.make(id, Overrides::new())
    }

    /// Resolves an id with per-resolution overrides keyed by parameter name.
    pub fn make(&self, id: &str, overrides: Overrides) -> DiResult<Value> {
        let ctx = KernelContext::builder(id).overrides(overrides).build();
        self.resolve_context(ctx)
    }

    /// True when a definition or registered type exists for the id. Never
    /// fails.
    pub fn has(&self, id: &str) -> bool {
        if id == Self::SELF_ID {
            return true;
        }
        self.core.store.read().unwrap().contains(id) || self.knows_type(id)
    }

    /// Resolves every id carrying the tag, in tag-registration order.
    pub fn tagged(&self, tag: &str) -> DiResult<Vec<Value>> {
        let ids = self.tagged_ids(tag);
        let mut values = Vec::with_capacity(ids.len());
        for id in ids {
            values.push(self.get(&id)?);
        }
        Ok(values)
    }

    /// Resolves a prepared context. Used internally for nested resolution;
    /// public so factories can preserve the parent chain when they need to.
    pub fn resolve_context(&self, ctx: Arc<KernelContext>) -> DiResult<Value> {
        self.core.engine.resolve(ctx)
    }

    // ----- Scope control -----

    /// Opens the scope. Fails when a scope is already active.
    pub fn begin_scope(&self) -> DiResult<()> {
        self.core.scopes.begin()
    }

    /// Closes the active scope, releasing all scoped instances.
    pub fn end_scope(&self) -> DiResult<()> {
        self.core.scopes.end()
    }

    /// Opens the scope and returns a guard that closes it on drop, covering
    /// exceptional exit paths.
    pub fn scope(&self) -> DiResult<ScopeGuard> {
        self.begin_scope()?;
        Ok(ScopeGuard {
            container: self.clone(),
            ended: false,
        })
    }

    // ----- Diagnostics -----

    /// A snapshot of one registered definition.
    pub fn definition(&self, id: &str) -> Option<ServiceDefinition> {
        self.core.store.read().unwrap().get(id).cloned()
    }

    /// A snapshot of every registered definition, in registration order.
    pub fn definitions(&self) -> Vec<ServiceDefinition> {
        self.core.store.read().unwrap().all().cloned().collect()
    }

    /// The analyzed prototype for a registered type id.
    pub fn prototype_of(&self, type_id: &str) -> DiResult<Arc<ServicePrototype>> {
        let types = self.core.types.read().unwrap();
        self.core.prototypes.of(&types, type_id)
    }

    /// Drops every cached prototype; analysis re-runs on demand.
    pub fn clear_prototype_cache(&self) {
        self.core.prototypes.clear();
    }

    /// The engine's depth/deadline configuration.
    pub fn engine_config(&self) -> EngineConfig {
        self.core.engine.config().clone()
    }

    // ----- Crate-internal accessors for the engine -----

    pub(crate) fn contextual_concrete(&self, consumer: &str, needs: &str) -> Option<Concrete> {
        self.core
            .store
            .read()
            .unwrap()
            .contextual_match(consumer, needs)
            .cloned()
    }

    pub(crate) fn definition_of(&self, id: &str) -> Option<ServiceDefinition> {
        self.core.store.read().unwrap().get(id).cloned()
    }

    pub(crate) fn extenders_of(&self, id: &str) -> Vec<ExtenderFn> {
        self.core.store.read().unwrap().extenders(id).to_vec()
    }

    pub(crate) fn tagged_ids(&self, tag: &str) -> Vec<String> {
        self.core.store.read().unwrap().tagged(tag).to_vec()
    }

    pub(crate) fn knows_type(&self, id: &str) -> bool {
        self.core.types.read().unwrap().contains(id)
    }

    pub(crate) fn type_spec(&self, id: &str) -> Option<Arc<TypeSpec>> {
        self.core.types.read().unwrap().get(id)
    }

    pub(crate) fn singletons(&self) -> &SingletonStore {
        &self.core.singletons
    }

    pub(crate) fn scopes(&self) -> &ScopeRegistry {
        &self.core.scopes
    }

    pub(crate) fn lifecycle_store(&self, lifetime: Lifetime) -> &dyn LifecycleStore {
        match lifetime {
            Lifetime::Singleton => &self.core.singletons,
            Lifetime::Scoped => &self.core.scopes,
            Lifetime::Transient => &TRANSIENT,
        }
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySet {
        &self.core.telemetry
    }

    pub(crate) fn store_mut<R>(&self, f: impl FnOnce(&mut DefinitionStore) -> R) -> R {
        f(&mut self.core.store.write().unwrap())
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("definitions", &self.core.store.read().unwrap().all().count())
            .field("scope_active", &self.core.scopes.is_active())
            .finish()
    }
}

/// Configuration for a container: engine guards, prototype cache backend,
/// and telemetry sinks.
#[derive(Default)]
pub struct ContainerBuilder {
    config: EngineConfig,
    cache: Option<Box<dyn PrototypeCache>>,
    telemetry: Vec<Arc<dyn StepTelemetry>>,
}

impl ContainerBuilder {
    /// Caps resolution depth (default 256).
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    /// Sets a wall-clock deadline for each root resolution.
    pub fn deadline(mut self, deadline: std::time::Duration) -> Self {
        self.config.deadline = Some(deadline);
        self
    }

    /// Swaps the prototype cache backend (default: in-memory).
    pub fn prototype_cache(mut self, cache: Box<dyn PrototypeCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Adds a telemetry sink observing every pipeline step.
    pub fn telemetry(mut self, sink: Arc<dyn StepTelemetry>) -> Self {
        self.telemetry.push(sink);
        self
    }

    pub fn build(self) -> Container {
        let cache = self
            .cache
            .unwrap_or_else(|| Box::new(MemoryPrototypeCache::new()));
        let mut telemetry = TelemetrySet::new();
        for sink in self.telemetry {
            telemetry.add(sink);
        }
        let config = self.config;
        let core = Arc::new_cyclic(|weak| ContainerCore {
            store: RwLock::new(DefinitionStore::new()),
            types: RwLock::new(TypeRegistry::new()),
            prototypes: Prototypes::new(cache),
            singletons: SingletonStore::new(),
            scopes: ScopeRegistry::new(),
            telemetry,
            engine: Engine::new(weak.clone(), config),
        });
        Container { core }
    }
}

/// RAII handle for an active scope: ends the scope on drop.
pub struct ScopeGuard {
    container: Container,
    ended: bool,
}

impl ScopeGuard {
    /// Ends the scope explicitly, surfacing any lifecycle error.
    pub fn end(mut self) -> DiResult<()> {
        self.ended = true;
        self.container.end_scope()
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if !self.ended {
            let _ = self.container.end_scope();
        }
    }
}
