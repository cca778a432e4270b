//! Per-resolution state: the kernel context and its parent chain.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{DiResult, ErrorKind};
use crate::trace::ResolutionTrace;
use crate::value::{Overrides, Value};

/// State carried through one resolution of one service id.
///
/// A context is created per `resolve` call; nested dependencies get child
/// contexts created strictly by [`KernelContext::child`], so the parent chain
/// is an acyclic linked path used for circular-dependency detection. The
/// trace sink and the resolution clock are shared down the chain.
///
/// # Examples
///
/// ```rust
/// use wirecore::KernelContext;
///
/// let root = KernelContext::root("report");
/// let child = root.child("logger");
///
/// assert_eq!(child.depth(), 1);
/// assert_eq!(child.consumer(), Some("report"));
/// assert!(child.contains("report"));
/// assert!(!child.contains("mailer"));
/// assert_eq!(child.path(), vec!["report".to_string(), "logger".to_string()]);
/// ```
pub struct KernelContext {
    service_id: String,
    consumer: Option<String>,
    parent: Option<Arc<KernelContext>>,
    depth: usize,
    overrides: Overrides,
    debug: bool,
    allow_autowire: bool,
    manual_injection: bool,
    trace: Arc<ResolutionTrace>,
    injection_plan: Vec<String>,
    instance: Mutex<Option<Value>>,
    metadata: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl KernelContext {
    /// A root context with default flags and no overrides.
    pub fn root(service_id: impl Into<String>) -> Arc<Self> {
        Self::builder(service_id).build()
    }

    /// Starts configuring a root context.
    pub fn builder(service_id: impl Into<String>) -> KernelContextBuilder {
        KernelContextBuilder {
            service_id: service_id.into(),
            overrides: Overrides::new(),
            debug: false,
            allow_autowire: true,
            manual_injection: false,
        }
    }

    /// A child context for a nested dependency. Depth grows by one and the
    /// consumer is this context's service id.
    pub fn child(self: &Arc<Self>, service_id: impl Into<String>) -> Arc<Self> {
        self.child_with_overrides(service_id, Overrides::new())
    }

    /// A child context carrying its own override map.
    pub fn child_with_overrides(
        self: &Arc<Self>,
        service_id: impl Into<String>,
        overrides: Overrides,
    ) -> Arc<Self> {
        self.child_inner(service_id.into(), overrides, Vec::new())
    }

    /// A child context for delegation: carries the delegating definition's
    /// effective overrides and injection plan to the target. The plan applies
    /// to the delegated instantiation only — ordinary children start with an
    /// empty plan.
    pub(crate) fn delegate_child(
        self: &Arc<Self>,
        service_id: impl Into<String>,
        overrides: Overrides,
        injection_plan: Vec<String>,
    ) -> Arc<Self> {
        self.child_inner(service_id.into(), overrides, injection_plan)
    }

    fn child_inner(
        self: &Arc<Self>,
        service_id: String,
        overrides: Overrides,
        injection_plan: Vec<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            service_id,
            consumer: Some(self.service_id.clone()),
            parent: Some(self.clone()),
            depth: self.depth + 1,
            overrides,
            debug: self.debug,
            allow_autowire: self.allow_autowire,
            manual_injection: self.manual_injection,
            trace: self.trace.clone(),
            injection_plan,
            instance: Mutex::new(None),
            metadata: Mutex::new(HashMap::new()),
        })
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// The parent's service id, if this is a nested resolution.
    pub fn consumer(&self) -> Option<&str> {
        self.consumer.as_deref()
    }

    pub fn parent(&self) -> Option<&Arc<KernelContext>> {
        self.parent.as_ref()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    pub fn allow_autowire(&self) -> bool {
        self.allow_autowire
    }

    pub fn manual_injection(&self) -> bool {
        self.manual_injection
    }

    pub(crate) fn injection_plan(&self) -> &[String] {
        &self.injection_plan
    }

    pub fn trace(&self) -> &Arc<ResolutionTrace> {
        &self.trace
    }

    pub fn trace_id(&self) -> &str {
        self.trace.trace_id()
    }

    /// Time since the root resolution started.
    pub fn elapsed(&self) -> Duration {
        self.trace.started().elapsed()
    }

    /// True when `id` is this context's service id or any ancestor's.
    pub fn contains(&self, id: &str) -> bool {
        let mut current = Some(self);
        while let Some(ctx) = current {
            if ctx.service_id == id {
                return true;
            }
            current = ctx.parent.as_deref();
        }
        false
    }

    /// The chain of service ids from the root to this context.
    pub fn path(&self) -> Vec<String> {
        let mut path = Vec::with_capacity(self.depth + 1);
        let mut current = Some(self);
        while let Some(ctx) = current {
            path.push(ctx.service_id.clone());
            current = ctx.parent.as_deref();
        }
        path.reverse();
        path
    }

    /// Sets the resolved instance. A context is consumed once: a second call
    /// is a lifecycle misuse.
    pub fn set_instance(&self, value: Value) -> DiResult<()> {
        let mut slot = self.instance.lock().unwrap();
        if slot.is_some() {
            return Err(ErrorKind::LifecycleMisuse {
                reason: format!(
                    "instance for `{}` was already set on this context",
                    self.service_id
                ),
            }
            .into());
        }
        *slot = Some(value);
        Ok(())
    }

    /// The explicit overwrite path for decorators: replaces any prior
    /// instance.
    pub fn replace_instance(&self, value: Value) {
        *self.instance.lock().unwrap() = Some(value);
    }

    pub fn instance(&self) -> Option<Value> {
        self.instance.lock().unwrap().clone()
    }

    /// Writes one namespaced metadata entry.
    pub fn set_metadata(
        &self,
        namespace: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.metadata
            .lock()
            .unwrap()
            .entry(namespace.into())
            .or_default()
            .insert(key.into(), value.into());
    }

    pub fn metadata(&self, namespace: &str, key: &str) -> Option<String> {
        self.metadata
            .lock()
            .unwrap()
            .get(namespace)
            .and_then(|ns| ns.get(key))
            .cloned()
    }
}

impl fmt::Debug for KernelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelContext")
            .field("service_id", &self.service_id)
            .field("consumer", &self.consumer)
            .field("depth", &self.depth)
            .field("trace_id", &self.trace_id())
            .finish()
    }
}

/// Builder for root contexts.
pub struct KernelContextBuilder {
    service_id: String,
    overrides: Overrides,
    debug: bool,
    allow_autowire: bool,
    manual_injection: bool,
}

impl KernelContextBuilder {
    pub fn overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn allow_autowire(mut self, allow: bool) -> Self {
        self.allow_autowire = allow;
        self
    }

    pub fn manual_injection(mut self, manual: bool) -> Self {
        self.manual_injection = manual;
        self
    }

    pub fn build(self) -> Arc<KernelContext> {
        Arc::new(KernelContext {
            service_id: self.service_id,
            consumer: None,
            parent: None,
            depth: 0,
            overrides: self.overrides,
            debug: self.debug,
            allow_autowire: self.allow_autowire,
            manual_injection: self.manual_injection,
            trace: ResolutionTrace::new(),
            injection_plan: Vec::new(),
            instance: Mutex::new(None),
            metadata: Mutex::new(HashMap::new()),
        })
    }
}
