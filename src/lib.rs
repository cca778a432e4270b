//! # wirecore
//!
//! String-keyed dependency injection for Rust: declarative service
//! registrations in, fully wired object graphs out.
//!
//! ## Features
//!
//! - **Three lifetimes**: singleton, scoped, and transient caching
//! - **Contextual bindings**: `when(consumer).needs(id).give(impl)` overrides
//! - **Prototype analysis**: programmatic type metadata reduced to cached,
//!   disk-persistable injection plans
//! - **Staged resolution**: contextual lookup → definition lookup → autowire
//!   → evaluate → instantiate, with a per-stage trace
//! - **Circular dependency detection**: parent-chain checks with full paths
//!   in the error
//! - **Extenders and tags**: post-build decoration and batch retrieval
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use wirecore::reflect::{ParamSpec, TypeSpec};
//! use wirecore::Container;
//!
//! trait Logger: Send + Sync {
//!     fn log(&self, message: &str);
//! }
//!
//! struct FileLogger {
//!     path: String,
//! }
//!
//! impl Logger for FileLogger {
//!     fn log(&self, _message: &str) {}
//! }
//!
//! struct ReportService {
//!     logger: Arc<FileLogger>,
//! }
//!
//! let container = Container::new();
//!
//! // Describe how types are built; this stands in for runtime reflection.
//! container
//!     .register_type(TypeSpec::new("file_logger").constructor(
//!         vec![ParamSpec::scalar("path").with_default("/var/log/app.log")],
//!         |args| {
//!             Ok(FileLogger {
//!                 path: args.string("path")?,
//!             })
//!         },
//!     ))
//!     .unwrap();
//! container
//!     .register_type(TypeSpec::new("report_service").constructor(
//!         vec![ParamSpec::typed("logger", "file_logger")],
//!         |args| {
//!             Ok(ReportService {
//!                 logger: args.instance("logger")?,
//!             })
//!         },
//!     ))
//!     .unwrap();
//!
//! // Bind an id and resolve: the dependency chain autowires.
//! container.singleton("report_service").unwrap();
//! let report = container.get("report_service").unwrap();
//! let report = report.downcast::<ReportService>().unwrap();
//! assert_eq!(report.logger.path, "/var/log/app.log");
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Singleton**: created once, shared for the container's lifetime
//! - **Scoped**: shared within an active `begin_scope`/`end_scope` window
//! - **Transient**: fresh on every resolution
//!
//! ## Contextual Bindings
//!
//! ```rust
//! use wirecore::{Container, Value};
//!
//! let container = Container::new();
//! container.bind("logger").unwrap().to_value(Value::from("file"));
//! container
//!     .when("report_service")
//!     .needs("logger")
//!     .give_factory(|_, _| Ok(Value::from("silent")))
//!     .unwrap();
//!
//! // The global binding is untouched.
//! assert_eq!(container.get("logger").unwrap().as_str(), Some("file"));
//! ```

pub mod container;
pub mod context;
pub mod definition;
pub mod engine;
pub mod error;
pub mod lifetime;
pub mod prototype;
pub mod reflect;
pub mod scope;
pub mod store;
pub mod trace;
pub mod value;

pub use container::{
    BindingBuilder, Container, ContainerBuilder, ContextualBindingBuilder, ScopeGuard,
};
pub use context::{KernelContext, KernelContextBuilder};
pub use definition::{Argument, Concrete, ExtenderFn, FactoryFn, ServiceDefinition};
pub use engine::EngineConfig;
pub use error::{DiError, DiResult, ErrorKind};
pub use lifetime::Lifetime;
pub use prototype::{
    FilePrototypeCache, MemoryPrototypeCache, MethodPrototype, ParameterPrototype,
    PropertyPrototype, PrototypeAnalyzer, PrototypeCache, ServicePrototype,
};
pub use scope::{LifecycleStore, ScopeRegistry, SingletonStore, TransientStore};
pub use store::{ContextualRule, DefinitionStore};
pub use trace::{
    LogTelemetry, MetricsTelemetry, ResolutionTrace, Stage, StageOutcome, StepTelemetry,
    TraceEntry,
};
pub use value::{AnyArc, Literal, Overrides, Value};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::reflect::{MethodSpec, ParamSpec, PropertySpec, TypeSpec};
    pub use crate::{
        Container, DiError, DiResult, ErrorKind, Lifetime, Literal, Overrides, Value,
    };
    pub use std::sync::Arc;
}
