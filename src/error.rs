//! Error types for the dependency injection container.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::trace::{Stage, TraceEntry};

/// The failure taxonomy of the container.
///
/// Each variant names one way registration or resolution can fail. The
/// [`DiError`] wrapper attaches the resolution path, last stage, and trace
/// to a kind; match on [`DiError::kind`] to dispatch on the failure class.
///
/// # Examples
///
/// ```rust
/// use wirecore::{Container, ErrorKind};
///
/// let container = Container::new();
/// match container.get("missing") {
///     Err(e) => assert!(matches!(e.kind(), ErrorKind::NotFound { .. })),
///     Ok(_) => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, Error)]
pub enum ErrorKind {
    /// No definition, no registered type, no contextual match
    #[error("service not found: {id}")]
    NotFound { id: String },
    /// A required parameter or property could not be satisfied
    #[error("unresolvable dependency `{parameter}` required by `{consumer}`")]
    UnresolvableDependency { parameter: String, consumer: String },
    /// The candidate id is already on the parent chain (includes the cycle)
    #[error("circular dependency: {}", .cycle.join(" -> "))]
    CircularDependency { cycle: Vec<String> },
    /// Maximum resolution depth exceeded
    #[error("resolution depth exceeded: limit is {limit}")]
    DepthExceeded { limit: usize },
    /// The configured wall-clock deadline elapsed mid-resolution
    #[error("resolution deadline of {limit:?} exceeded after {elapsed:?}")]
    Timeout { elapsed: Duration, limit: Duration },
    /// The prototype marks the type as non-instantiable
    #[error("type `{type_id}` is not instantiable")]
    NotInstantiable { type_id: String },
    /// Injection requested on a read-only member
    #[error("injection requested on read-only member `{member}` of `{type_id}`")]
    InvalidInjectionPoint { type_id: String, member: String },
    /// `give` called before `needs` on a contextual binding builder
    #[error("contextual binding for `{consumer}` is incomplete: call `needs` before `give`")]
    InvalidContextualBinding { consumer: String },
    /// Empty id, unknown concrete kind, or contradictory configuration
    #[error("invalid definition: {reason}")]
    InvalidDefinition { reason: String },
    /// Type metadata unavailable
    #[error("cannot analyze `{type_id}`: {reason}")]
    Analysis { type_id: String, reason: String },
    /// The engine was invoked without a live container back-reference
    #[error("engine invoked before its container back-reference was initialised")]
    ContainerNotInitialised,
    /// Scope not active, scope ended twice, or similar lifecycle violation
    #[error("lifecycle misuse: {reason}")]
    LifecycleMisuse { reason: String },
}

/// A container failure: an [`ErrorKind`] plus the resolution context it
/// occurred in.
///
/// Every failure surfaced to a caller carries the failing kind, the chain of
/// ancestor service ids, the last pipeline stage reached, and the recorded
/// trace. Errors raised inside factories and extenders keep their original
/// kind; the engine only fills in path, stage, and trace where absent.
///
/// # Examples
///
/// ```rust
/// use wirecore::{DiError, ErrorKind};
///
/// let err = DiError::from(ErrorKind::NotFound { id: "mailer".into() });
/// assert!(err.to_string().contains("service not found: mailer"));
/// assert!(err.path().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct DiError {
    kind: ErrorKind,
    path: Vec<String>,
    stage: Option<Stage>,
    trace: Vec<TraceEntry>,
}

impl DiError {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            path: Vec::new(),
            stage: None,
            trace: Vec::new(),
        }
    }

    /// The failure class.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The chain of ancestor service ids, root first.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The last pipeline stage reached, if the failure occurred inside the
    /// engine.
    pub fn stage(&self) -> Option<Stage> {
        self.stage
    }

    /// The trace recorded up to the failure.
    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    /// Attaches a resolution path unless one is already present.
    pub(crate) fn with_path(mut self, path: Vec<String>) -> Self {
        if self.path.is_empty() {
            self.path = path;
        }
        self
    }

    /// Attaches the last stage reached unless one is already present.
    pub(crate) fn with_stage(mut self, stage: Stage) -> Self {
        if self.stage.is_none() {
            self.stage = Some(stage);
        }
        self
    }

    /// Attaches the recorded trace unless one is already present.
    pub(crate) fn with_trace(mut self, trace: Vec<TraceEntry>) -> Self {
        if self.trace.is_empty() {
            self.trace = trace;
        }
        self
    }
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.path.is_empty() {
            write!(f, " (path: {})", self.path.join(" -> "))?;
        }
        if let Some(stage) = self.stage {
            write!(f, " (last stage: {})", stage)?;
        }
        if !self.trace.is_empty() {
            write!(f, "\nresolution trace:")?;
            for (i, entry) in self.trace.iter().enumerate() {
                write!(f, "\n  #{i} {entry}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for DiError {}

impl From<ErrorKind> for DiError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Result type for container operations.
pub type DiResult<T> = Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::StageOutcome;

    #[test]
    fn display_includes_path_and_stage() {
        let err = DiError::new(ErrorKind::NotFound { id: "svc".into() })
            .with_path(vec!["root".into(), "svc".into()])
            .with_stage(Stage::DefinitionLookup);
        let rendered = err.to_string();
        assert!(rendered.contains("service not found: svc"));
        assert!(rendered.contains("root -> svc"));
        assert!(rendered.contains("definition_lookup"));
    }

    #[test]
    fn display_includes_trace_entries() {
        let entry = TraceEntry::new("svc", Stage::Autowire, StageOutcome::Miss, 1);
        let err = DiError::new(ErrorKind::NotFound { id: "svc".into() })
            .with_trace(vec![entry]);
        let rendered = err.to_string();
        assert!(rendered.contains("resolution trace:"));
        assert!(rendered.contains("autowire"));
    }

    #[test]
    fn wrapping_does_not_overwrite_existing_path() {
        let err = DiError::new(ErrorKind::CircularDependency {
            cycle: vec!["x".into(), "y".into(), "x".into()],
        })
        .with_path(vec!["x".into(), "y".into()])
        .with_path(vec!["other".into()]);
        assert_eq!(err.path(), &["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn circular_message_joins_cycle() {
        let kind = ErrorKind::CircularDependency {
            cycle: vec!["x".into(), "y".into(), "x".into()],
        };
        assert_eq!(kind.to_string(), "circular dependency: x -> y -> x");
    }
}
