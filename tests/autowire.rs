//! Autowiring: unregistered ids resolving through type metadata alone.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use wirecore::reflect::{ParamSpec, TypeSpec};
use wirecore::{
    Container, ErrorKind, KernelContext, Stage, StageOutcome, StepTelemetry, TraceEntry,
};

struct A {
    b: Arc<B>,
}

struct B {
    c: Arc<C>,
}

struct C;

fn register_chain(container: &Container) {
    container
        .register_type(TypeSpec::new("a").constructor(
            vec![ParamSpec::typed("b", "b")],
            |args| {
                Ok(A {
                    b: args.instance("b")?,
                })
            },
        ))
        .unwrap();
    container
        .register_type(TypeSpec::new("b").constructor(
            vec![ParamSpec::typed("c", "c")],
            |args| {
                Ok(B {
                    c: args.instance("c")?,
                })
            },
        ))
        .unwrap();
    container
        .register_type(TypeSpec::new("c").constructor(vec![], |_| Ok(C)))
        .unwrap();
}

#[derive(Default)]
struct RecordingTelemetry {
    entries: Mutex<Vec<TraceEntry>>,
}

impl StepTelemetry for RecordingTelemetry {
    fn step(&self, _trace_id: &str, entry: &TraceEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

#[test]
fn autowires_a_chain_without_definitions() {
    let recorder = Arc::new(RecordingTelemetry::default());
    let container = Container::builder().telemetry(recorder.clone()).build();
    register_chain(&container);

    let a = container.get("a").unwrap();
    let a = a.downcast::<A>().unwrap();
    let _c: &C = &a.b.c;

    // The trace records an autowire hit for every id on the chain.
    let entries = recorder.entries.lock().unwrap();
    let autowired: Vec<&str> = entries
        .iter()
        .filter(|e| e.stage == Stage::Autowire && e.outcome == StageOutcome::Hit)
        .map(|e| e.service_id.as_str())
        .collect();
    assert_eq!(autowired, vec!["a", "b", "c"]);
}

#[test]
fn autowire_can_be_disabled_per_resolution() {
    let container = Container::new();
    register_chain(&container);

    let ctx = KernelContext::builder("a").allow_autowire(false).build();
    let err = container.resolve_context(ctx).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NotFound { .. }));
}

#[test]
fn abstract_types_are_not_instantiable() {
    let container = Container::new();
    container
        .register_type(TypeSpec::new("shape").abstract_type())
        .unwrap();

    let err = container.get("shape").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NotInstantiable { type_id } if type_id == "shape"));
}

#[test]
fn missing_required_dependency_propagates_not_found() {
    let container = Container::new();
    container
        .register_type(TypeSpec::new("needy").constructor(
            vec![ParamSpec::typed("dep", "absent")],
            |args| {
                Ok(A {
                    b: args.instance("dep")?,
                })
            },
        ))
        .unwrap();

    let err = container.get("needy").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::NotFound { id } if id == "absent"));
    assert_eq!(err.path(), &["needy".to_string(), "absent".to_string()]);
}

fn register_linear_chain(container: &Container, len: usize) {
    for i in 1..=len {
        let id = format!("s{i}");
        let spec = if i == len {
            TypeSpec::new(&id).constructor(vec![], |_| Ok(C))
        } else {
            TypeSpec::new(&id).constructor(
                vec![ParamSpec::typed("next", format!("s{}", i + 1))],
                |args| {
                    args.instance::<C>("next").ok();
                    Ok(C)
                },
            )
        };
        container.register_type(spec).unwrap();
    }
}

#[test]
fn depth_cap_allows_paths_up_to_the_limit() {
    let container = Container::builder().max_depth(3).build();
    register_linear_chain(&container, 3);
    assert!(container.get("s1").is_ok());
}

#[test]
fn depth_cap_rejects_one_past_the_limit() {
    let container = Container::builder().max_depth(3).build();
    register_linear_chain(&container, 4);
    let err = container.get("s1").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::DepthExceeded { limit: 3 }));
}

#[test]
fn deadline_aborts_runaway_resolution() {
    let container = Container::builder()
        .deadline(Duration::from_nanos(1))
        .build();
    register_chain(&container);

    // The root entry may pass the check, but some nested context will not.
    let err = container.get("a").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::Timeout { .. }));
}

#[test]
fn container_resolves_itself() {
    let container = Container::new();
    let value = container.get(Container::SELF_ID).unwrap();
    let inner = value.downcast::<Container>().unwrap();
    assert!(inner.has(Container::SELF_ID));
}
