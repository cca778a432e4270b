//! Scoped lifetime: isolation between scopes, sharing inside one.

use wirecore::reflect::TypeSpec;
use wirecore::{Container, ErrorKind, Value};

struct Session;

fn setup(container: &Container) {
    container
        .register_type(TypeSpec::new("session").constructor(vec![], |_| Ok(Session)))
        .unwrap();
    container.scoped("session").unwrap();
}

#[test]
fn scoped_instances_are_shared_within_a_scope_and_isolated_across() {
    let container = Container::new();
    setup(&container);

    container.begin_scope().unwrap();
    let a = container.get("session").unwrap();
    let b = container.get("session").unwrap();
    container.end_scope().unwrap();

    container.begin_scope().unwrap();
    let c = container.get("session").unwrap();
    container.end_scope().unwrap();

    assert!(Value::same_instance(&a, &b));
    assert!(!Value::same_instance(&a, &c));
}

#[test]
fn scoped_resolution_outside_a_scope_falls_back_to_transient() {
    let container = Container::new();
    setup(&container);

    let a = container.get("session").unwrap();
    let b = container.get("session").unwrap();
    assert!(!Value::same_instance(&a, &b));

    // Nothing leaked into the next scope either.
    container.begin_scope().unwrap();
    let c = container.get("session").unwrap();
    assert!(!Value::same_instance(&a, &c));
    container.end_scope().unwrap();
}

#[test]
fn singletons_are_shared_across_scopes() {
    let container = Container::new();
    container
        .register_type(TypeSpec::new("config").constructor(vec![], |_| Ok(Session)))
        .unwrap();
    container.singleton("config").unwrap();

    container.begin_scope().unwrap();
    let a = container.get("config").unwrap();
    container.end_scope().unwrap();

    container.begin_scope().unwrap();
    let b = container.get("config").unwrap();
    container.end_scope().unwrap();

    assert!(Value::same_instance(&a, &b));
}

#[test]
fn scope_cannot_nest_or_end_twice() {
    let container = Container::new();

    container.begin_scope().unwrap();
    let err = container.begin_scope().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::LifecycleMisuse { .. }));

    container.end_scope().unwrap();
    let err = container.end_scope().unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::LifecycleMisuse { .. }));
}

#[test]
fn scope_guard_releases_on_every_exit_path() {
    let container = Container::new();
    setup(&container);

    let first = {
        let _guard = container.scope().unwrap();
        container.get("session").unwrap()
    };

    // The guard dropped, so a fresh scope yields a fresh instance.
    let guard = container.scope().unwrap();
    let second = container.get("session").unwrap();
    assert!(!Value::same_instance(&first, &second));
    guard.end().unwrap();
}
