//! Property and method injection driven by prototypes.

use std::sync::Arc;

use wirecore::reflect::{MethodSpec, ParamSpec, PropertySpec, TypeSpec};
use wirecore::{Container, ErrorKind, Value};

struct Clock;

struct Report {
    clock: Option<Arc<Clock>>,
    label: String,
    sinks: Vec<String>,
}

fn new_report() -> Report {
    Report {
        clock: None,
        label: "default".into(),
        sinks: Vec::new(),
    }
}

fn register_clock(container: &Container) {
    container
        .register_type(TypeSpec::new("clock").constructor(vec![], |_| Ok(Clock)))
        .unwrap();
}

#[test]
fn marked_properties_are_injected_in_declared_order() {
    let container = Container::new();
    register_clock(&container);
    container
        .register_type(
            TypeSpec::new("report")
                .constructor(vec![], |_| Ok(new_report()))
                .property(
                    PropertySpec::writable("clock", "clock", |r: &mut Report, v: Value| {
                        r.clock = Some(v.expect_instance()?);
                        Ok(())
                    })
                    .injected(),
                ),
        )
        .unwrap();

    let report = container.get("report").unwrap();
    let report = report.downcast::<Report>().unwrap();
    assert!(report.clock.is_some());
}

#[test]
fn unmarked_properties_are_injected_via_the_definition_plan() {
    let container = Container::new();
    register_clock(&container);
    container
        .register_type(
            TypeSpec::new("report")
                .constructor(vec![], |_| Ok(new_report()))
                .property(PropertySpec::writable(
                    "clock",
                    "clock",
                    |r: &mut Report, v: Value| {
                        r.clock = Some(v.expect_instance()?);
                        Ok(())
                    },
                )),
        )
        .unwrap();

    // Without a plan the property stays untouched.
    let plain = container.get("report").unwrap();
    assert!(plain.downcast::<Report>().unwrap().clock.is_none());

    container.bind("wired_report").unwrap().to("report").inject(&["clock"]);
    let wired = container.get("wired_report").unwrap();
    assert!(wired.downcast::<Report>().unwrap().clock.is_some());
}

#[test]
fn plan_naming_a_read_only_property_is_rejected() {
    let container = Container::new();
    container
        .register_type(
            TypeSpec::new("report")
                .constructor(vec![], |_| Ok(new_report()))
                .property(PropertySpec::read_only("label", "string")),
        )
        .unwrap();
    container.bind("frozen").unwrap().to("report").inject(&["label"]);

    let err = container.get("frozen").unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::InvalidInjectionPoint { member, .. } if member == "label"
    ));
}

#[test]
fn marker_on_a_read_only_property_fails_analysis() {
    let container = Container::new();
    container
        .register_type(
            TypeSpec::new("report")
                .constructor(vec![], |_| Ok(new_report()))
                .property(PropertySpec::read_only("label", "string").injected()),
        )
        .unwrap();

    let err = container.get("report").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidInjectionPoint { .. }));
}

#[test]
fn property_with_default_is_skipped_when_unresolvable() {
    let container = Container::new();
    container
        .register_type(
            TypeSpec::new("report")
                .constructor(vec![], |_| Ok(new_report()))
                .property(
                    PropertySpec::writable("label", "labeler", |r: &mut Report, v: Value| {
                        r.label = v.as_str().unwrap_or("").to_string();
                        Ok(())
                    })
                    .with_default("default")
                    .injected(),
                ),
        )
        .unwrap();

    // No `labeler` service exists; the constructed default survives.
    let report = container.get("report").unwrap();
    assert_eq!(report.downcast::<Report>().unwrap().label, "default");
}

#[test]
fn nullable_property_receives_null_when_unresolvable() {
    let container = Container::new();
    container
        .register_type(
            TypeSpec::new("report")
                .constructor(vec![], |_| Ok(new_report()))
                .property(
                    PropertySpec::writable("clock", "absent_clock", |r: &mut Report, v: Value| {
                        r.clock = if v.is_null() {
                            None
                        } else {
                            Some(v.expect_instance()?)
                        };
                        Ok(())
                    })
                    .nullable()
                    .injected(),
                ),
        )
        .unwrap();

    let report = container.get("report").unwrap();
    assert!(report.downcast::<Report>().unwrap().clock.is_none());
}

#[test]
fn property_overrides_win_over_type_resolution() {
    let container = Container::new();
    register_clock(&container);
    container
        .register_type(
            TypeSpec::new("report")
                .constructor(vec![], |_| Ok(new_report()))
                .property(
                    PropertySpec::writable("label", "string", |r: &mut Report, v: Value| {
                        r.label = v.as_str().unwrap_or("").to_string();
                        Ok(())
                    })
                    .injected()
                    .nullable(),
                ),
        )
        .unwrap();

    let mut overrides = wirecore::Overrides::new();
    overrides.insert("label".into(), Value::from("override"));
    let report = container.make("report", overrides).unwrap();
    assert_eq!(report.downcast::<Report>().unwrap().label, "override");
}

#[test]
fn marked_methods_run_after_construction() {
    let container = Container::new();
    register_clock(&container);
    container
        .register_type(
            TypeSpec::new("report")
                .constructor(vec![], |_| Ok(new_report()))
                .method(
                    MethodSpec::new(
                        "set_clock",
                        vec![ParamSpec::typed("clock", "clock")],
                        |r: &mut Report, args| {
                            r.clock = Some(args.instance("clock")?);
                            Ok(())
                        },
                    )
                    .injected(),
                ),
        )
        .unwrap();

    let report = container.get("report").unwrap();
    assert!(report.downcast::<Report>().unwrap().clock.is_some());
}

#[test]
fn variadic_parameters_collect_tagged_services() {
    struct Fanout {
        sinks: Vec<String>,
    }

    let container = Container::new();
    container.bind("stdout_sink").unwrap().to_value(Value::from("stdout"));
    container.bind("file_sink").unwrap().to_value(Value::from("file"));
    container.tag(&["stdout_sink", "file_sink"], &["sinks"]).unwrap();
    container
        .register_type(TypeSpec::new("fanout").constructor(
            vec![ParamSpec::typed("sinks", "sink").variadic().tagged("sinks")],
            |args| {
                let sinks = args
                    .list("sinks")?
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                Ok(Fanout { sinks })
            },
        ))
        .unwrap();

    let fanout = container.get("fanout").unwrap();
    assert_eq!(
        fanout.downcast::<Fanout>().unwrap().sinks,
        vec!["stdout".to_string(), "file".into()]
    );
}

#[test]
fn variadic_without_override_or_tag_is_empty() {
    let container = Container::new();
    container
        .register_type(TypeSpec::new("report").constructor(
            vec![ParamSpec::typed("sinks", "sink").variadic()],
            |args| {
                let mut report = new_report();
                report.sinks = args
                    .list("sinks")?
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect();
                Ok(report)
            },
        ))
        .unwrap();

    let report = container.get("report").unwrap();
    assert!(report.downcast::<Report>().unwrap().sinks.is_empty());
}

#[test]
fn required_scalar_without_default_is_unresolvable() {
    let container = Container::new();
    container
        .register_type(TypeSpec::new("report").constructor(
            vec![ParamSpec::scalar("label")],
            |args| {
                let mut report = new_report();
                report.label = args.string("label")?;
                Ok(report)
            },
        ))
        .unwrap();

    let err = container.get("report").unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::UnresolvableDependency { parameter, consumer }
            if parameter == "label" && consumer == "report"
    ));
}

#[test]
fn optional_typed_parameter_falls_back_to_its_default() {
    struct Holder {
        label: String,
    }

    let container = Container::new();
    container
        .register_type(TypeSpec::new("holder").constructor(
            vec![ParamSpec::typed("dep", "absent").with_default("fallback")],
            |args| {
                Ok(Holder {
                    label: args.string("dep")?,
                })
            },
        ))
        .unwrap();

    let holder = container.get("holder").unwrap();
    assert_eq!(holder.downcast::<Holder>().unwrap().label, "fallback");
}

#[test]
fn nullable_typed_parameter_falls_back_to_null() {
    struct Holder {
        dep: Value,
    }

    let container = Container::new();
    container
        .register_type(TypeSpec::new("holder").constructor(
            vec![ParamSpec::typed("dep", "absent").nullable()],
            |args| {
                Ok(Holder {
                    dep: args.get("dep").cloned().unwrap_or_default(),
                })
            },
        ))
        .unwrap();

    let holder = container.get("holder").unwrap();
    assert!(holder.downcast::<Holder>().unwrap().dep.is_null());
}
