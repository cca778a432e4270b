//! Post-build extenders: wrapping and replacing produced values.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use wirecore::reflect::TypeSpec;
use wirecore::{Container, ErrorKind, Value};

struct SmtpMailer;

#[test]
fn extenders_compose_in_registration_order() {
    let container = Container::new();
    container
        .register_type(TypeSpec::new("smtp_mailer").constructor(vec![], |_| {
            Ok(vec!["smtp".to_string()])
        }))
        .unwrap();
    container.bind("mailer").unwrap().to("smtp_mailer");
    container
        .extend("mailer", |value, _| {
            let mut layers = (*value.expect_instance::<Vec<String>>()?).clone();
            layers.push("retry".into());
            Ok(Value::instance(layers))
        })
        .unwrap();
    container
        .extend("mailer", |value, _| {
            let mut layers = (*value.expect_instance::<Vec<String>>()?).clone();
            layers.push("log".into());
            Ok(Value::instance(layers))
        })
        .unwrap();

    let mailer = container.get("mailer").unwrap();
    let layers = mailer.expect_instance::<Vec<String>>().unwrap();
    assert_eq!(*layers, vec!["smtp".to_string(), "retry".into(), "log".into()]);
}

#[test]
fn extenders_may_replace_the_instance_entirely() {
    let container = Container::new();
    container
        .register_type(TypeSpec::new("smtp_mailer").constructor(vec![], |_| Ok(SmtpMailer)))
        .unwrap();
    container.bind("mailer").unwrap().to("smtp_mailer");
    container
        .extend("mailer", |_, _| Ok(Value::from("replaced")))
        .unwrap();

    assert_eq!(container.get("mailer").unwrap().as_str(), Some("replaced"));
}

#[test]
fn singleton_extenders_run_once_and_the_result_is_cached() {
    static RUNS: AtomicU32 = AtomicU32::new(0);

    let container = Container::new();
    container
        .register_type(TypeSpec::new("smtp_mailer").constructor(vec![], |_| Ok(SmtpMailer)))
        .unwrap();
    container.singleton("mailer").unwrap().to("smtp_mailer");
    container
        .extend("mailer", |value, _| {
            RUNS.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        })
        .unwrap();

    let a = container.get("mailer").unwrap();
    let b = container.get("mailer").unwrap();
    assert!(Value::same_instance(&a, &b));
    assert_eq!(RUNS.load(Ordering::SeqCst), 1);
}

#[test]
fn scoped_extenders_rerun_per_scope_instance() {
    let runs = Arc::new(AtomicU32::new(0));
    let counter = runs.clone();

    let container = Container::new();
    container
        .register_type(TypeSpec::new("session").constructor(vec![], |_| Ok(SmtpMailer)))
        .unwrap();
    container.scoped("session").unwrap();
    container
        .extend("session", move |value, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        })
        .unwrap();

    container.begin_scope().unwrap();
    let _ = container.get("session").unwrap();
    let _ = container.get("session").unwrap();
    container.end_scope().unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    container.begin_scope().unwrap();
    let _ = container.get("session").unwrap();
    container.end_scope().unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

#[test]
fn extenders_apply_to_factory_and_literal_bindings() {
    let container = Container::new();
    container.bind("banner").unwrap().to_value(Value::from("hi"));
    container
        .extend("banner", |value, _| {
            Ok(Value::from(format!("{}!", value.as_str().unwrap_or(""))))
        })
        .unwrap();

    assert_eq!(container.get("banner").unwrap().as_str(), Some("hi!"));
}

#[test]
fn extender_errors_carry_the_resolution_path() {
    let container = Container::new();
    container.bind("mailer").unwrap().to_value(Value::Null);
    container
        .extend("mailer", |_, _| {
            Err(ErrorKind::InvalidDefinition {
                reason: "broken extender".into(),
            }
            .into())
        })
        .unwrap();

    let err = container.get("mailer").unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidDefinition { .. }));
    assert_eq!(err.path(), &["mailer".to_string()]);
}

#[test]
fn extenders_can_resolve_other_services() {
    let container = Container::new();
    container.bind("suffix").unwrap().to_value(Value::from("-v2"));
    container.bind("name").unwrap().to_value(Value::from("core"));
    container
        .extend("name", |value, c| {
            let suffix = c.get("suffix")?;
            Ok(Value::from(format!(
                "{}{}",
                value.as_str().unwrap_or(""),
                suffix.as_str().unwrap_or("")
            )))
        })
        .unwrap();

    assert_eq!(container.get("name").unwrap().as_str(), Some("core-v2"));
}
