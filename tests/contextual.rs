//! Contextual bindings: consumer-specific overrides of global bindings.

use std::sync::Arc;

use wirecore::reflect::{ParamSpec, TypeSpec};
use wirecore::{Container, ErrorKind, Value};

trait Logger: Send + Sync {
    fn name(&self) -> &'static str;
}

struct FileLogger;

impl Logger for FileLogger {
    fn name(&self) -> &'static str {
        "file"
    }
}

struct SilentLogger;

impl Logger for SilentLogger {
    fn name(&self) -> &'static str {
        "silent"
    }
}

struct ReportService {
    logger: Arc<dyn Logger>,
}

fn setup(container: &Container) {
    container
        .register_type(TypeSpec::new("file_logger").constructor(vec![], |_| {
            Ok(Arc::new(FileLogger) as Arc<dyn Logger>)
        }))
        .unwrap();
    container
        .register_type(TypeSpec::new("silent_logger").constructor(vec![], |_| {
            Ok(Arc::new(SilentLogger) as Arc<dyn Logger>)
        }))
        .unwrap();
    container
        .register_type(TypeSpec::new("report_service").constructor(
            vec![ParamSpec::typed("logger", "logger")],
            |args| {
                let logger: Arc<Arc<dyn Logger>> = args.instance("logger")?;
                Ok(ReportService {
                    logger: (*logger).clone(),
                })
            },
        ))
        .unwrap();
    container.bind("logger").unwrap().to("file_logger");
}

fn logger_name(value: &Value) -> &'static str {
    value.downcast::<Arc<dyn Logger>>().unwrap().name()
}

#[test]
fn consumer_receives_the_contextual_implementation() {
    let container = Container::new();
    setup(&container);
    container
        .when("report_service")
        .needs("logger")
        .give("silent_logger")
        .unwrap();

    let report = container.get("report_service").unwrap();
    let report = report.downcast::<ReportService>().unwrap();
    assert_eq!(report.logger.name(), "silent");

    // The global binding is untouched.
    let direct = container.get("logger").unwrap();
    assert_eq!(logger_name(&direct), "file");
}

#[test]
fn contextual_precedence_beats_a_singleton_cache() {
    let container = Container::new();
    setup(&container);
    container.singleton("logger").unwrap().to("file_logger");
    container
        .when("report_service")
        .needs("logger")
        .give("silent_logger")
        .unwrap();

    // Warm the global singleton first; the consumer must still get its own
    // implementation, and the cache must stay clean afterwards.
    assert_eq!(logger_name(&container.get("logger").unwrap()), "file");

    let report = container.get("report_service").unwrap();
    let report = report.downcast::<ReportService>().unwrap();
    assert_eq!(report.logger.name(), "silent");

    assert_eq!(logger_name(&container.get("logger").unwrap()), "file");
}

#[test]
fn exact_consumer_beats_wildcard_patterns() {
    let container = Container::new();
    setup(&container);
    container
        .when("report*")
        .needs("logger")
        .give("file_logger")
        .unwrap();
    container
        .when("report_service")
        .needs("logger")
        .give("silent_logger")
        .unwrap();

    let report = container.get("report_service").unwrap();
    let report = report.downcast::<ReportService>().unwrap();
    assert_eq!(report.logger.name(), "silent");
}

#[test]
fn wildcard_consumers_match_by_longest_prefix() {
    let container = Container::new();
    setup(&container);
    container
        .when("rep*")
        .needs("logger")
        .give("file_logger")
        .unwrap();
    container
        .when("report_*")
        .needs("logger")
        .give("silent_logger")
        .unwrap();

    let report = container.get("report_service").unwrap();
    let report = report.downcast::<ReportService>().unwrap();
    assert_eq!(report.logger.name(), "silent");
}

#[test]
fn contextual_factories_are_supported() {
    let container = Container::new();
    setup(&container);
    container
        .when("report_service")
        .needs("logger")
        .give_factory(|_, _| Ok(Value::instance(Arc::new(SilentLogger) as Arc<dyn Logger>)))
        .unwrap();

    let report = container.get("report_service").unwrap();
    let report = report.downcast::<ReportService>().unwrap();
    assert_eq!(report.logger.name(), "silent");
}

#[test]
fn give_before_needs_is_rejected() {
    let container = Container::new();
    let err = container.when("report_service").give("silent_logger").unwrap_err();
    assert!(matches!(
        err.kind(),
        ErrorKind::InvalidContextualBinding { consumer } if consumer == "report_service"
    ));
}
