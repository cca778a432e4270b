//! Fluent registration builders: bindings and contextual bindings.

use std::sync::Arc;

use crate::container::Container;
use crate::definition::{Argument, Concrete, ServiceDefinition};
use crate::error::{DiResult, ErrorKind};
use crate::lifetime::Lifetime;
use crate::value::{Overrides, Value};

/// Fluent builder returned by `bind`/`singleton`/`scoped`.
///
/// The definition is inserted as soon as the builder is created; every
/// builder call writes through to the store, so dropping the builder mid-way
/// leaves a valid (if minimal) definition behind.
///
/// # Examples
///
/// ```rust
/// use wirecore::{Container, Value};
///
/// let container = Container::new();
/// container
///     .singleton("mailer")
///     .unwrap()
///     .to("smtp_mailer")
///     .with_argument("host", Value::from("smtp.example.com"))
///     .tag(&["outbound"]);
/// ```
pub struct BindingBuilder<'c> {
    container: &'c Container,
    id: String,
}

impl<'c> BindingBuilder<'c> {
    pub(crate) fn begin(container: &'c Container, id: &str, lifetime: Lifetime) -> DiResult<Self> {
        let definition = ServiceDefinition::new(id)?.with_lifetime(lifetime);
        container.store_mut(|store| store.add(definition));
        Ok(Self {
            container,
            id: id.to_string(),
        })
    }

    fn update(self, f: impl FnOnce(&mut ServiceDefinition)) -> Self {
        self.container.store_mut(|store| {
            if let Some(def) = store.get_mut(&self.id) {
                f(def);
            }
        });
        self
    }

    /// Sets the concrete: a type id, a literal value, or anything convertible
    /// into a [`Concrete`].
    pub fn to(self, concrete: impl Into<Concrete>) -> Self {
        let concrete = concrete.into();
        self.update(|def| def.concrete = Some(concrete))
    }

    /// Sets a factory concrete.
    pub fn to_factory<F>(self, factory: F) -> Self
    where
        F: Fn(&Container, &Overrides) -> DiResult<Value> + Send + Sync + 'static,
    {
        self.update(|def| def.concrete = Some(Concrete::Factory(Arc::new(factory))))
    }

    /// Sets a literal value concrete.
    pub fn to_value(self, value: Value) -> Self {
        self.update(|def| def.concrete = Some(Concrete::Literal(value)))
    }

    /// Sets a pre-built object concrete.
    pub fn to_instance<T: Send + Sync + 'static>(self, value: T) -> Self {
        self.update(|def| def.concrete = Some(Concrete::Instance(Arc::new(value))))
    }

    /// Attaches tags to this binding.
    pub fn tag(self, tags: &[&str]) -> Self {
        self.container
            .store_mut(|store| store.add_tags(&self.id, tags));
        self
    }

    /// Pins one constructor argument by parameter name.
    pub fn with_argument(self, name: &str, value: impl Into<Value>) -> Self {
        let name = name.to_string();
        let value = value.into();
        self.update(|def| {
            def.arguments.insert(name, Argument::Value(value));
        })
    }

    /// Pins several constructor arguments at once.
    pub fn with_arguments(self, arguments: impl IntoIterator<Item = (String, Value)>) -> Self {
        let arguments: Vec<_> = arguments.into_iter().collect();
        self.update(|def| {
            for (name, value) in arguments {
                def.arguments.insert(name, Argument::Value(value));
            }
        })
    }

    /// Pins one constructor argument to another service, resolved at build
    /// time.
    pub fn with_service_argument(self, name: &str, service_id: &str) -> Self {
        let name = name.to_string();
        let service_id = service_id.to_string();
        self.update(|def| {
            def.arguments.insert(name, Argument::Service(service_id));
        })
    }

    /// Adds members to the definition's explicit injection plan.
    pub fn inject(self, members: &[&str]) -> Self {
        let members: Vec<String> = members.iter().map(|m| m.to_string()).collect();
        self.update(|def| def.injections.extend(members))
    }
}

/// Builder for `when(consumer).needs(id).give(impl)`.
///
/// Calling a `give` method before `needs` fails with
/// `InvalidContextualBinding`.
///
/// # Examples
///
/// ```rust
/// use wirecore::Container;
///
/// let container = Container::new();
/// container
///     .when("report_service")
///     .needs("logger")
///     .give("silent_logger")
///     .unwrap();
///
/// let incomplete = container.when("report_service").give("silent_logger");
/// assert!(incomplete.is_err());
/// ```
pub struct ContextualBindingBuilder<'c> {
    container: &'c Container,
    consumer: String,
    needs: Option<String>,
}

impl<'c> ContextualBindingBuilder<'c> {
    pub(crate) fn new(container: &'c Container, consumer: &str) -> Self {
        Self {
            container,
            consumer: consumer.to_string(),
            needs: None,
        }
    }

    /// Names the dependency being overridden for this consumer.
    pub fn needs(mut self, id: &str) -> Self {
        self.needs = Some(id.to_string());
        self
    }

    /// Registers the override.
    pub fn give(self, concrete: impl Into<Concrete>) -> DiResult<()> {
        let concrete = concrete.into();
        self.finish(concrete)
    }

    /// Registers a factory override.
    pub fn give_factory<F>(self, factory: F) -> DiResult<()>
    where
        F: Fn(&Container, &Overrides) -> DiResult<Value> + Send + Sync + 'static,
    {
        self.finish(Concrete::Factory(Arc::new(factory)))
    }

    fn finish(self, give: Concrete) -> DiResult<()> {
        let needs = self.needs.ok_or_else(|| {
            crate::DiError::from(ErrorKind::InvalidContextualBinding {
                consumer: self.consumer.clone(),
            })
        })?;
        self.container
            .store_mut(|store| store.add_contextual(self.consumer.clone(), needs, give))
    }
}
