//! Programmatic type metadata: the reflection substitute.
//!
//! Rust has no runtime reflection, so constructible types are described up
//! front with a [`TypeSpec`]: parameter descriptions plus closures that
//! construct the value, write injectable properties, and invoke injectable
//! methods. The analyzer reduces a registered spec to a pure-data
//! [`ServicePrototype`](crate::prototype::ServicePrototype); the closures stay
//! here and are looked up again at instantiation time.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{DiResult, ErrorKind};
use crate::value::{Literal, Value};

/// Constructor invoker: receives resolved arguments, returns the built value.
pub type ConstructFn = Arc<dyn Fn(ArgumentSet) -> DiResult<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// Property setter invoker: writes one resolved value into the target.
pub type SetterFn = Arc<dyn Fn(&mut dyn Any, Value) -> DiResult<()> + Send + Sync>;

/// Method invoker: calls one injectable method with resolved arguments.
pub type InvokeFn = Arc<dyn Fn(&mut dyn Any, ArgumentSet) -> DiResult<()> + Send + Sync>;

/// Ordered, name-addressable resolved arguments handed to invokers.
#[derive(Debug, Default)]
pub struct ArgumentSet {
    names: Vec<String>,
    values: Vec<Value>,
}

impl ArgumentSet {
    pub(crate) fn new(names: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.values[idx])
    }

    /// All values in declaration order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    fn expect(&self, name: &str) -> DiResult<&Value> {
        self.get(name).ok_or_else(|| {
            ErrorKind::InvalidDefinition {
                reason: format!("no resolved argument named `{name}`"),
            }
            .into()
        })
    }

    /// The named argument downcast to a shared instance.
    pub fn instance<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Arc<T>> {
        self.expect(name)?.expect_instance::<T>()
    }

    /// The named argument downcast to an instance, or `None` when null.
    pub fn optional_instance<T: Send + Sync + 'static>(&self, name: &str) -> DiResult<Option<Arc<T>>> {
        let value = self.expect(name)?;
        if value.is_null() {
            return Ok(None);
        }
        value.expect_instance::<T>().map(Some)
    }

    pub fn string(&self, name: &str) -> DiResult<String> {
        let value = self.expect(name)?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Self::mismatch(name, "string", value))
    }

    pub fn integer(&self, name: &str) -> DiResult<i64> {
        let value = self.expect(name)?;
        value
            .as_int()
            .ok_or_else(|| Self::mismatch(name, "int", value))
    }

    pub fn boolean(&self, name: &str) -> DiResult<bool> {
        let value = self.expect(name)?;
        value
            .as_bool()
            .ok_or_else(|| Self::mismatch(name, "bool", value))
    }

    pub fn float(&self, name: &str) -> DiResult<f64> {
        let value = self.expect(name)?;
        value
            .as_float()
            .ok_or_else(|| Self::mismatch(name, "float", value))
    }

    pub fn list(&self, name: &str) -> DiResult<Vec<Value>> {
        let value = self.expect(name)?;
        value
            .as_list()
            .map(<[Value]>::to_vec)
            .ok_or_else(|| Self::mismatch(name, "list", value))
    }

    fn mismatch(name: &str, expected: &str, found: &Value) -> crate::DiError {
        ErrorKind::InvalidDefinition {
            reason: format!(
                "argument `{name}` expected a {expected}, found {}",
                found.type_label()
            ),
        }
        .into()
    }
}

/// Raw description of one parameter, before analysis.
///
/// `types` may hold a union of candidates; the analyzer selects the first
/// non-builtin entry as the injection type.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub types: Vec<String>,
    pub default: Option<Literal>,
    pub nullable: bool,
    pub variadic: bool,
    pub tag_hint: Option<String>,
}

impl ParamSpec {
    /// A parameter with a single class/interface type.
    pub fn typed(name: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: vec![type_id.into()],
            default: None,
            nullable: false,
            variadic: false,
            tag_hint: None,
        }
    }

    /// A scalar parameter with no resolvable type.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
            default: None,
            nullable: false,
            variadic: false,
            tag_hint: None,
        }
    }

    /// A parameter with a union of candidate types.
    pub fn union<I, S>(name: impl Into<String>, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            types: types.into_iter().map(Into::into).collect(),
            default: None,
            nullable: false,
            variadic: false,
            tag_hint: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<Literal>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Hints that a variadic parameter collects services carrying this tag.
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag_hint = Some(tag.into());
        self
    }
}

/// Raw description of one property.
pub struct PropertySpec {
    pub name: String,
    pub types: Vec<String>,
    pub default: Option<Literal>,
    pub nullable: bool,
    /// The injection marker: injected without being named in a definition's
    /// injection plan.
    pub inject: bool,
    pub(crate) setter: Option<SetterFn>,
}

impl PropertySpec {
    /// A writable property backed by a typed setter closure.
    pub fn writable<T, F>(
        name: impl Into<String>,
        type_id: impl Into<String>,
        setter: F,
    ) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut T, Value) -> DiResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            types: vec![type_id.into()],
            default: None,
            nullable: false,
            inject: false,
            setter: Some(erase_setter(setter)),
        }
    }

    /// A read-only property: visible to the analyzer but never injectable.
    pub fn read_only(name: impl Into<String>, type_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: vec![type_id.into()],
            default: None,
            nullable: false,
            inject: false,
            setter: None,
        }
    }

    /// Marks the property with the injection marker.
    pub fn injected(mut self) -> Self {
        self.inject = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Literal>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub(crate) fn writable_target(&self) -> bool {
        self.setter.is_some()
    }
}

impl fmt::Debug for PropertySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertySpec")
            .field("name", &self.name)
            .field("types", &self.types)
            .field("inject", &self.inject)
            .field("writable", &self.writable_target())
            .finish()
    }
}

/// Raw description of one injectable method.
pub struct MethodSpec {
    pub name: String,
    pub params: Vec<ParamSpec>,
    /// The injection marker, as for properties.
    pub inject: bool,
    pub(crate) invoke: InvokeFn,
}

impl MethodSpec {
    pub fn new<T, F>(name: impl Into<String>, params: Vec<ParamSpec>, invoke: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut T, ArgumentSet) -> DiResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params,
            inject: false,
            invoke: erase_method(invoke),
        }
    }

    pub fn injected(mut self) -> Self {
        self.inject = true;
        self
    }
}

impl fmt::Debug for MethodSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSpec")
            .field("name", &self.name)
            .field("params", &self.params.len())
            .field("inject", &self.inject)
            .finish()
    }
}

/// The registered description of one constructible type.
///
/// # Examples
///
/// ```rust
/// use wirecore::reflect::{ParamSpec, TypeSpec};
/// use wirecore::Literal;
///
/// struct FileLogger {
///     path: String,
/// }
///
/// let spec = TypeSpec::new("file_logger").constructor(
///     vec![ParamSpec::scalar("path").with_default(Literal::from("/var/log/app.log"))],
///     |args| {
///         Ok(FileLogger {
///             path: args.string("path")?,
///         })
///     },
/// );
/// assert!(spec.is_instantiable());
/// ```
pub struct TypeSpec {
    pub(crate) id: String,
    pub(crate) abstract_marker: bool,
    pub(crate) params: Vec<ParamSpec>,
    pub(crate) construct: Option<ConstructFn>,
    pub(crate) properties: Vec<PropertySpec>,
    pub(crate) methods: Vec<MethodSpec>,
}

impl TypeSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            abstract_marker: false,
            params: Vec::new(),
            construct: None,
            properties: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Marks the type as an interface/abstract type: known to the registry
    /// but never instantiable.
    pub fn abstract_type(mut self) -> Self {
        self.abstract_marker = true;
        self
    }

    /// Declares the constructor: parameter descriptions plus the closure that
    /// builds the value from resolved arguments.
    pub fn constructor<T, F>(mut self, params: Vec<ParamSpec>, construct: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(ArgumentSet) -> DiResult<T> + Send + Sync + 'static,
    {
        self.params = params;
        self.construct = Some(Arc::new(move |args| {
            construct(args).map(|value| Box::new(value) as Box<dyn Any + Send + Sync>)
        }));
        self
    }

    pub fn property(mut self, property: PropertySpec) -> Self {
        self.properties.push(property);
        self
    }

    pub fn method(mut self, method: MethodSpec) -> Self {
        self.methods.push(method);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_instantiable(&self) -> bool {
        !self.abstract_marker && self.construct.is_some()
    }

    pub(crate) fn property_named(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub(crate) fn method_named(&self, name: &str) -> Option<&MethodSpec> {
        self.methods.iter().find(|m| m.name == name)
    }
}

impl fmt::Debug for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSpec")
            .field("id", &self.id)
            .field("instantiable", &self.is_instantiable())
            .field("params", &self.params.len())
            .field("properties", &self.properties.len())
            .field("methods", &self.methods.len())
            .finish()
    }
}

/// Registry of type specs, keyed by type id.
#[derive(Default)]
pub struct TypeRegistry {
    types: IndexMap<String, Arc<TypeSpec>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a spec, replacing any prior entry for the same id.
    pub fn register(&mut self, spec: TypeSpec) -> DiResult<()> {
        if spec.id.is_empty() {
            return Err(ErrorKind::InvalidDefinition {
                reason: "type id must not be empty".into(),
            }
            .into());
        }
        self.types.insert(spec.id.clone(), Arc::new(spec));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<TypeSpec>> {
        self.types.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.types.contains_key(id)
    }
}

fn erase_setter<T, F>(setter: F) -> SetterFn
where
    T: Send + Sync + 'static,
    F: Fn(&mut T, Value) -> DiResult<()> + Send + Sync + 'static,
{
    Arc::new(move |target: &mut dyn Any, value: Value| {
        let typed = target.downcast_mut::<T>().ok_or_else(|| {
            crate::DiError::from(ErrorKind::Analysis {
                type_id: std::any::type_name::<T>().to_string(),
                reason: "setter target has a different concrete type".into(),
            })
        })?;
        setter(typed, value)
    })
}

fn erase_method<T, F>(invoke: F) -> InvokeFn
where
    T: Send + Sync + 'static,
    F: Fn(&mut T, ArgumentSet) -> DiResult<()> + Send + Sync + 'static,
{
    Arc::new(move |target: &mut dyn Any, args: ArgumentSet| {
        let typed = target.downcast_mut::<T>().ok_or_else(|| {
            crate::DiError::from(ErrorKind::Analysis {
                type_id: std::any::type_name::<T>().to_string(),
                reason: "method target has a different concrete type".into(),
            })
        })?;
        invoke(typed, args)
    })
}
