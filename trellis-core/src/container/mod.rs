// Dependency injection container

mod binding;
mod class;
pub mod coerce;
mod parameter;

pub use binding::{Binding, Factory};
pub use class::{ClassDescriptor, ClassKind, Injectable, find_class};
pub use inventory;
pub use parameter::{Arguments, Parameter, ParameterKind, Predefined};

use crate::logging::{debug, trace};
use crate::{Error, Result, Value, inflector};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Keyed registry of bindings with a per-key instance cache.
///
/// Clones share the same registry. Keys are plain strings; by convention
/// class-typed dependencies are looked up by their class name, so binding
/// a service under [`Injectable::NAME`] (or aliasing that name to the
/// service key) lets constructors receive it.
#[derive(Clone, Default)]
pub struct Container {
    bindings: Arc<RwLock<HashMap<String, Binding>>>,
    aliases: Arc<RwLock<HashMap<String, String>>>,
    instances: Arc<RwLock<HashMap<String, Value>>>,
    classes: Arc<RwLock<HashMap<String, ClassDescriptor>>>,
}

impl Container {
    pub fn new() -> Self {
        debug!("Creating new DI container");
        Self::default()
    }

    /// Register a binding, dropping any instance cached for `key`.
    pub fn set(&self, key: impl Into<String>, binding: Binding) -> &Self {
        let key = key.into();
        debug!(key = %key, kind = binding.kind(), "Binding registered");

        self.bindings.write().insert(key.clone(), binding);
        let stale = self.instances.write().remove(&key);
        drop(stale);
        self
    }

    /// Register a pre-built instance.
    pub fn set_instance<T: Any + Send + Sync>(&self, key: impl Into<String>, instance: T) -> &Self {
        self.set(key, Binding::instance(instance))
    }

    /// Register a factory producing `T` instances.
    pub fn set_factory<T, F>(&self, key: impl Into<String>, factory: F) -> &Self
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> Result<T> + Send + Sync + 'static,
    {
        self.set(
            key,
            Binding::factory(move |container| factory(container).map(Value::object)),
        )
    }

    /// Register a factory producing arbitrary values.
    pub fn set_value_factory<F>(&self, key: impl Into<String>, factory: F) -> &Self
    where
        F: Fn(&Container) -> Result<Value> + Send + Sync + 'static,
    {
        self.set(key, Binding::factory(factory))
    }

    /// Register a class name to be auto-constructed.
    pub fn set_class(&self, key: impl Into<String>, class: impl Into<String>) -> &Self {
        self.set(key, Binding::class(class))
    }

    /// Register a dynamic value: objects become instances, strings class
    /// names. Anything else is rejected.
    pub fn set_value(&self, key: impl Into<String>, value: Value) -> Result<&Self> {
        let binding = Binding::try_from(value)?;
        Ok(self.set(key, binding))
    }

    /// Make lookups of `alias` behave as lookups of `key`.
    pub fn alias(&self, alias: impl Into<String>, key: impl Into<String>) -> &Self {
        let (alias, key) = (alias.into(), key.into());
        trace!(alias = %alias, key = %key, "Alias registered");
        self.aliases.write().insert(alias, key);
        self
    }

    /// Remove the binding and cached instance for `key`.
    pub fn unset(&self, key: &str) -> &Self {
        let key = self.canonical(key);
        self.bindings.write().remove(&key);
        let stale = self.instances.write().remove(&key);
        drop(stale);
        self
    }

    pub fn unalias(&self, alias: &str) -> &Self {
        self.aliases.write().remove(alias);
        self
    }

    /// Whether `key` has a binding. Never instantiates anything.
    pub fn has(&self, key: &str) -> bool {
        let key = self.canonical(key);
        self.bindings.read().contains_key(&key)
    }

    pub fn has_instance(&self, key: &str) -> bool {
        let key = self.canonical(key);
        self.instances.read().contains_key(&key)
    }

    /// The shared instance for `key`, resolving and caching it on first use.
    pub fn get(&self, key: &str) -> Result<Value> {
        let key = self.canonical(key);

        if let Some(instance) = self.instances.read().get(&key).cloned() {
            trace!(key = %key, "Returning cached instance");
            return Ok(instance);
        }

        let value = self.resolve(&key)?;
        self.instances.write().insert(key, value.clone());
        Ok(value)
    }

    /// A freshly resolved value for `key`; the cache is left untouched.
    pub fn get_new(&self, key: &str) -> Result<Value> {
        let key = self.canonical(key);
        self.resolve(&key)
    }

    /// Typed [`get`](Self::get).
    pub fn get_as<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>> {
        let value = self.get(key)?;
        downcast(key, value)
    }

    /// Typed [`get_new`](Self::get_new).
    pub fn get_new_as<T: Any + Send + Sync>(&self, key: &str) -> Result<Arc<T>> {
        let value = self.get_new(key)?;
        downcast(key, value)
    }

    /// An owned fresh value; clones when the resolved instance is shared.
    pub fn make<T: Any + Send + Sync + Clone>(&self, key: &str) -> Result<T> {
        let instance = self.get_new_as::<T>(key)?;
        Ok(Arc::try_unwrap(instance).unwrap_or_else(|shared| (*shared).clone()))
    }

    /// Forget the cached instance for `key`.
    pub fn destroy_instance(&self, key: &str) {
        let key = self.canonical(key);
        let stale = self.instances.write().remove(&key);
        if stale.is_some() {
            debug!(key = %key, "Destroyed cached instance");
        }
    }

    /// Forget every cached instance. The container's references are
    /// released before this returns.
    pub fn destroy_all_instances(&self) {
        let stale = std::mem::take(&mut *self.instances.write());
        debug!(instance_count = stale.len(), "Destroying all cached instances");
        drop(stale);
    }

    /// Make `T` constructible by this container only.
    pub fn declare<T: Injectable>(&self) -> &Self {
        self.declare_class(ClassDescriptor::of::<T>())
    }

    pub fn declare_class(&self, descriptor: ClassDescriptor) -> &Self {
        trace!(class = descriptor.name, "Class declared");
        self.classes
            .write()
            .insert(descriptor.name.to_string(), descriptor);
        self
    }

    /// Whether `name` is a known class, declared locally or published.
    pub fn has_class(&self, name: &str) -> bool {
        self.class(name).is_some()
    }

    fn class(&self, name: &str) -> Option<ClassDescriptor> {
        if let Some(descriptor) = self.classes.read().get(name) {
            return Some(*descriptor);
        }
        find_class(name)
    }

    /// Bind formal parameters to values.
    ///
    /// Each parameter takes, in order of preference: the predefined value
    /// with the same name (converted for scalar kinds), the container's
    /// instance for its class, or its default. A class that cannot be
    /// resolved falls back to the default when there is one.
    pub fn resolve_parameters(
        &self,
        parameters: &[Parameter],
        predefined: &Predefined,
    ) -> Result<Arguments> {
        let mut args = Arguments::new();

        for parameter in parameters {
            let value = if let Some(value) = predefined.get(&parameter.name) {
                coerce::coerce(value.clone(), &parameter.kind)?
            } else if let ParameterKind::Class(class) = &parameter.kind {
                match self.get(class) {
                    Ok(value) => value,
                    Err(err) if err.is_not_found() => match &parameter.default {
                        Some(default) => {
                            trace!(
                                parameter = %parameter.name,
                                class = %class,
                                "Class not resolvable, using default"
                            );
                            default.clone()
                        }
                        None => return Err(err),
                    },
                    Err(err) => return Err(err),
                }
            } else if let Some(default) = &parameter.default {
                default.clone()
            } else {
                return Err(Error::Unresolvable(format!(
                    "No value for parameter ${}",
                    parameter.name
                )));
            };

            args.push(parameter.name.clone(), value);
        }

        Ok(args)
    }

    /// Dynamic accessors: `getNewFoo()`, `getFoo()` and `setFoo(value)`
    /// delegate to `get_new("foo")`, `get("foo")` and `set_value("foo", value)`.
    pub fn call(&self, method: &str, mut args: Vec<Value>) -> Result<Option<Value>> {
        if let Some(key) = accessor_key(method, "getNew") {
            return self.get_new(&key).map(Some);
        }
        if let Some(key) = accessor_key(method, "get") {
            return self.get(&key).map(Some);
        }
        if let Some(key) = accessor_key(method, "set") {
            if args.len() != 1 {
                return Err(Error::BadMethodCall(format!(
                    "Invalid argument count[{}] for application {}()",
                    args.len(),
                    method
                )));
            }
            self.set_value(key, args.remove(0))?;
            return Ok(None);
        }

        Err(Error::BadMethodCall(format!(
            "No application method named {}()",
            method
        )))
    }

    fn canonical(&self, key: &str) -> String {
        self.aliases
            .read()
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }

    fn resolve(&self, key: &str) -> Result<Value> {
        let binding = self.bindings.read().get(key).cloned();

        match binding {
            Some(Binding::Instance(object)) => Ok(Value::Object(object)),
            Some(Binding::Factory(factory)) => {
                trace!(key = %key, "Invoking factory");
                factory(self)
            }
            Some(Binding::Class(class)) => self.construct(&class).map_err(|e| not_found(key, e)),
            None => self.construct(key).map_err(|e| not_found(key, e)),
        }
    }

    fn construct(&self, class: &str) -> Result<Value> {
        let descriptor = self
            .class(class)
            .ok_or_else(|| Error::Unresolvable(format!("Class {} does not exist", class)))?;

        match descriptor.kind {
            ClassKind::Abstract => Err(Error::Unresolvable(format!(
                "Class {} cannot be instantiated",
                class
            ))),
            ClassKind::Concrete {
                parameters,
                construct,
            } => {
                trace!(class = %class, "Auto-constructing class");
                let args = self.resolve_parameters(&parameters(), &Predefined::new())?;
                construct(args)
            }
        }
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("bindings", &self.bindings.read().len())
            .field("aliases", &self.aliases.read().len())
            .field("instances", &self.instances.read().len())
            .finish()
    }
}

fn not_found(key: &str, err: Error) -> Error {
    match err {
        Error::Unresolvable(reason) => {
            debug!(key = %key, reason = %reason, "Key could not be resolved");
            Error::NotFound(key.to_string())
        }
        other => other,
    }
}

fn downcast<T: Any + Send + Sync>(key: &str, value: Value) -> Result<Arc<T>> {
    value.downcast::<T>().ok_or_else(|| Error::TypeMismatch {
        key: key.to_string(),
        expected: std::any::type_name::<T>().to_string(),
    })
}

/// `getFoo` with prefix `get` gives `foo`; the name must start uppercase.
fn accessor_key(method: &str, prefix: &str) -> Option<String> {
    let rest = method.strip_prefix(prefix)?;
    if !rest.chars().next()?.is_uppercase() {
        return None;
    }
    Some(inflector::lower_first(rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::injectable;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Engine;

    impl Injectable for Engine {
        const NAME: &'static str = "tests::Engine";

        fn construct(_: Arguments) -> Result<Self> {
            Ok(Engine)
        }
    }

    struct Car {
        engine: Arc<Engine>,
        doors: i64,
    }

    impl Injectable for Car {
        const NAME: &'static str = "tests::Car";

        fn parameters() -> Vec<Parameter> {
            vec![
                Parameter::of::<Engine>("engine"),
                Parameter::int("doors").with_default(4),
            ]
        }

        fn construct(args: Arguments) -> Result<Self> {
            Ok(Car {
                engine: args.object(0)?,
                doors: args.int(1)?,
            })
        }
    }

    struct Radio;

    impl Injectable for Radio {
        const NAME: &'static str = "tests::Radio";

        fn construct(_: Arguments) -> Result<Self> {
            Ok(Radio)
        }
    }

    injectable!(Radio);

    struct Counter(usize);

    fn counting_factory(container: &Container, calls: Arc<AtomicUsize>) {
        container.set_factory("counter", move |_| {
            Ok(Counter(calls.fetch_add(1, Ordering::SeqCst)))
        });
    }

    #[test]
    fn test_unknown_key_is_not_found() {
        let container = Container::new();

        let err = container.get("someUnknownKey").unwrap_err();
        assert!(matches!(err, Error::NotFound(ref key) if key == "someUnknownKey"));
        assert_eq!(err.to_string(), "Key \"someUnknownKey\" could not be resolved.");
        assert!(container.get_new("someUnknownKey").unwrap_err().is_not_found());
    }

    #[test]
    fn test_instance_is_shared_by_get_and_get_new() {
        let container = Container::new();
        container.set_instance("engine", Engine);

        let a = container.get_as::<Engine>("engine").unwrap();
        let b = container.get_as::<Engine>("engine").unwrap();
        let c = container.get_new_as::<Engine>("engine").unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_factory_is_cached_by_get_only() {
        let container = Container::new();
        counting_factory(&container, Arc::new(AtomicUsize::new(0)));

        let a = container.get_as::<Counter>("counter").unwrap();
        let b = container.get_as::<Counter>("counter").unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let c = container.get_new_as::<Counter>("counter").unwrap();
        let d = container.get_new_as::<Counter>("counter").unwrap();
        assert!(!Arc::ptr_eq(&c, &d));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!((a.0, c.0, d.0), (0, 1, 2));
    }

    #[test]
    fn test_alias() {
        let container = Container::new();
        container.alias("motor", "engine");
        container.set_instance("engine", Engine);

        assert!(container.has("motor"));
        assert!(!container.has_instance("motor"));

        let a = container.get("motor").unwrap();
        assert_eq!(a, container.get("engine").unwrap());
        assert!(container.has_instance("motor"));
        assert!(container.has_instance("engine"));

        container.unalias("motor");
        assert!(!container.has("motor"));
    }

    #[test]
    fn test_set_clears_cached_instance() {
        let container = Container::new();
        container.set_instance("engine", Engine);
        let first = container.get("engine").unwrap();

        container.set_instance("engine", Engine);
        assert!(!container.has_instance("engine"));
        assert_ne!(first, container.get("engine").unwrap());
    }

    #[test]
    fn test_destroy_instance() {
        let container = Container::new();
        counting_factory(&container, Arc::new(AtomicUsize::new(0)));

        let before = container.get("counter").unwrap();
        container.destroy_instance("counter");
        assert!(!container.has_instance("counter"));

        let after = container.get("counter").unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_get_new_and_destroy_through_alias() {
        let container = Container::new();
        counting_factory(&container, Arc::new(AtomicUsize::new(0)));
        container.alias("hits", "counter");

        let a = container.get_as::<Counter>("hits").unwrap();
        assert!(container.has_instance("counter"));

        container.destroy_instance("hits");
        assert!(!container.has_instance("counter"));

        let b = container.get_as::<Counter>("hits").unwrap();
        let fresh = container.get_new_as::<Counter>("hits").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&b, &container.get_as::<Counter>("counter").unwrap()));
        assert_eq!((a.0, b.0, fresh.0), (0, 1, 2));
    }

    #[test]
    fn test_destroy_all_instances() {
        let calls = Arc::new(AtomicUsize::new(0));
        let container = Container::new();
        counting_factory(&container, calls.clone());
        container.set_factory("engine", |_| Ok(Engine));

        container.get("counter").unwrap();
        container.get("engine").unwrap();
        container.destroy_all_instances();

        assert!(!container.has_instance("counter"));
        assert!(!container.has_instance("engine"));
        container.get("counter").unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_destroy_all_instances_drops_references() {
        let container = Container::new();
        container.set_factory("engine", |_| Ok(Engine));

        let engine = container.get_as::<Engine>("engine").unwrap();
        assert_eq!(Arc::strong_count(&engine), 2);

        container.destroy_all_instances();
        assert_eq!(Arc::strong_count(&engine), 1);
    }

    #[test]
    fn test_unset() {
        let container = Container::new();
        container.set_instance("engine", Engine);
        container.get("engine").unwrap();

        container.unset("engine").unset("nothing");
        assert!(!container.has("engine"));
        assert!(!container.has_instance("engine"));
    }

    #[test]
    fn test_auto_construction_resolves_dependencies() {
        let container = Container::new();
        container.declare::<Engine>().declare::<Car>();
        container.set_instance(Engine::NAME, Engine);

        let car = container.get_new_as::<Car>(Car::NAME).unwrap();
        let engine = container.get_as::<Engine>(Engine::NAME).unwrap();

        assert!(Arc::ptr_eq(&car.engine, &engine));
        assert_eq!(car.doors, 4);
    }

    #[test]
    fn test_auto_construction_of_unregistered_dependency() {
        let container = Container::new();
        container.declare::<Engine>().declare::<Car>();

        let car = container.get_as::<Car>(Car::NAME).unwrap();
        assert!(container.has_instance(Engine::NAME));
        assert!(!container.has(Engine::NAME));
        assert!(Arc::ptr_eq(
            &car.engine,
            &container.get_as::<Engine>(Engine::NAME).unwrap()
        ));
    }

    #[test]
    fn test_missing_dependency_propagates_not_found() {
        let container = Container::new();
        container.declare::<Car>();

        let err = container.get(Car::NAME).err().unwrap();
        assert!(matches!(err, Error::NotFound(ref key) if key == Engine::NAME));
    }

    #[test]
    fn test_abstract_class_is_not_found() {
        let container = Container::new();
        container.declare_class(ClassDescriptor::abstract_class("tests::Vehicle"));

        assert!(container.has_class("tests::Vehicle"));
        let err = container.get("tests::Vehicle").unwrap_err();
        assert!(matches!(err, Error::NotFound(ref key) if key == "tests::Vehicle"));
    }

    #[test]
    fn test_class_binding() {
        let container = Container::new();
        container.declare::<Engine>();
        container.set_class("engine", Engine::NAME);

        let a = container.get_new("engine").unwrap();
        let b = container.get_new("engine").unwrap();
        assert!(a.is::<Engine>());
        assert_ne!(a, b);
    }

    #[test]
    fn test_class_binding_to_unknown_class() {
        let container = Container::new();
        container.set_class("engine", "tests::Warp");

        assert!(container.has("engine"));
        assert!(matches!(container.get("engine"), Err(Error::NotFound(ref key)) if key == "engine"));
    }

    #[test]
    fn test_published_class() {
        let container = Container::new();

        assert!(container.has_class(Radio::NAME));
        assert!(container.get(Radio::NAME).unwrap().is::<Radio>());
    }

    #[test]
    fn test_factory_may_resolve_other_keys() {
        let container = Container::new();
        container.set_instance("engine", Engine);
        container.set_factory("car", |c| {
            Ok(Car {
                engine: c.get_as::<Engine>("engine")?,
                doors: 2,
            })
        });

        let car = container.get_as::<Car>("car").unwrap();
        assert_eq!(car.doors, 2);
    }

    #[test]
    fn test_set_value() {
        let container = Container::new();
        container.declare::<Engine>();

        container.set_value("engine", Value::from(Engine::NAME)).unwrap();
        assert!(container.get("engine").unwrap().is::<Engine>());

        container.set_value("radio", Value::object(Radio)).unwrap();
        assert!(container.get("radio").unwrap().is::<Radio>());

        let err = container.set_value("port", Value::Int(80)).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(!container.has("port"));
    }

    #[test]
    fn test_make_clones_shared_instances() {
        #[derive(Clone)]
        struct Settings {
            name: String,
        }

        let container = Container::new();
        container.set_instance(
            "settings",
            Settings {
                name: "default".into(),
            },
        );

        let mut settings = container.make::<Settings>("settings").unwrap();
        settings.name = "changed".into();
        assert_eq!(container.get_as::<Settings>("settings").unwrap().name, "default");
    }

    #[test]
    fn test_get_as_type_mismatch() {
        let container = Container::new();
        container.set_instance("engine", Engine);

        assert!(matches!(
            container.get_as::<Radio>("engine"),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_resolve_parameters_predefined_values() {
        let container = Container::new();
        let object = Value::object(Engine);
        let predefined: Predefined = [
            ("mixed".to_string(), Value::from("verbatim")),
            ("int".to_string(), Value::from("123abc")),
            ("float".to_string(), Value::Int(20)),
            ("array".to_string(), object.clone()),
            ("engine".to_string(), object.clone()),
        ]
        .into_iter()
        .collect();

        let args = container
            .resolve_parameters(
                &[
                    Parameter::mixed("mixed"),
                    Parameter::int("int"),
                    Parameter::float("float"),
                    Parameter::array("array"),
                    Parameter::class("engine", "tests::Unregistered"),
                ],
                &predefined,
            )
            .unwrap();

        assert_eq!(args.get(0), Some(&Value::from("verbatim")));
        assert_eq!(args.get(1), Some(&Value::Int(123)));
        assert_eq!(args.get(2), Some(&Value::Float(20.0)));
        assert_eq!(args.get(3), Some(&Value::List(vec![])));
        assert_eq!(args.get(4), Some(&object));
    }

    #[test]
    fn test_resolve_parameters_class_default() {
        let container = Container::new();

        let err = container
            .resolve_parameters(&[Parameter::class("logger", "tests::Logger")], &Predefined::new())
            .unwrap_err();
        assert!(err.is_not_found());

        let args = container
            .resolve_parameters(
                &[Parameter::class("logger", "tests::Logger").optional()],
                &Predefined::new(),
            )
            .unwrap();
        assert_eq!(args.get(0), Some(&Value::Null));
    }

    #[test]
    fn test_resolve_parameters_scalar_defaults() {
        let container = Container::new();

        let args = container
            .resolve_parameters(&[Parameter::string("name").with_default("guest")], &Predefined::new())
            .unwrap();
        assert_eq!(args.string(0).unwrap(), "guest");

        let err = container
            .resolve_parameters(&[Parameter::string("name")], &Predefined::new())
            .unwrap_err();
        assert!(matches!(err, Error::Unresolvable(_)));
    }

    #[test]
    fn test_dynamic_accessors() {
        let container = Container::new();
        container.declare::<Engine>();

        assert!(container
            .call("setEngine", vec![Value::from(Engine::NAME)])
            .unwrap()
            .is_none());

        let a = container.call("getEngine", vec![]).unwrap().unwrap();
        let b = container.call("getEngine", vec![]).unwrap().unwrap();
        let c = container.call("getNewEngine", vec![]).unwrap().unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_dynamic_accessor_errors() {
        let container = Container::new();

        let err = container.call("setEngine", vec![]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid argument count[0] for application setEngine()"
        );

        let err = container.call("fetchEngine", vec![]).unwrap_err();
        assert_eq!(err.to_string(), "No application method named fetchEngine()");

        assert!(matches!(
            container.call("getengine", vec![]),
            Err(Error::BadMethodCall(_))
        ));
        assert!(container.call("getEngine", vec![]).unwrap_err().is_not_found());
    }

    #[test]
    fn test_clones_share_state() {
        let container = Container::new();
        let other = container.clone();
        other.set_instance("engine", Engine);

        assert!(container.has("engine"));
    }
}
