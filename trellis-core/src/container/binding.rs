use super::Container;
use crate::{Error, Object, Result, Value};
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// A factory receives the container and produces a fresh value per call.
pub type Factory = Arc<dyn Fn(&Container) -> Result<Value> + Send + Sync>;

/// What a key is bound to.
#[derive(Clone)]
pub enum Binding {
    /// A pre-built instance, returned as is by `get` and `get_new`
    Instance(Object),
    Factory(Factory),
    /// A class name, auto-constructed on resolution
    Class(String),
}

impl Binding {
    pub fn instance<T: Any + Send + Sync>(instance: T) -> Self {
        Binding::Instance(Arc::new(instance))
    }

    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&Container) -> Result<Value> + Send + Sync + 'static,
    {
        Binding::Factory(Arc::new(factory))
    }

    pub fn class(name: impl Into<String>) -> Self {
        Binding::Class(name.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Binding::Instance(_) => "instance",
            Binding::Factory(_) => "factory",
            Binding::Class(_) => "class",
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Instance(object) => write!(f, "Instance({:p})", Arc::as_ptr(object)),
            Binding::Factory(_) => f.write_str("Factory"),
            Binding::Class(name) => f.debug_tuple("Class").field(name).finish(),
        }
    }
}

impl TryFrom<Value> for Binding {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(object) => Ok(Binding::Instance(object)),
            Value::Str(name) => Ok(Binding::Class(name)),
            _ => Err(Error::InvalidArgument(
                "Value must be a class name, an object instance, or a callable".to_string(),
            )),
        }
    }
}
