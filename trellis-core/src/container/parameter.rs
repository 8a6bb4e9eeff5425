//! Formal parameters and resolved argument lists.

use crate::{Error, Result, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use super::class::Injectable;

/// Declared type of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterKind {
    /// Untyped; values pass through verbatim
    Mixed,
    Bool,
    Int,
    Float,
    Str,
    Array,
    /// A class or interface name, resolved through the container
    Class(String),
}

impl ParameterKind {
    pub fn class_name(&self) -> Option<&str> {
        match self {
            ParameterKind::Class(name) => Some(name),
            _ => None,
        }
    }
}

/// A formal parameter of a constructor or action.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    pub default: Option<Value>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
        }
    }

    pub fn mixed(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Mixed)
    }

    pub fn bool(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Bool)
    }

    pub fn int(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Int)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Float)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Str)
    }

    pub fn array(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Array)
    }

    /// A parameter typed by class or interface name.
    pub fn class(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Class(class.into()))
    }

    /// A parameter typed by an injectable Rust type.
    pub fn of<T: Injectable>(name: impl Into<String>) -> Self {
        Self::class(name, T::NAME)
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Nullable parameter: defaults to `Value::Null`.
    pub fn optional(self) -> Self {
        self.with_default(Value::Null)
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, ParameterKind::Class(_))
    }
}

/// Values bound by parameter name, e.g. route attributes merged with
/// explicit call arguments.
pub type Predefined = BTreeMap<String, Value>;

/// Resolved arguments, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    names: Vec<String>,
    values: Vec<Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: Value) {
        self.names.push(name.into());
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// The argument bound to the parameter called `name`.
    pub fn by_name(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.values.get(i))
    }

    pub fn value(&self, index: usize) -> Result<Value> {
        self.values.get(index).cloned().ok_or_else(|| self.missing(index))
    }

    /// The shared instance at `index`.
    pub fn object<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>> {
        let value = self.values.get(index).ok_or_else(|| self.missing(index))?;
        value
            .downcast::<T>()
            .ok_or_else(|| self.mismatch(index, std::any::type_name::<T>()))
    }

    /// Like [`object`](Self::object), but `Value::Null` yields `None`.
    pub fn optional_object<T: Any + Send + Sync>(&self, index: usize) -> Result<Option<Arc<T>>> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.object(index).map(Some),
        }
    }

    pub fn int(&self, index: usize) -> Result<i64> {
        match self.values.get(index) {
            Some(Value::Int(i)) => Ok(*i),
            Some(_) => Err(self.mismatch(index, "int")),
            None => Err(self.missing(index)),
        }
    }

    pub fn float(&self, index: usize) -> Result<f64> {
        match self.values.get(index) {
            Some(value) => value.as_float().ok_or_else(|| self.mismatch(index, "float")),
            None => Err(self.missing(index)),
        }
    }

    pub fn bool(&self, index: usize) -> Result<bool> {
        match self.values.get(index) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(self.mismatch(index, "bool")),
            None => Err(self.missing(index)),
        }
    }

    pub fn string(&self, index: usize) -> Result<String> {
        match self.values.get(index) {
            Some(Value::Str(s)) => Ok(s.clone()),
            Some(_) => Err(self.mismatch(index, "string")),
            None => Err(self.missing(index)),
        }
    }

    /// `None` for a null argument, the string otherwise.
    pub fn optional_string(&self, index: usize) -> Result<Option<String>> {
        match self.values.get(index) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.string(index).map(Some),
        }
    }

    /// The elements of an array argument; map values keep key order.
    pub fn array(&self, index: usize) -> Result<Vec<Value>> {
        match self.values.get(index) {
            Some(Value::List(items)) => Ok(items.clone()),
            Some(Value::Map(map)) => Ok(map.values().cloned().collect()),
            Some(_) => Err(self.mismatch(index, "array")),
            None => Err(self.missing(index)),
        }
    }

    fn label(&self, index: usize) -> String {
        self.names
            .get(index)
            .map(|n| format!("${}", n))
            .unwrap_or_else(|| format!("#{}", index))
    }

    fn missing(&self, index: usize) -> Error {
        Error::Unresolvable(format!("Missing argument {}", self.label(index)))
    }

    fn mismatch(&self, index: usize, expected: &str) -> Error {
        Error::TypeMismatch {
            key: self.label(index),
            expected: expected.to_string(),
        }
    }
}

impl FromIterator<(String, Value)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut args = Arguments::new();
        for (name, value) in iter {
            args.push(name, value);
        }
        args
    }
}
