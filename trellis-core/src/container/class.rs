//! Class descriptors: the explicit stand-in for constructor reflection.
//!
//! A type becomes auto-constructible by implementing [`Injectable`] and
//! publishing a [`ClassDescriptor`], either globally:
//!
//! ```
//! use trellis_core::container::{Arguments, Injectable, Parameter};
//! use trellis_core::{injectable, Result};
//!
//! struct Mailer {
//!     sender: String,
//! }
//!
//! impl Injectable for Mailer {
//!     const NAME: &'static str = "app::Mailer";
//!
//!     fn parameters() -> Vec<Parameter> {
//!         vec![Parameter::string("sender").with_default("noreply@localhost")]
//!     }
//!
//!     fn construct(args: Arguments) -> Result<Self> {
//!         Ok(Mailer { sender: args.string(0)? })
//!     }
//! }
//!
//! injectable!(Mailer);
//! ```
//!
//! or per container with [`Container::declare`](super::Container::declare).

use super::parameter::{Arguments, Parameter};
use crate::{Result, Value};
use once_cell::sync::Lazy;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// A type the container can build from its constructor parameters.
pub trait Injectable: Any + Send + Sync + Sized {
    /// Fully qualified class name the type is registered under.
    const NAME: &'static str;

    /// Constructor parameters, in declaration order.
    fn parameters() -> Vec<Parameter> {
        Vec::new()
    }

    fn construct(args: Arguments) -> Result<Self>;
}

#[derive(Clone, Copy)]
pub enum ClassKind {
    Concrete {
        parameters: fn() -> Vec<Parameter>,
        construct: fn(Arguments) -> Result<Value>,
    },
    /// An interface or abstract class: known, but cannot be instantiated
    Abstract,
}

/// Constructor metadata for one class name.
#[derive(Clone, Copy)]
pub struct ClassDescriptor {
    pub name: &'static str,
    pub kind: ClassKind,
}

impl ClassDescriptor {
    pub const fn of<T: Injectable>() -> Self {
        Self {
            name: T::NAME,
            kind: ClassKind::Concrete {
                parameters: T::parameters,
                construct: construct_object::<T>,
            },
        }
    }

    pub const fn abstract_class(name: &'static str) -> Self {
        Self {
            name,
            kind: ClassKind::Abstract,
        }
    }

    pub fn is_instantiable(&self) -> bool {
        matches!(self.kind, ClassKind::Concrete { .. })
    }

    pub fn parameters(&self) -> Vec<Parameter> {
        match self.kind {
            ClassKind::Concrete { parameters, .. } => parameters(),
            ClassKind::Abstract => Vec::new(),
        }
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("instantiable", &self.is_instantiable())
            .finish()
    }
}

fn construct_object<T: Injectable>(args: Arguments) -> Result<Value> {
    T::construct(args).map(Value::object)
}

inventory::collect!(ClassDescriptor);

static PUBLISHED: Lazy<HashMap<&'static str, ClassDescriptor>> = Lazy::new(|| {
    inventory::iter::<ClassDescriptor>
        .into_iter()
        .map(|descriptor| (descriptor.name, *descriptor))
        .collect()
});

/// Look up a globally published class.
pub fn find_class(name: &str) -> Option<ClassDescriptor> {
    PUBLISHED.get(name).copied()
}

/// Publish an [`Injectable`] type so every container can auto-construct it.
#[macro_export]
macro_rules! injectable {
    ($ty:ty) => {
        $crate::container::inventory::submit! {
            $crate::container::ClassDescriptor::of::<$ty>()
        }
    };
}

/// Publish a class name that exists but cannot be instantiated.
#[macro_export]
macro_rules! abstract_class {
    ($name:expr) => {
        $crate::container::inventory::submit! {
            $crate::container::ClassDescriptor::abstract_class($name)
        }
    };
}
