// Trellis - A small MVC framework for Rust built around an auto-wiring
// dependency injection container.
//
// This crate re-exports the core container, router, controllers and views,
// plus the optional supporting crates behind feature flags.

// Re-export core functionality
pub use trellis_core::*;

pub use trellis_log;

// Re-export optional crates
#[cfg(feature = "config")]
pub use trellis_config;

#[cfg(feature = "session")]
pub use trellis_session;

#[cfg(feature = "testing")]
pub use trellis_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::container::{Arguments, Injectable, Parameter};
    pub use crate::{
        Action, ActionResult, App, AppBuilder, Binding, Config, Container, Controller,
        ControllerBase, Error, Request, Response, Result, ServiceProvider, Value, View,
        abstract_class, controller, injectable,
    };
}
