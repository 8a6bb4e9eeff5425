// Core library for the Trellis framework
// The dependency injection container with auto-wiring, and the router,
// controllers, views and application built on it

pub mod application;
pub mod container;
pub mod controller;
pub mod error;
pub mod error_handling;
pub mod http;
pub mod inflector;
pub mod provider;
pub mod routing;
pub mod value;
pub mod view;

pub use trellis_log as logging;

// Re-export commonly used types
pub use application::{App, AppBuilder, AppHooks, DefaultHooks};
pub use container::{
    Arguments, Binding, ClassDescriptor, Container, Injectable, Parameter, ParameterKind,
    Predefined,
};
pub use controller::{Action, ActionResult, Controller, ControllerBase, Dispatch};
pub use error::{Error, Result};
pub use error_handling::{ErrorHandler, ErrorPipeline};
pub use http::{Request, Response};
pub use provider::{ErrorServiceProvider, ServiceProvider, StandardServiceProvider};
pub use routing::{Route, Router, RouterOptions};
pub use value::{Object, Value};
pub use view::{View, ViewOptions};
pub use trellis_config::Config;
