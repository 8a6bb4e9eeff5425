//! Service providers register groups of container bindings on an [`App`].

mod error;
mod standard;

pub use error::{
    DEBUG_ERROR_PAGE_HANDLER, ERROR_HANDLER, ERROR_LOGGER, ERROR_PIPELINE, ErrorServiceProvider,
    USER_ERROR_PAGE_HANDLER,
};
pub use standard::{RESPONSE, ROUTER, SESSION, SESSION_STORAGE, StandardServiceProvider, VIEW};

use crate::application::App;
use crate::controller::ControllerRegistry;
use crate::{Container, Result};
use std::sync::Arc;
use trellis_config::Config;

pub trait ServiceProvider: Send + Sync {
    /// Add bindings to the application container.
    fn register(&self, app: &App) -> Result<()>;

    /// Called once when the application boots, after every provider has
    /// been registered.
    fn boot(&self, _app: &App) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// The application configuration, or an empty one outside an [`App`].
pub(crate) fn app_config(container: &Container) -> Result<Arc<Config>> {
    match container.get_as::<Config>(App::CONFIG) {
        Err(e) if e.is_not_found() => Ok(Arc::new(Config::default())),
        other => other,
    }
}

pub(crate) fn controller_registry(container: &Container) -> Result<Arc<ControllerRegistry>> {
    match container.get_as::<ControllerRegistry>(ControllerRegistry::NAME) {
        Err(e) if e.is_not_found() => Ok(Arc::new(ControllerRegistry::new())),
        other => other,
    }
}
