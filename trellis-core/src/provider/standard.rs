// Session, router, view and default response bindings

use super::{ServiceProvider, app_config, controller_registry};
use crate::application::App;
use crate::routing::{Router, RouterOptions};
use crate::view::{View, ViewOptions};
use crate::{Response, Result};
use std::sync::Arc;
use trellis_session::{MemorySessionStore, Session, SessionStore};

pub const SESSION_STORAGE: &str = "sessionStorage";
pub const SESSION: &str = "session";
pub const ROUTER: &str = "router";
pub const VIEW: &str = "view";
pub const RESPONSE: &str = "response";

/// Registers the services every application needs.
///
/// | Key              | Value                                      |
/// |------------------|--------------------------------------------|
/// | `sessionStorage` | `Arc<dyn SessionStore>` (in memory)        |
/// | `session`        | [`Session`] on a fresh `sessionStorage`    |
/// | `router`         | [`Router`] from the `router` config        |
/// | `view`           | [`View`] from the `view` config            |
/// | `response`       | [`Response::no_cache`]                     |
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardServiceProvider;

impl ServiceProvider for StandardServiceProvider {
    fn register(&self, app: &App) -> Result<()> {
        let container = app.container();

        container.set_factory(SESSION_STORAGE, |_| -> Result<Arc<dyn SessionStore>> {
            Ok(Arc::new(MemorySessionStore::new()))
        });

        container.set_factory(SESSION, |c| {
            let storage = c.get_new_as::<Arc<dyn SessionStore>>(SESSION_STORAGE)?;
            Ok(Session::new((*storage).clone()))
        });

        container.set_factory(ROUTER, |c| {
            let options = app_config(c)?
                .get_as::<RouterOptions>("router")?
                .unwrap_or_default();
            Router::with_options(controller_registry(c)?, options)
        });

        container.set_factory(VIEW, |c| {
            let options = app_config(c)?
                .get_as::<ViewOptions>("view")?
                .unwrap_or_default();
            Ok(View::new(options))
        });

        container.set_factory(RESPONSE, |_| Ok(Response::no_cache()));

        container
            .alias(Router::NAME, ROUTER)
            .alias(View::NAME, VIEW)
            .alias(Session::NAME, SESSION)
            .alias(Response::NAME, RESPONSE);

        Ok(())
    }
}
