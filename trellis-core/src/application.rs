// Application bootstrap and request handling

use crate::container::{Binding, Predefined};
use crate::controller::{Controller, ControllerRegistry};
use crate::error_handling::ErrorPipeline;
use crate::logging::{debug, info, warn};
use crate::provider::{ERROR_PIPELINE, ErrorServiceProvider, ServiceProvider, StandardServiceProvider};
use crate::routing::Router;
use crate::{Container, Error, Request, Response, Result};
use parking_lot::RwLock;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use trellis_config::Config;

/// Extension points around request handling.
///
/// Every method has a no-op default; implement only what is needed.
pub trait AppHooks: Send + Sync {
    /// Runs before routing. A returned response is sent as is.
    fn pre_handle(&self, _app: &App, _request: &Request) -> Result<Option<Response>> {
        Ok(None)
    }

    /// Runs after a successful route match, before dispatch. Route
    /// attributes are available on the request.
    fn post_route(&self, _app: &App, _request: &Request) -> Result<Option<Response>> {
        Ok(None)
    }

    /// Runs after dispatch, before the response is returned.
    fn post_handle(&self, _app: &App, _request: &Request) -> Result<()> {
        Ok(())
    }

    /// Response for requests no route or controller action matched.
    fn no_route_response(&self, _app: &App, _request: &Request) -> Response {
        Response::new(404).with_content("Not Found")
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl AppHooks for DefaultHooks {}

/// The application: a container with configuration, service providers and
/// request handling.
///
/// `App` dereferences to its [`Container`], so bindings are read and
/// written directly on it.
pub struct App {
    config: Arc<Config>,
    environment: String,
    cli: bool,
    providers: RwLock<Vec<Arc<dyn ServiceProvider>>>,
    booted: AtomicBool,
    container: Container,
    controllers: Arc<ControllerRegistry>,
    hooks: Arc<dyn AppHooks>,
}

impl App {
    /// Container key of the application [`Config`].
    pub const CONFIG: &'static str = "config";

    pub const DEFAULT_ENVIRONMENT: &'static str = "production";

    /// An application with the standard and error service providers.
    pub fn new(config: Config, environment: impl Into<String>) -> Result<Self> {
        Self::builder().config(config).environment(environment).build()
    }

    pub fn builder() -> AppBuilder {
        AppBuilder::new()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn is_cli(&self) -> bool {
        self.cli
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn controllers(&self) -> &Arc<ControllerRegistry> {
        &self.controllers
    }

    /// Add a provider and let it register its bindings.
    pub fn register<P: ServiceProvider + 'static>(&self, provider: P) -> Result<&Self> {
        self.register_arc(Arc::new(provider))
    }

    pub fn register_arc(&self, provider: Arc<dyn ServiceProvider>) -> Result<&Self> {
        debug!(provider = provider.name(), "Registering service provider");
        self.providers.write().push(provider.clone());
        provider.register(self)?;
        Ok(self)
    }

    pub fn register_controller<C: Controller>(&self) -> &Self {
        self.controllers.register::<C>();
        self
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers
            .read()
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    pub fn is_booted(&self) -> bool {
        self.booted.load(Ordering::Acquire)
    }

    /// Boot every provider, once. [`handle`](Self::handle) boots on demand.
    pub fn boot(&self) -> Result<()> {
        if self.is_booted() {
            return Ok(());
        }

        let providers = self.providers.read().clone();
        for provider in providers {
            provider.boot(self)?;
        }

        self.booted.store(true, Ordering::Release);
        info!(environment = %self.environment, "Application booted");
        Ok(())
    }

    /// The request being handled, if any.
    pub fn request(&self) -> Option<Arc<Request>> {
        if !self.container.has(Request::NAME) {
            return None;
        }
        self.container.get_as::<Request>(Request::NAME).ok()
    }

    /// Handle a request. Unmatched routes answer 404 "Not Found"; any other
    /// error is passed to the error pipeline.
    pub fn handle(&self, request: Request) -> Response {
        let mut request = request;
        debug!(method = %request.method, path = %request.path, "Handling request");

        match self.try_handle(&mut request) {
            Ok(response) => response,
            Err(err) => self.handle_error(&err, &request),
        }
    }

    fn try_handle(&self, request: &mut Request) -> Result<Response> {
        self.container.alias("request", Request::NAME);
        self.container.set_instance(Request::NAME, request.clone());

        self.boot()?;

        if let Some(response) = self.hooks.pre_handle(self, request)? {
            return Ok(response);
        }

        let router = self.container.get_as::<Router>(Router::NAME)?;
        let routed = router.route(&self.container, request);
        self.container.set_instance(Request::NAME, request.clone());

        let response = match routed {
            Ok(mut controller) => {
                if let Some(response) = self.hooks.post_route(self, request)? {
                    return Ok(response);
                }

                match controller.dispatch(None, Predefined::new()) {
                    Err(Error::ResourceNotFound(reason)) => self.no_route(request, &reason),
                    other => other?,
                }
            }
            Err(Error::ResourceNotFound(reason)) => self.no_route(request, &reason),
            Err(err) => return Err(err),
        };

        self.hooks.post_handle(self, request)?;
        Ok(response)
    }

    fn no_route(&self, request: &Request, reason: &str) -> Response {
        debug!(path = %request.path, reason = %reason, "No route");
        self.hooks.no_route_response(self, request)
    }

    fn handle_error(&self, err: &Error, request: &Request) -> Response {
        match self.container.get_as::<ErrorPipeline>(ERROR_PIPELINE) {
            Ok(pipeline) => pipeline.handle(err, Some(request)),
            Err(pipeline_err) => {
                warn!(
                    error = %err,
                    pipeline_error = %pipeline_err,
                    "Error pipeline unavailable"
                );
                Response::internal_server_error()
            }
        }
    }
}

impl Deref for App {
    type Target = Container;

    fn deref(&self) -> &Container {
        &self.container
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("environment", &self.environment)
            .field("cli", &self.cli)
            .field("booted", &self.is_booted())
            .field("providers", &self.provider_names())
            .field("container", &self.container)
            .finish()
    }
}

/// Builder for [`App`].
pub struct AppBuilder {
    config: Config,
    environment: String,
    cli: bool,
    hooks: Arc<dyn AppHooks>,
    default_providers: bool,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            environment: App::DEFAULT_ENVIRONMENT.to_string(),
            cli: false,
            hooks: Arc::new(DefaultHooks),
            default_providers: true,
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Mark the application as running from the command line.
    pub fn cli(mut self, cli: bool) -> Self {
        self.cli = cli;
        self
    }

    pub fn hooks<H: AppHooks + 'static>(mut self, hooks: H) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Skip the error and standard service providers.
    pub fn without_default_providers(mut self) -> Self {
        self.default_providers = false;
        self
    }

    pub fn build(self) -> Result<App> {
        let config = Arc::new(self.config);
        let controllers = Arc::new(ControllerRegistry::new());
        let container = Container::new();

        container.set(App::CONFIG, Binding::Instance(config.clone()));
        container.set(ControllerRegistry::NAME, Binding::Instance(controllers.clone()));

        let app = App {
            config,
            environment: self.environment,
            cli: self.cli,
            providers: RwLock::new(Vec::new()),
            booted: AtomicBool::new(false),
            container,
            controllers,
            hooks: self.hooks,
        };

        if self.default_providers {
            app.register(ErrorServiceProvider)?;
            app.register(StandardServiceProvider)?;
        }

        Ok(app)
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}
