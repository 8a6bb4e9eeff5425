// Test Application Builder

use std::any::Any;
use std::ops::Deref;
use trellis_core::container::Binding;
use trellis_core::{App, AppHooks, Config, Container, Controller, Result, ServiceProvider};

type Setup = Box<dyn FnOnce(&App) -> Result<()>>;

/// Application under test
pub struct TestApp {
    app: App,
}

impl TestApp {
    pub fn new(app: App) -> Self {
        Self { app }
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn container(&self) -> &Container {
        self.app.container()
    }

    /// Create a test client for making requests
    pub fn client(&self) -> crate::TestClient<'_> {
        crate::TestClient::new(&self.app)
    }
}

impl Deref for TestApp {
    type Target = App;

    fn deref(&self) -> &App {
        &self.app
    }
}

/// Builder for test applications
pub struct TestAppBuilder {
    config: serde_json::Value,
    environment: String,
    cli: bool,
    hooks: Option<Box<dyn FnOnce(trellis_core::AppBuilder) -> trellis_core::AppBuilder>>,
    setup: Vec<Setup>,
}

impl TestAppBuilder {
    pub fn new() -> Self {
        Self {
            config: serde_json::Value::Null,
            environment: "test".to_string(),
            cli: false,
            hooks: None,
            setup: Vec::new(),
        }
    }

    /// Application configuration, as a JSON object
    pub fn config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn cli(mut self, cli: bool) -> Self {
        self.cli = cli;
        self
    }

    pub fn hooks<H: AppHooks + 'static>(mut self, hooks: H) -> Self {
        self.hooks = Some(Box::new(move |builder| builder.hooks(hooks)));
        self
    }

    /// Register a service provider after the default ones
    pub fn provider<P: ServiceProvider + 'static>(mut self, provider: P) -> Self {
        self.setup.push(Box::new(move |app| app.register(provider).map(|_| ())));
        self
    }

    pub fn controller<C: Controller>(mut self) -> Self {
        self.setup.push(Box::new(|app| {
            app.register_controller::<C>();
            Ok(())
        }));
        self
    }

    /// Bind `key` to a fixed instance, replacing any provider binding
    pub fn with_instance<T: Any + Send + Sync>(mut self, key: impl Into<String>, instance: T) -> Self {
        let key = key.into();
        self.setup.push(Box::new(move |app| {
            app.set_instance(key, instance);
            Ok(())
        }));
        self
    }

    pub fn with_binding(mut self, key: impl Into<String>, binding: Binding) -> Self {
        let key = key.into();
        self.setup.push(Box::new(move |app| {
            app.set(key, binding);
            Ok(())
        }));
        self
    }

    /// Run arbitrary setup against the built application
    pub fn setup<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&App) -> Result<()> + 'static,
    {
        self.setup.push(Box::new(setup));
        self
    }

    pub fn build(self) -> Result<TestApp> {
        let mut builder = App::builder()
            .config(Config::from_value(self.config)?)
            .environment(self.environment)
            .cli(self.cli);
        if let Some(hooks) = self.hooks {
            builder = hooks(builder);
        }

        let app = builder.build()?;
        for setup in self.setup {
            setup(&app)?;
        }

        Ok(TestApp::new(app))
    }
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self::new()
    }
}
