//! Action controllers.
//!
//! A controller is a type implementing [`Controller`] whose actions are
//! listed by method name (`someOtherAction` serves the `some-other`
//! action). Action parameters are bound by name from the request
//! attributes and the explicit dispatch arguments, falling back to the
//! container for class-typed parameters.
//!
//! ```
//! use trellis_core::container::{Arguments, Parameter};
//! use trellis_core::controller::{Action, ActionResult, Controller, ControllerBase};
//! use trellis_core::{controller, Result};
//!
//! struct PostController {
//!     base: ControllerBase,
//! }
//!
//! impl PostController {
//!     fn show(&mut self, args: Arguments) -> Result<ActionResult> {
//!         Ok(format!("post {}", args.int(0)?).into())
//!     }
//! }
//!
//! impl Controller for PostController {
//!     const CLASS: &'static str = "controller::PostController";
//!
//!     fn create(base: ControllerBase) -> Result<Self> {
//!         Ok(Self { base })
//!     }
//!
//!     fn base(&self) -> &ControllerBase {
//!         &self.base
//!     }
//!
//!     fn base_mut(&mut self) -> &mut ControllerBase {
//!         &mut self.base
//!     }
//!
//!     fn actions() -> Vec<Action<Self>> {
//!         vec![Action::new("showAction", Self::show).with_parameter(Parameter::int("id"))]
//!     }
//! }
//!
//! controller!(PostController);
//! ```

use crate::container::{Arguments, Parameter, Predefined};
use crate::logging::{debug, trace};
use crate::routing::Router;
use crate::view::View;
use crate::{Container, Error, Request, Response, Result, Value, inflector};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;

/// What an action method returned.
#[derive(Debug, Default)]
pub enum ActionResult {
    Response(Response),
    Content(String),
    /// Nothing returned: auto-render the view, if enabled
    #[default]
    Empty,
}

impl From<Response> for ActionResult {
    fn from(response: Response) -> Self {
        ActionResult::Response(response)
    }
}

impl From<String> for ActionResult {
    fn from(content: String) -> Self {
        ActionResult::Content(content)
    }
}

impl From<&str> for ActionResult {
    fn from(content: &str) -> Self {
        ActionResult::Content(content.to_string())
    }
}

impl From<()> for ActionResult {
    fn from(_: ()) -> Self {
        ActionResult::Empty
    }
}

pub type ActionHandler<C> = fn(&mut C, Arguments) -> Result<ActionResult>;

/// An action method with its formal parameters.
pub struct Action<C> {
    pub method: &'static str,
    pub parameters: Vec<Parameter>,
    pub handler: ActionHandler<C>,
}

impl<C> Action<C> {
    pub fn new(method: &'static str, handler: ActionHandler<C>) -> Self {
        Self {
            method,
            parameters: Vec::new(),
            handler,
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

impl<C> fmt::Debug for Action<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("method", &self.method)
            .field("parameters", &self.parameters)
            .finish()
    }
}

/// State every controller carries.
pub struct ControllerBase {
    pub container: Container,
    pub request: Request,
    pub view: View,
    auto_render_view: bool,
    auto_render_view_script: Option<String>,
}

impl ControllerBase {
    /// Takes a fresh view from the container and attaches the request to it.
    pub fn new(container: Container, request: Request) -> Result<Self> {
        let mut view = container.make::<View>(View::NAME)?;
        view.set_request(request.clone());

        Ok(Self {
            container,
            request,
            view,
            auto_render_view: true,
            auto_render_view_script: None,
        })
    }

    pub fn set_auto_render_view(&mut self, enabled: bool) {
        self.auto_render_view = enabled;
    }

    pub fn auto_render_view(&self) -> bool {
        self.auto_render_view
    }

    pub fn set_auto_render_view_script(&mut self, script: impl Into<String>) {
        self.auto_render_view_script = Some(script.into());
    }

    pub fn auto_render_view_script(&self) -> Option<&str> {
        self.auto_render_view_script.as_deref()
    }

    /// A query parameter.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.request.query(key)
    }

    pub fn query_all(&self) -> &[(String, String)] {
        &self.request.query
    }

    /// A form field.
    pub fn post(&self, key: &str) -> Option<&str> {
        self.request.post(key)
    }

    pub fn post_all(&self) -> &[(String, String)] {
        &self.request.post
    }

    /// Absolute URL of `relative_url`, or of the current request, with the
    /// current query merged with `parameters`.
    pub fn url(&self, relative_url: Option<&str>, parameters: &[(&str, &str)]) -> String {
        let url = format!(
            "{}{}",
            self.request.scheme_and_http_host(),
            relative_url
                .map(str::to_string)
                .unwrap_or_else(|| self.request.request_uri())
        );

        if parameters.is_empty() {
            return url;
        }

        let mut merged = self.request.query.clone();
        merged.extend(parameters.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        crate::http::add_query_parameters(&url, &merged, "&")
    }

    fn router(&self) -> Result<std::sync::Arc<Router>> {
        self.container.get_as::<Router>(Router::NAME)
    }

    /// A copy of the container's shared response, or a no-cache one.
    fn response(&self) -> Result<Response> {
        match self.container.get_as::<Response>(Response::NAME) {
            Ok(shared) => Ok((*shared).clone()),
            Err(e) if e.is_not_found() => Ok(Response::no_cache()),
            Err(e) => Err(e),
        }
    }
}

impl fmt::Debug for ControllerBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerBase")
            .field("request", &self.request)
            .field("auto_render_view", &self.auto_render_view)
            .field("auto_render_view_script", &self.auto_render_view_script)
            .finish()
    }
}

pub trait Controller: Send + Sized + 'static {
    /// Class name the router resolves, e.g. `controller::IndexController`.
    const CLASS: &'static str;

    fn create(base: ControllerBase) -> Result<Self>;

    fn base(&self) -> &ControllerBase;

    fn base_mut(&mut self) -> &mut ControllerBase;

    fn actions() -> Vec<Action<Self>>;

    /// Called once after construction.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called right before the action; a returned response is used as is.
    fn pre_dispatch(&mut self, _action: &str) -> Result<Option<Response>> {
        Ok(None)
    }

    fn post_dispatch(&mut self) -> Result<()> {
        Ok(())
    }

    /// Forward to another action of this controller, or to another
    /// controller when `controller` is given.
    fn forward(
        &mut self,
        action: &str,
        controller: Option<&str>,
        module: Option<&str>,
        args: Predefined,
    ) -> Result<Response> {
        let Some(controller) = controller.filter(|c| !c.is_empty()) else {
            return dispatch_action(self, Some(action), args);
        };

        let base = self.base_mut();
        let router = base.router()?;
        let module = module
            .map(str::to_string)
            .or_else(|| router.request_module(&base.request))
            .unwrap_or_default();
        let class = router.controller_class(controller, Some(module.as_str()));

        base.request.set_attribute("module", module);
        base.request.set_attribute("controller", controller);
        base.request.set_attribute("action", action);

        debug!(controller = %class, action = %action, "Forwarding request");
        let mut target = router
            .controllers()
            .instantiate(&class, base.container.clone(), base.request.clone())?;
        target.dispatch(Some(action), args)
    }
}

/// Object-safe view of a controller, as produced by the router.
pub trait Dispatch: Send {
    fn class(&self) -> &'static str;

    fn controller_base(&self) -> &ControllerBase;

    fn controller_base_mut(&mut self) -> &mut ControllerBase;

    /// Run `action` (or the request's action) and build the response.
    fn dispatch(&mut self, action: Option<&str>, args: Predefined) -> Result<Response>;
}

impl<C: Controller> Dispatch for C {
    fn class(&self) -> &'static str {
        C::CLASS
    }

    fn controller_base(&self) -> &ControllerBase {
        self.base()
    }

    fn controller_base_mut(&mut self) -> &mut ControllerBase {
        self.base_mut()
    }

    fn dispatch(&mut self, action: Option<&str>, args: Predefined) -> Result<Response> {
        dispatch_action(self, action, args)
    }
}

fn dispatch_action<C: Controller>(
    controller: &mut C,
    action: Option<&str>,
    args: Predefined,
) -> Result<Response> {
    let router = controller.base().router()?;
    let requested = match action {
        Some(action) if !action.is_empty() => action.to_string(),
        _ => router.request_action(&controller.base().request),
    };
    let action = inflector::camel_to_separator(&requested, "-");
    let method = router.action_method(&action);

    let actions = C::actions();
    let entry = actions
        .iter()
        .find(|a| a.method == method)
        .ok_or_else(|| {
            Error::ResourceNotFound(format!("\"{}\" action method does not exist.", method))
        })?;

    let base = controller.base();
    let mut predefined = base.request.attributes.clone();
    predefined.extend(args);
    let collected = base
        .container
        .resolve_parameters(&entry.parameters, &predefined)
        .map_err(|e| match e {
            Error::Unresolvable(_) => {
                Error::Logic("Missing values for one or more action parameters".to_string())
            }
            other => other,
        })?;

    if let Some(response) = controller.pre_dispatch(&action)? {
        trace!(action = %action, "Pre-dispatch returned a response");
        return Ok(response);
    }

    trace!(controller = C::CLASS, method = %method, "Calling action");
    let result = (entry.handler)(controller, collected)?;
    controller.post_dispatch()?;

    let base = controller.base_mut();
    let response = match result {
        ActionResult::Response(response) => response,
        ActionResult::Content(content) => base.response()?.with_content(content),
        ActionResult::Empty if base.auto_render_view => {
            let script = match &base.auto_render_view_script {
                Some(script) => script.clone(),
                None => auto_render_view_script_name(
                    &action,
                    &router.request_controller(&base.request),
                    router.request_module(&base.request).as_deref(),
                ),
            };
            let content = base.view.render(&script, true)?;
            base.response()?.with_content(content)
        }
        ActionResult::Empty => base.response()?.with_content(""),
    };

    Ok(response.prepare(&base.request))
}

/// `module/controller/action`, skipping empty parts.
pub fn auto_render_view_script_name(action: &str, controller: &str, module: Option<&str>) -> String {
    [module.unwrap_or_default(), controller, action]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Constructor and action names of one controller type.
#[derive(Clone, Copy)]
pub struct ControllerEntry {
    pub class: &'static str,
    create: fn(Container, Request) -> Result<Box<dyn Dispatch>>,
    actions: fn() -> Vec<&'static str>,
}

impl ControllerEntry {
    pub const fn of<C: Controller>() -> Self {
        Self {
            class: C::CLASS,
            create: create_controller::<C>,
            actions: action_methods::<C>,
        }
    }

    pub fn has_action(&self, method: &str) -> bool {
        (self.actions)().contains(&method)
    }

    pub fn action_methods(&self) -> Vec<&'static str> {
        (self.actions)()
    }

    pub fn instantiate(&self, container: Container, request: Request) -> Result<Box<dyn Dispatch>> {
        (self.create)(container, request)
    }
}

impl fmt::Debug for ControllerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerEntry")
            .field("class", &self.class)
            .field("actions", &self.action_methods())
            .finish()
    }
}

fn create_controller<C: Controller>(container: Container, request: Request) -> Result<Box<dyn Dispatch>> {
    let base = ControllerBase::new(container, request)?;
    let mut controller = C::create(base)?;
    controller.init()?;
    Ok(Box::new(controller))
}

fn action_methods<C: Controller>() -> Vec<&'static str> {
    C::actions().iter().map(|action| action.method).collect()
}

inventory::collect!(ControllerEntry);

/// Publish a [`Controller`] so every router can find it.
#[macro_export]
macro_rules! controller {
    ($ty:ty) => {
        $crate::container::inventory::submit! {
            $crate::controller::ControllerEntry::of::<$ty>()
        }
    };
}

/// Controllers known to the router: registered ones first, then those
/// published with [`controller!`](crate::controller!).
#[derive(Default)]
pub struct ControllerRegistry {
    entries: RwLock<HashMap<String, ControllerEntry>>,
}

impl ControllerRegistry {
    pub const NAME: &'static str = "controllerRegistry";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C: Controller>(&self) {
        self.register_entry(ControllerEntry::of::<C>());
    }

    pub fn register_entry(&self, entry: ControllerEntry) {
        trace!(controller = entry.class, "Controller registered");
        self.entries.write().insert(entry.class.to_string(), entry);
    }

    pub fn find(&self, class: &str) -> Option<ControllerEntry> {
        if let Some(entry) = self.entries.read().get(class) {
            return Some(*entry);
        }
        inventory::iter::<ControllerEntry>
            .into_iter()
            .find(|entry| entry.class == class)
            .copied()
    }

    pub fn contains(&self, class: &str) -> bool {
        self.find(class).is_some()
    }

    pub fn instantiate(&self, class: &str, container: Container, request: Request) -> Result<Box<dyn Dispatch>> {
        let entry = self.find(class).ok_or_else(|| {
            Error::ResourceNotFound(format!("Controller \"{}\" does not exist", class))
        })?;
        entry.instantiate(container, request)
    }
}

impl fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("entries", &self.entries.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Predefined values from `(name, value)` pairs.
pub fn args<I, K, V>(pairs: I) -> Predefined
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TestController {
        base: ControllerBase,
        pre_dispatched: Vec<String>,
    }

    impl TestController {
        fn index(&mut self, _: Arguments) -> Result<ActionResult> {
            Ok(ActionResult::Empty)
        }

        fn pre_test(&mut self, _: Arguments) -> Result<ActionResult> {
            Ok("not reached".into())
        }

        fn some_other(&mut self, args: Arguments) -> Result<ActionResult> {
            Ok(format!("{} {} {}", args.string(0)?, args.string(1)?, args.string(2)?).into())
        }

        fn no_auto(&mut self, _: Arguments) -> Result<ActionResult> {
            self.base.set_auto_render_view(false);
            Ok(ActionResult::Empty)
        }

        fn string_return(&mut self, _: Arguments) -> Result<ActionResult> {
            Ok("a string".into())
        }

        fn response(&mut self, _: Arguments) -> Result<ActionResult> {
            Ok(Response::new(201).with_content("created").into())
        }

        fn forward_internal(&mut self, _: Arguments) -> Result<ActionResult> {
            self.forward("forward-end", None, None, Predefined::new())
                .map(ActionResult::from)
        }

        fn forward_end(&mut self, _: Arguments) -> Result<ActionResult> {
            Ok("eeend".into())
        }
    }

    impl Controller for TestController {
        const CLASS: &'static str = "controller::TestController";

        fn create(base: ControllerBase) -> Result<Self> {
            Ok(Self {
                base,
                pre_dispatched: Vec::new(),
            })
        }

        fn base(&self) -> &ControllerBase {
            &self.base
        }

        fn base_mut(&mut self) -> &mut ControllerBase {
            &mut self.base
        }

        fn actions() -> Vec<Action<Self>> {
            vec![
                Action::new("indexAction", Self::index),
                Action::new("preTestAction", Self::pre_test),
                Action::new("someOtherAction", Self::some_other)
                    .with_parameter(Parameter::string("someParam"))
                    .with_parameter(Parameter::string("otherParam"))
                    .with_parameter(Parameter::string("defaultParam").with_default("wow")),
                Action::new("noAutoAction", Self::no_auto),
                Action::new("stringReturnAction", Self::string_return),
                Action::new("responseAction", Self::response),
                Action::new("forwardInternalAction", Self::forward_internal),
                Action::new("forwardEndAction", Self::forward_end),
            ]
        }

        fn pre_dispatch(&mut self, action: &str) -> Result<Option<Response>> {
            self.pre_dispatched.push(action.to_string());
            if action == "pre-test" {
                return Ok(Some(Response::ok().with_content("preOk")));
            }
            Ok(None)
        }
    }

    fn setup() -> (tempfile::TempDir, TestController) {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("test")).unwrap();
        std::fs::write(dir.path().join("test/index.html.hbs"), "yes").unwrap();

        let container = Container::new();
        let registry = Arc::new(ControllerRegistry::new());
        registry.register::<TestController>();
        container.set_instance(Router::NAME, Router::new(registry).unwrap());

        let root = dir.path().display().to_string();
        container.set_factory(View::NAME, move |_| {
            Ok(View::new(crate::view::ViewOptions {
                script_root_path: root.clone(),
                ..Default::default()
            }))
        });

        let request = Request::create("GET", "/test/index")
            .unwrap()
            .with_attribute("controller", "test");
        let base = ControllerBase::new(container, request).unwrap();
        (dir, TestController::create(base).unwrap())
    }

    #[test]
    fn test_view_gets_request() {
        let (_dir, controller) = setup();
        assert_eq!(controller.base.view.request().unwrap().path, "/test/index");
    }

    #[test]
    fn test_auto_render_settings() {
        let (_dir, mut controller) = setup();
        assert!(controller.base.auto_render_view());

        controller.base.set_auto_render_view(false);
        controller.base.set_auto_render_view_script("someScript");
        assert!(!controller.base.auto_render_view());
        assert_eq!(controller.base.auto_render_view_script(), Some("someScript"));
    }

    #[test]
    fn test_dispatch_auto_renders_view() {
        let (_dir, mut controller) = setup();

        let response = controller.dispatch(Some("index"), Predefined::new()).unwrap();
        assert_eq!(response.content(), "yes");
        assert_eq!(
            response.header("Cache-Control"),
            Some("max-age=0, must-revalidate, no-cache, no-store")
        );
        assert_eq!(response.header("Content-Type"), Some("text/html; charset=UTF-8"));
    }

    #[test]
    fn test_dispatch_uses_request_action() {
        let (_dir, mut controller) = setup();
        controller.base.request.set_attribute("action", "string-return");

        let response = controller.dispatch(None, Predefined::new()).unwrap();
        assert_eq!(response.content(), "a string");
    }

    #[test]
    fn test_dispatch_starts_from_shared_response() {
        let (_dir, mut controller) = setup();
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        controller.base.container.set_factory(Response::NAME, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Response::ok().with_header("X-Frame-Options", "DENY"))
        });

        let first = controller.dispatch(Some("string-return"), Predefined::new()).unwrap();
        let second = controller.dispatch(Some("string-return"), Predefined::new()).unwrap();

        assert_eq!(first.header("X-Frame-Options"), Some("DENY"));
        assert_eq!(second.content(), "a string");
        assert!(controller.base.container.has_instance(Response::NAME));
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_pre_dispatch_response() {
        let (_dir, mut controller) = setup();

        let response = controller.dispatch(Some("pre-test"), Predefined::new()).unwrap();
        assert_eq!(response.content(), "preOk");
        assert_eq!(controller.pre_dispatched, ["pre-test"]);
    }

    #[test]
    fn test_dispatch_binds_parameters_by_name() {
        let (_dir, mut controller) = setup();
        controller.base.request.set_attribute("someParam", "ooh");

        let response = controller
            .dispatch(Some("some-other"), args([("otherParam", "aaa")]))
            .unwrap();
        assert_eq!(response.content(), "ooh aaa wow");
    }

    #[test]
    fn test_dispatch_camel_case_action() {
        let (_dir, mut controller) = setup();

        let response = controller
            .dispatch(
                Some("someOther"),
                args([("someParam", "a"), ("otherParam", "b")]),
            )
            .unwrap();
        assert_eq!(response.content(), "a b wow");
        assert_eq!(controller.pre_dispatched, ["some-other"]);
    }

    #[test]
    fn test_dispatch_missing_parameter() {
        let (_dir, mut controller) = setup();

        let err = controller.dispatch(Some("some-other"), Predefined::new()).unwrap_err();
        assert!(matches!(err, Error::Logic(_)));
        assert_eq!(err.to_string(), "Missing values for one or more action parameters");
    }

    #[test]
    fn test_dispatch_unknown_action() {
        let (_dir, mut controller) = setup();

        let err = controller.dispatch(Some("none"), Predefined::new()).unwrap_err();
        assert!(matches!(err, Error::ResourceNotFound(_)));
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_dispatch_without_auto_render() {
        let (_dir, mut controller) = setup();

        let response = controller.dispatch(Some("no-auto"), Predefined::new()).unwrap();
        assert_eq!(response.content(), "");
    }

    #[test]
    fn test_dispatch_returned_response() {
        let (_dir, mut controller) = setup();

        let response = controller.dispatch(Some("response"), Predefined::new()).unwrap();
        assert_eq!(response.status, 201);
        assert_eq!(response.content(), "created");
        assert_eq!(response.header("Cache-Control"), None);
    }

    #[test]
    fn test_forward_within_controller() {
        let (_dir, mut controller) = setup();

        let response = controller
            .dispatch(Some("forward-internal"), Predefined::new())
            .unwrap();
        assert_eq!(response.content(), "eeend");
    }

    #[test]
    fn test_forward_to_other_controller() {
        let (_dir, mut controller) = setup();

        let response = controller
            .forward("string-return", Some("test"), None, Predefined::new())
            .unwrap();
        assert_eq!(response.content(), "a string");
        assert_eq!(controller.base.request.attribute_str("action"), Some("string-return"));
    }

    #[test]
    fn test_auto_render_view_script_name() {
        assert_eq!(auto_render_view_script_name("index", "test", None), "test/index");
        assert_eq!(
            auto_render_view_script_name("show", "post", Some("admin")),
            "admin/post/show"
        );
        assert_eq!(auto_render_view_script_name("index", "test", Some("")), "test/index");
    }

    #[test]
    fn test_url() {
        let (_dir, controller) = setup();

        assert_eq!(controller.base.url(None, &[]), "http://localhost/test/index");
        assert_eq!(
            controller.base.url(Some("/other"), &[("page", "2")]),
            "http://localhost/other?page=2"
        );
    }

    #[test]
    fn test_registry() {
        let registry = ControllerRegistry::new();
        assert!(!registry.contains(TestController::CLASS));

        registry.register::<TestController>();
        let entry = registry.find(TestController::CLASS).unwrap();
        assert!(entry.has_action("someOtherAction"));
        assert!(!entry.has_action("init"));
    }
}
