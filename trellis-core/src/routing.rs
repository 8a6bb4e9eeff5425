// Routing of requests to controller actions

use crate::container::coerce;
use crate::controller::{ControllerRegistry, Dispatch};
use crate::logging::{debug, trace};
use crate::{Container, Error, Request, Result, Value, inflector};
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A path pattern with default attributes and parameter requirements.
///
/// Paths use `{name}` placeholders. Requirements are regular expressions
/// a captured value must match in full.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub path: String,
    pub defaults: BTreeMap<String, Value>,
    pub requirements: BTreeMap<String, String>,
}

impl Route {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            defaults: BTreeMap::new(),
            requirements: BTreeMap::new(),
        }
    }

    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    pub fn with_requirement(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.requirements.insert(name.into(), pattern.into());
        self
    }
}

struct CompiledRoute {
    route: Route,
    matcher: matchit::Router<()>,
    requirements: Vec<(String, Regex)>,
}

impl CompiledRoute {
    fn compile(route: Route) -> Result<Self> {
        let mut matcher = matchit::Router::new();
        matcher.insert(route.path.clone(), ()).map_err(|e| {
            Error::InvalidArgument(format!("Invalid route path \"{}\": {}", route.path, e))
        })?;

        let requirements = route
            .requirements
            .iter()
            .map(|(name, pattern)| {
                Regex::new(&format!("^(?:{})$", pattern))
                    .map(|regex| (name.clone(), regex))
                    .map_err(|e| {
                        Error::InvalidArgument(format!(
                            "Invalid requirement for \"{}\" in route \"{}\": {}",
                            name, route.path, e
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            route,
            matcher,
            requirements,
        })
    }

    /// Captured parameters merged over the route defaults.
    fn matches(&self, path: &str) -> Option<BTreeMap<String, Value>> {
        let matched = self.matcher.at(path).ok()?;
        let params: Vec<(&str, &str)> = matched.params.iter().collect();

        for (name, regex) in &self.requirements {
            if let Some((_, value)) = params.iter().find(|(key, _)| *key == name.as_str()) {
                if !regex.is_match(value) {
                    return None;
                }
            }
        }

        let mut attributes = self.route.defaults.clone();
        for (name, value) in params {
            attributes.insert(name.to_string(), Value::from(value));
        }
        attributes.insert("_route".to_string(), Value::from(self.route.path.as_str()));
        Some(attributes)
    }
}

/// Route definition as read from configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    pub defaults: BTreeMap<String, serde_json::Value>,
    pub requirements: BTreeMap<String, String>,
}

/// The `router` configuration section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RouterOptions {
    pub default_module: Option<String>,
    pub default_controller: Option<String>,
    pub default_action: Option<String>,
    /// Keyed by path, added in key order before the built-in routes
    pub routes: BTreeMap<String, RouteOptions>,
}

/// Maps request paths to controllers and actions.
pub struct Router {
    default_module: String,
    default_controller: String,
    default_action: String,
    routes: Vec<CompiledRoute>,
    controllers: Arc<ControllerRegistry>,
}

impl Router {
    pub const NAME: &'static str = "trellis_core::routing::Router";

    const CONTROLLER_SUFFIX: &'static str = "Controller";
    const ACTION_SUFFIX: &'static str = "Action";

    /// A router with the built-in routes: `/`, `/{action}` and
    /// `/{controller}/{action}`.
    pub fn new(controllers: Arc<ControllerRegistry>) -> Result<Self> {
        Self::with_options(controllers, RouterOptions::default())
    }

    /// Configured routes are tried before the built-in ones.
    pub fn with_options(controllers: Arc<ControllerRegistry>, options: RouterOptions) -> Result<Self> {
        let mut router = Self {
            default_module: String::new(),
            default_controller: "index".to_string(),
            default_action: "index".to_string(),
            routes: Vec::new(),
            controllers,
        };
        router.set_options(options)?;

        router.add_route(Route::new("/"))?;
        router.add_route(Route::new("/{action}").with_requirement("action", "[a-z-]+"))?;
        router.add_route(
            Route::new("/{controller}/{action}")
                .with_requirement("controller", "[a-z-]+")
                .with_requirement("action", "[a-z-]+"),
        )?;

        Ok(router)
    }

    pub fn set_options(&mut self, options: RouterOptions) -> Result<()> {
        if let Some(module) = options.default_module {
            self.default_module = module;
        }
        if let Some(controller) = options.default_controller {
            self.default_controller = controller;
        }
        if let Some(action) = options.default_action {
            self.default_action = action;
        }

        for (path, config) in options.routes {
            let mut route = Route::new(path);
            route.defaults = config
                .defaults
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect();
            route.requirements = config.requirements;
            self.add_route(route)?;
        }

        Ok(())
    }

    pub fn default_module(&self) -> &str {
        &self.default_module
    }

    pub fn default_controller(&self) -> &str {
        &self.default_controller
    }

    pub fn default_action(&self) -> &str {
        &self.default_action
    }

    /// Add a route; a route with the same path is replaced.
    pub fn add_route(&mut self, route: Route) -> Result<()> {
        let compiled = CompiledRoute::compile(route)?;
        trace!(path = %compiled.route.path, "Route added");

        self.routes.retain(|r| r.route.path != compiled.route.path);
        self.routes.push(compiled);
        Ok(())
    }

    pub fn clear_routes(&mut self) {
        self.routes.clear();
    }

    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().map(|r| &r.route)
    }

    pub fn controllers(&self) -> &Arc<ControllerRegistry> {
        &self.controllers
    }

    /// Attributes of the first route matching `path`.
    pub fn match_path(&self, path: &str) -> Result<BTreeMap<String, Value>> {
        self.routes
            .iter()
            .find_map(|route| route.matches(path))
            .ok_or_else(|| Error::ResourceNotFound(format!("No routes found for \"{}\".", path)))
    }

    /// Match the request, record module, controller and action on it and
    /// instantiate the controller.
    pub fn route(&self, container: &Container, request: &mut Request) -> Result<Box<dyn Dispatch>> {
        let matched = self.match_path(&request.path)?;
        request.attributes.extend(matched);

        let module = attribute_string(request, "module").unwrap_or_else(|| self.default_module.clone());
        let controller =
            attribute_string(request, "controller").unwrap_or_else(|| self.default_controller.clone());
        let action = attribute_string(request, "action").unwrap_or_else(|| self.default_action.clone());

        let class = self.controller_class(&controller, Some(module.as_str()));
        let action_method = self.action_method(&action);

        request.set_attribute("module", module);
        request.set_attribute("controller", controller);
        request.set_attribute("action", action);

        let entry = self.controllers.find(&class).ok_or_else(|| {
            Error::ResourceNotFound(format!("Controller \"{}\" does not exist", class))
        })?;

        if !entry.has_action(&action_method) {
            return Err(Error::ResourceNotFound(format!(
                "Action method \"{}::{}\" does not exist",
                class, action_method
            )));
        }

        debug!(controller = %class, action = %action_method, "Request routed");
        entry.instantiate(container.clone(), request.clone())
    }

    /// `("user-profile", Some("admin"))` gives `admin::controller::UserProfileController`.
    pub fn controller_class(&self, controller: &str, module: Option<&str>) -> String {
        let name = inflector::separator_to_camel(controller, "-", true);
        match module.filter(|m| !m.is_empty()) {
            Some(module) => format!("{}::controller::{}{}", module, name, Self::CONTROLLER_SUFFIX),
            None => format!("controller::{}{}", name, Self::CONTROLLER_SUFFIX),
        }
    }

    /// `"some-action"` gives `someAction`.
    pub fn action_method(&self, action: &str) -> String {
        format!(
            "{}{}",
            inflector::separator_to_camel(action, "-", false),
            Self::ACTION_SUFFIX
        )
    }

    pub fn request_module(&self, request: &Request) -> Option<String> {
        attribute_string(request, "module").filter(|m| !m.is_empty())
    }

    pub fn request_controller(&self, request: &Request) -> String {
        attribute_string(request, "controller").unwrap_or_else(|| self.default_controller.clone())
    }

    pub fn request_action(&self, request: &Request) -> String {
        attribute_string(request, "action").unwrap_or_else(|| self.default_action.clone())
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("default_module", &self.default_module)
            .field("default_controller", &self.default_controller)
            .field("default_action", &self.default_action)
            .field("routes", &self.routes().map(|r| r.path.as_str()).collect::<Vec<_>>())
            .finish()
    }
}

fn attribute_string(request: &Request, name: &str) -> Option<String> {
    request
        .attribute(name)
        .filter(|value| !value.is_null())
        .and_then(|value| coerce::to_string(value).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        Router::new(Arc::new(ControllerRegistry::new())).unwrap()
    }

    #[test]
    fn test_default_routes() {
        let router = router();
        let paths: Vec<&str> = router.routes().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["/", "/{action}", "/{controller}/{action}"]);
    }

    #[test]
    fn test_options() {
        let options: RouterOptions = serde_json::from_value(serde_json::json!({
            "defaultModule": "admin",
            "defaultController": "home",
            "routes": {
                "/posts/{id}": {
                    "defaults": { "controller": "post", "action": "show" },
                    "requirements": { "id": "\\d+" }
                }
            }
        }))
        .unwrap();

        let router = Router::with_options(Arc::new(ControllerRegistry::new()), options).unwrap();
        assert_eq!(router.default_module(), "admin");
        assert_eq!(router.default_controller(), "home");
        assert_eq!(router.default_action(), "index");

        let paths: Vec<&str> = router.routes().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["/posts/{id}", "/", "/{action}", "/{controller}/{action}"]);
        assert_eq!(
            router.match_path("/posts/7").unwrap()["controller"],
            Value::from("post")
        );
    }

    #[test]
    fn test_match_with_requirements() {
        let router = router();

        let attributes = router.match_path("/some-action").unwrap();
        assert_eq!(attributes["action"], Value::from("some-action"));
        assert!(!attributes.contains_key("controller"));

        let attributes = router.match_path("/blog/list").unwrap();
        assert_eq!(attributes["controller"], Value::from("blog"));
        assert_eq!(attributes["action"], Value::from("list"));

        assert!(router.match_path("/Upper").is_err());
        assert!(matches!(
            router.match_path("/a/b/c"),
            Err(Error::ResourceNotFound(_))
        ));
    }

    #[test]
    fn test_defaults_are_overridden_by_captures() {
        let mut router = router();
        router
            .add_route(
                Route::new("/posts/{id}")
                    .with_default("controller", "post")
                    .with_default("id", "1")
                    .with_requirement("id", r"\d+"),
            )
            .unwrap();

        let attributes = router.match_path("/posts/42").unwrap();
        assert_eq!(attributes["controller"], Value::from("post"));
        assert_eq!(attributes["id"], Value::from("42"));

        // Failed requirements fall through to the next route
        let attributes = router.match_path("/posts/abc").unwrap();
        assert_eq!(attributes["_route"], Value::from("/{controller}/{action}"));
        assert_eq!(attributes["controller"], Value::from("posts"));
        assert!(router.match_path("/posts/4a").is_err());
    }

    #[test]
    fn test_re_adding_a_path_replaces_it() {
        let mut router = router();
        router
            .add_route(Route::new("/").with_default("action", "home"))
            .unwrap();

        let paths: Vec<&str> = router.routes().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["/{action}", "/{controller}/{action}", "/"]);
        assert_eq!(router.match_path("/").unwrap()["action"], Value::from("home"));
    }

    #[test]
    fn test_clear_routes() {
        let mut router = router();
        router.clear_routes();

        assert_eq!(router.routes().count(), 0);
        assert!(router.match_path("/").is_err());
    }

    #[test]
    fn test_invalid_requirement() {
        let mut router = router();
        let err = router
            .add_route(Route::new("/{id}").with_requirement("id", "("))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_controller_class() {
        let router = router();
        assert_eq!(
            router.controller_class("index", None),
            "controller::IndexController"
        );
        assert_eq!(
            router.controller_class("user-profile", Some("admin")),
            "admin::controller::UserProfileController"
        );
        assert_eq!(router.controller_class("index", Some("")), "controller::IndexController");
    }

    #[test]
    fn test_action_method() {
        let router = router();
        assert_eq!(router.action_method("index"), "indexAction");
        assert_eq!(router.action_method("some-other"), "someOtherAction");
    }

    #[test]
    fn test_request_accessors_fall_back_to_defaults() {
        let router = router();
        let request = Request::new("GET", "/").with_attribute("module", "");

        assert_eq!(router.request_module(&request), None);
        assert_eq!(router.request_controller(&request), "index");
        assert_eq!(router.request_action(&request), "index");

        let request = request.with_attribute("action", "show");
        assert_eq!(router.request_action(&request), "show");
    }

    #[test]
    fn test_route_unknown_controller() {
        let router = router();
        let mut request = Request::create("GET", "/missing/index").unwrap();

        let err = router.route(&Container::new(), &mut request).err().unwrap();
        assert_eq!(
            err.to_string(),
            "Controller \"controller::MissingController\" does not exist"
        );
        assert_eq!(request.attribute_str("controller"), Some("missing"));
        assert_eq!(request.attribute_str("module"), Some(""));
    }
}
