//! Handlebars-backed view renderer.
//!
//! Scripts are looked up as `{scriptRootPath}/{script}.{fileExtension}` and
//! rendered with the view's variables. When rendering with a layout, the
//! script output is exposed to the layout as `layoutContent`:
//!
//! ```text
//! <html><body>{{{layoutContent}}}</body></html>
//! ```
//!
//! Every view registers the helpers `capture`/`captured`,
//! `mustache_tmpl`/`mustache_script`, `inline_script`, `url` and `escape`.

mod helpers;

pub use helpers::BUILTIN_HELPERS;

use crate::container::{Arguments, Injectable};
use crate::logging::trace;
use crate::{Error, Request, Result};
use handlebars::{Handlebars, HelperDef};
use helpers::{Capture, CaptureTarget, Captured, InlineScript, MustacheScript, SharedHelper, Url};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// The `view` configuration section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewOptions {
    pub script_root_path: String,
    pub file_extension: String,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            script_root_path: "app/views".to_string(),
            file_extension: "html.hbs".to_string(),
        }
    }
}

/// Content collected by the capturing helpers.
#[derive(Debug, Clone, Default)]
pub(crate) struct HelperState {
    captures: HashMap<String, String>,
    templates: HashMap<String, String>,
    inline_js: String,
}

impl HelperState {
    fn captured(&self, key: &str) -> Result<String> {
        self.captures.get(key).cloned().ok_or_else(|| {
            Error::Logic(format!(
                "View helper Capturer does not have any content for key \"{}\"",
                key
            ))
        })
    }

    fn mustache_script(&self, id: &str) -> Result<String> {
        let content = self.templates.get(id).ok_or_else(|| {
            Error::Logic(format!(
                "View helper MustacheTmplCapturer does not have any content for key \"{}\"",
                id
            ))
        })?;
        Ok(format!(
            "<script type=\"text/x-mustache\" id=\"{}\">\n{}</script>\n",
            id, content
        ))
    }
}

pub struct View {
    options: ViewOptions,
    variables: Map<String, JsonValue>,
    layout_script: String,
    layout_content: String,
    request: Option<Request>,
    helpers: BTreeMap<String, Arc<dyn HelperDef + Send + Sync>>,
    state: Arc<Mutex<HelperState>>,
}

impl View {
    pub const NAME: &'static str = "trellis_core::view::View";

    pub fn new(options: ViewOptions) -> Self {
        Self {
            options,
            variables: Map::new(),
            layout_script: String::new(),
            layout_content: String::new(),
            request: None,
            helpers: BTreeMap::new(),
            state: Arc::new(Mutex::new(HelperState::default())),
        }
    }

    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: ViewOptions) {
        self.options = options;
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<JsonValue>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.variables.get(name).filter(|value| !value.is_null())
    }

    /// Whether `name` is set to a non-null value.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<JsonValue> {
        self.variables.remove(name)
    }

    pub fn variables(&self) -> &Map<String, JsonValue> {
        &self.variables
    }

    /// The variable as escaped text; empty when unset.
    pub fn get_escaped(&self, name: &str) -> String {
        match self.get(name) {
            Some(JsonValue::String(s)) => escape(s),
            Some(value) => escape(&value.to_string()),
            None => String::new(),
        }
    }

    pub fn escape(&self, s: &str) -> String {
        escape(s)
    }

    pub fn set_layout(&mut self, script: impl Into<String>) {
        self.layout_script = script.into();
    }

    pub fn layout(&self) -> &str {
        &self.layout_script
    }

    pub fn layout_content(&self) -> &str {
        &self.layout_content
    }

    pub fn set_layout_content(&mut self, content: impl Into<String>) {
        self.layout_content = content.into();
    }

    pub fn set_request(&mut self, request: Request) {
        self.request = Some(request);
    }

    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    /// Render `script`; with `with_layout` and a layout set, the output
    /// becomes the layout's `layoutContent`.
    pub fn render(&mut self, script: &str, with_layout: bool) -> Result<String> {
        if with_layout && !self.layout_script.is_empty() {
            self.layout_content = self.render_script(script)?;
            let layout = self.layout_script.clone();
            self.render_script(&layout)
        } else {
            self.render_script(script)
        }
    }

    fn render_script(&mut self, script: &str) -> Result<String> {
        let path = format!(
            "{}/{}.{}",
            self.options.script_root_path, script, self.options.file_extension
        );
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::ViewScriptNotFound(path));
            }
            Err(e) => return Err(e.into()),
        };

        trace!(script = %path, "Rendering view script");

        let mut data = self.variables.clone();
        data.insert(
            "layoutContent".to_string(),
            JsonValue::String(self.layout_content.clone()),
        );

        let output = self
            .registry()
            .render_template(&source, &JsonValue::Object(data))?;
        self.flush_inline_js();
        Ok(output)
    }

    fn flush_inline_js(&mut self) {
        let captured = std::mem::take(&mut self.state.lock().inline_js);
        if captured.is_empty() {
            return;
        }
        let mut inline_js = self
            .get("inlineJs")
            .and_then(JsonValue::as_str)
            .unwrap_or_default()
            .to_string();
        inline_js.push_str(&captured);
        self.set("inlineJs", inline_js);
    }

    fn registry(&self) -> Handlebars<'static> {
        let mut registry = Handlebars::new();
        for name in BUILTIN_HELPERS.iter().copied().chain(self.helpers.keys().map(String::as_str)) {
            if let Some(helper) = self.helper(name) {
                registry.register_helper(name, Box::new(SharedHelper(helper)));
            }
        }
        registry
    }

    /// Register a custom helper, replacing any helper with the same name.
    pub fn add_helper<H>(&mut self, name: impl Into<String>, helper: H)
    where
        H: HelperDef + Send + Sync + 'static,
    {
        self.helpers.insert(name.into(), Arc::new(helper));
    }

    pub fn has_helper(&self, name: &str) -> bool {
        self.helpers.contains_key(name) || BUILTIN_HELPERS.contains(&name)
    }

    /// The helper registered as `name`.
    pub fn get_helper(&self, name: &str) -> Result<Arc<dyn HelperDef + Send + Sync>> {
        self.helper(name)
            .ok_or_else(|| Error::InvalidArgument(format!("No helper named \"{}\"", name)))
    }

    fn helper(&self, name: &str) -> Option<Arc<dyn HelperDef + Send + Sync>> {
        if let Some(helper) = self.helpers.get(name) {
            return Some(helper.clone());
        }

        let state = self.state.clone();
        let helper: Arc<dyn HelperDef + Send + Sync> = match name {
            "capture" => Arc::new(Capture {
                state,
                target: CaptureTarget::Content,
            }),
            "mustache_tmpl" => Arc::new(Capture {
                state,
                target: CaptureTarget::Mustache,
            }),
            "captured" => Arc::new(Captured { state }),
            "mustache_script" => Arc::new(MustacheScript { state }),
            "inline_script" => Arc::new(InlineScript { state }),
            "url" => Arc::new(Url {
                request: self.request.clone(),
            }),
            "escape" => Arc::new(helpers::escape_helper),
            _ => return None,
        };
        Some(helper)
    }

    /// Content captured under `key` by the `capture` helper.
    pub fn captured(&self, key: &str) -> Result<String> {
        self.state.lock().captured(key)
    }

    /// The mustache template captured as `id`, wrapped in a script tag.
    pub fn mustache_script(&self, id: &str) -> Result<String> {
        self.state.lock().mustache_script(id)
    }
}

impl Default for View {
    fn default() -> Self {
        Self::new(ViewOptions::default())
    }
}

/// Each clone captures independently.
impl Clone for View {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
            variables: self.variables.clone(),
            layout_script: self.layout_script.clone(),
            layout_content: self.layout_content.clone(),
            request: self.request.clone(),
            helpers: self.helpers.clone(),
            state: Arc::new(Mutex::new(self.state.lock().clone())),
        }
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("options", &self.options)
            .field("variables", &self.variables)
            .field("layout", &self.layout_script)
            .field("helpers", &self.helpers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Injectable for View {
    const NAME: &'static str = View::NAME;

    fn construct(_: Arguments) -> Result<Self> {
        Ok(View::default())
    }
}

crate::injectable!(View);

/// HTML-escape `&`, `<`, `>`, `"` and `'`.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}
