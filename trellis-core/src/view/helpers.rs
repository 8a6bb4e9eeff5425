// Built-in view helpers

use super::{HelperState, escape};
use crate::Request;
use crate::http::add_query_parameters;
use handlebars::{
    Context, Handlebars, Helper, HelperDef, HelperResult, JsonRender, Output, RenderContext,
    RenderError, RenderErrorReason, Renderable,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// Names of the helpers every view provides.
pub const BUILTIN_HELPERS: [&str; 7] = [
    "capture",
    "captured",
    "mustache_tmpl",
    "mustache_script",
    "inline_script",
    "url",
    "escape",
];

/// In-memory output used to collect block contents.
#[derive(Default)]
pub(crate) struct Buffer(String);

impl Output for Buffer {
    fn write(&mut self, seg: &str) -> Result<(), std::io::Error> {
        self.0.push_str(seg);
        Ok(())
    }
}

/// A shared helper registered with a fresh registry for each render.
pub(crate) struct SharedHelper(pub Arc<dyn HelperDef + Send + Sync>);

impl HelperDef for SharedHelper {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        self.0.call(h, r, ctx, rc, out)
    }
}

fn string_param(h: &Helper<'_>, helper: &str) -> Result<String, RenderError> {
    h.param(0)
        .map(|p| p.value().render())
        .filter(|key| !key.is_empty())
        .ok_or_else(|| {
            RenderErrorReason::Other(format!("Helper \"{}\" requires a content key", helper)).into()
        })
}

fn render_block<'reg: 'rc, 'rc>(
    h: &Helper<'rc>,
    r: &'reg Handlebars<'reg>,
    ctx: &'rc Context,
    rc: &mut RenderContext<'reg, 'rc>,
) -> Result<String, RenderError> {
    let mut buffer = Buffer::default();
    if let Some(template) = h.template() {
        template.render(r, ctx, rc, &mut buffer)?;
    }
    Ok(buffer.0)
}

#[derive(Clone, Copy)]
pub(crate) enum CaptureTarget {
    Content,
    Mustache,
}

/// `{{#capture "key"}}…{{/capture}}` stores the block instead of printing it.
pub(crate) struct Capture {
    pub state: Arc<Mutex<HelperState>>,
    pub target: CaptureTarget,
}

impl HelperDef for Capture {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        _: &mut dyn Output,
    ) -> HelperResult {
        let key = string_param(h, h.name())?;
        let content = render_block(h, r, ctx, rc)?;

        let mut state = self.state.lock();
        match self.target {
            CaptureTarget::Content => state.captures.insert(key, content),
            CaptureTarget::Mustache => state.templates.insert(key, content),
        };
        Ok(())
    }
}

/// `{{captured "key"}}` prints content stored by `capture`.
pub(crate) struct Captured {
    pub state: Arc<Mutex<HelperState>>,
}

impl HelperDef for Captured {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let key = string_param(h, "captured")?;
        let content = self
            .state
            .lock()
            .captured(&key)
            .map_err(|e| RenderErrorReason::Other(e.to_string()))?;
        out.write(&content)?;
        Ok(())
    }
}

/// `{{mustache_script "id"}}` prints a captured mustache template wrapped
/// in a script tag.
pub(crate) struct MustacheScript {
    pub state: Arc<Mutex<HelperState>>,
}

impl HelperDef for MustacheScript {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let id = string_param(h, "mustache_script")?;
        let script = self
            .state
            .lock()
            .mustache_script(&id)
            .map_err(|e| RenderErrorReason::Other(e.to_string()))?;
        out.write(&script)?;
        Ok(())
    }
}

/// `{{#inline_script}}…{{/inline_script}}` appends the block to the
/// view's `inlineJs` variable.
pub(crate) struct InlineScript {
    pub state: Arc<Mutex<HelperState>>,
}

impl HelperDef for InlineScript {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        _: &mut dyn Output,
    ) -> HelperResult {
        let content = render_block(h, r, ctx, rc)?;
        self.state.lock().inline_js.push_str(&content);
        Ok(())
    }
}

/// `{{url}}`, `{{url "/path"}}`, `{{url page=2}}`: the given or current
/// URL with hash arguments merged into its query string.
pub(crate) struct Url {
    pub request: Option<Request>,
}

impl HelperDef for Url {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        _: &'reg Handlebars<'reg>,
        _: &'rc Context,
        _: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let request = self.request.as_ref().ok_or_else(|| {
            RenderErrorReason::Other("View request is required for this view helper".to_string())
        })?;

        let url = h
            .param(0)
            .map(|p| p.value().render())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| request.request_uri());
        let parameters: Vec<(String, String)> = h
            .hash()
            .iter()
            .map(|(name, value)| (name.to_string(), value.value().render()))
            .collect();

        out.write(&add_query_parameters(&url, &parameters, "&amp;"))?;
        Ok(())
    }
}

/// `{{escape value}}`
pub(crate) fn escape_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = h.param(0).map(|p| p.value().render()).unwrap_or_default();
    out.write(&escape(&value))?;
    Ok(())
}
