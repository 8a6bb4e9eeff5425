//! Handling of errors that escape request handling.
//!
//! An [`ErrorPipeline`] runs every registered [`ErrorHandler`] in order.
//! Each handler may produce a response; the first one produced is sent,
//! but later handlers still run so logging always happens.

use crate::logging::{error, warn};
use crate::view::escape;
use crate::{Error, Request, Response};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A step of the error pipeline.
pub trait ErrorHandler: Send + Sync {
    /// Handle `error`; return a response to have it sent.
    fn handle(&self, error: &Error, request: Option<&Request>) -> Option<Response>;

    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Writes request failures as single log lines.
///
/// CLI runs log `LEVEL: message`; web requests add the host and the
/// requested URI.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorLogger {
    cli: bool,
}

impl ErrorLogger {
    pub fn new(cli: bool) -> Self {
        Self { cli }
    }

    pub fn is_cli(&self) -> bool {
        self.cli
    }

    pub fn format(&self, level: &str, message: &str, request: Option<&Request>) -> String {
        match request {
            Some(request) if !self.cli => format!(
                "{}: {} {}{}",
                level,
                message,
                request.host,
                request.request_uri()
            ),
            _ => format!("{}: {}", level, message),
        }
    }

    pub fn log(&self, err: &Error, request: Option<&Request>) {
        let line = self.format("ERROR", &describe(err), request);
        error!(
            target: "errorLogger",
            kind = err.kind(),
            status = err.status_code(),
            "{}",
            line
        );
    }
}

/// Detailed HTML error page for development.
#[derive(Debug, Clone, Default)]
pub struct DebugErrorPage {
    editor: Option<String>,
}

impl DebugErrorPage {
    pub fn new(editor: Option<String>) -> Self {
        Self { editor }
    }

    pub fn editor(&self) -> Option<&str> {
        self.editor.as_deref()
    }

    /// Link opening `file` at `line` in the configured editor.
    ///
    /// Known editor names map to their URL scheme; any other value is used
    /// as a pattern with `%file` and `%line` placeholders.
    pub fn editor_href(&self, file: &str, line: u32) -> Option<String> {
        let pattern = match self.editor.as_deref()? {
            "sublime" => "subl://open?url=file://%file&line=%line",
            "textmate" => "txmt://open?url=file://%file&line=%line",
            "emacs" => "emacs://open?url=file://%file&line=%line",
            "macvim" => "mvim://open/?url=file://%file&line=%line",
            "phpstorm" | "idea" => "idea://open?file=%file&line=%line",
            "vscode" => "vscode://file/%file:%line",
            "atom" => "atom://core/open/file?filename=%file&line=%line",
            custom => custom,
        };
        Some(
            pattern
                .replace("%file", &urlencoding::encode(file))
                .replace("%line", &line.to_string()),
        )
    }

    pub fn render(&self, err: &Error, request: Option<&Request>) -> String {
        let mut page = format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<title>{kind}</title>\n</head>\n<body>\n<h1>{status} {kind}</h1>\n<p class=\"message\">{message}</p>\n",
            kind = err.kind(),
            status = err.status_code(),
            message = escape(&err.to_string()),
        );

        let causes = causes(err);
        if !causes.is_empty() {
            page.push_str("<h2>Caused by</h2>\n<ol>\n");
            for cause in causes {
                page.push_str(&format!("<li>{}</li>\n", escape(&cause)));
            }
            page.push_str("</ol>\n");
        }

        if let Some(request) = request {
            page.push_str(&format!(
                "<h2>Request</h2>\n<table>\n<tr><th>Method</th><td>{}</td></tr>\n<tr><th>URI</th><td>{}</td></tr>\n",
                escape(&request.method),
                escape(&request.request_uri())
            ));
            for (name, value) in &request.attributes {
                page.push_str(&format!(
                    "<tr><th>{}</th><td>{}</td></tr>\n",
                    escape(name),
                    escape(&format!("{:?}", value))
                ));
            }
            page.push_str("</table>\n");
        }

        page.push_str("</body>\n</html>\n");
        page
    }
}

impl ErrorHandler for DebugErrorPage {
    fn handle(&self, err: &Error, request: Option<&Request>) -> Option<Response> {
        Some(
            Response::new(err.status_code())
                .with_header("Content-Type", "text/html; charset=UTF-8")
                .with_content(self.render(err, request)),
        )
    }
}

/// Sends a static error page to web clients.
#[derive(Debug, Clone)]
pub struct UserErrorPage {
    path: PathBuf,
    cli: bool,
}

impl UserErrorPage {
    pub fn new(path: impl Into<PathBuf>, cli: bool) -> Self {
        Self {
            path: path.into(),
            cli,
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl ErrorHandler for UserErrorPage {
    fn handle(&self, err: &Error, _: Option<&Request>) -> Option<Response> {
        if self.cli {
            return None;
        }

        match std::fs::read_to_string(&self.path) {
            Ok(page) => Some(
                Response::new(err.status_code())
                    .with_header("Content-Type", "text/html; charset=UTF-8")
                    .with_content(page),
            ),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Error page could not be read");
                None
            }
        }
    }
}

/// Logs the error and, unless logging only, answers with a plain text
/// description.
#[derive(Debug, Clone)]
pub struct PlainTextErrorHandler {
    logger: Arc<ErrorLogger>,
    logger_only: bool,
}

impl PlainTextErrorHandler {
    pub fn new(logger: Arc<ErrorLogger>, logger_only: bool) -> Self {
        Self {
            logger,
            logger_only,
        }
    }

    pub fn is_logger_only(&self) -> bool {
        self.logger_only
    }

    pub fn render(err: &Error) -> String {
        let mut text = format!("{}: {}\n", err.kind(), err);
        for cause in causes(err) {
            text.push_str(&format!("Caused by: {}\n", cause));
        }
        text
    }
}

impl ErrorHandler for PlainTextErrorHandler {
    fn handle(&self, err: &Error, request: Option<&Request>) -> Option<Response> {
        self.logger.log(err, request);

        if self.logger_only {
            return None;
        }
        Some(
            Response::new(err.status_code())
                .with_header("Content-Type", "text/plain; charset=UTF-8")
                .with_content(Self::render(err)),
        )
    }
}

/// Ordered error handlers.
#[derive(Clone, Default)]
pub struct ErrorPipeline {
    handlers: Vec<Arc<dyn ErrorHandler>>,
}

impl ErrorPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_handler(&mut self, handler: Arc<dyn ErrorHandler>) -> &mut Self {
        self.handlers.push(handler);
        self
    }

    pub fn with_handler<H: ErrorHandler + 'static>(mut self, handler: H) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run every handler; the first response produced wins.
    pub fn handle(&self, err: &Error, request: Option<&Request>) -> Response {
        let mut response = None;
        for handler in &self.handlers {
            let handled = handler.handle(err, request);
            if response.is_none() {
                response = handled;
            }
        }

        response.unwrap_or_else(|| {
            Response::new(err.status_code()).with_content(match err.status_code() {
                404 => "Not Found",
                _ => "Internal Server Error",
            })
        })
    }
}

impl fmt::Debug for ErrorPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorPipeline")
            .field("handlers", &self.handler_names())
            .finish()
    }
}

fn causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }
    causes
}

fn describe(err: &Error) -> String {
    let mut text = err.to_string();
    for cause in causes(err) {
        text.push_str(": ");
        text.push_str(&cause);
    }
    text
}
