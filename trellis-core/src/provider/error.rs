// Error logging and error page bindings

use super::{ServiceProvider, app_config};
use crate::application::App;
use crate::error_handling::{
    DebugErrorPage, ErrorHandler, ErrorLogger, ErrorPipeline, PlainTextErrorHandler, UserErrorPage,
};
use crate::{Error, Result};
use std::sync::Arc;

pub const ERROR_LOGGER: &str = "errorLogger";
pub const DEBUG_ERROR_PAGE_HANDLER: &str = "debugErrorPageHandler";
pub const USER_ERROR_PAGE_HANDLER: &str = "userErrorPageHandler";
pub const ERROR_HANDLER: &str = "errorHandler";
pub const ERROR_PIPELINE: &str = "errorPipeline";

/// Registers the error logger, the error page handlers and the pipeline
/// combining them.
///
/// The pipeline holds the debug page when `displayErrors` is set, otherwise
/// the user page when `errorPagePath` is set, and always the logging
/// handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorServiceProvider;

impl ServiceProvider for ErrorServiceProvider {
    fn register(&self, app: &App) -> Result<()> {
        let container = app.container();
        let cli = app.is_cli();

        container.set_factory(ERROR_LOGGER, move |_| Ok(ErrorLogger::new(cli)));

        container.set_factory(DEBUG_ERROR_PAGE_HANDLER, |c| {
            let config = app_config(c)?;
            Ok(DebugErrorPage::new(
                config.get_str("editor").map(str::to_string),
            ))
        });

        container.set_factory(USER_ERROR_PAGE_HANDLER, move |c| {
            let config = app_config(c)?;
            let path = config
                .get_required("errorPagePath")?
                .as_str()
                .ok_or_else(|| {
                    Error::InvalidArgument("Config key \"errorPagePath\" must be a string".to_string())
                })?;
            Ok(UserErrorPage::new(path, cli))
        });

        container.set_factory(ERROR_HANDLER, move |c| {
            let logger = c.get_as::<ErrorLogger>(ERROR_LOGGER)?;
            Ok(PlainTextErrorHandler::new(logger, !cli))
        });

        container.set_factory(ERROR_PIPELINE, |c| {
            let config = app_config(c)?;
            let mut pipeline = ErrorPipeline::new();

            if config.has("displayErrors") {
                let handler: Arc<dyn ErrorHandler> =
                    c.get_as::<DebugErrorPage>(DEBUG_ERROR_PAGE_HANDLER)?;
                pipeline.push_handler(handler);
            } else if config.has("errorPagePath") {
                let handler: Arc<dyn ErrorHandler> =
                    c.get_as::<UserErrorPage>(USER_ERROR_PAGE_HANDLER)?;
                pipeline.push_handler(handler);
            }

            let handler: Arc<dyn ErrorHandler> = c.get_as::<PlainTextErrorHandler>(ERROR_HANDLER)?;
            pipeline.push_handler(handler);
            Ok(pipeline)
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trellis_config::Config;

    fn app(config: serde_json::Value, cli: bool) -> App {
        App::builder()
            .config(Config::from_value(config).unwrap())
            .cli(cli)
            .build()
            .unwrap()
    }

    #[test]
    fn test_logger_follows_cli_flag() {
        assert!(app(json!({}), true).get_as::<ErrorLogger>(ERROR_LOGGER).unwrap().is_cli());
        assert!(!app(json!({}), false).get_as::<ErrorLogger>(ERROR_LOGGER).unwrap().is_cli());
    }

    #[test]
    fn test_debug_page_editor() {
        let app = app(json!({ "editor": "vscode" }), false);

        let page = app.get_as::<DebugErrorPage>(DEBUG_ERROR_PAGE_HANDLER).unwrap();
        assert_eq!(page.editor(), Some("vscode"));
    }

    #[test]
    fn test_user_page_requires_path() {
        let err = app(json!({}), false)
            .get(USER_ERROR_PAGE_HANDLER)
            .unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: Config key \"errorPagePath\" not found");

        let app = app(json!({ "errorPagePath": "/tmp/500.html" }), false);
        let page = app.get_as::<UserErrorPage>(USER_ERROR_PAGE_HANDLER).unwrap();
        assert_eq!(page.path(), std::path::Path::new("/tmp/500.html"));
    }

    #[test]
    fn test_error_handler_is_logger_only_for_web() {
        let web = app(json!({}), false);
        assert!(web.get_as::<PlainTextErrorHandler>(ERROR_HANDLER).unwrap().is_logger_only());

        let cli = app(json!({}), true);
        assert!(!cli.get_as::<PlainTextErrorHandler>(ERROR_HANDLER).unwrap().is_logger_only());
    }

    #[test]
    fn test_pipeline_composition() {
        let plain = app(json!({}), false);
        assert_eq!(plain.get_as::<ErrorPipeline>(ERROR_PIPELINE).unwrap().len(), 1);

        let user = app(json!({ "errorPagePath": "/tmp/500.html" }), false);
        let pipeline = user.get_as::<ErrorPipeline>(ERROR_PIPELINE).unwrap();
        assert_eq!(pipeline.len(), 2);
        assert!(pipeline.handler_names()[0].ends_with("UserErrorPage"));

        let debug = app(
            json!({ "displayErrors": true, "errorPagePath": "/tmp/500.html" }),
            false,
        );
        let pipeline = debug.get_as::<ErrorPipeline>(ERROR_PIPELINE).unwrap();
        assert_eq!(pipeline.len(), 2);
        assert!(pipeline.handler_names()[0].ends_with("DebugErrorPage"));
    }
}
