//! Trellis logging bootstrap
//!
//! Configures a `tracing` subscriber for applications built on Trellis.
//! Everything inside the framework logs through the `tracing` macros; this
//! crate only decides where those records go and how they look.
//!
//! # Environment Variables
//!
//! - `TRELLIS_DEBUG=1` - Enable debug logging
//! - `TRELLIS_LOG_LEVEL=trace|debug|info|warn|error` - Set log level
//! - `TRELLIS_LOG_FORMAT=json|plain|pretty|compact` - Set output format
//! - `TRELLIS_LOG_COLOR=1|0` - Enable/disable colors
//!
//! # Examples
//!
//! ```no_run
//! use trellis_log::*;
//!
//! let _guard = LogConfig::new()
//!     .level(LogLevel::Debug)
//!     .format(LogFormat::Pretty)
//!     .init();
//!
//! info!("Application started");
//! ```

use once_cell::sync::OnceCell;
use std::env;
use std::io;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use tracing::{debug, error, info, trace, warn};
pub use tracing_appender;

static INITIALIZED: OnceCell<()> = OnceCell::new();

/// Errors raised while installing the global subscriber.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("Failed to open log file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Logging has already been initialized")]
    AlreadyInitialized,

    #[error("Failed to install subscriber: {0}")]
    Subscriber(String),
}

/// Log level for filtering messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name, accepting `warning` as an alias of `warn`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Convert to tracing Level
    pub fn to_tracing_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    /// Convert to string for EnvFilter
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Output format for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured, machine-readable
    Json,
    /// Single line per record
    Plain,
    /// Multi-line, for development
    Pretty,
    /// Minimal output
    Compact,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "plain" | "text" => Some(LogFormat::Plain),
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Output destination for logs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Stdout,
    Stderr,
    File(String),
    RollingFile {
        directory: String,
        prefix: String,
        rotation: Rotation,
    },
}

/// File rotation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Minutely,
    Hourly,
    Daily,
    Never,
}

impl Rotation {
    fn to_tracing_rotation(self) -> tracing_appender::rolling::Rotation {
        match self {
            Rotation::Minutely => tracing_appender::rolling::Rotation::MINUTELY,
            Rotation::Hourly => tracing_appender::rolling::Rotation::HOURLY,
            Rotation::Daily => tracing_appender::rolling::Rotation::DAILY,
            Rotation::Never => tracing_appender::rolling::Rotation::NEVER,
        }
    }
}

/// Logging configuration.
///
/// Defaults to plain text on STDERR at INFO level, which is what a
/// request-in/response-out application usually wants next to its output.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub output: LogOutput,
    pub timestamps: bool,
    pub thread_ids: bool,
    pub targets: bool,
    pub file_line: bool,
    pub spans: bool,
    pub colors: bool,
    /// Custom filter directive (overrides `level` if set)
    pub env_filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Plain,
            output: LogOutput::Stderr,
            timestamps: true,
            thread_ids: false,
            targets: true,
            file_line: false,
            spans: false,
            colors: false,
            env_filter: None,
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from `TRELLIS_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| {
            lookup(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        };

        let debug = flag("TRELLIS_DEBUG").unwrap_or(false);
        let default_level = if debug { LogLevel::Debug } else { LogLevel::Info };

        let level = lookup("TRELLIS_LOG_LEVEL")
            .and_then(|s| LogLevel::parse(&s))
            .unwrap_or(default_level);

        let format = lookup("TRELLIS_LOG_FORMAT")
            .and_then(|s| LogFormat::parse(&s))
            .unwrap_or(LogFormat::Plain);

        let colors = flag("TRELLIS_LOG_COLOR")
            .unwrap_or_else(|| lookup("NO_COLOR").is_none() && lookup("TERM").is_some());

        Self {
            level,
            format,
            colors: colors && format != LogFormat::Json,
            ..Self::default()
        }
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn output(mut self, output: LogOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_timestamps(mut self, enable: bool) -> Self {
        self.timestamps = enable;
        self
    }

    pub fn with_thread_ids(mut self, enable: bool) -> Self {
        self.thread_ids = enable;
        self
    }

    pub fn with_targets(mut self, enable: bool) -> Self {
        self.targets = enable;
        self
    }

    pub fn with_file_line(mut self, enable: bool) -> Self {
        self.file_line = enable;
        self
    }

    pub fn with_spans(mut self, enable: bool) -> Self {
        self.spans = enable;
        self
    }

    pub fn with_colors(mut self, enable: bool) -> Self {
        self.colors = enable;
        self
    }

    /// Set a custom filter such as `"trellis_core=debug,handlebars=warn"`.
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Install the global subscriber, ignoring failures.
    ///
    /// Returns a guard that must be kept alive for the duration of the
    /// program; dropping it flushes buffered records.
    pub fn init(self) -> Option<WorkerGuard> {
        match self.try_init() {
            Ok(guard) => Some(guard),
            Err(LogError::AlreadyInitialized) => None,
            Err(e) => {
                eprintln!("trellis-log: {e}");
                None
            }
        }
    }

    /// Install the global subscriber.
    pub fn try_init(self) -> Result<WorkerGuard, LogError> {
        if INITIALIZED.get().is_some() {
            return Err(LogError::AlreadyInitialized);
        }

        let env_filter = self.build_filter();

        let guard = match &self.output {
            LogOutput::Stdout => {
                let (writer, guard) = tracing_appender::non_blocking(io::stdout());
                self.install(writer, env_filter)?;
                guard
            }
            LogOutput::Stderr => {
                let (writer, guard) = tracing_appender::non_blocking(io::stderr());
                self.install(writer, env_filter)?;
                guard
            }
            LogOutput::File(path) => {
                let file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|source| LogError::File {
                        path: path.clone(),
                        source,
                    })?;
                let (writer, guard) = tracing_appender::non_blocking(file);
                self.install(writer, env_filter)?;
                guard
            }
            LogOutput::RollingFile {
                directory,
                prefix,
                rotation,
            } => {
                let appender = tracing_appender::rolling::RollingFileAppender::new(
                    rotation.to_tracing_rotation(),
                    directory,
                    prefix,
                );
                let (writer, guard) = tracing_appender::non_blocking(appender);
                self.install(writer, env_filter)?;
                guard
            }
        };

        let _ = INITIALIZED.set(());
        Ok(guard)
    }

    fn build_filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(directive) => {
                EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
            }
            None => EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(self.level.as_str())),
        }
    }

    fn install<W>(&self, writer: W, env_filter: EnvFilter) -> Result<(), LogError>
    where
        W: for<'a> fmt::MakeWriter<'a> + Send + Sync + 'static,
    {
        let fmt_span = if self.spans {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let registry = tracing_subscriber::registry().with(env_filter);

        let result = match self.format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(writer)
                        .with_current_span(self.spans)
                        .with_span_list(self.spans)
                        .with_target(self.targets)
                        .with_thread_ids(self.thread_ids)
                        .with_file(self.file_line)
                        .with_line_number(self.file_line)
                        .with_span_events(fmt_span),
                )
                .try_init(),
            LogFormat::Plain => registry
                .with(
                    fmt::layer()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_thread_ids(self.thread_ids)
                        .with_file(self.file_line)
                        .with_line_number(self.file_line)
                        .with_ansi(self.colors)
                        .with_span_events(fmt_span),
                )
                .try_init(),
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_thread_ids(self.thread_ids)
                        .with_file(self.file_line)
                        .with_line_number(self.file_line)
                        .with_ansi(self.colors)
                        .with_span_events(fmt_span),
                )
                .try_init(),
            LogFormat::Compact => registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_writer(writer)
                        .with_target(self.targets)
                        .with_thread_ids(self.thread_ids)
                        .with_file(false)
                        .with_line_number(false)
                        .with_ansi(self.colors)
                        .with_span_events(fmt_span),
                )
                .try_init(),
        };

        result.map_err(|e| LogError::Subscriber(e.to_string()))
    }
}

/// Initialize logging from the environment.
pub fn init() -> Option<WorkerGuard> {
    LogConfig::from_env().init()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Trace.to_tracing_level(), Level::TRACE);
        assert_eq!(LogLevel::Error.to_tracing_level(), Level::ERROR);
        assert_eq!(LogLevel::Warn.as_str(), "warn");
        assert!(LogLevel::Trace < LogLevel::Error);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("text"), Some(LogFormat::Plain));
        assert_eq!(LogFormat::parse("Compact"), Some(LogFormat::Compact));
        assert_eq!(LogFormat::parse("xml"), None);
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Plain);
        assert_eq!(config.output, LogOutput::Stderr);
        assert!(config.targets);
        assert!(config.env_filter.is_none());
    }

    #[test]
    fn test_config_from_env_debug_flag() {
        let config = LogConfig::from_lookup(lookup(&[("TRELLIS_DEBUG", "1")]));
        assert_eq!(config.level, LogLevel::Debug);

        let config = LogConfig::from_lookup(lookup(&[
            ("TRELLIS_DEBUG", "true"),
            ("TRELLIS_LOG_LEVEL", "error"),
        ]));
        assert_eq!(config.level, LogLevel::Error);
    }

    #[test]
    fn test_config_from_env_json_disables_colors() {
        let config = LogConfig::from_lookup(lookup(&[
            ("TRELLIS_LOG_FORMAT", "json"),
            ("TRELLIS_LOG_COLOR", "1"),
        ]));
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.colors);
    }

    #[test]
    fn test_config_builder() {
        let config = LogConfig::new()
            .level(LogLevel::Trace)
            .format(LogFormat::Pretty)
            .with_colors(true)
            .with_targets(false)
            .with_env_filter("trellis_core=trace");

        assert_eq!(config.level, LogLevel::Trace);
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(config.colors);
        assert!(!config.targets);
        assert_eq!(config.env_filter.as_deref(), Some("trellis_core=trace"));
    }

    #[test]
    fn test_unwritable_log_file_is_reported() {
        let config = LogConfig::new().output(LogOutput::File(
            "/nonexistent-dir/trellis/app.log".to_string(),
        ));
        match config.try_init() {
            Err(LogError::File { path, .. }) => assert!(path.ends_with("app.log")),
            Err(LogError::AlreadyInitialized) => {}
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
