// Error types for the Trellis framework

use thiserror::Error;
use trellis_config::ConfigError;

#[derive(Error, Debug)]
pub enum Error {
    /// A key or class could not be resolved by the container
    #[error("Key \"{0}\" could not be resolved.")]
    NotFound(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    BadMethodCall(String),

    /// Reflection-level failure while auto-constructing a class
    #[error("{0}")]
    Unresolvable(String),

    #[error("Value for \"{key}\" is not {expected}")]
    TypeMismatch { key: String, expected: String },

    #[error("Cannot convert value: {0}")]
    Coercion(String),

    #[error("{0}")]
    ResourceNotFound(String),

    #[error("{0}")]
    Logic(String),

    #[error("Couldn't find view script \"{0}\"")]
    ViewScriptNotFound(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::ResourceNotFound(_) => 404,
            _ => 500,
        }
    }

    /// Short variant name, used in logs and error pages.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "NotFound",
            Error::InvalidArgument(_) => "InvalidArgument",
            Error::BadMethodCall(_) => "BadMethodCall",
            Error::Unresolvable(_) => "Unresolvable",
            Error::TypeMismatch { .. } => "TypeMismatch",
            Error::Coercion(_) => "Coercion",
            Error::ResourceNotFound(_) => "ResourceNotFound",
            Error::Logic(_) => "Logic",
            Error::ViewScriptNotFound(_) => "ViewScriptNotFound",
            Error::Template(_) => "Template",
            Error::Config(_) => "Config",
            Error::Io(_) => "Io",
        }
    }

    /// Whether callers may fall back to a default instead of failing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code())
    }
}

impl From<handlebars::RenderError> for Error {
    fn from(err: handlebars::RenderError) -> Self {
        Error::Template(err.to_string())
    }
}

impl From<handlebars::TemplateError> for Error {
    fn from(err: handlebars::TemplateError) -> Self {
        Error::Template(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
