// HTTP request and response types

use crate::{Error, Result, Value};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// HTTP request wrapper
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub method: String,
    pub path: String,
    pub query_string: String,
    pub query: Vec<(String, String)>,
    pub post: Vec<(String, String)>,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub scheme: String,
    pub host: String,
    /// Values attached while handling the request, e.g. route parameters
    pub attributes: BTreeMap<String, Value>,
}

impl Request {
    /// Container key the current request is bound under.
    pub const NAME: &'static str = "trellis_core::http::Request";

    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_uppercase(),
            path: path.into(),
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            ..Self::default()
        }
    }

    /// Build a request from a method and an absolute or relative URI.
    pub fn create(method: &str, uri: &str) -> Result<Self> {
        let mut request = Self::new(method, "/");

        let mut rest = uri;
        for scheme in ["http", "https"] {
            if let Some(after) = uri.strip_prefix(scheme).and_then(|s| s.strip_prefix("://")) {
                request.scheme = scheme.to_string();
                let (host, path) = match after.find(['/', '?']) {
                    Some(i) => after.split_at(i),
                    None => (after, ""),
                };
                request.host = host.to_string();
                rest = path;
            }
        }

        let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
        request.path = if path.is_empty() {
            "/".to_string()
        } else {
            path.to_string()
        };
        request.query_string = query.to_string();
        request.query = serde_urlencoded::from_str(query)
            .map_err(|e| Error::InvalidArgument(format!("Invalid query string: {}", e)))?;

        Ok(request)
    }

    /// Set form fields and an url-encoded body.
    pub fn with_form(mut self, fields: &[(&str, &str)]) -> Result<Self> {
        let encoded = serde_urlencoded::to_string(fields)
            .map_err(|e| Error::InvalidArgument(format!("Invalid form data: {}", e)))?;
        self.post = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.body = encoded.into_bytes();
        self.headers.insert(
            "content-type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        Ok(self)
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Parse the request body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        serde_json::from_slice(&self.body)
            .map_err(|e| Error::InvalidArgument(format!("Invalid JSON body: {}", e)))
    }

    /// Get a query parameter by name
    pub fn query(&self, name: &str) -> Option<&str> {
        lookup(&self.query, name)
    }

    /// Get a form field by name
    pub fn post(&self, name: &str) -> Option<&str> {
        lookup(&self.post, name)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// String form of an attribute; `None` for missing or non-string values.
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(name.into(), value.into());
    }

    pub fn is_method(&self, method: &str) -> bool {
        self.method.eq_ignore_ascii_case(method)
    }

    /// Path plus query string, as requested.
    pub fn request_uri(&self) -> String {
        if self.query_string.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string)
        }
    }

    pub fn scheme_and_http_host(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

/// Add query parameters to `url`, replacing existing ones with the same name.
pub fn add_query_parameters(url: &str, parameters: &[(String, String)], separator: &str) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    let (path, query) = base.split_once('?').unwrap_or((base, ""));

    let mut merged: Vec<(String, String)> = serde_urlencoded::from_str(query).unwrap_or_default();
    for (name, value) in parameters {
        match merged.iter_mut().find(|(k, _)| k == name) {
            Some(existing) => existing.1 = value.clone(),
            None => merged.push((name.clone(), value.clone())),
        }
    }

    let mut out = path.to_string();
    if !merged.is_empty() {
        let encoded: Vec<String> = merged
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        out.push('?');
        out.push_str(&encoded.join(separator));
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

fn lookup<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs
        .iter()
        .rev()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// HTTP response wrapper
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Response {
    /// Container key of the default response prototype.
    pub const NAME: &'static str = "trellis_core::http::Response";

    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn not_found() -> Self {
        Self::new(404)
    }

    pub fn internal_server_error() -> Self {
        Self::new(500)
    }

    /// The framework's default response: not cacheable by clients or proxies.
    pub fn no_cache() -> Self {
        Self::ok().with_header("Cache-Control", "max-age=0, must-revalidate, no-cache, no-store")
    }

    pub fn redirect(url: &str, status: u16) -> Self {
        Self::new(status).with_header("Location", url)
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.set_content(content);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self> {
        self.body = serde_json::to_vec(value)
            .map_err(|e| Error::InvalidArgument(format!("Cannot serialize response: {}", e)))?;
        self.set_header("Content-Type", "application/json");
        Ok(self)
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Replace any header with the same case-insensitive name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
        self.headers.insert(name.to_string(), value.into());
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.body = content.into().into_bytes();
    }

    pub fn content(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Fix the response up against the request it answers.
    pub fn prepare(mut self, request: &Request) -> Self {
        if self.header("Content-Type").is_none() && !self.is_informational_or_empty() {
            self.set_header("Content-Type", "text/html; charset=UTF-8");
        }
        if request.is_method("HEAD") || self.is_informational_or_empty() {
            self.body.clear();
        }
        self
    }

    fn is_informational_or_empty(&self) -> bool {
        self.status < 200 || self.status == 204 || self.status == 304
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::ok()
    }
}
