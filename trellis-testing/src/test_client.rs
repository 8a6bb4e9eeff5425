// Test HTTP Client

use serde::Serialize;
use serde::de::DeserializeOwned;
use trellis_core::{App, Request, Response, Result};

/// Sends requests through an application's `handle`.
pub struct TestClient<'a> {
    app: &'a App,
    headers: Vec<(String, String)>,
}

impl<'a> TestClient<'a> {
    pub fn new(app: &'a App) -> Self {
        Self {
            app,
            headers: Vec::new(),
        }
    }

    /// Header sent with every request of this client
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Make a GET request
    pub fn get(&self, uri: &str) -> TestResponse {
        self.send("GET", uri, |request| Ok(request))
    }

    /// Make a HEAD request
    pub fn head(&self, uri: &str) -> TestResponse {
        self.send("HEAD", uri, |request| Ok(request))
    }

    /// Make a POST request with url-encoded form fields
    pub fn post(&self, uri: &str, form: &[(&str, &str)]) -> TestResponse {
        self.send("POST", uri, |request| request.with_form(form))
    }

    /// Make a POST request with a JSON body
    pub fn post_json<T: Serialize>(&self, uri: &str, body: &T) -> TestResponse {
        self.send("POST", uri, |request| {
            let body = serde_json::to_vec(body)
                .map_err(|e| trellis_core::Error::InvalidArgument(e.to_string()))?;
            Ok(request
                .with_header("Content-Type", "application/json")
                .with_body(body))
        })
    }

    /// Send a prepared request
    pub fn request(&self, request: Request) -> TestResponse {
        let request = self
            .headers
            .iter()
            .fold(request, |request, (name, value)| {
                request.with_header(name, value.as_str())
            });
        TestResponse::new(self.app.handle(request))
    }

    fn send<F>(&self, method: &str, uri: &str, build: F) -> TestResponse
    where
        F: FnOnce(Request) -> Result<Request>,
    {
        match Request::create(method, uri).and_then(build) {
            Ok(request) => self.request(request),
            Err(e) => panic!("Invalid test request {} {}: {}", method, uri, e),
        }
    }
}

/// Response from a test request
#[derive(Debug, Clone)]
pub struct TestResponse {
    response: Response,
}

impl TestResponse {
    pub fn new(response: Response) -> Self {
        Self { response }
    }

    pub fn status(&self) -> u16 {
        self.response.status
    }

    pub fn body(&self) -> &[u8] {
        &self.response.body
    }

    /// Get the response body as string
    pub fn body_string(&self) -> String {
        self.response.content()
    }

    /// Get the response body as JSON
    pub fn body_json<T: DeserializeOwned>(&self) -> std::result::Result<T, String> {
        serde_json::from_slice(&self.response.body)
            .map_err(|e| format!("Serialization error: {}", e))
    }

    /// Get a header value, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.response.header(name)
    }

    pub fn into_inner(self) -> Response {
        self.response
    }
}

impl From<Response> for TestResponse {
    fn from(response: Response) -> Self {
        Self::new(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestAppBuilder;

    #[test]
    fn test_unrouted_request() {
        let app = TestAppBuilder::new().build().unwrap();

        let response = app.client().get("/a/b/c/d");
        assert_eq!(response.status(), 404);
        assert_eq!(response.body_string(), "Not Found");
    }

    #[test]
    fn test_default_headers_reach_the_request() {
        let app = TestAppBuilder::new().build().unwrap();

        app.client().with_header("X-Test", "1").get("/nothing/here");
        assert_eq!(app.request().unwrap().header("x-test"), Some("1"));
    }

    #[test]
    fn test_body_json() {
        let response = TestResponse::new(Response::ok().with_content("{\"ok\":true}"));

        let body: serde_json::Value = response.body_json().unwrap();
        assert_eq!(body["ok"], true);
        assert!(response.body_json::<Vec<u8>>().is_err());
    }
}
