// Response assertions

use crate::TestResponse;
use std::fmt::Debug;
use std::ops::Range;

const NO_CACHE: &str = "max-age=0, must-revalidate, no-cache, no-store";

fn assert_status_in(response: &TestResponse, range: Range<u16>, class: &str) {
    let status = response.status();
    assert!(
        range.contains(&status),
        "{} status expected, response was {}: {}",
        class,
        status,
        response.body_string()
    );
}

pub fn assert_status(response: &TestResponse, expected: u16) {
    assert_eq!(
        response.status(),
        expected,
        "Unexpected status, body: {}",
        response.body_string()
    );
}

/// 2xx
pub fn assert_success(response: &TestResponse) {
    assert_status_in(response, 200..300, "Successful");
}

/// 4xx
pub fn assert_client_error(response: &TestResponse) {
    assert_status_in(response, 400..500, "Client error");
}

/// 5xx
pub fn assert_server_error(response: &TestResponse) {
    assert_status_in(response, 500..600, "Server error");
}

/// The body, decoded as `T`, equals `expected`.
pub fn assert_json<T>(response: &TestResponse, expected: &T)
where
    T: serde::de::DeserializeOwned + PartialEq + Debug,
{
    match response.body_json::<T>() {
        Ok(actual) => assert_eq!(&actual, expected, "Response JSON differs"),
        Err(e) => panic!("Response body is not the expected JSON ({}): {}", e, response.body_string()),
    }
}

/// Header lookup is case-insensitive.
pub fn assert_header(response: &TestResponse, name: &str, expected: &str) {
    assert_eq!(response.header(name), Some(expected), "Header {} differs", name);
}

pub fn assert_body_eq(response: &TestResponse, expected: &str) {
    assert_eq!(response.body_string(), expected);
}

pub fn assert_body_contains(response: &TestResponse, needle: &str) {
    let body = response.body_string();
    assert!(body.contains(needle), "{:?} not found in body {:?}", needle, body);
}

/// The framework's default response headers were kept.
pub fn assert_not_cached(response: &TestResponse) {
    assert_header(response, "Cache-Control", NO_CACHE);
}

pub fn assert_redirect(response: &TestResponse, location: &str) {
    assert_status_in(response, 300..400, "Redirect");
    assert_header(response, "Location", location);
}

pub fn assert_json_content_type(response: &TestResponse) {
    assert_content_type(response, "application/json");
}

pub fn assert_html_content_type(response: &TestResponse) {
    assert_content_type(response, "text/html");
}

fn assert_content_type(response: &TestResponse, mime: &str) {
    let content_type = response.header("Content-Type").unwrap_or_default();
    assert!(
        content_type.starts_with(mime),
        "Content-Type {:?} is not {}",
        content_type,
        mime
    );
}
