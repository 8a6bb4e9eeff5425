//! Testing utilities for Trellis applications.
//!
//! - **TestApp** - Application builder with config, controllers and
//!   overridden bindings
//! - **TestClient** - Sends requests through the application
//! - **MockService** - Call recorder for test doubles
//! - **Assertions** - Response status, header, body, JSON, redirect and
//!   cache header checks
//!
//! ## Quick Start
//!
//! ```
//! use serde_json::json;
//! use trellis_testing::*;
//!
//! let app = TestAppBuilder::new()
//!     .config(json!({ "router": { "defaultController": "home" } }))
//!     .build()
//!     .unwrap();
//!
//! let response = app.client().get("/");
//! assert_status(&response, 404);
//! assert_body_contains(&response, "Not Found");
//! ```
//!
//! ## Replacing Services
//!
//! ```
//! use trellis_testing::*;
//!
//! #[derive(Clone, Default)]
//! struct FakeMailer {
//!     calls: MockService<()>,
//! }
//!
//! let mailer = FakeMailer::default();
//! let app = TestAppBuilder::new()
//!     .with_instance("mailer", mailer.clone())
//!     .build()
//!     .unwrap();
//!
//! let resolved = app.get_as::<FakeMailer>("mailer").unwrap();
//! resolved.calls.record_call("send");
//! assert!(mailer.calls.was_called("send"));
//! ```

mod assertions;
mod mock;
mod test_app;
mod test_client;

pub use assertions::{
    assert_body_contains, assert_body_eq, assert_client_error, assert_header,
    assert_html_content_type, assert_json, assert_json_content_type, assert_not_cached,
    assert_redirect, assert_server_error, assert_status, assert_success,
};
pub use mock::{Call, MockService};
pub use test_app::{TestApp, TestAppBuilder};
pub use test_client::{TestClient, TestResponse};
