//! Courier
//!
//! One blocking HTTP interface over interchangeable client backends.
//!
//! A [`Request`] describes what to send: URL, headers, body, timeouts, proxy
//! and authentication. A [`Dispatcher`] picks a backend from its
//! [`Registry`], builds a fresh [`Adapter`] for it and sends the request,
//! returning a normalized [`Response`]. Backends declare their
//! [`Capabilities`](adapter::Capabilities); a request which asks for
//! something the selected backend cannot do fails with
//! [`Error::NotSupported`] before anything is sent.
//!
//! ```no_run
//! # fn main() -> courier::Result<()> {
//! let response = courier::post(("http://example.com/api", "<x/>"))?;
//! println!("{} {}", response.code(), response.text());
//!
//! let mut request = courier::Request::new("http://example.com/private")?;
//! request.auth_mut().basic("user", "secret");
//! let response = courier::with_adapter("hyper").get(request)?;
//! # Ok(())
//! # }
//! ```
//!
//! The functions at the crate root use a process-wide dispatcher with the
//! standard backends. Construct a [`Dispatcher`] to use a custom registry.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

use std::sync::OnceLock;

pub mod adapter;
pub mod auth;
pub mod credentials;
pub mod dispatch;
mod error;
pub mod headers;
pub mod registry;
pub mod request;
pub mod response;

pub use adapter::Adapter;
pub use auth::{Auth, AuthType, CertSource, CertType, SslConfig, SslVersion, VerifyMode};
pub use dispatch::{Call, Dispatcher};
pub use error::{Error, Feature, Result};
pub use http::Method;
pub use registry::{backend_fn, Backend, Registry};
pub use request::{IntoRequest, Request, Url};
pub use response::Response;

/// Boxed error from a backend.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn global() -> &'static Dispatcher {
    static DISPATCHER: OnceLock<Dispatcher> = OnceLock::new();
    DISPATCHER.get_or_init(Dispatcher::standard)
}

/// The registry behind the crate-level functions.
pub fn registry() -> &'static Registry {
    global().registry()
}

/// Name of the default backend used by the crate-level functions.
pub fn default_adapter() -> String {
    registry().default_name()
}

/// Change the default backend used by the crate-level functions.
///
/// Fails without changing the default if the backend is unknown or
/// unavailable.
pub fn set_default_adapter(name: &str) -> Result<()> {
    registry().set_default(name)
}

/// Start a request which uses the named backend.
pub fn with_adapter(name: impl Into<String>) -> Call<'static> {
    global().call().adapter(name)
}

/// Send a GET request with the default backend.
pub fn get(request: impl IntoRequest) -> Result<Response> {
    global().get(request)
}

/// Send a HEAD request with the default backend.
pub fn head(request: impl IntoRequest) -> Result<Response> {
    global().head(request)
}

/// Send a DELETE request with the default backend.
pub fn delete(request: impl IntoRequest) -> Result<Response> {
    global().delete(request)
}

/// Send a POST request with the default backend.
pub fn post(request: impl IntoRequest) -> Result<Response> {
    global().post(request)
}

/// Send a PUT request with the default backend.
pub fn put(request: impl IntoRequest) -> Result<Response> {
    global().put(request)
}

/// Send a request with an arbitrary method with the default backend.
pub fn request(method: Method, request: impl IntoRequest) -> Result<Response> {
    global().request(method, request)
}
