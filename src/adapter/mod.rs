//! Adapters bind the canonical request and response to one backend.
//!
//! Every adapter declares its [`Capabilities`] up front. Before a request is
//! translated, [`Capabilities::check`] compares what the request asks for
//! against that declaration and fails with [`Error::NotSupported`] instead
//! of quietly dropping a setting the backend cannot honor.
//!
//! Backends:
//!
//! * [`hyper`][self::hyper] drives `hyper`'s HTTP/1 client on a private tokio runtime.
//! * [`reqwest`][self::reqwest] uses the blocking `reqwest` client.
//! * [`curl`] wraps a libcurl easy handle (requires the `curl` feature for the
//!   real transport).

use std::any::Any;
use std::fmt;

use http::Method;

use crate::auth::{AuthType, CertType, VerifyMode};
use crate::error::{Error, Feature, Result};
use crate::request::Request;
use crate::response::Response;

pub mod curl;
#[cfg(feature = "hyper")]
pub mod hyper;
#[cfg(any(test, feature = "mocks"))]
pub mod mock;
#[cfg(feature = "reqwest")]
pub mod reqwest;

/// Methods with a dedicated verb on every backend.
const STANDARD_METHODS: [Method; 5] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::HEAD,
];

/// Whether a request made with `method` sends its body.
pub(crate) fn sends_body(method: &Method, request: &Request) -> bool {
    if *method == Method::POST || *method == Method::PUT {
        true
    } else if STANDARD_METHODS.contains(method) {
        false
    } else {
        request.body().is_some()
    }
}

/// Static declaration of what a backend can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Methods other than GET, POST, PUT, DELETE and HEAD.
    pub custom_methods: bool,

    /// Supported authentication schemes, besides [`AuthType::None`].
    pub auth: &'static [AuthType],

    /// Supported certificate verification modes.
    pub verify_modes: &'static [VerifyMode],

    /// Sending requests through a proxy.
    pub proxy: bool,

    /// Custom CA bundles.
    pub ca_file: bool,

    /// Presenting client certificates.
    pub client_certificates: bool,

    /// DER encoded certificate material.
    pub der: bool,
}

impl Capabilities {
    /// Fail with [`Error::NotSupported`] if `backend` cannot send `request`
    /// with `method` exactly as specified.
    pub fn check(&self, backend: &str, method: &Method, request: &Request) -> Result<()> {
        if !self.custom_methods && !STANDARD_METHODS.contains(method) {
            return Err(Error::not_supported(backend, Feature::Method(method.clone())));
        }

        let auth = request.auth();
        if auth.kind() != AuthType::None && !self.auth.contains(&auth.kind()) {
            return Err(Error::not_supported(backend, Feature::Auth(auth.kind())));
        }

        if request.proxy().is_some() && !self.proxy {
            return Err(Error::not_supported(backend, Feature::Proxy));
        }

        if let Some(ssl) = auth.ssl() {
            if !self.verify_modes.contains(&ssl.verify_mode) {
                return Err(Error::not_supported(
                    backend,
                    Feature::VerifyMode(ssl.verify_mode),
                ));
            }

            // Certificate material is only consulted when verifying.
            if ssl.verifies_peer() {
                if ssl.ca_cert_file.is_some() && !self.ca_file {
                    return Err(Error::not_supported(backend, Feature::CaFile));
                }

                if ssl.has_client_certificate() && !self.client_certificates {
                    return Err(Error::not_supported(backend, Feature::ClientCertificate));
                }

                let has_material = ssl.ca_cert_file.is_some() || ssl.has_client_certificate();
                if has_material && ssl.cert_type == CertType::Der && !self.der {
                    return Err(Error::not_supported(
                        backend,
                        Feature::CertType(CertType::Der),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// The backend-native client behind an adapter.
///
/// This is an escape hatch for transport options the canonical request does
/// not model. Changes made through it are not validated.
#[non_exhaustive]
pub enum NativeClient<'a> {
    /// The hyper adapter's client configuration.
    #[cfg(feature = "hyper")]
    Hyper(&'a mut self::hyper::HyperClient),

    /// The reqwest adapter's client configuration.
    #[cfg(feature = "reqwest")]
    Reqwest(&'a mut self::reqwest::ReqwestClient),

    /// The curl adapter's easy handle.
    Curl(&'a mut dyn self::curl::EasyHandle),

    /// Any other adapter's client.
    Other(&'a mut dyn Any),
}

impl fmt::Debug for NativeClient<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "hyper")]
            NativeClient::Hyper(client) => f.debug_tuple("Hyper").field(client).finish(),
            #[cfg(feature = "reqwest")]
            NativeClient::Reqwest(client) => f.debug_tuple("Reqwest").field(client).finish(),
            NativeClient::Curl(_) => f.write_str("Curl"),
            NativeClient::Other(_) => f.write_str("Other"),
        }
    }
}

/// Translates canonical requests into calls on one backend.
///
/// Implementors provide [`Adapter::perform`]; the verb methods run the
/// capability check first and are not meant to be overridden.
pub trait Adapter: Send {
    /// Name of the backend, used in errors.
    fn name(&self) -> &str;

    /// What this backend can do.
    fn capabilities(&self) -> Capabilities;

    /// The backend-native client.
    fn client(&mut self) -> NativeClient<'_>;

    /// Send the request. Capabilities have already been checked.
    fn perform(&mut self, method: &Method, request: &Request) -> Result<Response>;

    /// Send a request with an arbitrary method.
    fn request(&mut self, method: Method, request: &Request) -> Result<Response> {
        self.capabilities().check(self.name(), &method, request)?;
        tracing::trace!(adapter = self.name(), %method, "capabilities satisfied");
        self.perform(&method, request)
    }

    /// Send a GET request.
    fn get(&mut self, request: &Request) -> Result<Response> {
        self.request(Method::GET, request)
    }

    /// Send a HEAD request.
    fn head(&mut self, request: &Request) -> Result<Response> {
        self.request(Method::HEAD, request)
    }

    /// Send a DELETE request.
    fn delete(&mut self, request: &Request) -> Result<Response> {
        self.request(Method::DELETE, request)
    }

    /// Send a POST request.
    fn post(&mut self, request: &Request) -> Result<Response> {
        self.request(Method::POST, request)
    }

    /// Send a PUT request.
    fn put(&mut self, request: &Request) -> Result<Response> {
        self.request(Method::PUT, request)
    }
}

impl fmt::Debug for dyn Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter").field("name", &self.name()).finish()
    }
}
