//! A scripted adapter for tests.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use parking_lot::Mutex;

use super::{Adapter, Capabilities, NativeClient};
use crate::auth::{AuthType, VerifyMode};
use crate::error::Result;
use crate::request::Request;
use crate::response::Response;

/// Capabilities of a backend which supports everything.
pub const ALL: Capabilities = Capabilities {
    custom_methods: true,
    auth: &[
        AuthType::Basic,
        AuthType::Digest,
        AuthType::Ntlm,
        AuthType::GssNegotiate,
    ],
    verify_modes: &[
        VerifyMode::None,
        VerifyMode::Peer,
        VerifyMode::ClientOnce,
        VerifyMode::FailIfNoPeerCert,
    ],
    proxy: true,
    ca_file: true,
    client_certificates: true,
    der: true,
};

/// Capabilities of a backend with only the standard verbs and basic auth.
pub const BASIC: Capabilities = Capabilities {
    custom_methods: false,
    auth: &[AuthType::Basic],
    verify_modes: &[VerifyMode::None, VerifyMode::Peer],
    proxy: false,
    ca_file: false,
    client_certificates: false,
    der: false,
};

/// A request as seen by [`MockAdapter::perform`].
#[derive(Debug, Clone)]
pub struct Recorded {
    /// The method used.
    pub method: Method,

    /// The request.
    pub request: Request,
}

/// The canned result of a [`MockAdapter`].
#[derive(Debug, Clone)]
pub struct Reply {
    code: u32,
    headers: HeaderMap,
    body: Bytes,
}

impl Reply {
    /// A reply with the given raw status code and an empty body.
    ///
    /// A code of zero is the transport's timeout signal.
    pub fn status(code: u32) -> Self {
        Self {
            code,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Add a header to the reply.
    ///
    /// # Panics
    ///
    /// If the name or value is not valid.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.append(
            HeaderName::from_bytes(name.as_bytes()).expect("valid header name"),
            HeaderValue::from_str(value).expect("valid header value"),
        );
        self
    }

    /// Set the body of the reply.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

impl Default for Reply {
    fn default() -> Self {
        Reply::status(200)
    }
}

/// An adapter which records requests and answers with a canned [`Reply`].
///
/// Clones share the same log, so a test can keep one handle and hand
/// another to a registry.
#[derive(Debug, Clone)]
pub struct MockAdapter {
    name: String,
    capabilities: Capabilities,
    reply: Reply,
    log: Arc<Mutex<Vec<Recorded>>>,
}

impl MockAdapter {
    /// Create a mock backend which supports everything and replies `200 OK`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capabilities: ALL,
            reply: Reply::default(),
            log: Default::default(),
        }
    }

    /// Restrict the capabilities of the backend.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the canned reply.
    pub fn with_reply(mut self, reply: Reply) -> Self {
        self.reply = reply;
        self
    }

    /// Requests performed so far, in order.
    pub fn recorded(&self) -> Vec<Recorded> {
        self.log.lock().clone()
    }
}

impl Adapter for MockAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn client(&mut self) -> NativeClient<'_> {
        NativeClient::Other(&mut self.reply)
    }

    fn perform(&mut self, method: &Method, request: &Request) -> Result<Response> {
        self.log.lock().push(Recorded {
            method: method.clone(),
            request: request.clone(),
        });

        Response::from_raw(
            self.reply.code,
            self.reply.headers.clone(),
            self.reply.body.clone(),
            Duration::ZERO,
        )
    }
}
