//! Adapter for reqwest's blocking client.

use std::fmt;
use std::time::Instant;

use http::Method;
use reqwest::blocking::{Client, ClientBuilder};
use reqwest::tls::{Certificate, Identity, Version};
use reqwest::Proxy;

use super::{Adapter, Capabilities, NativeClient};
use crate::auth::{AuthType, SslConfig, SslVersion, VerifyMode};
use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::Response;

/// Name of the reqwest backend.
pub const NAME: &str = "reqwest";

const CAPABILITIES: Capabilities = Capabilities {
    custom_methods: true,
    auth: &[AuthType::Basic],
    verify_modes: &[VerifyMode::None, VerifyMode::Peer],
    proxy: true,
    ca_file: true,
    client_certificates: true,
    der: false,
};

fn ssl_error(error: impl Into<crate::BoxError>) -> Error {
    Error::Ssl(error.into())
}

type Configure = Box<dyn Fn(ClientBuilder) -> ClientBuilder + Send + Sync>;

/// Client configuration for the reqwest adapter.
///
/// This is the native client exposed through [`NativeClient::Reqwest`].
/// Configuration is kept and replayed onto a fresh builder for every
/// request, before the request's own settings are applied on top of it.
#[derive(Default)]
pub struct ReqwestClient {
    configure: Vec<Configure>,
}

impl fmt::Debug for ReqwestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestClient")
            .field("configure", &self.configure.len())
            .finish()
    }
}

impl ReqwestClient {
    /// Modify the client builder used for every later request.
    pub fn configure<F>(&mut self, configure: F) -> &mut Self
    where
        F: Fn(ClientBuilder) -> ClientBuilder + Send + Sync + 'static,
    {
        self.configure.push(Box::new(configure));
        self
    }

    /// Drop all configuration, returning to reqwest's defaults.
    pub fn clear(&mut self) -> &mut Self {
        self.configure.clear();
        self
    }

    fn builder(&self) -> ClientBuilder {
        self.configure
            .iter()
            .fold(Client::builder(), |builder, configure| configure(builder))
    }
}

fn apply_ssl(mut builder: ClientBuilder, ssl: &SslConfig) -> Result<ClientBuilder> {
    match ssl.ssl_version {
        SslVersion::Auto => {}
        SslVersion::TlsV1 => builder = builder.min_tls_version(Version::TLS_1_0),
        version => {
            tracing::debug!(?version, "protocol version has no rustls equivalent, using defaults");
        }
    }

    if !ssl.verifies_peer() {
        return Ok(builder.danger_accept_invalid_certs(true));
    }

    if let Some(ca) = &ssl.ca_cert_file {
        let contents = ca.load()?;
        let certs = Certificate::from_pem_bundle(&contents).map_err(ssl_error)?;
        if certs.is_empty() {
            return Err(ssl_error("no certificates found in CA file"));
        }
        builder = builder.tls_built_in_root_certs(false);
        for cert in certs {
            builder = builder.add_root_certificate(cert);
        }
    }

    if ssl.has_client_certificate() {
        let mut pem = Vec::new();
        for source in [&ssl.cert_key_file, &ssl.cert_file].into_iter().flatten() {
            pem.extend_from_slice(&source.load()?);
            pem.push(b'\n');
        }
        let identity = Identity::from_pem(&pem).map_err(ssl_error)?;
        builder = builder.identity(identity);
    }

    Ok(builder)
}

fn client(mut builder: ClientBuilder, request: &Request) -> Result<Client> {
    if let Some(timeout) = request.open_timeout() {
        builder = builder.connect_timeout(timeout);
    }
    builder = builder.timeout(request.read_timeout());

    builder = match request.proxy() {
        Some(proxy) => builder.proxy(
            Proxy::all(proxy.as_str())
                .map_err(|error| Error::InvalidRequest(error.to_string()))?,
        ),
        None => builder.no_proxy(),
    };

    if let Some(ssl) = request.auth().ssl() {
        builder = apply_ssl(builder, ssl)?;
    }

    builder.build().map_err(ssl_error)
}

/// Adapter which sends requests with reqwest.
#[derive(Debug, Default)]
pub struct ReqwestAdapter {
    client: ReqwestClient,
}

impl ReqwestAdapter {
    /// Create an adapter with reqwest's default client settings.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Adapter for ReqwestAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }

    fn client(&mut self) -> NativeClient<'_> {
        NativeClient::Reqwest(&mut self.client)
    }

    fn perform(&mut self, method: &Method, request: &Request) -> Result<Response> {
        let client = client(self.client.builder(), request)?;

        let mut outgoing = client
            .request(method.clone(), request.url().as_str())
            .headers(request.headers().clone());

        if request.auth().kind() == AuthType::Basic {
            let credentials = request.auth().credentials().ok_or_else(|| {
                Error::InvalidRequest("basic authentication requires credentials".into())
            })?;
            outgoing = outgoing.basic_auth(credentials.username(), Some(credentials.password()));
        }

        if super::sends_body(method, request) {
            let body = request.body().map(|body| body.to_vec()).unwrap_or_default();
            outgoing = outgoing.body(body);
        }

        let started = Instant::now();
        let timed_out = |error: reqwest::Error| {
            if error.is_timeout() {
                Error::Timeout(started.elapsed())
            } else {
                Error::Transport(error.into())
            }
        };

        let response = outgoing.send().map_err(timed_out)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().map_err(timed_out)?;
        tracing::debug!(%status, "reqwest response");

        Ok(Response::new(status, headers, body))
    }
}
