//! Adapter for hyper's HTTP/1 client connection.
//!
//! Each request opens one connection (through tokio-rustls for `https`),
//! performs the handshake with [`hyper::client::conn::http1::Builder`] and
//! drives the exchange to completion on a current-thread tokio runtime. Open
//! and read timeouts are enforced here with the tokio clock, since the
//! connection itself has none.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::prelude::*;
use bytes::Bytes;
use http::header::{HeaderValue, AUTHORIZATION, HOST, PROXY_AUTHORIZATION};
use http::{Method, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use super::{Adapter, Capabilities, NativeClient};
use crate::auth::{AuthType, VerifyMode};
use crate::error::{Error, Feature, Result};
use crate::request::{Request, Url};
use crate::response::Response;

mod tls;

/// Name of the hyper backend.
pub const NAME: &str = "hyper";

const CAPABILITIES: Capabilities = Capabilities {
    custom_methods: true,
    auth: &[AuthType::Basic],
    verify_modes: &[VerifyMode::None, VerifyMode::Peer],
    proxy: true,
    ca_file: true,
    client_certificates: true,
    der: true,
};

trait Io: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Io for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// Connection settings for the hyper adapter.
///
/// This is the native client exposed through [`NativeClient::Hyper`].
#[derive(Debug, Clone)]
pub struct HyperClient {
    http1: hyper::client::conn::http1::Builder,
    nodelay: bool,
}

impl Default for HyperClient {
    fn default() -> Self {
        Self {
            http1: hyper::client::conn::http1::Builder::new(),
            nodelay: true,
        }
    }
}

impl HyperClient {
    /// Get the HTTP/1.1 configuration.
    pub fn http1(&mut self) -> &mut hyper::client::conn::http1::Builder {
        &mut self.http1
    }

    /// Set `TCP_NODELAY` on new connections.
    pub fn set_nodelay(&mut self, nodelay: bool) -> &mut Self {
        self.nodelay = nodelay;
        self
    }

    /// Whether `TCP_NODELAY` is set on new connections.
    pub fn nodelay(&self) -> bool {
        self.nodelay
    }
}

/// Where the connection goes, and how it is secured.
struct Target {
    host: String,
    port: u16,
    tls: Option<Arc<rustls::ClientConfig>>,
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("tls", &self.tls.is_some())
            .finish()
    }
}

fn host_and_port(url: &Url) -> (String, u16) {
    let host = url.host().trim_start_matches('[').trim_end_matches(']');
    let port = url
        .port_u16()
        .unwrap_or(if url.is_https() { 443 } else { 80 });
    (host.to_owned(), port)
}

/// Host and explicit port, without user info.
fn authority(url: &Url) -> String {
    match url.port_u16() {
        Some(port) => format!("{}:{port}", url.host()),
        None => url.host().to_owned(),
    }
}

fn basic_credentials(username: &str, password: &str) -> Result<HeaderValue> {
    let token = BASE64_STANDARD.encode(format!("{username}:{password}"));
    let mut value = HeaderValue::from_str(&format!("Basic {token}"))
        .map_err(|error| Error::InvalidRequest(error.to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

/// The request target: absolute form through a proxy, origin form
/// otherwise. User info and fragment are never sent.
fn request_target(url: &Url, via_proxy: bool) -> Result<Uri> {
    let uri = url.uri();
    let mut target = String::new();
    if via_proxy {
        target.push_str(url.scheme_str());
        target.push_str("://");
        target.push_str(&authority(url));
    }
    target.push_str(uri.path());
    if let Some(query) = uri.query() {
        target.push('?');
        target.push_str(query);
    }
    target
        .parse()
        .map_err(|error| Error::InvalidRequest(format!("{url}: {error}")))
}

/// Translate the canonical request into an `http::Request`.
///
/// Credentials in the proxy URL are sent as `Proxy-Authorization`.
fn outgoing(
    method: &Method,
    request: &Request,
    proxy: Option<&Url>,
) -> Result<http::Request<Full<Bytes>>> {
    let url = request.url();

    let body = if super::sends_body(method, request) {
        request.body().cloned().unwrap_or_default()
    } else {
        Bytes::new()
    };

    let mut outgoing = http::Request::builder()
        .method(method.clone())
        .uri(request_target(url, proxy.is_some())?)
        .body(Full::new(body))
        .map_err(|error| Error::InvalidRequest(error.to_string()))?;

    let headers = outgoing.headers_mut();
    *headers = request.headers().clone();
    if !headers.contains_key(HOST) {
        let host = HeaderValue::from_str(&authority(url))
            .map_err(|error| Error::InvalidRequest(error.to_string()))?;
        headers.insert(HOST, host);
    }

    if request.auth().kind() == AuthType::Basic {
        let credentials = request.auth().credentials().ok_or_else(|| {
            Error::InvalidRequest("basic authentication requires credentials".into())
        })?;
        headers.insert(
            AUTHORIZATION,
            basic_credentials(credentials.username(), credentials.password())?,
        );
    }

    if let Some((username, password)) = proxy.and_then(Url::userinfo) {
        headers.insert(
            PROXY_AUTHORIZATION,
            basic_credentials(username, password.unwrap_or_default())?,
        );
    }

    Ok(outgoing)
}

/// Run `future`, failing with [`Error::Timeout`] once `limit` has passed.
async fn within<F, T>(limit: Option<Duration>, started: Instant, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, future)
            .await
            .map_err(|_| Error::Timeout(started.elapsed()))?,
        None => future.await,
    }
}

fn transport(error: impl Into<crate::BoxError>) -> Error {
    Error::Transport(error.into())
}

impl HyperClient {
    async fn connect(&self, target: &Target) -> Result<Box<dyn Io>> {
        tracing::trace!(host = %target.host, port = target.port, "connecting");
        let stream = TcpStream::connect((target.host.as_str(), target.port))
            .await
            .map_err(transport)?;
        stream.set_nodelay(self.nodelay).map_err(transport)?;

        match &target.tls {
            Some(config) => {
                let domain = tls::server_name(&target.host)?;
                let connector = tokio_rustls::TlsConnector::from(config.clone());
                let stream = connector.connect(domain, stream).await.map_err(transport)?;
                tracing::trace!("tls handshake complete");
                Ok(Box::new(stream))
            }
            None => Ok(Box::new(stream)),
        }
    }

    async fn send(
        &self,
        target: Target,
        request: http::Request<Full<Bytes>>,
        open_timeout: Option<Duration>,
        read_timeout: Option<Duration>,
    ) -> Result<Response> {
        let started = Instant::now();
        let stream = within(open_timeout, started, self.connect(&target)).await?;

        let (mut sender, conn) = self
            .http1
            .handshake(TokioIo::new(stream))
            .await
            .map_err(transport)?;
        tokio::spawn(async {
            if let Err(err) = conn.await {
                tracing::debug!(%err, "h1 connection driver error");
            }
        });

        let exchange = async {
            let response = sender.send_request(request).await.map_err(transport)?;
            let (parts, body) = response.into_parts();
            let body = body.collect().await.map_err(transport)?.to_bytes();
            Ok((parts, body))
        };

        let (parts, body) = within(read_timeout, started, exchange).await?;
        tracing::debug!(status = %parts.status, "hyper response");
        Ok(Response::new(parts.status, parts.headers, body))
    }
}

/// Adapter which sends requests with hyper.
#[derive(Debug, Clone, Default)]
pub struct HyperAdapter {
    client: HyperClient,
}

impl HyperAdapter {
    /// Create an adapter with default connection settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an adapter with the given connection settings.
    pub fn with_client(client: HyperClient) -> Self {
        Self { client }
    }
}

impl Adapter for HyperAdapter {
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }

    fn client(&mut self) -> NativeClient<'_> {
        NativeClient::Hyper(&mut self.client)
    }

    fn perform(&mut self, method: &Method, request: &Request) -> Result<Response> {
        let https = request.url().is_https();
        let proxy = request.proxy();
        if let Some(proxy) = proxy {
            if https {
                return Err(Error::not_supported(NAME, Feature::HttpsProxy));
            }
            if proxy.is_https() {
                return Err(Error::not_supported(NAME, Feature::SecureProxy));
            }
        }

        let (host, port) = host_and_port(proxy.unwrap_or(request.url()));
        let tls = if https {
            Some(Arc::new(tls::client_config(request.auth().ssl())?))
        } else {
            None
        };
        let target = Target { host, port, tls };
        tracing::trace!(?target, "resolved target");

        let outgoing = outgoing(method, request, proxy)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(transport)?;

        runtime.block_on(self.client.send(
            target,
            outgoing,
            request.open_timeout(),
            request.read_timeout(),
        ))
    }
}
