//! Adapter for libcurl style "easy" handles.
//!
//! An easy handle is configured through a series of setters and reports its
//! result as a numeric response code, a raw header block and a body. The
//! [`EasyHandle`] trait captures that native API so the translation logic in
//! [`CurlAdapter`] is independent of the concrete handle. With the `curl`
//! feature enabled, [`CurlEasy`] implements it on top of libcurl.
//!
//! Easy handles only accept certificate material as file paths. Material
//! held in memory is written out through a [`CredentialStore`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::Method;

use super::{Adapter, Capabilities, NativeClient};
use crate::auth::{AuthType, CertSource, CertType, SslConfig, SslVersion, VerifyMode};
use crate::credentials::{CredentialStore, FileCredentialStore};
use crate::error::{Error, Result};
use crate::headers::parse_header_block;
use crate::request::Request;
use crate::response::Response;
use crate::BoxError;

#[cfg(feature = "curl")]
mod easy;
#[cfg(any(test, feature = "mocks"))]
pub mod mock;

#[cfg(feature = "curl")]
pub(crate) use self::easy::probe;
#[cfg(feature = "curl")]
pub use self::easy::CurlEasy;

/// Name of the curl backend.
pub const NAME: &str = "curl";

/// Username curl expects for GSS-Negotiate, which has no username of its own.
const NEGOTIATE_USERNAME: &str = ":";

const CAPABILITIES: Capabilities = Capabilities {
    custom_methods: false,
    auth: &[
        AuthType::Basic,
        AuthType::Digest,
        AuthType::Ntlm,
        AuthType::GssNegotiate,
    ],
    verify_modes: &[VerifyMode::None, VerifyMode::Peer],
    proxy: true,
    ca_file: true,
    client_certificates: true,
    der: true,
};

/// Why [`EasyHandle::perform`] failed.
#[derive(Debug)]
pub enum PerformError {
    /// The transfer exceeded one of the configured timeouts.
    TimedOut,

    /// Any other failure.
    Failed(BoxError),
}

/// The native API of an easy handle.
///
/// Setters mirror the libcurl options of the same name.
pub trait EasyHandle: Send {
    /// Drop every option set for an earlier transfer.
    fn reset(&mut self) -> Result<(), BoxError>;

    /// Target URL.
    fn url(&mut self, url: &str) -> Result<(), BoxError>;

    /// Proxy URL.
    fn proxy(&mut self, url: &str) -> Result<(), BoxError>;

    /// Timeout for the whole transfer.
    fn timeout(&mut self, timeout: Duration) -> Result<(), BoxError>;

    /// Timeout for the connect phase.
    fn connect_timeout(&mut self, timeout: Duration) -> Result<(), BoxError>;

    /// Request headers, one `Name: value` line each.
    fn http_headers(&mut self, headers: &[String]) -> Result<(), BoxError>;

    /// Whether the handle writes debug output.
    fn verbose(&mut self, verbose: bool) -> Result<(), BoxError>;

    /// Allowed authentication scheme.
    fn http_auth(&mut self, kind: AuthType) -> Result<(), BoxError>;

    /// Username for authentication.
    fn username(&mut self, username: &str) -> Result<(), BoxError>;

    /// Password for authentication.
    fn password(&mut self, password: &str) -> Result<(), BoxError>;

    /// Client certificate file.
    fn ssl_cert(&mut self, path: &Path) -> Result<(), BoxError>;

    /// Client private key file.
    fn ssl_key(&mut self, path: &Path) -> Result<(), BoxError>;

    /// CA bundle file.
    fn ca_info(&mut self, path: &Path) -> Result<(), BoxError>;

    /// Certificate encoding, `PEM` or `DER`.
    fn ssl_cert_type(&mut self, kind: &str) -> Result<(), BoxError>;

    /// Whether the peer certificate is verified.
    fn ssl_verify_peer(&mut self, verify: bool) -> Result<(), BoxError>;

    /// Protocol version. Never called with [`SslVersion::Auto`].
    fn ssl_version(&mut self, version: SslVersion) -> Result<(), BoxError>;

    /// Run the transfer. `method` is one of GET, POST, PUT, DELETE or HEAD,
    /// and must be set on the handle whatever an earlier transfer used.
    fn perform(&mut self, method: &Method, body: Option<&[u8]>) -> Result<(), PerformError>;

    /// Response code of the last transfer, zero if none was received.
    fn response_code(&mut self) -> Result<u32, BoxError>;

    /// Raw status line and headers of the last transfer.
    fn header_block(&self) -> &[u8];

    /// Body of the last transfer.
    fn body(&self) -> &[u8];
}

/// Adapter for an [`EasyHandle`].
pub struct CurlAdapter<H> {
    handle: H,
    store: Arc<dyn CredentialStore>,
}

impl<H> fmt::Debug for CurlAdapter<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurlAdapter")
            .field("store", &self.store)
            .finish()
    }
}

#[cfg(feature = "curl")]
impl CurlAdapter<CurlEasy> {
    /// Create an adapter with a fresh libcurl handle.
    pub fn new() -> Self {
        Self::with_handle(CurlEasy::new())
    }
}

#[cfg(feature = "curl")]
impl Default for CurlAdapter<CurlEasy> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: EasyHandle> CurlAdapter<H> {
    /// Create an adapter around an existing handle, materializing
    /// credentials into the default temporary directory.
    pub fn with_handle(handle: H) -> Self {
        Self::with_store(handle, Arc::new(FileCredentialStore::default()))
    }

    /// Create an adapter around an existing handle and credential store.
    pub fn with_store(handle: H, store: Arc<dyn CredentialStore>) -> Self {
        Self { handle, store }
    }

    /// The easy handle.
    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Mutable access to the easy handle.
    pub fn handle_mut(&mut self) -> &mut H {
        &mut self.handle
    }

    fn setup(&mut self, request: &Request) -> Result<()> {
        self.handle.reset().map_err(Error::Transport)?;
        self.basic_setup(request).map_err(Error::Transport)?;

        let auth = request.auth();
        match auth.kind() {
            AuthType::None => {}
            AuthType::GssNegotiate => {
                self.handle
                    .http_auth(AuthType::GssNegotiate)
                    .and_then(|_| self.handle.username(NEGOTIATE_USERNAME))
                    .map_err(Error::Transport)?;
            }
            kind => {
                let credentials = auth.credentials().ok_or_else(|| {
                    Error::InvalidRequest(format!("{kind} authentication requires credentials"))
                })?;
                self.handle
                    .http_auth(kind)
                    .and_then(|_| self.handle.username(credentials.username()))
                    .and_then(|_| self.handle.password(credentials.password()))
                    .map_err(Error::Transport)?;
            }
        }

        if let Some(ssl) = auth.ssl() {
            self.setup_ssl(ssl)?;
        }

        Ok(())
    }

    fn basic_setup(&mut self, request: &Request) -> Result<(), BoxError> {
        self.handle.url(request.url().as_str())?;
        if let Some(proxy) = request.proxy() {
            self.handle.proxy(proxy.as_str())?;
        }
        if let Some(timeout) = request.read_timeout() {
            self.handle.timeout(timeout)?;
        }
        if let Some(timeout) = request.open_timeout() {
            self.handle.connect_timeout(timeout)?;
        }

        let mut lines = Vec::with_capacity(request.headers().len());
        for (name, value) in request.headers() {
            let value = value
                .to_str()
                .map_err(|error| format!("header {name}: {error}"))?;
            lines.push(format!("{name}: {value}"));
        }
        self.handle.http_headers(&lines)?;
        self.handle.verbose(false)?;
        Ok(())
    }

    fn setup_ssl(&mut self, ssl: &SslConfig) -> Result<()> {
        if ssl.verifies_peer() {
            if let Some((cert, key)) = self.client_certificate(ssl)? {
                self.handle.ssl_cert(&cert).map_err(Error::Ssl)?;
                if let Some(key) = key {
                    self.handle.ssl_key(&key).map_err(Error::Ssl)?;
                }
            }

            if let Some(ca) = &ssl.ca_cert_file {
                let path = self.file_for(ca)?;
                self.handle.ca_info(&path).map_err(Error::Ssl)?;
            }

            self.handle
                .ssl_cert_type(ssl.cert_type.as_str())
                .map_err(Error::Ssl)?;
        }

        self.handle
            .ssl_verify_peer(ssl.verify_mode == VerifyMode::Peer)
            .map_err(Error::Ssl)?;

        if ssl.ssl_version != SslVersion::Auto {
            self.handle
                .ssl_version(ssl.ssl_version)
                .map_err(Error::Ssl)?;
        }

        Ok(())
    }

    /// Paths for the client certificate and key.
    ///
    /// Files on disk are passed through unchanged. PEM material held in
    /// memory is joined, key first, into one file used for both. DER
    /// material cannot be concatenated, so each part gets its own file.
    fn client_certificate(&self, ssl: &SslConfig) -> Result<Option<(PathBuf, Option<PathBuf>)>> {
        match (&ssl.cert_file, &ssl.cert_key_file) {
            (None, None) => Ok(None),
            (Some(CertSource::File(cert)), Some(CertSource::File(key))) => {
                Ok(Some((cert.clone(), Some(key.clone()))))
            }
            (Some(CertSource::File(cert)), None) => Ok(Some((cert.clone(), None))),
            (cert, key) if ssl.cert_type == CertType::Der => {
                let cert = cert.as_ref().ok_or_else(|| {
                    Error::InvalidRequest("a DER client key needs a certificate".into())
                })?;
                let key = key.as_ref().map(|key| self.file_for(key)).transpose()?;
                Ok(Some((self.file_for(cert)?, key)))
            }
            (cert, key) => {
                let mut combined = Vec::new();
                for source in [key, cert].into_iter().flatten() {
                    if !combined.is_empty() {
                        combined.push(b'\n');
                    }
                    combined.extend_from_slice(source.load()?.trim_ascii_end());
                }
                let combined = self.materialize(&combined)?;
                Ok(Some((combined.clone(), Some(combined))))
            }
        }
    }

    fn file_for(&self, source: &CertSource) -> Result<PathBuf> {
        match source {
            CertSource::File(path) => Ok(path.clone()),
            CertSource::Memory(bytes) => self.materialize(bytes),
        }
    }

    fn materialize(&self, contents: &[u8]) -> Result<PathBuf> {
        self.store
            .materialize(contents)
            .map_err(|error| Error::Ssl(error.into()))
    }

    fn respond(&mut self, started: Instant) -> Result<Response> {
        let code = self.handle.response_code().map_err(Error::Transport)?;
        let head = parse_header_block(self.handle.header_block());
        tracing::debug!(code, reason = ?head.reason, "curl response");
        Response::from_raw(
            code,
            head.headers,
            self.handle.body().to_vec(),
            started.elapsed(),
        )
    }
}

impl<H> Adapter for CurlAdapter<H>
where
    H: EasyHandle + 'static,
{
    fn name(&self) -> &str {
        NAME
    }

    fn capabilities(&self) -> Capabilities {
        CAPABILITIES
    }

    fn client(&mut self) -> NativeClient<'_> {
        NativeClient::Curl(&mut self.handle)
    }

    fn perform(&mut self, method: &Method, request: &Request) -> Result<Response> {
        self.setup(request)?;

        let body = if super::sends_body(method, request) {
            Some(request.body().map(|body| &body[..]).unwrap_or_default())
        } else {
            None
        };

        let started = Instant::now();
        match self.handle.perform(method, body) {
            Ok(()) => self.respond(started),
            Err(PerformError::TimedOut) => Err(Error::Timeout(started.elapsed())),
            Err(PerformError::Failed(error)) => Err(Error::Transport(error)),
        }
    }
}
