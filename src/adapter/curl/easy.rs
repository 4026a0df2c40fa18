use std::fmt;
use std::path::Path;
use std::time::Duration;

use curl::easy::{Easy, List};
use http::Method;

use super::{EasyHandle, PerformError};
use crate::auth::{AuthType, SslVersion};
use crate::BoxError;

type Configure = Box<dyn Fn(&mut Easy) -> Result<(), curl::Error> + Send + Sync>;

/// A libcurl easy handle which buffers the response head and body.
///
/// The handle is reset before every transfer. Options which should apply to
/// every request are registered with [`CurlEasy::configure`] and replayed
/// after each reset.
pub struct CurlEasy {
    easy: Easy,
    configure: Vec<Configure>,
    header: Vec<u8>,
    body: Vec<u8>,
}

impl fmt::Debug for CurlEasy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurlEasy")
            .field("configure", &self.configure.len())
            .field("header", &self.header.len())
            .field("body", &self.body.len())
            .finish()
    }
}

impl Default for CurlEasy {
    fn default() -> Self {
        Self::new()
    }
}

impl CurlEasy {
    /// Create a fresh handle.
    pub fn new() -> Self {
        Self {
            easy: Easy::new(),
            configure: Vec::new(),
            header: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Set options on the libcurl handle for every later transfer.
    pub fn configure<F>(&mut self, configure: F) -> &mut Self
    where
        F: Fn(&mut Easy) -> Result<(), curl::Error> + Send + Sync + 'static,
    {
        self.configure.push(Box::new(configure));
        self
    }

    /// The underlying libcurl handle.
    ///
    /// Options set here directly last until the next reset.
    pub fn easy(&mut self) -> &mut Easy {
        &mut self.easy
    }
}

/// Check that libcurl can be initialized.
pub(crate) fn probe() -> Result<(), BoxError> {
    curl::init();
    let version = curl::Version::get();
    tracing::trace!(version = version.version(), "libcurl available");
    Ok(())
}

impl EasyHandle for CurlEasy {
    fn reset(&mut self) -> Result<(), BoxError> {
        self.easy.reset();
        for configure in &self.configure {
            configure(&mut self.easy)?;
        }
        Ok(())
    }

    fn url(&mut self, url: &str) -> Result<(), BoxError> {
        Ok(self.easy.url(url)?)
    }

    fn proxy(&mut self, url: &str) -> Result<(), BoxError> {
        Ok(self.easy.proxy(url)?)
    }

    fn timeout(&mut self, timeout: Duration) -> Result<(), BoxError> {
        Ok(self.easy.timeout(timeout)?)
    }

    fn connect_timeout(&mut self, timeout: Duration) -> Result<(), BoxError> {
        Ok(self.easy.connect_timeout(timeout)?)
    }

    fn http_headers(&mut self, headers: &[String]) -> Result<(), BoxError> {
        let mut list = List::new();
        for header in headers {
            list.append(header)?;
        }
        Ok(self.easy.http_headers(list)?)
    }

    fn verbose(&mut self, verbose: bool) -> Result<(), BoxError> {
        Ok(self.easy.verbose(verbose)?)
    }

    fn http_auth(&mut self, kind: AuthType) -> Result<(), BoxError> {
        let mut auth = curl::easy::Auth::new();
        match kind {
            AuthType::None => {}
            AuthType::Basic => {
                auth.basic(true);
            }
            AuthType::Digest => {
                auth.digest(true);
            }
            AuthType::Ntlm => {
                auth.ntlm(true);
            }
            AuthType::GssNegotiate => {
                auth.gssnegotiate(true);
            }
        }
        Ok(self.easy.http_auth(&auth)?)
    }

    fn username(&mut self, username: &str) -> Result<(), BoxError> {
        Ok(self.easy.username(username)?)
    }

    fn password(&mut self, password: &str) -> Result<(), BoxError> {
        Ok(self.easy.password(password)?)
    }

    fn ssl_cert(&mut self, path: &Path) -> Result<(), BoxError> {
        Ok(self.easy.ssl_cert(path)?)
    }

    fn ssl_key(&mut self, path: &Path) -> Result<(), BoxError> {
        Ok(self.easy.ssl_key(path)?)
    }

    fn ca_info(&mut self, path: &Path) -> Result<(), BoxError> {
        Ok(self.easy.cainfo(path)?)
    }

    fn ssl_cert_type(&mut self, kind: &str) -> Result<(), BoxError> {
        Ok(self.easy.ssl_cert_type(kind)?)
    }

    fn ssl_verify_peer(&mut self, verify: bool) -> Result<(), BoxError> {
        Ok(self.easy.ssl_verify_peer(verify)?)
    }

    fn ssl_version(&mut self, version: SslVersion) -> Result<(), BoxError> {
        let version = match version {
            SslVersion::Auto => curl::easy::SslVersion::Default,
            SslVersion::TlsV1 => curl::easy::SslVersion::Tlsv1,
            SslVersion::SslV2 => curl::easy::SslVersion::Sslv2,
            SslVersion::SslV3 => curl::easy::SslVersion::Sslv3,
        };
        Ok(self.easy.ssl_version(version)?)
    }

    fn perform(&mut self, method: &Method, body: Option<&[u8]>) -> Result<(), PerformError> {
        let failed = |error: curl::Error| PerformError::Failed(error.into());

        if *method == Method::HEAD {
            self.easy.nobody(true).map_err(failed)?;
        } else if *method == Method::GET {
            self.easy.get(true).map_err(failed)?;
        } else if *method == Method::POST {
            self.easy.post(true).map_err(failed)?;
        } else {
            self.easy.custom_request(method.as_str()).map_err(failed)?;
        }
        if let Some(body) = body {
            self.easy.post_fields_copy(body).map_err(failed)?;
        }

        let Self {
            easy,
            header,
            body: buffer,
            ..
        } = self;
        header.clear();
        buffer.clear();

        let mut transfer = easy.transfer();
        transfer
            .header_function(|data| {
                header.extend_from_slice(data);
                true
            })
            .map_err(failed)?;
        transfer
            .write_function(|data| {
                buffer.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(failed)?;

        match transfer.perform() {
            Ok(()) => Ok(()),
            Err(error) if error.is_operation_timedout() => Err(PerformError::TimedOut),
            Err(error) => Err(failed(error)),
        }
    }

    fn response_code(&mut self) -> Result<u32, BoxError> {
        Ok(self.easy.response_code()?)
    }

    fn header_block(&self) -> &[u8] {
        &self.header
    }

    fn body(&self) -> &[u8] {
        &self.body
    }
}
