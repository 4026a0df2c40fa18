//! A recording easy handle for tests.

use std::path::{Path, PathBuf};
use std::time::Duration;

use http::Method;

use super::{EasyHandle, PerformError};
use crate::auth::{AuthType, SslVersion};
use crate::BoxError;

/// An [`EasyHandle`] which records every option and returns a canned result.
#[derive(Debug, Clone, Default)]
pub struct MockEasy {
    /// Last URL set.
    pub url: Option<String>,
    /// Last proxy set.
    pub proxy: Option<String>,
    /// Last transfer timeout set.
    pub timeout: Option<Duration>,
    /// Last connect timeout set.
    pub connect_timeout: Option<Duration>,
    /// Last header lines set.
    pub headers: Vec<String>,
    /// Last verbosity set.
    pub verbose: Option<bool>,
    /// Last authentication scheme set.
    pub auth: Option<AuthType>,
    /// Last username set.
    pub username: Option<String>,
    /// Last password set.
    pub password: Option<String>,
    /// Last client certificate path set.
    pub ssl_cert: Option<PathBuf>,
    /// Last client key path set.
    pub ssl_key: Option<PathBuf>,
    /// Last CA bundle path set.
    pub ca_info: Option<PathBuf>,
    /// Last certificate type set.
    pub cert_type: Option<String>,
    /// Last peer verification flag set.
    pub verify_peer: Option<bool>,
    /// Last protocol version set.
    pub ssl_version: Option<SslVersion>,
    /// Every transfer, with its method and body.
    pub performed: Vec<(Method, Option<Vec<u8>>)>,
    /// Number of resets.
    pub resets: usize,

    code: u32,
    header_block: Vec<u8>,
    body: Vec<u8>,
    timed_out: bool,
}

impl MockEasy {
    /// A handle which answers `200 OK` with an empty body.
    pub fn ok() -> Self {
        Self::responding(200, "HTTP/1.1 200 OK\r\n\r\n", "")
    }

    /// A handle which answers with the given code, raw header block and body.
    pub fn responding(code: u32, header_block: &str, body: &str) -> Self {
        Self {
            code,
            header_block: header_block.as_bytes().to_vec(),
            body: body.as_bytes().to_vec(),
            ..Default::default()
        }
    }

    /// A handle whose transfers time out.
    pub fn timing_out() -> Self {
        Self {
            timed_out: true,
            ..Default::default()
        }
    }
}

impl EasyHandle for MockEasy {
    fn reset(&mut self) -> Result<(), BoxError> {
        *self = Self {
            performed: std::mem::take(&mut self.performed),
            resets: self.resets + 1,
            code: self.code,
            header_block: std::mem::take(&mut self.header_block),
            body: std::mem::take(&mut self.body),
            timed_out: self.timed_out,
            ..Default::default()
        };
        Ok(())
    }

    fn url(&mut self, url: &str) -> Result<(), BoxError> {
        self.url = Some(url.to_owned());
        Ok(())
    }

    fn proxy(&mut self, url: &str) -> Result<(), BoxError> {
        self.proxy = Some(url.to_owned());
        Ok(())
    }

    fn timeout(&mut self, timeout: Duration) -> Result<(), BoxError> {
        self.timeout = Some(timeout);
        Ok(())
    }

    fn connect_timeout(&mut self, timeout: Duration) -> Result<(), BoxError> {
        self.connect_timeout = Some(timeout);
        Ok(())
    }

    fn http_headers(&mut self, headers: &[String]) -> Result<(), BoxError> {
        self.headers = headers.to_vec();
        Ok(())
    }

    fn verbose(&mut self, verbose: bool) -> Result<(), BoxError> {
        self.verbose = Some(verbose);
        Ok(())
    }

    fn http_auth(&mut self, kind: AuthType) -> Result<(), BoxError> {
        self.auth = Some(kind);
        Ok(())
    }

    fn username(&mut self, username: &str) -> Result<(), BoxError> {
        self.username = Some(username.to_owned());
        Ok(())
    }

    fn password(&mut self, password: &str) -> Result<(), BoxError> {
        self.password = Some(password.to_owned());
        Ok(())
    }

    fn ssl_cert(&mut self, path: &Path) -> Result<(), BoxError> {
        self.ssl_cert = Some(path.to_owned());
        Ok(())
    }

    fn ssl_key(&mut self, path: &Path) -> Result<(), BoxError> {
        self.ssl_key = Some(path.to_owned());
        Ok(())
    }

    fn ca_info(&mut self, path: &Path) -> Result<(), BoxError> {
        self.ca_info = Some(path.to_owned());
        Ok(())
    }

    fn ssl_cert_type(&mut self, kind: &str) -> Result<(), BoxError> {
        self.cert_type = Some(kind.to_owned());
        Ok(())
    }

    fn ssl_verify_peer(&mut self, verify: bool) -> Result<(), BoxError> {
        self.verify_peer = Some(verify);
        Ok(())
    }

    fn ssl_version(&mut self, version: SslVersion) -> Result<(), BoxError> {
        self.ssl_version = Some(version);
        Ok(())
    }

    fn perform(&mut self, method: &Method, body: Option<&[u8]>) -> Result<(), PerformError> {
        self.performed
            .push((method.clone(), body.map(|body| body.to_vec())));
        if self.timed_out {
            return Err(PerformError::TimedOut);
        }
        Ok(())
    }

    fn response_code(&mut self) -> Result<u32, BoxError> {
        Ok(self.code)
    }

    fn header_block(&self) -> &[u8] {
        &self.header_block
    }

    fn body(&self) -> &[u8] {
        &self.body
    }
}
