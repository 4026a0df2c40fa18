//! Authentication and transport security settings attached to every request.

use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;

use crate::error::{Error, Result};

/// HTTP authentication scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AuthType {
    /// No authentication.
    #[default]
    None,

    /// HTTP basic authentication.
    Basic,

    /// HTTP digest authentication.
    Digest,

    /// NTLM authentication.
    Ntlm,

    /// GSS-Negotiate (SPNEGO / Kerberos) authentication.
    GssNegotiate,
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthType::None => "no",
            AuthType::Basic => "basic",
            AuthType::Digest => "digest",
            AuthType::Ntlm => "NTLM",
            AuthType::GssNegotiate => "GSS-Negotiate",
        };
        f.write_str(name)
    }
}

/// A username and password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Create a new set of credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Authentication settings for a request.
///
/// Every [`Request`][crate::Request] carries an `Auth`, which defaults to
/// no authentication and no TLS configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Auth {
    kind: AuthType,
    credentials: Option<Credentials>,
    ssl: Option<SslConfig>,
}

impl Auth {
    /// Create an empty authentication configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// The selected authentication scheme.
    pub fn kind(&self) -> AuthType {
        self.kind
    }

    /// The credentials, if any were provided.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// Use HTTP basic authentication.
    pub fn basic(&mut self, username: impl Into<String>, password: impl Into<String>) -> &mut Self {
        self.kind = AuthType::Basic;
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Use HTTP digest authentication.
    pub fn digest(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> &mut Self {
        self.kind = AuthType::Digest;
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Use NTLM authentication.
    pub fn ntlm(&mut self, username: impl Into<String>, password: impl Into<String>) -> &mut Self {
        self.kind = AuthType::Ntlm;
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Use GSS-Negotiate authentication, which takes its identity from the
    /// environment instead of a username and password.
    pub fn gssnegotiate(&mut self) -> &mut Self {
        self.kind = AuthType::GssNegotiate;
        self.credentials = None;
        self
    }

    /// Set credentials without choosing a scheme.
    ///
    /// If no scheme was selected yet, this implies basic authentication.
    pub fn set_credentials(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> &mut Self {
        if matches!(self.kind, AuthType::None | AuthType::GssNegotiate) {
            self.kind = AuthType::Basic;
        }
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Remove any authentication scheme and credentials. TLS settings are kept.
    pub fn clear(&mut self) -> &mut Self {
        self.kind = AuthType::None;
        self.credentials = None;
        self
    }

    /// Whether basic or digest authentication is selected.
    pub fn is_http(&self) -> bool {
        matches!(self.kind, AuthType::Basic | AuthType::Digest)
    }

    /// Whether NTLM authentication is selected.
    pub fn is_ntlm(&self) -> bool {
        self.kind == AuthType::Ntlm
    }

    /// Whether GSS-Negotiate authentication is selected.
    pub fn is_gssnegotiate(&self) -> bool {
        self.kind == AuthType::GssNegotiate
    }

    /// The TLS configuration, if one was set.
    pub fn ssl(&self) -> Option<&SslConfig> {
        self.ssl.as_ref()
    }

    /// The TLS configuration, created with defaults on first access.
    pub fn ssl_mut(&mut self) -> &mut SslConfig {
        self.ssl.get_or_insert_with(SslConfig::default)
    }

    /// Replace the TLS configuration.
    pub fn set_ssl(&mut self, ssl: Option<SslConfig>) -> &mut Self {
        self.ssl = ssl;
        self
    }
}

/// Encoding of certificate and key material.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CertType {
    /// PEM (base64 with armor).
    #[default]
    Pem,

    /// DER (raw ASN.1).
    Der,
}

impl CertType {
    /// The upper case name used by curl-style backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            CertType::Pem => "PEM",
            CertType::Der => "DER",
        }
    }
}

impl fmt::Display for CertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the peer certificate is verified.
///
/// Only [`VerifyMode::None`] and [`VerifyMode::Peer`] are portable across
/// backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum VerifyMode {
    /// Do not verify the peer.
    None,

    /// Verify the peer certificate.
    #[default]
    Peer,

    /// Request a client certificate only once.
    ClientOnce,

    /// Fail the handshake if the peer presents no certificate.
    FailIfNoPeerCert,
}

impl fmt::Display for VerifyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VerifyMode::None => "none",
            VerifyMode::Peer => "peer",
            VerifyMode::ClientOnce => "client-once",
            VerifyMode::FailIfNoPeerCert => "fail-if-no-peer-cert",
        };
        f.write_str(name)
    }
}

/// Requested SSL/TLS protocol version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SslVersion {
    /// Let the backend decide.
    #[default]
    Auto,

    /// TLS 1.x
    TlsV1,

    /// SSL 2
    SslV2,

    /// SSL 3
    SslV3,
}

/// Certificate or key material, either on disk or already in memory.
#[derive(Clone, PartialEq, Eq)]
pub enum CertSource {
    /// A path to a file holding the material.
    File(PathBuf),

    /// The material itself.
    Memory(Bytes),
}

impl CertSource {
    /// Read the material into memory.
    pub fn load(&self) -> Result<Bytes> {
        match self {
            CertSource::File(path) => std::fs::read(path)
                .map(Bytes::from)
                .map_err(|error| Error::Ssl(format!("{}: {error}", path.display()).into())),
            CertSource::Memory(bytes) => Ok(bytes.clone()),
        }
    }

    /// The path, if this material lives on disk.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            CertSource::File(path) => Some(path),
            CertSource::Memory(_) => None,
        }
    }
}

impl fmt::Debug for CertSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertSource::File(path) => f.debug_tuple("File").field(path).finish(),
            CertSource::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
        }
    }
}

impl From<PathBuf> for CertSource {
    fn from(path: PathBuf) -> Self {
        CertSource::File(path)
    }
}

impl From<&std::path::Path> for CertSource {
    fn from(path: &std::path::Path) -> Self {
        CertSource::File(path.to_owned())
    }
}

impl From<Bytes> for CertSource {
    fn from(bytes: Bytes) -> Self {
        CertSource::Memory(bytes)
    }
}

impl From<Vec<u8>> for CertSource {
    fn from(bytes: Vec<u8>) -> Self {
        CertSource::Memory(bytes.into())
    }
}

/// Transport security settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SslConfig {
    /// Private key for the client certificate.
    pub cert_key_file: Option<CertSource>,

    /// Client certificate.
    pub cert_file: Option<CertSource>,

    /// CA bundle used to verify the peer.
    pub ca_cert_file: Option<CertSource>,

    /// Encoding of the certificate and key material.
    pub cert_type: CertType,

    /// Peer verification.
    pub verify_mode: VerifyMode,

    /// Requested protocol version.
    pub ssl_version: SslVersion,
}

impl SslConfig {
    /// Create a configuration which verifies the peer with the backend's
    /// default roots.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any client certificate material is configured.
    pub fn has_client_certificate(&self) -> bool {
        self.cert_file.is_some() || self.cert_key_file.is_some()
    }

    /// Whether the peer certificate is verified.
    pub fn verifies_peer(&self) -> bool {
        self.verify_mode != VerifyMode::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_no_auth() {
        let auth = Auth::new();
        assert_eq!(auth.kind(), AuthType::None);
        assert!(auth.credentials().is_none());
        assert!(auth.ssl().is_none());
        assert!(!auth.is_http());
    }

    #[test]
    fn credentials_imply_basic() {
        let mut auth = Auth::new();
        auth.set_credentials("u", "p");
        assert_eq!(auth.kind(), AuthType::Basic);
        assert_eq!(auth.credentials().unwrap().username(), "u");
        assert_eq!(auth.credentials().unwrap().password(), "p");
    }

    #[test]
    fn credentials_keep_explicit_scheme() {
        let mut auth = Auth::new();
        auth.digest("a", "b");
        auth.set_credentials("u", "p");
        assert_eq!(auth.kind(), AuthType::Digest);
        assert_eq!(auth.credentials().unwrap().username(), "u");
    }

    #[test]
    fn gssnegotiate_drops_credentials() {
        let mut auth = Auth::new();
        auth.ntlm("u", "p");
        assert!(auth.is_ntlm());
        auth.gssnegotiate();
        assert!(auth.is_gssnegotiate());
        assert!(auth.credentials().is_none());
    }

    #[test]
    fn password_is_redacted() {
        let credentials = Credentials::new("user", "hunter2");
        let debug = format!("{credentials:?}");
        assert!(debug.contains("user"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn ssl_defaults_to_peer_verification() {
        let mut auth = Auth::new();
        let ssl = auth.ssl_mut();
        assert_eq!(ssl.verify_mode, VerifyMode::Peer);
        assert_eq!(ssl.cert_type, CertType::Pem);
        assert_eq!(ssl.ssl_version, SslVersion::Auto);
        assert!(!ssl.has_client_certificate());
        assert!(auth.ssl().is_some());
    }

    #[test]
    fn memory_source_loads_its_bytes() {
        let source = CertSource::from(b"---cert---".to_vec());
        assert_eq!(source.load().unwrap(), Bytes::from_static(b"---cert---"));
        assert!(source.path().is_none());
    }

    #[test]
    fn missing_file_is_an_ssl_error() {
        let source = CertSource::from(PathBuf::from("/does/not/exist.pem"));
        assert!(matches!(source.load(), Err(Error::Ssl(_))));
    }
}
