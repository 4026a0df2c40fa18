use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::auth::{AuthType, CertType, VerifyMode};
use crate::BoxError;

/// A feature of a request which a backend may not be able to honor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Feature {
    /// An HTTP method without a dedicated verb on the backend.
    Method(http::Method),

    /// An authentication scheme.
    Auth(AuthType),

    /// A certificate verification mode.
    VerifyMode(VerifyMode),

    /// Sending the request through a proxy.
    Proxy,

    /// Tunnelling an `https` request through a proxy.
    HttpsProxy,

    /// Reaching the proxy itself over `https`.
    SecureProxy,

    /// A custom CA certificate bundle.
    CaFile,

    /// Presenting a client certificate.
    ClientCertificate,

    /// Certificate material in the given encoding.
    CertType(CertType),
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Method(method) => write!(f, "custom HTTP method {method}"),
            Feature::Auth(kind) => write!(f, "{kind} authentication"),
            Feature::VerifyMode(mode) => write!(f, "SSL verify mode {mode}"),
            Feature::Proxy => f.write_str("proxies"),
            Feature::HttpsProxy => f.write_str("https requests through a proxy"),
            Feature::SecureProxy => f.write_str("proxies reached over https"),
            Feature::CaFile => f.write_str("CA files"),
            Feature::ClientCertificate => f.write_str("client certificates"),
            Feature::CertType(kind) => write!(f, "{kind} certificates"),
        }
    }
}

/// Error type for dispatching requests through an adapter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The request could not be built, usually because the URL does not parse.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No backend is registered under this name.
    #[error("unknown adapter: {0:?}")]
    UnknownAdapter(String),

    /// The backend is registered, but its transport could not be loaded.
    #[error("adapter {backend:?} is unavailable: {source}")]
    BackendUnavailable {
        /// Name of the backend.
        backend: String,

        /// Why the transport could not be loaded.
        #[source]
        source: BoxError,
    },

    /// The backend cannot honor a feature of the request.
    #[error("{backend} does not support {feature}")]
    NotSupported {
        /// Name of the backend.
        backend: String,

        /// The feature which was rejected.
        feature: Feature,
    },

    /// The backend signalled that the request exceeded its time bounds.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// Certificate material could not be loaded or materialized.
    #[error("ssl: {0}")]
    Ssl(#[source] BoxError),

    /// The backend returned a response which could not be normalized.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Any other failure reported by the backend transport.
    #[error("transport: {0}")]
    Transport(#[source] BoxError),
}

impl Error {
    pub(crate) fn not_supported(backend: impl Into<String>, feature: Feature) -> Self {
        Error::NotSupported {
            backend: backend.into(),
            feature,
        }
    }

    pub(crate) fn unavailable(backend: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::BackendUnavailable {
            backend: backend.into(),
            source: source.into(),
        }
    }

    /// The rejected feature, if this is a [`Error::NotSupported`] error.
    pub fn unsupported_feature(&self) -> Option<&Feature> {
        match self {
            Error::NotSupported { feature, .. } => Some(feature),
            _ => None,
        }
    }

    /// Whether this error was caused by a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}

/// Result alias for this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
