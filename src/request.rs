//! The canonical, backend-agnostic request.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Uri};

use crate::auth::Auth;
use crate::error::{Error, Result};

/// Check that `uri` is an absolute `http` or `https` URL with a host.
fn validate(text: &str, uri: &Uri) -> Result<()> {
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        Some(other) => {
            return Err(Error::InvalidRequest(format!(
                "{text:?}: unsupported scheme {other:?}"
            )))
        }
        None => {
            return Err(Error::InvalidRequest(format!(
                "{text:?}: URL must be absolute"
            )))
        }
    }

    match uri.host() {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(Error::InvalidRequest(format!("{text:?}: URL has no host"))),
    }
}

/// An absolute `http` or `https` URL.
///
/// The text is kept exactly as given, so a URL displays the way it was
/// written even where the parsed [`Uri`] would normalize it (an empty path,
/// a fragment).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Url {
    text: String,
    uri: Uri,
}

impl Url {
    /// Parse an absolute `http` or `https` URL.
    pub fn parse(text: &str) -> Result<Self> {
        let uri: Uri = text
            .parse()
            .map_err(|error| Error::InvalidRequest(format!("{text:?}: {error}")))?;
        validate(text, &uri)?;
        Ok(Self {
            text: text.to_owned(),
            uri,
        })
    }

    /// The URL as written.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The parsed URI. It carries no fragment.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The scheme, `http` or `https`.
    pub fn scheme_str(&self) -> &str {
        self.uri.scheme_str().unwrap_or("http")
    }

    /// Whether the scheme is `https`.
    pub fn is_https(&self) -> bool {
        self.scheme_str() == "https"
    }

    /// The host, without user info or port.
    pub fn host(&self) -> &str {
        self.uri.host().unwrap_or_default()
    }

    /// The explicit port, if any.
    pub fn port_u16(&self) -> Option<u16> {
        self.uri.port_u16()
    }

    /// User name and optional password from the authority.
    ///
    /// They are returned as written; percent-encoded characters are not
    /// decoded.
    pub fn userinfo(&self) -> Option<(&str, Option<&str>)> {
        let authority = self.uri.authority()?.as_str();
        let (userinfo, _) = authority.rsplit_once('@')?;
        Some(match userinfo.split_once(':') {
            Some((username, password)) => (username, Some(password)),
            None => (userinfo, None),
        })
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Url {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        Url::parse(text)
    }
}

impl TryFrom<Uri> for Url {
    type Error = Error;

    fn try_from(uri: Uri) -> Result<Self> {
        let text = uri.to_string();
        validate(&text, &uri)?;
        Ok(Self { text, uri })
    }
}

impl PartialEq<str> for Url {
    fn eq(&self, other: &str) -> bool {
        self.text == other
    }
}

impl PartialEq<&str> for Url {
    fn eq(&self, other: &&str) -> bool {
        self.text == *other
    }
}

fn positive(timeout: Duration, name: &str) -> Result<Duration> {
    if timeout.is_zero() {
        return Err(Error::InvalidRequest(format!("{name} must be positive")));
    }
    Ok(timeout)
}

/// An outbound HTTP request, independent of the backend which will send it.
#[derive(Debug, Clone)]
pub struct Request {
    url: Url,
    body: Option<Bytes>,
    headers: HeaderMap,
    open_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    proxy: Option<Url>,
    auth: Auth,
}

impl Request {
    /// Create a request for an absolute `http` or `https` URL.
    pub fn new(url: &str) -> Result<Self> {
        Url::parse(url).map(Self::from_url)
    }

    /// Create a request from an already parsed URI.
    ///
    /// Fails unless the URI is an absolute `http` or `https` URL.
    pub fn from_uri(url: Uri) -> Result<Self> {
        Url::try_from(url).map(Self::from_url)
    }

    /// Create a request for a parsed URL.
    pub fn from_url(url: Url) -> Self {
        Self {
            url,
            body: None,
            headers: HeaderMap::new(),
            open_timeout: None,
            read_timeout: None,
            proxy: None,
            auth: Auth::default(),
        }
    }

    /// The target URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Replace the target URL.
    pub fn set_url(&mut self, url: &str) -> Result<&mut Self> {
        self.url = Url::parse(url)?;
        Ok(self)
    }

    /// The request body.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Replace the request body.
    pub fn set_body(&mut self, body: impl Into<Bytes>) -> &mut Self {
        self.body = Some(body.into());
        self
    }

    /// Remove the request body.
    pub fn take_body(&mut self) -> Option<Bytes> {
        self.body.take()
    }

    /// Set the body, builder style.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.set_body(body);
        self
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the request headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Set a header, replacing any earlier value for the same name.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|error| Error::InvalidRequest(format!("header {name:?}: {error}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|error| Error::InvalidRequest(format!("header {name}: {error}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Set a header, builder style.
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        self.set_header(name, value)?;
        Ok(self)
    }

    /// Time allowed for establishing the connection.
    pub fn open_timeout(&self) -> Option<Duration> {
        self.open_timeout
    }

    /// Set the time allowed for establishing the connection.
    pub fn set_open_timeout(&mut self, timeout: Duration) -> Result<&mut Self> {
        self.open_timeout = Some(positive(timeout, "open timeout")?);
        Ok(self)
    }

    /// Time allowed for receiving the response.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// Set the time allowed for receiving the response.
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<&mut Self> {
        self.read_timeout = Some(positive(timeout, "read timeout")?);
        Ok(self)
    }

    /// Set the connection timeout, builder style.
    pub fn with_open_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.set_open_timeout(timeout)?;
        Ok(self)
    }

    /// Set the response timeout, builder style.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.set_read_timeout(timeout)?;
        Ok(self)
    }

    /// The proxy URL, if one is set.
    pub fn proxy(&self) -> Option<&Url> {
        self.proxy.as_ref()
    }

    /// Send the request through a proxy.
    pub fn set_proxy(&mut self, proxy: &str) -> Result<&mut Self> {
        self.proxy = Some(Url::parse(proxy)?);
        Ok(self)
    }

    /// Set the proxy, builder style.
    pub fn with_proxy(mut self, proxy: &str) -> Result<Self> {
        self.set_proxy(proxy)?;
        Ok(self)
    }

    /// Send the request directly.
    pub fn clear_proxy(&mut self) -> &mut Self {
        self.proxy = None;
        self
    }

    /// Authentication and TLS settings.
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// Mutable access to the authentication and TLS settings.
    pub fn auth_mut(&mut self) -> &mut Auth {
        &mut self.auth
    }
}

impl FromStr for Request {
    type Err = Error;

    fn from_str(url: &str) -> Result<Self> {
        Request::new(url)
    }
}

/// Conversion into a [`Request`], used by the dispatcher shorthands.
///
/// Implemented for requests, URL strings, and `(url, body)` pairs.
pub trait IntoRequest {
    /// Build the request.
    fn into_request(self) -> Result<Request>;
}

impl IntoRequest for Request {
    fn into_request(self) -> Result<Request> {
        Ok(self)
    }
}

impl IntoRequest for &str {
    fn into_request(self) -> Result<Request> {
        Request::new(self)
    }
}

impl IntoRequest for String {
    fn into_request(self) -> Result<Request> {
        Request::new(&self)
    }
}

impl IntoRequest for &String {
    fn into_request(self) -> Result<Request> {
        Request::new(self)
    }
}

impl<U, B> IntoRequest for (U, B)
where
    U: AsRef<str>,
    B: Into<Bytes>,
{
    fn into_request(self) -> Result<Request> {
        let (url, body) = self;
        Ok(Request::new(url.as_ref())?.with_body(body))
    }
}
