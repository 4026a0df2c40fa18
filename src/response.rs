//! The canonical response returned by every adapter.

use std::borrow::Cow;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::error::{Error, Result};

/// A completed HTTP response.
///
/// Headers keep every value of repeated fields in the order the backend
/// delivered them. The body is never decoded.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Create a response.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Create a response from a raw status code as reported by a backend.
    ///
    /// A zero status is how several transports report that no response
    /// arrived in time, so it becomes [`Error::Timeout`] with the elapsed
    /// time. Any other code outside `100..=999` is an invalid response.
    pub fn from_raw(
        code: u32,
        headers: HeaderMap,
        body: impl Into<Bytes>,
        elapsed: std::time::Duration,
    ) -> Result<Self> {
        if code == 0 {
            return Err(Error::Timeout(elapsed));
        }

        let status = u16::try_from(code)
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or_else(|| Error::InvalidResponse(format!("status code {code}")))?;

        Ok(Self::new(status, headers, body))
    }

    /// The status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The status code as an integer.
    pub fn code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Whether the status is a 4xx or 5xx code.
    pub fn is_error(&self) -> bool {
        self.status.is_client_error() || self.status.is_server_error()
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The first value of a header, if it is valid text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Every value of a header, in order.
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// The raw body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The body as text, replacing invalid UTF-8.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Consume the response, returning the body.
    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Consume the response, returning its parts.
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }
}
