//! Normalization of raw header blocks.
//!
//! Some backends only expose the response head as text, the status line
//! followed by one header per line. [`parse_header_block`] turns that text
//! into a [`HeaderMap`], keeping every value of repeated headers.

use http::header::{HeaderName, HeaderValue};
use http::HeaderMap;

/// The parsed response head.
#[derive(Debug, Clone, Default)]
pub struct HeaderBlock {
    /// Reason phrase from the last status line, if one was present.
    pub reason: Option<String>,

    /// Header fields, in the order they were received.
    pub headers: HeaderMap,
}

/// Reason phrase of an `HTTP/<version> <code> <reason>` line.
fn status_line(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("HTTP/")?;
    let (version, rest) = rest.split_once(' ')?;
    if version.is_empty() || !version.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }

    let (code, reason) = match rest.split_once(' ') {
        Some((code, reason)) => (code, reason),
        None => (rest, ""),
    };
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some(reason.trim())
}

/// Parse a raw status-line-plus-headers block.
///
/// Lines that are neither a status line nor a `name: value` pair are
/// skipped. A status line which follows headers starts a new response head
/// (interim `1xx` responses and followed redirects both produce one), so
/// only the headers of the final response are kept.
pub fn parse_header_block(block: &[u8]) -> HeaderBlock {
    let text = String::from_utf8_lossy(block);
    let mut parsed = HeaderBlock::default();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        if let Some(reason) = status_line(line) {
            parsed.reason = Some(reason.to_owned());
            parsed.headers.clear();
            continue;
        }

        let Some((name, value)) = line.split_once(':') else {
            tracing::warn!(line, "skipping header line without a colon");
            continue;
        };

        let name = match HeaderName::from_bytes(name.trim().as_bytes()) {
            Ok(name) => name,
            Err(error) => {
                tracing::warn!(line, %error, "skipping header with an invalid name");
                continue;
            }
        };

        let value = match HeaderValue::from_str(value.trim()) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(line, %error, "skipping header with an invalid value");
                continue;
            }
        };

        parsed.headers.append(name, value);
    }

    parsed
}
