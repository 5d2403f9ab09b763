//! Signed connection URLs.
//!
//! The service authenticates the WebSocket handshake through query
//! parameters: an HMAC-SHA256 signature over the host, an RFC-1123 date and
//! the request line, wrapped in a base64 authorization value. The date makes
//! every URL single-use, so a fresh one is signed for each connection.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio_tungstenite::tungstenite::http::Uri;

use crate::ChatError;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_ALGORITHM: &str = "hmac-sha256";
pub const SIGNED_HEADERS: &str = "host date request-line";

/// Source of the signing timestamp.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A URL valid for a single connection attempt.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedUrl {
    pub url: String,
    /// The RFC-1123 date baked into the signature.
    pub date: String,
    pub host: String,
}

impl SignedUrl {
    /// The URL without its credential-bearing query string, for logs.
    pub fn redacted(&self) -> &str {
        self.url.split('?').next().unwrap_or("")
    }
}

impl std::fmt::Debug for SignedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedUrl")
            .field("url", &self.redacted())
            .field("date", &self.date)
            .field("host", &self.host)
            .finish()
    }
}

impl std::fmt::Display for SignedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

/// Produces signed connection URLs.
#[derive(Clone)]
pub struct UrlSigner {
    clock: Arc<dyn Clock>,
}

impl UrlSigner {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Sign `endpoint_url` with a timestamp taken from the clock now.
    pub fn sign(
        &self,
        endpoint_url: &str,
        api_key: &str,
        api_secret: &str,
    ) -> Result<SignedUrl, ChatError> {
        let (host, path) = split_endpoint(endpoint_url)?;
        let date = rfc1123(&self.clock.now());

        let signature_origin = format!("host: {host}\ndate: {date}\nGET {path} HTTP/1.1");
        let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes())
            .map_err(|e| ChatError::InvalidParameter(format!("unusable api secret: {e}")))?;
        mac.update(signature_origin.as_bytes());
        let signature = B64.encode(mac.finalize().into_bytes());

        let authorization_origin = format!(
            "api_key=\"{api_key}\", algorithm=\"{SIGNATURE_ALGORITHM}\", headers=\"{SIGNED_HEADERS}\", signature=\"{signature}\""
        );
        let authorization = B64.encode(authorization_origin.as_bytes());

        let separator = if endpoint_url.contains('?') { '&' } else { '?' };
        let url = format!(
            "{endpoint_url}{separator}authorization={}&date={}&host={}",
            form_encode(&authorization),
            form_encode(&date),
            form_encode(&host),
        );

        Ok(SignedUrl { url, date, host })
    }
}

impl Default for UrlSigner {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a timestamp as an HTTP date, e.g. `Tue, 14 May 2024 07:30:00 GMT`.
pub fn rfc1123(ts: &DateTime<Utc>) -> String {
    ts.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Percent-encode a query value the way HTML forms do: spaces become `+`.
fn form_encode(value: &str) -> String {
    // `%` itself is escaped as `%25`, so every `%20` here is a space.
    urlencoding::encode(value).replace("%20", "+")
}

/// Check that `url` is a usable WebSocket endpoint.
pub fn validate_endpoint(url: &str) -> Result<(), ChatError> {
    split_endpoint(url).map(|_| ())
}

/// Split a WebSocket URL into its authority (`host[:port]`) and path.
fn split_endpoint(url: &str) -> Result<(String, String), ChatError> {
    let uri: Uri = url
        .parse()
        .map_err(|e| ChatError::InvalidEndpoint(format!("{url}: {e}")))?;

    match uri.scheme_str() {
        Some("ws") | Some("wss") => {}
        Some(other) => {
            return Err(ChatError::InvalidEndpoint(format!(
                "{url}: unsupported scheme '{other}'"
            )))
        }
        None => return Err(ChatError::InvalidEndpoint(format!("{url}: missing scheme"))),
    }

    let host = uri
        .authority()
        .map(|a| a.as_str().to_string())
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ChatError::InvalidEndpoint(format!("{url}: missing host")))?;

    Ok((host, uri.path().to_string()))
}
