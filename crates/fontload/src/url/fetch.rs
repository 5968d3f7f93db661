//! HTTP fetching
//!
//! `Transport` is the seam between the pipeline and the network. The default
//! implementation wraps a blocking reqwest client; a second client with
//! certificate checks disabled is only built when a caller opts out.

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::time::Duration;
use thiserror::Error;

use crate::config::LoaderConfig;
use crate::error::FontError;

/// Lower-cased fragments that identify a certificate verification failure
const CERTIFICATE_MARKERS: [&str; 5] = [
    "certificate",
    "unknownissuer",
    "self signed",
    "self-signed",
    "cert verify",
];

/// Errors raised below the HTTP status level
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// TLS handshake rejected the server certificate
    #[error("certificate verification failed: {0}")]
    Tls(String),

    /// Anything else that prevented a response
    #[error("network error: {0}")]
    Network(String),

    /// Body exceeded the configured size cap
    #[error("content too large: {size} bytes (max: {max})")]
    TooLarge { size: u64, max: u64 },

    /// Client could not be built
    #[error("client error: {0}")]
    Client(String),
}

impl TransportError {
    /// Attach the request URL and convert into the public taxonomy
    pub fn into_font_error(self, url: &str) -> FontError {
        match self {
            TransportError::Tls(_) => FontError::TlsVerification {
                url: url.to_string(),
            },
            TransportError::Network(reason) => FontError::Network {
                url: url.to_string(),
                reason,
            },
            TransportError::TooLarge { size, max } => FontError::ContentTooLarge { size, max },
            TransportError::Client(reason) => FontError::Client(reason),
        }
    }
}

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Check if response is OK (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Blocking GET. Non-2xx statuses are returned as responses, not errors.
pub trait Transport {
    fn get(&self, url: &str, verify_tls: bool) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn get(&self, url: &str, verify_tls: bool) -> Result<HttpResponse, TransportError> {
        (**self).get(url, verify_tls)
    }
}

/// reqwest-backed transport
pub struct HttpTransport {
    verified: Client,
    unverified: OnceCell<Client>,
    user_agent: String,
    timeout: Duration,
    max_size: u64,
}

impl HttpTransport {
    /// Create a transport from loader settings
    pub fn new(config: &LoaderConfig) -> Result<Self, TransportError> {
        let verified = build_client(&config.user_agent, config.timeout, false)?;

        Ok(Self {
            verified,
            unverified: OnceCell::new(),
            user_agent: config.user_agent.clone(),
            timeout: config.timeout,
            max_size: config.max_content_size,
        })
    }

    fn client(&self, verify_tls: bool) -> Result<&Client, TransportError> {
        if verify_tls {
            return Ok(&self.verified);
        }
        self.unverified
            .get_or_try_init(|| build_client(&self.user_agent, self.timeout, true))
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, verify_tls: bool) -> Result<HttpResponse, TransportError> {
        tracing::info!("HTTP GET {} (verify_tls={})", url, verify_tls);

        let response = self.client(verify_tls)?.get(url).send().map_err(classify)?;
        let status = response.status().as_u16();

        if let Some(len) = response.content_length() {
            if len > self.max_size {
                return Err(TransportError::TooLarge {
                    size: len,
                    max: self.max_size,
                });
            }
        }

        // Read content with size limit
        let mut body = Vec::new();
        let mut reader = response.take(self.max_size + 1);
        reader
            .read_to_end(&mut body)
            .map_err(|e| TransportError::Network(error_chain(&e)))?;

        if body.len() as u64 > self.max_size {
            return Err(TransportError::TooLarge {
                size: body.len() as u64,
                max: self.max_size,
            });
        }

        Ok(HttpResponse { status, body })
    }
}

fn build_client(
    user_agent: &str,
    timeout: Duration,
    accept_invalid_certs: bool,
) -> Result<Client, TransportError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .map_err(|e| TransportError::Client(error_chain(&e)))
}

fn classify(err: reqwest::Error) -> TransportError {
    // The request URL is attached by the caller; keep it out of the reason
    let err = err.without_url();
    let chain = error_chain(&err);
    if is_certificate_error(&err) {
        TransportError::Tls(chain)
    } else {
        TransportError::Network(chain)
    }
}

/// Render an error and all of its sources as `outer: inner: ...`
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        let text = inner.to_string();
        if !parts.contains(&text) {
            parts.push(text);
        }
        source = inner.source();
    }
    parts.join(": ")
}

/// Only the causes are inspected. The outermost message may echo the URL.
fn is_certificate_error(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = err.source();
    while let Some(inner) = source {
        if has_certificate_marker(&inner.to_string()) {
            return true;
        }
        source = inner.source();
    }
    false
}

fn has_certificate_marker(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    CERTIFICATE_MARKERS.iter().any(|m| lower.contains(m))
}

/// GET `url`, retrying once without certificate checks if the caller opted out
///
/// A certificate failure without the opt-out becomes
/// [`FontError::TlsVerification`]. With the opt-out, a warning is emitted and
/// the request is repeated with verification disabled.
pub fn get_with_tls_fallback(
    transport: &dyn Transport,
    url: &str,
    danger_skip_tls_verify: bool,
) -> Result<HttpResponse, FontError> {
    match transport.get(url, true) {
        Ok(response) => Ok(response),
        Err(TransportError::Tls(reason)) if danger_skip_tls_verify => {
            tracing::warn!(
                "SSL certificate verification disabled for {} after: {}. \
                 This is a security risk.",
                url,
                reason
            );
            transport
                .get(url, false)
                .map_err(|e| e.into_font_error(url))
        }
        Err(e) => Err(e.into_font_error(url)),
    }
}

/// Compute SHA-256 checksum of bytes (hex-encoded)
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
