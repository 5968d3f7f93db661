//! Error types shared by the fetcher, the resolver and the font cache

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to callers of the font loading pipeline
#[derive(Debug, Error)]
pub enum FontError {
    /// Bad weight, malformed style query, or a URL that is not a raw font link
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Remote resource (or matching font format) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Local font file does not exist
    #[error("Font file not found: '{}'.", .0.display())]
    FileNotFound(PathBuf),

    /// Certificate verification failed and the caller did not opt out
    #[error(
        "SSL certificate verification failed for {url}. If you trust this source, \
         retry with `danger_skip_tls_verify = true` (this disables certificate checks \
         and exposes you to man-in-the-middle attacks)."
    )]
    TlsVerification { url: String },

    /// No connectivity, DNS failure, sandboxed environment, timeout
    #[error(
        "Failed to load font from {url}: {reason}. This may be due to a lack of internet \
         connection or an environment where network access is not available."
    )]
    Network { url: String, reason: String },

    /// Non-success HTTP status other than 404
    #[error("An HTTP error has occurred. Code: {status} for URL: {url}")]
    Fetch { status: u16, url: String },

    /// Response body larger than the configured cap
    #[error("Content too large: {size} bytes (max: {max})")]
    ContentTooLarge { size: u64, max: u64 },

    /// Bytes on disk are not a usable font
    #[error("Failed to load font {}: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },

    /// Local filesystem failure inside the font cache
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Result type for font operations
pub type Result<T> = std::result::Result<T, FontError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tls_message_names_opt_out() {
        let err = FontError::TlsVerification {
            url: "https://example.com/font.ttf".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("SSL certificate verification failed"));
        assert!(msg.contains("danger_skip_tls_verify"));
    }

    #[test]
    fn test_file_not_found_message() {
        let err = FontError::FileNotFound(PathBuf::from("/path/to/font.ttf"));
        assert_eq!(err.to_string(), "Font file not found: '/path/to/font.ttf'.");
    }
}
