//! URL classification
//!
//! Decides whether a font reference is remote or local, and whether a remote
//! reference plausibly serves raw font bytes.
//!
//! ## Source-hosting links
//!
//! GitHub serves an HTML page for `https://github.com/<user>/<repo>/blob/...`.
//! Only the raw variants return the font itself:
//!
//! - `https://raw.githubusercontent.com/user/repo/main/font.ttf`
//! - `https://github.com/user/repo/raw/main/font.ttf`
//! - `https://github.com/user/repo/blob/main/font.ttf?raw=true`
//!
//! Any other host only has to end in a known font extension.

pub mod fetch;

pub use fetch::{
    compute_checksum, get_with_tls_fallback, HttpResponse, HttpTransport, Transport,
    TransportError,
};

use ::url::Url;

/// Extensions accepted as font files (compared case-insensitively)
pub const FONT_EXTENSIONS: [&str; 5] = ["ttf", "otf", "woff", "woff2", "eot"];

/// Source-hosting host that wraps files in HTML unless asked for raw bytes
const SOURCE_HOST: &str = "github.com";

/// Host serving raw file content for [`SOURCE_HOST`]
const RAW_CONTENT_HOST: &str = "raw.githubusercontent.com";

/// Whether `s` is a URI with a non-empty scheme
///
/// Any scheme qualifies (`http`, `ftp`, `file`, `mailto`, ...). Single-letter
/// schemes are Windows drive letters (`C:\fonts\a.ttf`) and count as local.
pub fn is_remote_reference(s: &str) -> bool {
    match Url::parse(s) {
        Ok(url) => url.scheme().len() > 1,
        Err(_) => false,
    }
}

/// Whether `url` plausibly points at a raw font binary
pub fn is_likely_font_file(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    let has_font_extension = path_extension(parsed.path())
        .map(|ext| FONT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if !has_font_extension {
        return false;
    }

    match parsed.host_str() {
        Some(host) if is_source_host(host) => {
            parsed.path().contains("/raw/")
                || parsed.query_pairs().any(|(k, v)| k == "raw" && v == "true")
        }
        _ => true,
    }
}

/// Extension of the URL's last path segment, with the leading dot and
/// original case (`".ttf"`), or an empty string when there is none
pub fn url_extension(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| path_extension(parsed.path()).map(|ext| format!(".{}", ext)))
        .unwrap_or_default()
}

fn is_source_host(host: &str) -> bool {
    host != RAW_CONTENT_HOST && (host == SOURCE_HOST || host == "www.github.com")
}

fn path_extension(path: &str) -> Option<&str> {
    let file_name = path.rsplit('/').next()?;
    let dot = file_name.rfind('.')?;
    if dot == 0 || dot + 1 == file_name.len() {
        return None;
    }
    Some(&file_name[dot + 1..])
}
