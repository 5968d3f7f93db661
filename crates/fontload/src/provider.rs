//! Web font provider resolution
//!
//! Turns a family/weight/italic request into a direct font-file URL by asking
//! a provider's CSS endpoint and scanning the returned stylesheet. Google
//! Fonts and Bunny Fonts share the same `css2` query syntax:
//!
//! ```text
//! https://fonts.googleapis.com/css2?family=Open+Sans:ital,wght@1,700
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::cache::ResolutionCache;
use crate::error::{FontError, Result};
use crate::url::fetch::{compute_checksum, get_with_tls_fallback, Transport};

/// Named weights accepted in place of a number
pub const WEIGHT_NAMES: [(&str, u16); 9] = [
    ("thin", 100),
    ("extra-light", 200),
    ("light", 300),
    ("regular", 400),
    ("medium", 500),
    ("semi-bold", 600),
    ("bold", 700),
    ("extra-bold", 800),
    ("black", 900),
];

/// Valid numeric weight range
pub const WEIGHT_RANGE: std::ops::RangeInclusive<u16> = 100..=900;

/// Finds `url(...)` references in a stylesheet, with optional quotes
static CSS_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"url\(\s*['"]?(https://[^)'"\s]+)['"]?\s*\)"#).expect("valid url() pattern")
});

/// Requested font weight
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Weight {
    Numeric(u16),
    /// One of [`WEIGHT_NAMES`], matched case-insensitively
    Named(String),
}

impl Weight {
    /// Numeric weight; unknown names are rejected, range is not checked here
    pub fn to_numeric(&self) -> Result<u16> {
        match self {
            Weight::Numeric(value) => Ok(*value),
            Weight::Named(name) => {
                let lower = name.to_ascii_lowercase();
                WEIGHT_NAMES
                    .iter()
                    .find(|(token, _)| *token == lower)
                    .map(|(_, value)| *value)
                    .ok_or_else(|| {
                        FontError::InvalidArgument(format!(
                            "Invalid weight descriptor: {}. Valid options are: thin, extra-light, \
                             light, regular, medium, semi-bold, bold, extra-bold, black.",
                            name
                        ))
                    })
            }
        }
    }
}

impl From<u16> for Weight {
    fn from(value: u16) -> Self {
        Weight::Numeric(value)
    }
}

impl From<&str> for Weight {
    fn from(name: &str) -> Self {
        Weight::Named(name.to_string())
    }
}

impl From<String> for Weight {
    fn from(name: String) -> Self {
        Weight::Named(name)
    }
}

/// Description of the font variant to resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleQuery {
    pub family: String,
    pub weight: Option<Weight>,
    pub italic: Option<bool>,
    /// Format tokens in order of preference; empty means provider default
    pub allowed_formats: Vec<String>,
}

impl StyleQuery {
    pub fn new(family: &str) -> Self {
        Self {
            family: family.to_string(),
            weight: None,
            italic: None,
            allowed_formats: Vec::new(),
        }
    }

    pub fn weight(mut self, weight: impl Into<Weight>) -> Self {
        self.weight = Some(weight.into());
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = Some(italic);
        self
    }

    pub fn formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_formats = formats.into_iter().map(Into::into).collect();
        self
    }

    /// Validated, numeric form of this query
    ///
    /// Named weights are mapped to numbers; the numeric range is enforced
    /// later, when the provider URL is built.
    pub fn normalize(&self, provider: &Provider) -> Result<NormalizedQuery> {
        let family = self.family.trim();
        if family.is_empty() {
            return Err(FontError::InvalidArgument(
                "`family` must not be empty".to_string(),
            ));
        }

        let weight = self.weight.as_ref().map(Weight::to_numeric).transpose()?;

        let allowed_formats = if self.allowed_formats.is_empty() {
            provider.default_formats()
        } else {
            self.allowed_formats.clone()
        };
        if allowed_formats.iter().any(|f| f.trim().is_empty()) {
            return Err(FontError::InvalidArgument(
                "`allowed_formats` must not contain empty entries".to_string(),
            ));
        }

        Ok(NormalizedQuery {
            family: family.to_string(),
            weight,
            italic: self.italic,
            allowed_formats,
        })
    }
}

/// Style query with the weight resolved to a number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery {
    pub family: String,
    pub weight: Option<u16>,
    pub italic: Option<bool>,
    pub allowed_formats: Vec<String>,
}

impl NormalizedQuery {
    /// Resolution cache key: SHA-256 of the query as key-sorted JSON
    pub fn cache_key(&self) -> String {
        let canonical: BTreeMap<&str, Value> = BTreeMap::from([
            ("family", json!(self.family)),
            ("weight", json!(self.weight)),
            ("italic", json!(self.italic)),
            ("allowed_formats", json!(self.allowed_formats)),
        ]);
        let encoded = serde_json::to_string(&canonical).unwrap_or_default();
        compute_checksum(encoded.as_bytes())
    }
}

/// CSS endpoint serving `@font-face` rules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    /// fonts.googleapis.com
    Google,
    /// fonts.bunny.net
    Bunny,
    /// Any endpoint speaking the same query syntax
    Custom { endpoint: String },
}

impl Provider {
    pub fn endpoint(&self) -> &str {
        match self {
            Provider::Google => "https://fonts.googleapis.com/css2",
            Provider::Bunny => "https://fonts.bunny.net/css",
            Provider::Custom { endpoint } => endpoint,
        }
    }

    /// Formats tried when a query does not name any
    pub fn default_formats(&self) -> Vec<String> {
        let formats: &[&str] = match self {
            Provider::Bunny => &["woff", "ttf", "otf"],
            Provider::Google | Provider::Custom { .. } => &["woff2", "woff", "ttf", "otf"],
        };
        formats.iter().map(|f| f.to_string()).collect()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Google => f.write_str("Google Fonts"),
            Provider::Bunny => f.write_str("Bunny Fonts"),
            Provider::Custom { endpoint } => f.write_str(endpoint),
        }
    }
}

/// Build the stylesheet URL for a query
///
/// Fails when the weight is outside `100..=900`.
pub fn build_query_url(endpoint: &str, query: &NormalizedQuery) -> Result<String> {
    let family: String = ::url::form_urlencoded::byte_serialize(query.family.as_bytes()).collect();
    let mut url = format!("{}?family={}", endpoint, family);

    let mut axes = Vec::new();
    let mut values = Vec::new();

    if let Some(italic) = query.italic {
        axes.push("ital");
        values.push(u8::from(italic).to_string());
    }
    if let Some(weight) = query.weight {
        if !WEIGHT_RANGE.contains(&weight) {
            return Err(FontError::InvalidArgument(format!(
                "`weight` must be between 100 and 900, not {}.",
                weight
            )));
        }
        axes.push("wght");
        values.push(weight.to_string());
    }

    if !axes.is_empty() {
        url.push_str(&format!(":{}@{}", axes.join(","), values.join(",")));
    }
    Ok(url)
}

/// All `url(https://...)` references whose extension is in `allowed`,
/// in document order, paired with that extension
pub fn extract_font_urls(css: &str, allowed: &[String]) -> Vec<(String, String)> {
    CSS_URL
        .captures_iter(css)
        .filter_map(|caps| {
            let url = caps.get(1)?.as_str();
            let ext = url.rsplit('.').next()?;
            allowed
                .iter()
                .any(|fmt| fmt == ext)
                .then(|| (url.to_string(), ext.to_string()))
        })
        .collect()
}

/// Pick the first URL of the most preferred format that has any match
pub fn select_font_url(matches: &[(String, String)], allowed: &[String]) -> Option<String> {
    allowed.iter().find_map(|fmt| {
        matches
            .iter()
            .find(|(_, ext)| ext == fmt)
            .map(|(url, _)| url.clone())
    })
}

/// Resolve a style query to a direct font-file URL
///
/// Consults `cache` first when given; a fresh resolution is stored back into
/// it before returning.
///
/// # Arguments
/// * `transport` - Client for the stylesheet request
/// * `cache` - Resolution cache, or `None` to always ask the provider
/// * `provider` - Stylesheet endpoint to query
/// * `query` - Requested style
/// * `danger_skip_tls_verify` - Retry the stylesheet request unverified after
///   a certificate failure
///
/// # Returns
/// * `Ok(String)` - Font-file URL of the most preferred available format
/// * `Err(FontError)` - Invalid query, request failure, error status or no
///   usable `url(...)` in the stylesheet
///
/// # Example
/// ```no_run
/// # use fontload::provider::resolve;
/// # use fontload::{HttpTransport, LoaderConfig, Provider, ResolutionCache, StyleQuery};
/// let transport = HttpTransport::new(&LoaderConfig::default()).unwrap();
/// let mut cache = ResolutionCache::in_memory();
/// let url = resolve(&transport, Some(&mut cache), &Provider::Google, &StyleQuery::new("Roboto"), false)
///     .unwrap();
/// ```
pub fn resolve(
    transport: &dyn Transport,
    mut cache: Option<&mut ResolutionCache>,
    provider: &Provider,
    query: &StyleQuery,
    danger_skip_tls_verify: bool,
) -> Result<String> {
    let normalized = query.normalize(provider)?;
    let key = normalized.cache_key();

    if let Some(cache) = cache.as_deref_mut() {
        if let Some(url) = cache.get(&key) {
            tracing::debug!("resolution cache hit for '{}': {}", normalized.family, url);
            return Ok(url);
        }
    }

    let query_url = build_query_url(provider.endpoint(), &normalized)?;
    let response = get_with_tls_fallback(transport, &query_url, danger_skip_tls_verify)?;
    if !response.is_success() {
        return Err(FontError::Fetch {
            status: response.status,
            url: query_url,
        });
    }

    let css = response.text();
    if !CSS_URL.is_match(&css) {
        return Err(FontError::NotFound(format!(
            "No font available for the request at URL {}",
            query_url
        )));
    }

    let matches = extract_font_urls(&css, &normalized.allowed_formats);
    let font_url = select_font_url(&matches, &normalized.allowed_formats).ok_or_else(|| {
        FontError::NotFound(format!(
            "No font files found in formats {:?} for '{}'",
            normalized.allowed_formats, normalized.family
        ))
    })?;

    tracing::debug!("resolved '{}' via {} to {}", normalized.family, provider, font_url);

    if let Some(cache) = cache {
        cache.put(&key, &font_url);
    }
    Ok(font_url)
}
