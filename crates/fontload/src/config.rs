//! Loader configuration
//!
//! Cache locations and HTTP client settings. Defaults point at the per-user
//! cache directory; `FONTLOAD_CACHE_DIR` overrides the root.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the cache root
pub const CACHE_DIR_ENV: &str = "FONTLOAD_CACHE_DIR";

/// Maximum size for a downloaded font or stylesheet (50 MB)
pub const MAX_CONTENT_SIZE: u64 = 50 * 1024 * 1024;

/// HTTP request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Name of the directory holding cached font files
const FONTS_DIR: &str = "fonts";

/// Name of the resolution cache file
const RESOLUTION_FILE: &str = "resolved-urls.json";

/// Configuration for a [`crate::FontLoader`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Root directory for everything the loader persists
    pub cache_root: PathBuf,
    /// User agent sent with every request
    pub user_agent: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Largest response body accepted
    pub max_content_size: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            cache_root: default_cache_root(),
            user_agent: format!("fontload/{}", env!("CARGO_PKG_VERSION")),
            timeout: REQUEST_TIMEOUT,
            max_content_size: MAX_CONTENT_SIZE,
        }
    }
}

impl LoaderConfig {
    /// Default configuration, honouring `FONTLOAD_CACHE_DIR`
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
            config.cache_root = PathBuf::from(dir);
        }
        config
    }

    /// Configuration rooted at an explicit directory
    pub fn with_cache_root(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            ..Self::default()
        }
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn max_content_size(mut self, max: u64) -> Self {
        self.max_content_size = max;
        self
    }

    /// Directory holding `<sha256(url)><ext>` font files
    pub fn fonts_dir(&self) -> PathBuf {
        self.cache_root.join(FONTS_DIR)
    }

    /// JSON file mapping style-query keys to resolved URLs
    pub fn resolution_file(&self) -> PathBuf {
        self.cache_root.join(RESOLUTION_FILE)
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }
}

/// `~/.cache/fontload` (or the platform cache dir), with a relative fallback
fn default_cache_root() -> PathBuf {
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .map(|d| d.join("fontload"))
        .unwrap_or_else(|| PathBuf::from(".fontload-cache"))
}
