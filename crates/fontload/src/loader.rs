//! Font loader
//!
//! Ties the pieces together: classify the source, resolve provider queries,
//! fetch through the font cache and hand back a validated [`FontHandle`].

use std::fmt;
use std::path::PathBuf;

use crate::cache::{FontCache, ResolutionCache};
use crate::config::LoaderConfig;
use crate::error::{FontError, Result};
use crate::font::FontHandle;
use crate::provider::{self, Provider, StyleQuery};
use crate::url::fetch::{HttpTransport, Transport};
use crate::url::is_remote_reference;

/// Per-call switches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Read and write the on-disk caches. When off, fetched fonts land in a
    /// fresh temp file that the caller owns and must delete.
    pub use_cache: bool,
    /// Retry without certificate verification when TLS fails
    pub danger_skip_tls_verify: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            danger_skip_tls_verify: false,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn danger_skip_tls_verify(mut self, skip: bool) -> Self {
        self.danger_skip_tls_verify = skip;
        self
    }
}

/// Outcome of clearing the caches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearReport {
    pub fonts_dir: PathBuf,
    pub fonts_removed: bool,
    pub resolutions_removed: bool,
}

impl ClearReport {
    /// Whether anything was deleted
    pub fn cleaned(&self) -> bool {
        self.fonts_removed || self.resolutions_removed
    }
}

impl fmt::Display for ClearReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cleaned() {
            write!(f, "Font cache cleaned: {}", self.fonts_dir.display())
        } else {
            write!(f, "No font cache directory found. Nothing to clean.")
        }
    }
}

/// Loads fonts from local paths, URLs and web font providers
pub struct FontLoader<T: Transport = HttpTransport> {
    config: LoaderConfig,
    transport: T,
    fonts: FontCache,
    resolutions: ResolutionCache,
}

impl FontLoader<HttpTransport> {
    /// Loader with the environment's configuration
    pub fn new() -> Result<Self> {
        Self::with_config(LoaderConfig::from_env())
    }

    /// Loader with an explicit configuration and the HTTP transport
    pub fn with_config(config: LoaderConfig) -> Result<Self> {
        let transport =
            HttpTransport::new(&config).map_err(|e| FontError::Client(e.to_string()))?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> FontLoader<T> {
    /// Loader issuing its requests through `transport`
    pub fn with_transport(config: LoaderConfig, transport: T) -> Self {
        let fonts = FontCache::new(config.fonts_dir());
        let resolutions = ResolutionCache::with_file(config.resolution_file());
        Self {
            config,
            transport,
            fonts,
            resolutions,
        }
    }

    /// Replace the resolution cache, e.g. with [`ResolutionCache::in_memory`]
    pub fn with_resolution_cache(mut self, resolutions: ResolutionCache) -> Self {
        self.resolutions = resolutions;
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn font_cache(&self) -> &FontCache {
        &self.fonts
    }

    /// Load a font from a local path or a URL
    ///
    /// Anything that parses as a URI with a scheme is fetched; everything else
    /// is treated as a filesystem path.
    ///
    /// # Arguments
    /// * `source` - Filesystem path or font URL
    /// * `options` - Cache and TLS switches for the download
    ///
    /// # Returns
    /// * `Ok(FontHandle)` - Parsed font backed by a local file
    /// * `Err(FontError)` - Missing file, failed download or invalid font data
    ///
    /// # Example
    /// ```no_run
    /// # use fontload::{FontLoader, LoadOptions};
    /// let loader = FontLoader::new().unwrap();
    /// let font = loader
    ///     .load_font("https://example.com/fonts/Inter.ttf", LoadOptions::default())
    ///     .unwrap();
    /// println!("{:?}", font.family_name());
    /// ```
    pub fn load_font(&self, source: &str, options: LoadOptions) -> Result<FontHandle> {
        if !is_remote_reference(source) {
            return FontHandle::from_path(source);
        }
        let path = self.fetch_font(source, options)?;
        FontHandle::from_path(path)
    }

    /// Download (or reuse) the font at `url` and return its local path
    ///
    /// # Arguments
    /// * `url` - Remote font URL
    /// * `options` - Cache and TLS switches
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - The cache entry, or with `use_cache` off a temp file
    ///   the caller must delete
    /// * `Err(FontError)` - Request failed or the body is not a font
    ///
    /// # Example
    /// ```no_run
    /// # use fontload::{FontLoader, LoadOptions};
    /// let loader = FontLoader::new().unwrap();
    /// let path = loader
    ///     .fetch_font("https://example.com/fonts/Inter.ttf", LoadOptions::new().use_cache(false))
    ///     .unwrap();
    /// std::fs::remove_file(path).unwrap();
    /// ```
    pub fn fetch_font(&self, url: &str, options: LoadOptions) -> Result<PathBuf> {
        self.fonts.fetch(&self.transport, url, options)
    }

    /// Resolve a style query against `provider` to a font-file URL
    ///
    /// # Arguments
    /// * `provider` - Google, Bunny or a custom CSS endpoint
    /// * `query` - Family, weight, italic flag and accepted formats
    /// * `options` - `use_cache` gates the resolution cache, and
    ///   `danger_skip_tls_verify` applies to the stylesheet request
    ///
    /// # Returns
    /// * `Ok(String)` - URL of the selected font file
    /// * `Err(FontError)` - Invalid query, provider error or no matching font
    ///
    /// # Example
    /// ```no_run
    /// # use fontload::{FontLoader, LoadOptions, Provider, StyleQuery};
    /// let mut loader = FontLoader::new().unwrap();
    /// let query = StyleQuery::new("Roboto").weight("bold");
    /// let url = loader
    ///     .resolve_font_url(&Provider::Google, &query, LoadOptions::default())
    ///     .unwrap();
    /// ```
    pub fn resolve_font_url(
        &mut self,
        provider: &Provider,
        query: &StyleQuery,
        options: LoadOptions,
    ) -> Result<String> {
        let cache = if options.use_cache {
            Some(&mut self.resolutions)
        } else {
            None
        };
        provider::resolve(
            &self.transport,
            cache,
            provider,
            query,
            options.danger_skip_tls_verify,
        )
    }

    /// Resolve a style query and load the resulting font
    ///
    /// # Arguments
    /// * `provider` - Where to resolve the query
    /// * `query` - Requested style
    /// * `options` - Applied to both the resolution and the font download
    ///
    /// # Returns
    /// * `Ok(FontHandle)` - Parsed font
    /// * `Err(FontError)` - Resolution or load failed
    ///
    /// # Example
    /// ```no_run
    /// # use fontload::{FontLoader, LoadOptions, Provider, StyleQuery};
    /// let mut loader = FontLoader::new().unwrap();
    /// let font = loader
    ///     .load_provider_font(&Provider::Bunny, &StyleQuery::new("Inter"), LoadOptions::default())
    ///     .unwrap();
    /// ```
    pub fn load_provider_font(
        &mut self,
        provider: &Provider,
        query: &StyleQuery,
        options: LoadOptions,
    ) -> Result<FontHandle> {
        let url = self.resolve_font_url(provider, query, options)?;
        self.load_font(&url, options)
    }

    pub fn load_google_font(&mut self, query: &StyleQuery, options: LoadOptions) -> Result<FontHandle> {
        self.load_provider_font(&Provider::Google, query, options)
    }

    pub fn load_bunny_font(&mut self, query: &StyleQuery, options: LoadOptions) -> Result<FontHandle> {
        self.load_provider_font(&Provider::Bunny, query, options)
    }

    /// Delete the fonts directory and the resolution cache
    pub fn clear_cache(&mut self) -> Result<ClearReport> {
        let fonts_removed = self.fonts.clear()?;
        let resolutions_removed = self.resolutions.clear();

        let report = ClearReport {
            fonts_dir: self.fonts.fonts_dir().to_path_buf(),
            fonts_removed,
            resolutions_removed,
        };
        tracing::info!("{}", report);
        Ok(report)
    }

    /// [`clear_cache`](Self::clear_cache), printing the outcome to stdout
    pub fn clear_cache_verbose(&mut self) -> Result<ClearReport> {
        let report = self.clear_cache()?;
        println!("{}", report);
        Ok(report)
    }
}
