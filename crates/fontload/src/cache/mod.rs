//! Font caching infrastructure
//!
//! Downloaded fonts are stored under the fonts directory, named by the SHA-256
//! of the URL they came from plus the URL's extension:
//!
//! ```text
//! ~/.cache/fontload/
//! ├── fonts/
//! │   ├── <sha256(url)>.ttf
//! │   └── <sha256(url)>.woff2
//! └── resolved-urls.json      # see `resolution`
//! ```
//!
//! A cached file is only returned after it loads as a font. One that does not
//! is deleted and downloaded again.

mod resolution;

pub use resolution::{JsonFileStore, MemoryStore, ResolutionCache, ResolutionStore, StoreError};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{FontError, Result};
use crate::font::FontHandle;
use crate::loader::LoadOptions;
use crate::url::fetch::{compute_checksum, get_with_tls_fallback, Transport};
use crate::url::{is_likely_font_file, is_remote_reference, url_extension};

/// Content-addressed store of downloaded font files
#[derive(Debug, Clone)]
pub struct FontCache {
    /// Directory holding the cached files
    fonts_dir: PathBuf,
}

impl FontCache {
    /// Cache rooted at `fonts_dir`; the directory is created on first write
    pub fn new(fonts_dir: impl Into<PathBuf>) -> Self {
        Self {
            fonts_dir: fonts_dir.into(),
        }
    }

    pub fn fonts_dir(&self) -> &Path {
        &self.fonts_dir
    }

    /// Where the font downloaded from `url` is (or would be) cached
    pub fn cache_path(&self, url: &str) -> PathBuf {
        let file_name = format!("{}{}", compute_checksum(url.as_bytes()), url_extension(url));
        self.fonts_dir.join(file_name)
    }

    /// Return a validated local path for the font at `url`
    ///
    /// With `use_cache`, a cached copy that still loads is returned without any
    /// request. Otherwise the font is downloaded, written, validated and, when
    /// caching, atomically moved into place.
    ///
    /// # Arguments
    /// * `transport` - Client used for the download
    /// * `url` - Remote font URL
    /// * `options` - Cache and TLS switches
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - `cache_path(url)`, or with `use_cache` off a new
    ///   `fontload-*` file in the system temp dir. The cache never deletes
    ///   that file; the caller owns it.
    /// * `Err(FontError)` - Not a font URL, request failed or invalid font data
    ///
    /// # Example
    /// ```no_run
    /// # use fontload::{FontCache, HttpTransport, LoadOptions, LoaderConfig};
    /// let config = LoaderConfig::default();
    /// let transport = HttpTransport::new(&config).unwrap();
    /// let cache = FontCache::new(config.fonts_dir());
    /// let path = cache
    ///     .fetch(&transport, "https://example.com/fonts/Inter.woff2", LoadOptions::default())
    ///     .unwrap();
    /// ```
    pub fn fetch(
        &self,
        transport: &dyn Transport,
        url: &str,
        options: LoadOptions,
    ) -> Result<PathBuf> {
        if !is_remote_reference(url) {
            return Err(FontError::InvalidArgument(format!(
                "'{}' is not a URL; load local files with `FontHandle::from_path`",
                url
            )));
        }
        if !is_likely_font_file(url) {
            return Err(FontError::InvalidArgument(format!(
                "The URL provided ({}) does not appear to be valid. It must point to a binary \
                 font file (ttf, otf, woff, woff2 or eot). Have you forgotten to append \
                 `?raw=true` to the end of the URL?",
                url
            )));
        }

        let cache_path = self.cache_path(url);

        if options.use_cache && cache_path.exists() {
            match FontHandle::from_path(&cache_path) {
                Ok(_) => {
                    tracing::debug!("font cache hit for {}: {}", url, cache_path.display());
                    return Ok(cache_path);
                }
                Err(e) => {
                    tracing::debug!("discarding corrupt cached font {}: {}", cache_path.display(), e);
                    if let Err(e) = fs::remove_file(&cache_path) {
                        tracing::debug!("could not remove {}: {}", cache_path.display(), e);
                    }
                }
            }
        }

        let response = get_with_tls_fallback(transport, url, options.danger_skip_tls_verify)?;
        match response.status {
            404 => {
                return Err(FontError::NotFound(format!(
                    "404 error. The url passed does not exist: font file not found ({})",
                    url
                )))
            }
            status if !response.is_success() => {
                return Err(FontError::Fetch {
                    status,
                    url: url.to_string(),
                })
            }
            _ => {}
        }

        if options.use_cache {
            self.store(&cache_path, &response.body)?;
            Ok(cache_path)
        } else {
            store_temporary(&url_extension(url), &response.body)
        }
    }

    /// Write to a temp file beside the target, validate, then rename into place
    fn store(&self, cache_path: &Path, content: &[u8]) -> Result<()> {
        fs::create_dir_all(&self.fonts_dir)?;

        let suffix = cache_path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let mut tmp = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(&suffix)
            .tempfile_in(&self.fonts_dir)?;
        tmp.write_all(content)?;
        tmp.as_file().sync_all()?;

        // Dropping `tmp` on error removes the partial download
        FontHandle::from_path(tmp.path()).map_err(|e| retarget(e, cache_path))?;

        tmp.persist(cache_path).map_err(|e| FontError::Io(e.error))?;
        tracing::debug!("cached font at {}", cache_path.display());
        Ok(())
    }

    /// Delete the fonts directory; returns whether it existed
    pub fn clear(&self) -> Result<bool> {
        if !self.fonts_dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&self.fonts_dir)?;
        Ok(true)
    }
}

/// Write an uncached download to a kept file in the system temp dir
fn store_temporary(extension: &str, content: &[u8]) -> Result<PathBuf> {
    let mut tmp = tempfile::Builder::new()
        .prefix("fontload-")
        .suffix(extension)
        .tempfile()?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;

    FontHandle::from_path(tmp.path())?;

    let (_, path) = tmp.keep().map_err(|e| FontError::Io(e.error))?;
    Ok(path)
}

/// Report load failures against the final cache path, not the temp file
fn retarget(err: FontError, cache_path: &Path) -> FontError {
    match err {
        FontError::Load { reason, .. } => FontError::Load {
            path: cache_path.to_path_buf(),
            reason,
        },
        other => other,
    }
}
