//! Font acquisition and caching
//!
//! This crate turns a font reference into a validated local font file:
//! - URL classification (remote vs. local, raw font links vs. HTML pages)
//! - Web font provider resolution (Google Fonts, Bunny Fonts, custom CSS endpoints)
//! - Resolution caching (style query → font URL, persisted as JSON)
//! - Content-addressed font file caching with corrupt-entry self-healing
//! - TLS verification opt-out for hosts with broken certificates
//! - Font validation and metadata (TrueType, OpenType, WOFF, WOFF2, EOT)

pub mod cache;
pub mod config;
pub mod error;
pub mod font;
pub mod loader;
pub mod provider;
pub mod url;

pub use cache::{FontCache, JsonFileStore, MemoryStore, ResolutionCache, ResolutionStore, StoreError};
pub use config::LoaderConfig;
pub use error::{FontError, Result};
pub use font::{FaceInfo, FontFormat, FontHandle};
pub use loader::{ClearReport, FontLoader, LoadOptions};
pub use provider::{Provider, StyleQuery, Weight};
pub use crate::url::{is_likely_font_file, is_remote_reference, HttpResponse, HttpTransport, Transport, TransportError};

/// Load a font from a path or URL with the default loader and options
pub fn load_font(source: &str) -> Result<FontHandle> {
    FontLoader::new()?.load_font(source, LoadOptions::default())
}

/// Resolve and load a Google Fonts style query with the default loader
pub fn load_google_font(query: &StyleQuery) -> Result<FontHandle> {
    FontLoader::new()?.load_google_font(query, LoadOptions::default())
}

/// Resolve and load a Bunny Fonts style query with the default loader
pub fn load_bunny_font(query: &StyleQuery) -> Result<FontHandle> {
    FontLoader::new()?.load_bunny_font(query, LoadOptions::default())
}

/// Remove every cached font and resolution under the default cache root
pub fn clear_font_cache(verbose: bool) -> Result<ClearReport> {
    let mut loader = FontLoader::new()?;
    if verbose {
        loader.clear_cache_verbose()
    } else {
        loader.clear_cache()
    }
}
