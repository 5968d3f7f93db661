//! Resolution cache
//!
//! Maps a style-query key to the font-file URL a provider returned for it.
//! Entries live in an in-process map backed by a pluggable store; the default
//! store is a flat JSON object on disk:
//!
//! ```json
//! { "<sha256 of query>": "https://fonts.gstatic.com/s/roboto/v30/....ttf" }
//! ```
//!
//! The store is read lazily (whole file, on the first lookup against an
//! empty map) and rewritten in full after every insert. Entries never expire.
//! Store failures are logged and otherwise ignored: a missing or corrupt file
//! behaves like an empty cache.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while reading or writing a resolution store
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Persistence backend for [`ResolutionCache`]
pub trait ResolutionStore {
    /// Whether anything has been persisted
    fn exists(&self) -> bool;

    /// Read every persisted entry
    fn load(&self) -> Result<BTreeMap<String, String>, StoreError>;

    /// Replace the persisted entries with `entries`
    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError>;

    /// Drop everything; returns whether anything was there
    fn remove(&self) -> Result<bool, StoreError>;
}

/// JSON file store
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResolutionStore for JsonFileStore {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let contents = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn remove(&self) -> Result<bool, StoreError> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)?;
        Ok(true)
    }
}

/// In-memory store, for callers that want resolution caching without a file
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<Option<BTreeMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResolutionStore for MemoryStore {
    fn exists(&self) -> bool {
        self.entries.borrow().is_some()
    }

    fn load(&self) -> Result<BTreeMap<String, String>, StoreError> {
        Ok(self.entries.borrow().clone().unwrap_or_default())
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        *self.entries.borrow_mut() = Some(entries.clone());
        Ok(())
    }

    fn remove(&self) -> Result<bool, StoreError> {
        Ok(self.entries.borrow_mut().take().is_some())
    }
}

/// Two-tier cache of resolved font URLs
pub struct ResolutionCache {
    entries: BTreeMap<String, String>,
    store: Box<dyn ResolutionStore>,
}

impl ResolutionCache {
    pub fn new(store: Box<dyn ResolutionStore>) -> Self {
        Self {
            entries: BTreeMap::new(),
            store,
        }
    }

    /// Cache persisted to a JSON file at `path`
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self::new(Box::new(JsonFileStore::new(path)))
    }

    /// Cache that never touches the filesystem
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStore::new()))
    }

    /// Look up a key, loading the store first if the map is empty
    pub fn get(&mut self, key: &str) -> Option<String> {
        if self.entries.is_empty() && self.store.exists() {
            match self.store.load() {
                Ok(loaded) => {
                    tracing::debug!("loaded {} resolved font URLs", loaded.len());
                    self.entries.extend(loaded);
                }
                Err(e) => tracing::debug!("ignoring unreadable resolution cache: {}", e),
            }
        }
        self.entries.get(key).cloned()
    }

    /// Insert an entry and persist the whole map
    pub fn put(&mut self, key: &str, url: &str) {
        self.entries.insert(key.to_string(), url.to_string());
        if let Err(e) = self.store.save(&self.entries) {
            tracing::warn!("failed to persist resolution cache: {}", e);
        }
    }

    /// Empty the map and the store; returns whether the store held anything
    pub fn clear(&mut self) -> bool {
        self.entries.clear();
        match self.store.remove() {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!("failed to remove resolution cache: {}", e);
                false
            }
        }
    }

    /// Entries currently held in memory
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
