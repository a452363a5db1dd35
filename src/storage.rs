//! Persistent key/value storage for the seen and read link sets.
//!
//! The [`Storage`] trait is a string-keyed, string-valued store.  Values are
//! JSON documents written whole on every update, so the last writer wins and
//! a partial update is never visible.
//!
//! * [`FileStorage`] keeps every key in one JSON object on disk.
//! * `MemoryStorage` (test builds only) keeps them in a map.
//!
//! Reads are best-effort: anything that cannot be parsed reads as empty.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Key of the seen-links snapshot.
pub const SEEN_NEWS_KEY: &str = "seenNews";
/// Key of the append-only read-links list.
pub const READ_ARTICLES_KEY: &str = "readArticles";

/// A string key/value store.
pub trait Storage {
    /// Raw value stored under `key`, if any.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Replace the value stored under `key`.
    fn set_item(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Read a JSON array of strings stored under `key`.
///
/// A missing key, malformed JSON, or JSON that is not an array of strings
/// all read as an empty list.
pub fn read_links(storage: &dyn Storage, key: &str) -> Vec<String> {
    let Some(raw) = storage.get_item(key) else {
        return Vec::new();
    };
    if raw.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Vec<String>>(&raw) {
        Ok(links) => links,
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to parse stored data");
            Vec::new()
        }
    }
}

/// Store `links` under `key` as a JSON array.
pub fn write_links(storage: &mut dyn Storage, key: &str, links: &[String]) -> Result<()> {
    let json = serde_json::to_string(links).context("failed to encode link list")?;
    storage.set_item(key, &json)
}

// ---------------------------------------------------------------------------
// File-backed storage
// ---------------------------------------------------------------------------

/// All keys in a single JSON object file.
///
/// The file is read once on open; every write rewrites it in full.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: HashMap<String, String>,
}

impl FileStorage {
    /// Open the store at `path`.  A missing or corrupt file opens empty.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let items = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "storage file is corrupt, starting empty");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };

        Self { path, items }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(&self.items).context("failed to encode storage")?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

impl Storage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    /// On a failed flush the previous value is put back, so memory never
    /// runs ahead of the file.
    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        let previous = self.items.insert(key.to_string(), value.to_string());
        if let Err(e) = self.flush() {
            match previous {
                Some(previous) => self.items.insert(key.to_string(), previous),
                None => self.items.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory storage
// ---------------------------------------------------------------------------

/// Map-backed store that counts writes.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
    /// Number of successful `set_item` calls.
    pub writes: usize,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `key` with a JSON array of `links`.
    pub fn with_links(mut self, key: &str, links: &[&str]) -> Self {
        let links: Vec<String> = links.iter().map(|l| l.to_string()).collect();
        self.items.insert(
            key.to_string(),
            serde_json::to_string(&links).unwrap_or_default(),
        );
        self
    }

    /// Seed `key` with a raw value.
    pub fn with_raw(mut self, key: &str, value: &str) -> Self {
        self.items.insert(key.to_string(), value.to_string());
        self
    }
}

#[cfg(test)]
impl Storage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).cloned()
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<()> {
        self.items.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
