//! Durable fetch cache: at most one remote fetch per page, ever.
//!
//! The cache is a page-title → raw-wikitext map persisted in full
//! after every successful fetch, so a run that dies after N of M
//! fetches keeps all N. Entries are append-only: once a page is
//! cached it is never fetched or overwritten again, across runs.
//!
//! The backing document is pretty-printed JSON with sorted keys, which
//! keeps it diffable and lets a human inspect or prune it by hand.

use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;

use crate::error::AppError;
use crate::models::CacheEntry;
use crate::traits::CacheStore;

/// In-memory view of the fetch cache plus its backing store.
#[derive(Debug, Clone)]
pub struct IngestionCache<S: CacheStore> {
    entries: BTreeMap<String, CacheEntry>,
    store: S,
}

impl<S: CacheStore> IngestionCache<S> {
    /// Load the cache from its backing store. A store with no prior
    /// document yields an empty cache; a document that cannot be read
    /// is a fatal error.
    pub fn load(store: S) -> Result<Self, AppError> {
        let entries = store.load()?;
        if !entries.is_empty() {
            tracing::debug!(pages = entries.len(), "Loaded fetch cache");
        }
        Ok(Self { entries, store })
    }

    pub fn contains(&self, page: &str) -> bool {
        self.entries.contains_key(page)
    }

    pub fn get(&self, page: &str) -> Option<&CacheEntry> {
        self.entries.get(page)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CacheEntry)> {
        self.entries.iter().map(|(page, entry)| (page.as_str(), entry))
    }

    /// Add an entry and persist the whole cache immediately. A page
    /// that is already cached is left untouched and nothing is
    /// rewritten.
    pub fn insert(&mut self, page: &str, entry: CacheEntry) -> Result<(), AppError> {
        if self.entries.contains_key(page) {
            return Ok(());
        }
        self.entries.insert(page.to_string(), entry);
        self.store.persist(&self.entries)?;
        tracing::info!(%page, "Cached new entry");
        Ok(())
    }

    /// Return the cached entry for `page`, fetching and persisting it
    /// first if absent. On a hit `fetch_fn` is never invoked. A
    /// `fetch_fn` failure leaves the key absent (so a later run can
    /// retry it) and every previously cached entry untouched.
    pub async fn fetch_or_populate<F, Fut>(
        &mut self,
        page: &str,
        fetch_fn: F,
    ) -> Result<&CacheEntry, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<CacheEntry, AppError>>,
    {
        if !self.entries.contains_key(page) {
            let entry = fetch_fn().await?;
            self.insert(page, entry)?;
        }
        // Present: either cached before the call or inserted above.
        self.entries
            .get(page)
            .ok_or_else(|| AppError::Generic(format!("cache lookup failed for {page}")))
    }
}

/// File-backed [`CacheStore`] holding the cache as one pretty-printed
/// JSON document.
#[derive(Debug, Clone)]
pub struct JsonCacheStore {
    path: PathBuf,
}

impl JsonCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl CacheStore for JsonCacheStore {
    fn load(&self) -> Result<BTreeMap<String, CacheEntry>, AppError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(e) => {
                return Err(AppError::CacheCorrupt {
                    path: self.path.display().to_string(),
                    message: e.to_string(),
                });
            }
        };
        serde_json::from_str(&raw).map_err(|e| AppError::CacheCorrupt {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Write-new-then-rename, so a crash mid-write never clobbers the
    /// previous document.
    fn persist(&self, entries: &BTreeMap<String, CacheEntry>) -> Result<(), AppError> {
        let json =
            serde_json::to_string_pretty(entries).map_err(|e| AppError::Persist(e.to_string()))?;
        let tmp = self.tmp_path();
        std::fs::write(&tmp, json)
            .map_err(|e| AppError::Persist(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| AppError::Persist(format!("rename to {}: {e}", self.path.display())))?;
        Ok(())
    }
}
