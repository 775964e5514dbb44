//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::models::{CacheEntry, PlayerRecord, Section, TournamentRecord, UpsertReport};
use crate::traits::{CacheStore, RecordStore, WikiFetcher};

// ---------------------------------------------------------------------------
// MockWikiFetcher
// ---------------------------------------------------------------------------

/// Mock fetcher serving scripted section listings and wikitext.
///
/// Every fetch is counted, so tests can assert that cached pages
/// cause no remote calls at all. Failures are queued per page: each
/// fetch for that page pops one error until the queue is empty, then
/// scripted data is served again.
#[derive(Clone, Default)]
pub struct MockWikiFetcher {
    sections: Arc<Mutex<HashMap<String, Vec<Section>>>>,
    texts: Arc<Mutex<HashMap<(String, i64), String>>>,
    failures: Arc<Mutex<HashMap<String, Vec<AppError>>>>,
    sections_calls: Arc<Mutex<usize>>,
    text_calls: Arc<Mutex<usize>>,
}

impl MockWikiFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the section listing for a page.
    pub fn with_sections(self, page: &str, sections: Vec<Section>) -> Self {
        self.sections
            .lock()
            .unwrap()
            .insert(page.to_string(), sections);
        self
    }

    /// Script the wikitext of one section of a page.
    pub fn with_text(self, page: &str, section: i64, text: &str) -> Self {
        self.texts
            .lock()
            .unwrap()
            .insert((page.to_string(), section), text.to_string());
        self
    }

    /// Queue one failure for a page; it is consumed by the next fetch
    /// (of either kind) targeting that page.
    pub fn with_failure(self, page: &str, error: AppError) -> Self {
        self.failures
            .lock()
            .unwrap()
            .entry(page.to_string())
            .or_default()
            .push(error);
        self
    }

    pub fn sections_calls(&self) -> usize {
        *self.sections_calls.lock().unwrap()
    }

    pub fn text_calls(&self) -> usize {
        *self.text_calls.lock().unwrap()
    }

    /// Total remote calls of either kind.
    pub fn fetch_calls(&self) -> usize {
        self.sections_calls() + self.text_calls()
    }

    fn pop_failure(&self, page: &str) -> Option<AppError> {
        let mut failures = self.failures.lock().unwrap();
        let queue = failures.get_mut(page)?;
        if queue.is_empty() {
            None
        } else {
            Some(queue.remove(0))
        }
    }
}

impl WikiFetcher for MockWikiFetcher {
    async fn fetch_sections(&self, page: &str) -> Result<Vec<Section>, AppError> {
        *self.sections_calls.lock().unwrap() += 1;
        if let Some(err) = self.pop_failure(page) {
            return Err(err);
        }
        self.sections
            .lock()
            .unwrap()
            .get(page)
            .cloned()
            .ok_or_else(|| AppError::ApiFormat {
                page: page.to_string(),
                message: "no sections scripted".to_string(),
            })
    }

    async fn fetch_section_text(&self, page: &str, section: i64) -> Result<String, AppError> {
        *self.text_calls.lock().unwrap() += 1;
        if let Some(err) = self.pop_failure(page) {
            return Err(err);
        }
        self.texts
            .lock()
            .unwrap()
            .get(&(page.to_string(), section))
            .cloned()
            .ok_or_else(|| AppError::ApiFormat {
                page: page.to_string(),
                message: format!("no wikitext scripted for section {section}"),
            })
    }
}

// ---------------------------------------------------------------------------
// MemoryCacheStore
// ---------------------------------------------------------------------------

/// In-memory [`CacheStore`] that counts persist calls.
#[derive(Clone, Default)]
pub struct MemoryCacheStore {
    entries: Arc<Mutex<BTreeMap<String, CacheEntry>>>,
    persist_count: Arc<Mutex<usize>>,
    persist_error: Arc<Mutex<Option<AppError>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with entries, as if a prior run populated it.
    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, CacheEntry)>,
        K: Into<String>,
    {
        let map: BTreeMap<String, CacheEntry> = entries
            .into_iter()
            .map(|(page, entry)| (page.into(), entry))
            .collect();
        Self {
            entries: Arc::new(Mutex::new(map)),
            ..Self::default()
        }
    }

    /// Store whose next persist fails.
    pub fn with_persist_error(error: AppError) -> Self {
        Self {
            persist_error: Arc::new(Mutex::new(Some(error))),
            ..Self::default()
        }
    }

    pub fn persist_count(&self) -> usize {
        *self.persist_count.lock().unwrap()
    }

    /// The entries most recently persisted (or seeded).
    pub fn persisted(&self) -> BTreeMap<String, CacheEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self) -> Result<BTreeMap<String, CacheEntry>, AppError> {
        Ok(self.entries.lock().unwrap().clone())
    }

    fn persist(&self, entries: &BTreeMap<String, CacheEntry>) -> Result<(), AppError> {
        if let Some(e) = self.persist_error.lock().unwrap().take() {
            return Err(e);
        }
        *self.entries.lock().unwrap() = entries.clone();
        *self.persist_count.lock().unwrap() += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockRecordStore
// ---------------------------------------------------------------------------

/// Mock store that records every upsert batch it receives.
#[derive(Clone, Default)]
pub struct MockRecordStore {
    pub tournament_upserts: Arc<Mutex<Vec<Vec<TournamentRecord>>>>,
    pub player_upserts: Arc<Mutex<Vec<Vec<PlayerRecord>>>>,
    tournaments: Arc<Mutex<Vec<TournamentRecord>>>,
    players: Arc<Mutex<Vec<PlayerRecord>>>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with tournament records to serve on reads.
    pub fn with_tournaments(tournaments: Vec<TournamentRecord>) -> Self {
        Self {
            tournaments: Arc::new(Mutex::new(tournaments)),
            ..Self::default()
        }
    }
}

impl RecordStore for MockRecordStore {
    async fn upsert_tournaments(
        &self,
        records: &[TournamentRecord],
    ) -> Result<UpsertReport, AppError> {
        self.tournament_upserts
            .lock()
            .unwrap()
            .push(records.to_vec());
        Ok(UpsertReport {
            inserted: records.len(),
            modified: 0,
        })
    }

    async fn upsert_players(&self, records: &[PlayerRecord]) -> Result<UpsertReport, AppError> {
        self.player_upserts.lock().unwrap().push(records.to_vec());
        Ok(UpsertReport {
            inserted: records.len(),
            modified: 0,
        })
    }

    async fn all_tournaments(&self) -> Result<Vec<TournamentRecord>, AppError> {
        Ok(self.tournaments.lock().unwrap().clone())
    }

    async fn all_players(&self) -> Result<Vec<PlayerRecord>, AppError> {
        Ok(self.players.lock().unwrap().clone())
    }
}
