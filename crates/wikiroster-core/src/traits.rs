use std::collections::BTreeMap;
use std::future::Future;

use crate::error::AppError;
use crate::models::{CacheEntry, PlayerRecord, Section, TournamentRecord, UpsertReport};

/// Fetches wiki content from the remote action API.
pub trait WikiFetcher: Send + Sync + Clone {
    /// List the sections of a page.
    fn fetch_sections(
        &self,
        page: &str,
    ) -> impl Future<Output = Result<Vec<Section>, AppError>> + Send;

    /// Fetch the raw wikitext of one section of a page.
    fn fetch_section_text(
        &self,
        page: &str,
        section: i64,
    ) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Loads and persists the durable fetch cache.
///
/// `load` on a backing file that does not exist yet returns an empty
/// map; a file that exists but cannot be parsed is [`AppError::CacheCorrupt`].
pub trait CacheStore: Send + Sync + Clone {
    fn load(&self) -> Result<BTreeMap<String, CacheEntry>, AppError>;

    /// Write the entire cache durably. Called after every insert.
    fn persist(&self, entries: &BTreeMap<String, CacheEntry>) -> Result<(), AppError>;
}

/// Persists and retrieves parsed records.
pub trait RecordStore: Send + Sync + Clone {
    /// Upsert tournament records by name. Unchanged records count as
    /// neither inserted nor modified.
    fn upsert_tournaments(
        &self,
        records: &[TournamentRecord],
    ) -> impl Future<Output = Result<UpsertReport, AppError>> + Send;

    /// Upsert player records by name. Records without a name are skipped.
    fn upsert_players(
        &self,
        records: &[PlayerRecord],
    ) -> impl Future<Output = Result<UpsertReport, AppError>> + Send;

    /// All stored tournament records, in stored order.
    fn all_tournaments(&self)
    -> impl Future<Output = Result<Vec<TournamentRecord>, AppError>> + Send;

    /// All stored player records, in stored order.
    fn all_players(&self) -> impl Future<Output = Result<Vec<PlayerRecord>, AppError>> + Send;
}

/// A no-op RecordStore for runs that only populate the cache.
#[derive(Debug, Clone)]
pub struct NullRecordStore;

impl RecordStore for NullRecordStore {
    async fn upsert_tournaments(
        &self,
        _records: &[TournamentRecord],
    ) -> Result<UpsertReport, AppError> {
        Ok(UpsertReport::default())
    }

    async fn upsert_players(&self, _records: &[PlayerRecord]) -> Result<UpsertReport, AppError> {
        Ok(UpsertReport::default())
    }

    async fn all_tournaments(&self) -> Result<Vec<TournamentRecord>, AppError> {
        Ok(vec![])
    }

    async fn all_players(&self) -> Result<Vec<PlayerRecord>, AppError> {
        Ok(vec![])
    }
}
