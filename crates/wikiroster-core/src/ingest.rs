use crate::cache::IngestionCache;
use crate::career::CareerParser;
use crate::config::IngestConfig;
use crate::error::AppError;
use crate::locator::find_section_index;
use crate::models::{CacheEntry, PlayerRecord, Section, TournamentRecord, UpsertReport};
use crate::roster::RosterParser;
use crate::throttle::Throttle;
use crate::traits::{CacheStore, RecordStore, WikiFetcher};

/// What happened to one configured page during a run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub enum PageOutcome {
    /// Fetched from the remote API this run and cached.
    Fetched,
    /// Already cached; no remote call was made.
    Cached,
    /// No section matched the configured keyword; nothing cached.
    SkippedNoSection,
    /// Fetch or decode failed; the page stays uncached and is
    /// eligible for retry on a later run.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PageResult {
    pub page: String,
    pub outcome: PageOutcome,
}

/// Per-page results for a whole run, in configured page order.
///
/// Failures are collected rather than propagated so one bad page
/// cannot abort a batch; the caller decides whether they matter.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct IngestReport {
    pub pages: Vec<PageResult>,
}

impl IngestReport {
    fn record(&mut self, page: &str, outcome: PageOutcome) {
        self.pages.push(PageResult {
            page: page.to_string(),
            outcome,
        });
    }

    pub fn fetched(&self) -> usize {
        self.count(|o| matches!(o, PageOutcome::Fetched))
    }

    pub fn cached(&self) -> usize {
        self.count(|o| matches!(o, PageOutcome::Cached))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, PageOutcome::SkippedNoSection))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, PageOutcome::Failed(_)))
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &PageResult> {
        self.pages
            .iter()
            .filter(|r| matches!(r.outcome, PageOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&PageOutcome) -> bool) -> usize {
        self.pages.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Everything one ingestion run produced.
#[derive(Debug, Clone)]
pub struct IngestOutcome<R> {
    /// Parsed records for every cached page, in cache key order.
    pub records: Vec<R>,
    pub report: IngestReport,
    /// Store counts, when a record store was attached.
    pub upsert: Option<UpsertReport>,
}

/// Orchestrates the two ingestion flows: cache check → fetch → locate
/// (tournaments only) → cache write → parse → store upsert.
///
/// Generic over all external dependencies via traits, enabling
/// dependency injection and testability without real HTTP calls.
pub struct IngestService<F, C, S>
where
    F: WikiFetcher,
    C: CacheStore,
    S: RecordStore,
{
    fetcher: F,
    tournament_cache: C,
    player_cache: C,
    store: Option<S>,
    config: IngestConfig,
    throttle: Throttle,
}

impl<F, C, S> IngestService<F, C, S>
where
    F: WikiFetcher,
    C: CacheStore,
    S: RecordStore,
{
    /// Create a new IngestService without record persistence.
    pub fn new(fetcher: F, tournament_cache: C, player_cache: C, config: IngestConfig) -> Self {
        let throttle = Throttle::new(config.fetch_delay());
        Self {
            fetcher,
            tournament_cache,
            player_cache,
            store: None,
            config,
            throttle,
        }
    }

    /// Create a new IngestService that upserts parsed records into a store.
    pub fn with_store(
        fetcher: F,
        tournament_cache: C,
        player_cache: C,
        store: S,
        config: IngestConfig,
    ) -> Self {
        let throttle = Throttle::new(config.fetch_delay());
        Self {
            fetcher,
            tournament_cache,
            player_cache,
            store: Some(store),
            config,
            throttle,
        }
    }

    /// Run the tournament flow.
    ///
    /// For each configured page not yet cached: list its sections,
    /// locate the roster section by keyword, fetch that section's
    /// wikitext, and persist it. Pages without a matching section are
    /// skipped; fetch failures fail only their page. Afterwards every
    /// cached page (current and prior runs alike) is parsed into a
    /// [`TournamentRecord`].
    pub async fn ingest_tournaments(&self) -> Result<IngestOutcome<TournamentRecord>, AppError> {
        let mut cache = IngestionCache::load(self.tournament_cache.clone())?;
        let mut report = IngestReport::default();

        for page in &self.config.tournaments {
            if cache.contains(page) {
                tracing::debug!(%page, "Cache hit");
                report.record(page, PageOutcome::Cached);
                continue;
            }
            match self.fetch_roster_section(page).await {
                Ok(Some(entry)) => {
                    cache.insert(page, entry)?;
                    report.record(page, PageOutcome::Fetched);
                }
                Ok(None) => {
                    tracing::warn!(
                        %page,
                        keyword = %self.config.section_keyword,
                        "No matching section, skipping"
                    );
                    report.record(page, PageOutcome::SkippedNoSection);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(%page, error = %e, "Fetch failed, continuing");
                    report.record(page, PageOutcome::Failed(e.to_string()));
                }
            }
        }

        let parser = RosterParser::new(self.config.min_team_size);
        let records: Vec<TournamentRecord> = cache
            .iter()
            .map(|(page, entry)| TournamentRecord {
                name: page.to_string(),
                teams: parser.parse(&entry.wikitext),
            })
            .collect();
        tracing::info!(
            tournaments = records.len(),
            fetched = report.fetched(),
            cached = report.cached(),
            skipped = report.skipped(),
            failed = report.failed(),
            "Tournament ingestion complete"
        );

        let upsert = self.upsert_tournaments(&records).await?;
        Ok(IngestOutcome {
            records,
            report,
            upsert,
        })
    }

    /// Run the player flow.
    ///
    /// Player pages need no locator step: the infobox and history sit
    /// in a fixed configured section. Each cache miss waits out the
    /// fetch gap first; hits never wait.
    pub async fn ingest_players(&self) -> Result<IngestOutcome<PlayerRecord>, AppError> {
        let mut cache = IngestionCache::load(self.player_cache.clone())?;
        let mut report = IngestReport::default();
        let section = self.config.player_section;

        for page in &self.config.players {
            if cache.contains(page) {
                tracing::debug!(%page, "Cache hit");
                report.record(page, PageOutcome::Cached);
                continue;
            }
            let result = cache
                .fetch_or_populate(page, || async {
                    self.throttle.wait().await;
                    let text = self.fetch_text_with_retry(page, section).await?;
                    Ok(CacheEntry::new(section, text))
                })
                .await;
            match result {
                Ok(_) => report.record(page, PageOutcome::Fetched),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(%page, error = %e, "Fetch failed, continuing");
                    report.record(page, PageOutcome::Failed(e.to_string()));
                }
            }
        }

        let parser = CareerParser::new();
        let records: Vec<PlayerRecord> = cache
            .iter()
            .map(|(_, entry)| parser.parse(&entry.wikitext))
            .collect();
        tracing::info!(
            players = records.len(),
            fetched = report.fetched(),
            cached = report.cached(),
            failed = report.failed(),
            "Player ingestion complete"
        );

        let upsert = self.upsert_players(&records).await?;
        Ok(IngestOutcome {
            records,
            report,
            upsert,
        })
    }

    /// Sections listing → keyword match → section text, for one page.
    /// `None` means no section matched.
    async fn fetch_roster_section(&self, page: &str) -> Result<Option<CacheEntry>, AppError> {
        let sections = self.fetch_sections_with_retry(page).await?;
        let Some(index) = find_section_index(&sections, &self.config.section_keyword) else {
            return Ok(None);
        };
        let text = self.fetch_text_with_retry(page, index).await?;
        Ok(Some(CacheEntry::new(index, text)))
    }

    async fn fetch_sections_with_retry(&self, page: &str) -> Result<Vec<Section>, AppError> {
        match self.fetcher.fetch_sections(page).await {
            Err(e) if e.is_retryable() => {
                tracing::debug!(%page, error = %e, "Retrying section listing");
                self.fetcher.fetch_sections(page).await
            }
            other => other,
        }
    }

    async fn fetch_text_with_retry(&self, page: &str, section: i64) -> Result<String, AppError> {
        match self.fetcher.fetch_section_text(page, section).await {
            Err(e) if e.is_retryable() => {
                tracing::debug!(%page, %section, error = %e, "Retrying section fetch");
                self.fetcher.fetch_section_text(page, section).await
            }
            other => other,
        }
    }

    async fn upsert_tournaments(
        &self,
        records: &[TournamentRecord],
    ) -> Result<Option<UpsertReport>, AppError> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let counts = store.upsert_tournaments(records).await?;
        tracing::info!(
            inserted = counts.inserted,
            modified = counts.modified,
            "Upserted tournament records"
        );
        Ok(Some(counts))
    }

    async fn upsert_players(
        &self,
        records: &[PlayerRecord],
    ) -> Result<Option<UpsertReport>, AppError> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        let counts = store.upsert_players(records).await?;
        tracing::info!(
            inserted = counts.inserted,
            modified = counts.modified,
            "Upserted player records"
        );
        Ok(Some(counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::*;
    use crate::traits::NullRecordStore;

    fn sections_with_participants() -> Vec<Section> {
        vec![
            Section {
                index: 1,
                title: "Overview".into(),
                anchor: "Overview".into(),
            },
            Section {
                index: 4,
                title: "Participants".into(),
                anchor: "Participants".into(),
            },
        ]
    }

    fn tournament_config(pages: &[&str]) -> IngestConfig {
        IngestConfig {
            tournaments: pages.iter().map(|p| p.to_string()).collect(),
            fetch_delay_secs: 0,
            ..IngestConfig::default()
        }
    }

    fn player_config(pages: &[&str]) -> IngestConfig {
        IngestConfig {
            players: pages.iter().map(|p| p.to_string()).collect(),
            fetch_delay_secs: 0,
            ..IngestConfig::default()
        }
    }

    fn service(
        fetcher: MockWikiFetcher,
        cache: MemoryCacheStore,
        config: IngestConfig,
    ) -> IngestService<MockWikiFetcher, MemoryCacheStore, NullRecordStore> {
        IngestService::new(fetcher, cache.clone(), cache, config)
    }

    #[tokio::test]
    async fn tournament_happy_path() {
        let fetcher = MockWikiFetcher::new()
            .with_sections("Season 1", sections_with_participants())
            .with_text("Season 1", 4, "|team=NRG\n|p1=GarrettG\n|p2=Fireburner");
        let svc = service(
            fetcher.clone(),
            MemoryCacheStore::new(),
            tournament_config(&["Season 1"]),
        );

        let outcome = svc.ingest_tournaments().await.unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].name, "Season 1");
        assert_eq!(outcome.records[0].teams[0].name, "NRG");
        assert_eq!(outcome.records[0].teams[0].players, vec![
            "GarrettG",
            "Fireburner"
        ]);
        assert_eq!(outcome.report.fetched(), 1);
        assert!(outcome.upsert.is_none());
        assert_eq!(fetcher.sections_calls(), 1);
        assert_eq!(fetcher.text_calls(), 1);
    }

    #[tokio::test]
    async fn run_without_a_store_reports_no_upsert() {
        let fetcher = MockWikiFetcher::new()
            .with_sections("Season 1", sections_with_participants())
            .with_text("Season 1", 4, "|team=NRG\n|p1=GarrettG\n|p2=Fireburner");
        let svc = IngestService::<_, _, NullRecordStore>::new(
            fetcher,
            MemoryCacheStore::new(),
            MemoryCacheStore::new(),
            tournament_config(&["Season 1"]),
        );

        let outcome = svc.ingest_tournaments().await.unwrap();

        assert!(outcome.upsert.is_none());
        assert_eq!(outcome.records.len(), 1);
    }

    #[tokio::test]
    async fn cached_pages_cause_no_fetches() {
        let cache = MemoryCacheStore::with_entries([
            ("Season 1", CacheEntry::new(4, "|team=A\n|p1=X")),
            ("Season 2", CacheEntry::new(3, "|team=B\n|p1=Y")),
        ]);
        let fetcher = MockWikiFetcher::new();
        let svc = service(
            fetcher.clone(),
            cache,
            tournament_config(&["Season 1", "Season 2"]),
        );

        let outcome = svc.ingest_tournaments().await.unwrap();

        assert_eq!(fetcher.fetch_calls(), 0);
        assert_eq!(outcome.report.cached(), 2);
        assert_eq!(outcome.records.len(), 2);
    }

    #[tokio::test]
    async fn second_run_is_idempotent() {
        let cache = MemoryCacheStore::new();
        let fetcher = MockWikiFetcher::new()
            .with_sections("Season 1", sections_with_participants())
            .with_text("Season 1", 4, "|team=A\n|p1=X");
        let svc = service(fetcher.clone(), cache, tournament_config(&["Season 1"]));

        svc.ingest_tournaments().await.unwrap();
        let first_run_calls = fetcher.fetch_calls();
        let outcome = svc.ingest_tournaments().await.unwrap();

        assert_eq!(fetcher.fetch_calls(), first_run_calls);
        assert_eq!(outcome.report.cached(), 1);
        assert_eq!(outcome.records.len(), 1);
    }

    #[tokio::test]
    async fn missing_section_skips_page_and_continues() {
        let no_rosters = vec![Section {
            index: 1,
            title: "Results".into(),
            anchor: "Results".into(),
        }];
        let fetcher = MockWikiFetcher::new()
            .with_sections("Bare Page", no_rosters)
            .with_sections("Good Page", sections_with_participants())
            .with_text("Good Page", 4, "|team=A\n|p1=X");
        let cache = MemoryCacheStore::new();
        let svc = service(
            fetcher.clone(),
            cache.clone(),
            tournament_config(&["Bare Page", "Good Page"]),
        );

        let outcome = svc.ingest_tournaments().await.unwrap();

        assert_eq!(outcome.report.skipped(), 1);
        assert_eq!(outcome.report.fetched(), 1);
        assert!(!cache.persisted().contains_key("Bare Page"));
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].name, "Good Page");
    }

    #[tokio::test]
    async fn failing_page_does_not_abort_the_batch() {
        let fetcher = MockWikiFetcher::new()
            .with_failure("Broken", AppError::NetworkError("reset".into()))
            .with_failure("Broken", AppError::NetworkError("reset".into()))
            .with_sections("Good", sections_with_participants())
            .with_text("Good", 4, "|team=A\n|p1=X");
        let cache = MemoryCacheStore::new();
        let svc = service(
            fetcher.clone(),
            cache.clone(),
            tournament_config(&["Broken", "Good"]),
        );

        let outcome = svc.ingest_tournaments().await.unwrap();

        assert_eq!(outcome.report.failed(), 1);
        assert_eq!(outcome.report.fetched(), 1);
        assert!(outcome.report.has_failures());
        assert!(!cache.persisted().contains_key("Broken"));
        assert_eq!(outcome.records.len(), 1);
    }

    #[tokio::test]
    async fn transient_error_is_retried_once() {
        let fetcher = MockWikiFetcher::new()
            .with_failure("Season 1", AppError::Timeout(30))
            .with_sections("Season 1", sections_with_participants())
            .with_text("Season 1", 4, "|team=A\n|p1=X");
        let svc = service(
            fetcher.clone(),
            MemoryCacheStore::new(),
            tournament_config(&["Season 1"]),
        );

        let outcome = svc.ingest_tournaments().await.unwrap();

        assert_eq!(outcome.report.fetched(), 1);
        assert_eq!(fetcher.sections_calls(), 2, "one retry after the timeout");
    }

    #[tokio::test]
    async fn non_retryable_error_is_not_retried() {
        let fetcher = MockWikiFetcher::new().with_failure("Season 1", AppError::ApiFormat {
            page: "Season 1".into(),
            message: "missing parse".into(),
        });
        let svc = service(
            fetcher.clone(),
            MemoryCacheStore::new(),
            tournament_config(&["Season 1"]),
        );

        let outcome = svc.ingest_tournaments().await.unwrap();

        assert_eq!(outcome.report.failed(), 1);
        assert_eq!(fetcher.sections_calls(), 1);
    }

    #[tokio::test]
    async fn persist_failure_aborts_the_run() {
        let fetcher = MockWikiFetcher::new()
            .with_sections("Season 1", sections_with_participants())
            .with_text("Season 1", 4, "|team=A\n|p1=X");
        let cache = MemoryCacheStore::with_persist_error(AppError::Persist("disk full".into()));
        let svc = service(fetcher, cache, tournament_config(&["Season 1"]));

        let err = svc.ingest_tournaments().await.unwrap_err();
        assert!(matches!(err, AppError::Persist(_)));
    }

    #[tokio::test]
    async fn parse_covers_cache_entries_outside_the_config() {
        // A page cached by an earlier run stays in the output even
        // when today's config no longer lists it.
        let cache = MemoryCacheStore::with_entries([(
            "Old Season",
            CacheEntry::new(2, "|team=Legacy\n|p1=Vet"),
        )]);
        let fetcher = MockWikiFetcher::new()
            .with_sections("New Season", sections_with_participants())
            .with_text("New Season", 4, "|team=Fresh\n|p1=Rookie");
        let svc = service(
            fetcher,
            cache,
            tournament_config(&["New Season"]),
        );

        let outcome = svc.ingest_tournaments().await.unwrap();

        let names: Vec<&str> = outcome.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["New Season", "Old Season"], "cache key order");
    }

    #[tokio::test]
    async fn player_happy_path_with_store() {
        let fetcher = MockWikiFetcher::new().with_text(
            "Kronovi",
            0,
            "{{Infobox player\n|id=Kronovi\n|history=\n{{TH|2015-07-25 &ndash; 2016-07-07|Kings of Urban}}",
        );
        let store = MockRecordStore::new();
        let svc = IngestService::with_store(
            fetcher.clone(),
            MemoryCacheStore::new(),
            MemoryCacheStore::new(),
            store.clone(),
            player_config(&["Kronovi"]),
        );

        let outcome = svc.ingest_players().await.unwrap();

        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].name.as_deref(), Some("Kronovi"));
        assert_eq!(outcome.records[0].events.len(), 1);
        assert_eq!(outcome.report.fetched(), 1);
        assert_eq!(outcome.upsert, Some(UpsertReport {
            inserted: 1,
            modified: 0
        }));
        assert_eq!(store.player_upserts.lock().unwrap().len(), 1);
        assert_eq!(fetcher.text_calls(), 1);
    }

    #[tokio::test]
    async fn cached_players_cause_no_fetches() {
        let cache = MemoryCacheStore::with_entries([(
            "Kronovi",
            CacheEntry::new(0, "{{Infobox player\n|id=Kronovi"),
        )]);
        let fetcher = MockWikiFetcher::new();
        let svc = service(fetcher.clone(), cache, player_config(&["Kronovi"]));

        let outcome = svc.ingest_players().await.unwrap();

        assert_eq!(fetcher.fetch_calls(), 0);
        assert_eq!(outcome.report.cached(), 1);
        assert_eq!(outcome.records[0].name.as_deref(), Some("Kronovi"));
    }

    #[tokio::test]
    async fn failed_player_fetch_is_isolated() {
        let fetcher = MockWikiFetcher::new()
            .with_failure("Gone", AppError::HttpError("HTTP 404".into()))
            .with_text("Here", 0, "{{Infobox player\n|id=Here");
        let cache = MemoryCacheStore::new();
        let svc = service(fetcher, cache.clone(), player_config(&["Gone", "Here"]));

        let outcome = svc.ingest_players().await.unwrap();

        assert_eq!(outcome.report.failed(), 1);
        assert_eq!(outcome.report.fetched(), 1);
        assert!(!cache.persisted().contains_key("Gone"));
        assert_eq!(outcome.records.len(), 1);
    }

    #[tokio::test]
    async fn tournament_store_receives_parsed_batch() {
        let cache = MemoryCacheStore::with_entries([(
            "Season 1",
            CacheEntry::new(4, "|team=NRG\n|p1=GarrettG"),
        )]);
        let store = MockRecordStore::new();
        let svc = IngestService::with_store(
            MockWikiFetcher::new(),
            cache.clone(),
            cache,
            store.clone(),
            tournament_config(&["Season 1"]),
        );

        let outcome = svc.ingest_tournaments().await.unwrap();

        let batches = store.tournament_upserts.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0], outcome.records);
    }
}
