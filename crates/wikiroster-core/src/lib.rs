pub mod cache;
pub mod career;
pub mod config;
pub mod error;
pub mod ingest;
pub mod locator;
pub mod models;
pub mod roster;
pub mod testutil;
pub mod throttle;
pub mod traits;

pub use cache::{IngestionCache, JsonCacheStore};
pub use career::CareerParser;
pub use config::IngestConfig;
pub use error::AppError;
pub use ingest::{IngestOutcome, IngestReport, IngestService, PageOutcome, PageResult};
pub use locator::find_section_index;
pub use models::{
    CacheEntry, PlayerEvent, PlayerRecord, Section, Team, TournamentRecord, UpsertReport,
};
pub use roster::RosterParser;
pub use throttle::Throttle;
pub use traits::{CacheStore, NullRecordStore, RecordStore, WikiFetcher};
