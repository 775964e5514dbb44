//! Ingestion run configuration.
//!
//! All knobs live on one explicit value handed to the pipeline; nothing
//! reads globals. Loadable from a JSON file, with every field optional
//! so a config that only lists pages gets sensible defaults for the rest.

use std::path::Path;
use std::time::Duration;

use crate::error::AppError;

/// Configuration for one ingestion run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Tournament page titles to ingest, in order.
    pub tournaments: Vec<String>,

    /// Player page titles to ingest, in order.
    pub players: Vec<String>,

    /// Teams with fewer qualifying players than this are dropped.
    pub min_team_size: usize,

    /// Case-insensitive substring that identifies the roster section
    /// of a tournament page.
    pub section_keyword: String,

    /// Section index fetched for player pages. The infobox and team
    /// history sit in the page's lead section.
    pub player_section: i64,

    /// Minimum gap between consecutive remote fetches, in seconds.
    pub fetch_delay_secs: u64,
}

impl IngestConfig {
    /// Load a config from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AppError::ConfigError(format!("read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| AppError::ConfigError(format!("parse {}: {e}", path.display())))
    }

    /// The fetch gap as a [`Duration`].
    pub fn fetch_delay(&self) -> Duration {
        Duration::from_secs(self.fetch_delay_secs)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            tournaments: Vec::new(),
            players: Vec::new(),
            min_team_size: 1,
            section_keyword: "participants".to_string(),
            player_section: 0,
            fetch_delay_secs: 30,
        }
    }
}
