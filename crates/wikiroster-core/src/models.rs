/// One section of a wiki page, as reported by the action API's
/// section listing.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Section {
    /// Position used to request this section's wikitext.
    pub index: i64,
    /// Rendered heading text (e.g., "Participants").
    pub title: String,
    /// URL fragment for the heading (e.g., "Participants").
    pub anchor: String,
}

/// Raw wikitext captured for one page, keyed by page title in the cache.
///
/// Entries are immutable once written: a page present in the cache is
/// never fetched or overwritten again.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CacheEntry {
    /// Which section of the page the wikitext came from.
    pub section: i64,
    /// The section body, verbatim.
    pub wikitext: String,
}

impl CacheEntry {
    pub fn new(section: i64, wikitext: impl Into<String>) -> Self {
        Self {
            section,
            wikitext: wikitext.into(),
        }
    }
}

/// A team extracted from a tournament participants section.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Team {
    pub name: String,
    /// Starting players, in the order their lines appear.
    pub players: Vec<String>,
    /// Substitute players, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subs: Vec<String>,
}

/// All teams parsed from one tournament page.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TournamentRecord {
    /// Page title, used as the record identity on upsert.
    pub name: String,
    pub teams: Vec<Team>,
}

/// One row of a player's team history.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlayerEvent {
    /// Join date, `YYYY-MM-DD` with `?` wildcards for unknown digits.
    pub start: String,
    pub team: String,
    /// Leave date; absent for a player still on the team.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// A player's identity and team history parsed from their page.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlayerRecord {
    /// In-game id from the infobox; absent when no infobox id was found.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub events: Vec<PlayerEvent>,
}

/// Outcome of writing a batch of records into a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct UpsertReport {
    /// Records that did not exist before.
    pub inserted: usize,
    /// Existing records whose content changed.
    pub modified: usize,
}
