//! Career extraction from player infobox pages.
//!
//! The lead section of a player page carries an infobox with the
//! player's in-game id and a team history block:
//!
//! ```text
//! {{Infobox player
//! |id=Kronovi
//! |history=
//! {{TH|2015-07-25 &ndash; 2016-07-07|Kings of Urban}}
//! {{TH|2016-07-07 &ndash; '''Present'''|G2 Esports}}
//! }}
//! ```
//!
//! Two scans run over the same lines: an identity scan for the infobox
//! id (last match wins) and a history scan for `{{TH` tenure rows. The
//! history scan is strictly contiguous: the first non-entry line after
//! the history marker stops event capture for the page for good, even
//! if entry lines appear again further down.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{PlayerEvent, PlayerRecord};

/// `YYYY-MM-DD` with `?` wildcards allowed for unknown digits.
/// Prefix match: a token carrying trailing junk after a valid date
/// still counts, and the whole token is kept.
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w?]{4}-[\w?]{2}-[\w?]{2}").unwrap());

const INFOBOX_MARKER: &str = "{{Infobox";
const ID_MARKER: &str = "|id=";
const HISTORY_MARKER: &str = "|history";
const ENTRY_MARKER: &str = "{{TH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HistoryState {
    /// History marker not seen yet.
    Pending,
    /// Inside the contiguous run of entry lines.
    Capturing,
    /// Hit a non-entry line while capturing; capture is over.
    Halted,
}

/// Line-oriented parser for player infobox markup.
#[derive(Debug, Clone, Default)]
pub struct CareerParser;

impl CareerParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse one player page's lead-section wikitext.
    ///
    /// Never fails: the name is absent when no infobox id was found,
    /// and entry lines that do not carry the expected fields are
    /// skipped without ending capture.
    pub fn parse(&self, wikitext: &str) -> PlayerRecord {
        let mut record = PlayerRecord {
            name: None,
            events: Vec::new(),
        };
        let mut in_infobox = false;
        let mut history = HistoryState::Pending;

        for line in wikitext.lines() {
            if line.starts_with(INFOBOX_MARKER) {
                in_infobox = true;
            } else if in_infobox
                && let Some(id) = line.strip_prefix(ID_MARKER)
            {
                record.name = Some(id.trim().to_string());
            }

            match history {
                HistoryState::Pending => {
                    if line.starts_with(HISTORY_MARKER) {
                        history = HistoryState::Capturing;
                    }
                }
                HistoryState::Capturing => {
                    if line.starts_with(ENTRY_MARKER) {
                        if let Some(event) = parse_entry(line) {
                            record.events.push(event);
                        }
                    } else {
                        history = HistoryState::Halted;
                    }
                }
                HistoryState::Halted => {}
            }
        }
        record
    }
}

/// One `{{TH|<dates>|<team>}}` row. The dates field is whitespace
/// tokens: the first is the start, and the last becomes the end only
/// when it looks like a date (separator words and `'''Present'''`
/// never do).
fn parse_entry(line: &str) -> Option<PlayerEvent> {
    let cleaned = line.replace("{{", "").replace("}}", "");
    let mut parts = cleaned.split('|');
    parts.next();
    let dates_field = parts.next()?;
    let team = parts.next()?.trim();

    let mut tokens = dates_field.split_whitespace();
    let start = tokens.next()?;
    // A field with a single token is both first and last.
    let last = tokens.next_back().unwrap_or(start);
    let end = DATE_RE.is_match(last).then(|| last.to_string());

    Some(PlayerEvent {
        start: start.to_string(),
        team: team.to_string(),
        end,
    })
}
