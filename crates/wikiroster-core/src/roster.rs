//! Roster extraction from tournament participants sections.
//!
//! The markup of interest is a flat run of template parameter lines:
//!
//! ```text
//! |team=iBUYPOWER Cosmic
//! |p1=Kronovi |p1flag=us
//! |p2=Lachinio |p2flag=ca
//! ```
//!
//! A two-state scan (outside a team block / inside one) collects the
//! slot values line by line. Everything that is not a team or slot
//! line is ignored, so surrounding `{{TeamCard}}` scaffolding passes
//! through harmlessly.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::Team;

static PLAYER_SLOT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\|p[0-9]+=").unwrap());
static SUB_SLOT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\|sub[0-9]+=").unwrap());

const TEAM_MARKER: &str = "|team=";

/// Line-oriented parser for roster markup.
#[derive(Debug, Clone)]
pub struct RosterParser {
    /// Teams with fewer players than this are dropped at flush time.
    min_team_size: usize,
}

impl RosterParser {
    pub fn new(min_team_size: usize) -> Self {
        Self { min_team_size }
    }

    /// Parse one section of wikitext into teams, in document order.
    ///
    /// Never fails: lines that do not match the expected shapes are
    /// skipped, and a team block that ends up with too few players is
    /// dropped rather than reported.
    pub fn parse(&self, wikitext: &str) -> Vec<Team> {
        let mut teams = Vec::new();
        let mut current: Option<Team> = None;

        for line in wikitext.lines() {
            if let Some(rest) = line.strip_prefix(TEAM_MARKER) {
                self.flush(&mut teams, current.take());
                current = Some(Team {
                    name: team_name(rest),
                    players: Vec::new(),
                    subs: Vec::new(),
                });
            } else if let Some(team) = current.as_mut() {
                if PLAYER_SLOT_RE.is_match(line) {
                    if let Some(player) = slot_value(line) {
                        team.players.push(player);
                    }
                } else if SUB_SLOT_RE.is_match(line) {
                    if let Some(sub) = slot_value(line) {
                        team.subs.push(sub);
                    }
                }
            }
        }
        self.flush(&mut teams, current.take());
        teams
    }

    fn flush(&self, teams: &mut Vec<Team>, team: Option<Team>) {
        if let Some(team) = team
            && team.players.len() >= self.min_team_size
        {
            teams.push(team);
        }
    }
}

/// Name portion of a `|team=` line: everything up to the next `|`,
/// so trailing parameters on the same line (`|team=NRG|teamflag=us`)
/// do not leak into the name.
fn team_name(rest: &str) -> String {
    let name = match rest.find('|') {
        Some(end) => &rest[..end],
        None => rest,
    };
    name.trim().to_string()
}

/// Value of a slot line: the segment between the first two `|`s,
/// then what follows the first `=` up to any second `=`. Trailing
/// parameters after another `|` (flag icons and the like) and
/// anything after a second `=` are discarded.
fn slot_value(line: &str) -> Option<String> {
    let segment = line.split('|').nth(1)?;
    let value = segment.split('=').nth(1)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
