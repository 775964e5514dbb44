use serde::Serialize;

use wikiroster_core::models::{Team, TournamentRecord};

// ---------------------------------------------------------------------------
// Tournaments
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TournamentResponse {
    pub name: String,
    pub teams: Vec<TeamResponse>,
}

impl From<TournamentRecord> for TournamentResponse {
    fn from(record: TournamentRecord) -> Self {
        Self {
            name: record.name,
            teams: record.teams.into_iter().map(TeamResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct TeamResponse {
    pub name: String,
    pub players: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subs: Vec<String>,
}

impl From<Team> for TeamResponse {
    fn from(team: Team) -> Self {
        Self {
            name: team.name,
            players: team.players,
            subs: team.subs,
        }
    }
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}
