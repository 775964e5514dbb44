//! File-backed record store.
//!
//! Records live in two pretty-printed JSON array documents,
//! `tournaments.json` and `players.json`, inside a data directory.
//! Upserts match records by name, keep the stored order stable, and
//! rewrite the whole document atomically. The counts mirror what a
//! replace-by-key bulk write reports: replacing a record with
//! identical content is neither an insert nor a modification.

use std::path::{Path, PathBuf};

use wikiroster_core::error::AppError;
use wikiroster_core::models::{PlayerRecord, TournamentRecord, UpsertReport};
use wikiroster_core::traits::RecordStore;

/// Repository for parsed records in JSON files.
#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    tournaments_path: PathBuf,
    players_path: PathBuf,
}

impl JsonRecordStore {
    /// Store rooted at a data directory. The directory must exist;
    /// the documents are created on first upsert.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let dir = data_dir.as_ref();
        Self {
            tournaments_path: dir.join("tournaments.json"),
            players_path: dir.join("players.json"),
        }
    }

    /// Upsert tournament records by name.
    pub fn upsert_tournaments(
        &self,
        records: &[TournamentRecord],
    ) -> Result<UpsertReport, AppError> {
        upsert_into(&self.tournaments_path, records, tournament_name)
    }

    /// Upsert player records by name. Records without a name have no
    /// identity to match on and are skipped.
    pub fn upsert_players(&self, records: &[PlayerRecord]) -> Result<UpsertReport, AppError> {
        upsert_into(&self.players_path, records, player_name)
    }

    /// All stored tournament records, in stored order.
    pub fn all_tournaments(&self) -> Result<Vec<TournamentRecord>, AppError> {
        load_document(&self.tournaments_path)
    }

    /// All stored player records, in stored order.
    pub fn all_players(&self) -> Result<Vec<PlayerRecord>, AppError> {
        load_document(&self.players_path)
    }
}

fn tournament_name(record: &TournamentRecord) -> Option<&str> {
    Some(record.name.as_str())
}

fn player_name(record: &PlayerRecord) -> Option<&str> {
    record.name.as_deref()
}

fn upsert_into<R>(
    path: &Path,
    records: &[R],
    name_of: impl Fn(&R) -> Option<&str>,
) -> Result<UpsertReport, AppError>
where
    R: Clone + PartialEq + serde::Serialize + serde::de::DeserializeOwned,
{
    let mut stored: Vec<R> = load_document(path)?;
    let mut report = UpsertReport::default();

    for record in records {
        let Some(name) = name_of(record) else {
            tracing::debug!("Skipping record without a name");
            continue;
        };
        match stored.iter_mut().find(|r| name_of(r) == Some(name)) {
            Some(existing) => {
                if *existing != *record {
                    *existing = record.clone();
                    report.modified += 1;
                }
            }
            None => {
                stored.push(record.clone());
                report.inserted += 1;
            }
        }
    }

    write_document(path, &stored)?;
    Ok(report)
}

fn load_document<R: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<R>, AppError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(AppError::StoreError(format!(
                "read {}: {e}",
                path.display()
            )));
        }
    };
    serde_json::from_str(&raw)
        .map_err(|e| AppError::StoreError(format!("parse {}: {e}", path.display())))
}

/// Write-new-then-rename, matching the cache's crash discipline.
fn write_document<R: serde::Serialize>(path: &Path, records: &[R]) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(records)?;
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);
    std::fs::write(&tmp, json)
        .map_err(|e| AppError::StoreError(format!("write {}: {e}", tmp.display())))?;
    std::fs::rename(&tmp, path)
        .map_err(|e| AppError::StoreError(format!("rename to {}: {e}", path.display())))?;
    Ok(())
}

// -- Trait implementation --

impl RecordStore for JsonRecordStore {
    async fn upsert_tournaments(
        &self,
        records: &[TournamentRecord],
    ) -> Result<UpsertReport, AppError> {
        JsonRecordStore::upsert_tournaments(self, records)
    }

    async fn upsert_players(&self, records: &[PlayerRecord]) -> Result<UpsertReport, AppError> {
        JsonRecordStore::upsert_players(self, records)
    }

    async fn all_tournaments(&self) -> Result<Vec<TournamentRecord>, AppError> {
        JsonRecordStore::all_tournaments(self)
    }

    async fn all_players(&self) -> Result<Vec<PlayerRecord>, AppError> {
        JsonRecordStore::all_players(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wikiroster_core::models::{PlayerEvent, Team};

    fn tournament(name: &str, team: &str) -> TournamentRecord {
        TournamentRecord {
            name: name.to_string(),
            teams: vec![Team {
                name: team.to_string(),
                players: vec!["a".into(), "b".into()],
                subs: vec![],
            }],
        }
    }

    fn player(name: Option<&str>, team: &str) -> PlayerRecord {
        PlayerRecord {
            name: name.map(str::to_string),
            events: vec![PlayerEvent {
                start: "2015-01-01".into(),
                team: team.to_string(),
                end: None,
            }],
        }
    }

    #[test]
    fn test_first_upsert_inserts_all() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path());

        let report = store
            .upsert_tournaments(&[tournament("S1", "NRG"), tournament("S2", "G2")])
            .unwrap();

        assert_eq!(report, UpsertReport {
            inserted: 2,
            modified: 0
        });
        let stored = store.all_tournaments().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].name, "S1");
    }

    #[test]
    fn test_identical_upsert_counts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path());
        let records = [tournament("S1", "NRG")];

        store.upsert_tournaments(&records).unwrap();
        let report = store.upsert_tournaments(&records).unwrap();

        assert_eq!(report, UpsertReport::default());
    }

    #[test]
    fn test_changed_record_counts_modified_and_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path());
        store
            .upsert_tournaments(&[tournament("S1", "NRG"), tournament("S2", "G2")])
            .unwrap();

        let report = store
            .upsert_tournaments(&[tournament("S1", "Cloud9"), tournament("S3", "Dignitas")])
            .unwrap();

        assert_eq!(report, UpsertReport {
            inserted: 1,
            modified: 1
        });
        let names: Vec<String> = store
            .all_tournaments()
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["S1", "S2", "S3"], "replaced in place, new at end");
        assert_eq!(store.all_tournaments().unwrap()[0].teams[0].name, "Cloud9");
    }

    #[test]
    fn test_nameless_players_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path());

        let report = store
            .upsert_players(&[player(None, "Ghost Team"), player(Some("Kronovi"), "G2")])
            .unwrap();

        assert_eq!(report, UpsertReport {
            inserted: 1,
            modified: 0
        });
        let stored = store.all_players().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name.as_deref(), Some("Kronovi"));
    }

    #[test]
    fn test_reads_before_first_upsert_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path());
        assert!(store.all_tournaments().unwrap().is_empty());
        assert!(store.all_players().unwrap().is_empty());
    }

    #[test]
    fn test_document_is_pretty_printed() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path());
        store.upsert_tournaments(&[tournament("S1", "NRG")]).unwrap();

        let raw = std::fs::read_to_string(dir.path().join("tournaments.json")).unwrap();
        assert!(raw.starts_with('['));
        assert!(raw.contains('\n'));
        assert!(!dir.path().join("tournaments.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_trait_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonRecordStore::new(dir.path());

        let report = RecordStore::upsert_players(&store, &[player(Some("Squishy"), "C9")])
            .await
            .unwrap();
        assert_eq!(report.inserted, 1);

        let stored = RecordStore::all_players(&store).await.unwrap();
        assert_eq!(stored[0].name.as_deref(), Some("Squishy"));
    }
}
