use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use wikiroster_client::MediaWikiClient;
use wikiroster_core::cache::JsonCacheStore;
use wikiroster_core::config::IngestConfig;
use wikiroster_core::ingest::{IngestReport, IngestService, PageOutcome};
use wikiroster_core::models::UpsertReport;
use wikiroster_core::traits::NullRecordStore;
use wikiroster_store::JsonRecordStore;

#[derive(Parser)]
#[command(name = "wikiroster", version, about = "Wiki roster ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and parse tournament participant rosters
    Tournaments {
        /// Run configuration file (page lists, keyword, thresholds)
        #[arg(short, long, env = "WIKIROSTER_CONFIG", default_value = "config.json")]
        config: PathBuf,

        /// Directory holding the durable fetch caches
        #[arg(long, env = "WIKIROSTER_CACHE_DIR", default_value = "cache")]
        cache_dir: PathBuf,

        /// Directory holding the record store documents
        #[arg(long, env = "WIKIROSTER_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        /// Drop rosters smaller than this (overrides the config value)
        #[arg(long)]
        min_team_size: Option<usize>,

        /// Also write the parsed records to this JSON file
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Skip fetching; parse what the cache already holds
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Skip the record store upsert
        #[arg(long, default_value_t = false)]
        no_store: bool,

        /// Exit non-zero if any page failed
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Fetch and parse player career histories
    Players {
        /// Run configuration file (page lists, keyword, thresholds)
        #[arg(short, long, env = "WIKIROSTER_CONFIG", default_value = "config.json")]
        config: PathBuf,

        /// Directory holding the durable fetch caches
        #[arg(long, env = "WIKIROSTER_CACHE_DIR", default_value = "cache")]
        cache_dir: PathBuf,

        /// Directory holding the record store documents
        #[arg(long, env = "WIKIROSTER_DATA_DIR", default_value = "data")]
        data_dir: PathBuf,

        /// Seconds to wait between fetches (overrides the config value)
        #[arg(long)]
        delay: Option<u64>,

        /// Also write the parsed records to this JSON file
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Skip fetching; parse what the cache already holds
        #[arg(long, default_value_t = false)]
        offline: bool,

        /// Skip the record store upsert
        #[arg(long, default_value_t = false)]
        no_store: bool,

        /// Exit non-zero if any page failed
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("wikiroster=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Tournaments {
            config,
            cache_dir,
            data_dir,
            min_team_size,
            out,
            offline,
            no_store,
            strict,
        } => {
            let mut config = load_config(&config)?;
            if let Some(size) = min_team_size {
                config.min_team_size = size;
            }
            if offline {
                config.tournaments.clear();
            }
            cmd_tournaments(config, &cache_dir, &data_dir, no_store, out.as_deref(), strict)
                .await?;
        }
        Commands::Players {
            config,
            cache_dir,
            data_dir,
            delay,
            out,
            offline,
            no_store,
            strict,
        } => {
            let mut config = load_config(&config)?;
            if let Some(secs) = delay {
                config.fetch_delay_secs = secs;
            }
            if offline {
                config.players.clear();
            }
            cmd_players(config, &cache_dir, &data_dir, no_store, out.as_deref(), strict).await?;
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<IngestConfig> {
    IngestConfig::from_file(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

async fn cmd_tournaments(
    config: IngestConfig,
    cache_dir: &Path,
    data_dir: &Path,
    no_store: bool,
    out: Option<&Path>,
    strict: bool,
) -> Result<()> {
    std::fs::create_dir_all(cache_dir)
        .with_context(|| format!("Failed to create cache dir {}", cache_dir.display()))?;

    let fetcher = MediaWikiClient::new().map_err(|e| anyhow::anyhow!(e))?;
    let tournament_cache = JsonCacheStore::new(cache_dir.join("tournaments.json"));
    let player_cache = JsonCacheStore::new(cache_dir.join("players.json"));

    let outcome = if no_store {
        IngestService::<_, _, NullRecordStore>::new(
            fetcher,
            tournament_cache,
            player_cache,
            config,
        )
        .ingest_tournaments()
        .await
        .map_err(|e| anyhow::anyhow!(e))?
    } else {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;
        let store = JsonRecordStore::new(data_dir);
        IngestService::with_store(fetcher, tournament_cache, player_cache, store, config)
            .ingest_tournaments()
            .await
            .map_err(|e| anyhow::anyhow!(e))?
    };

    if let Some(path) = out {
        let json = serde_json::to_string_pretty(&outcome.records)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {} records to {}", outcome.records.len(), path.display());
    }

    finish(
        "tournament",
        outcome.records.len(),
        &outcome.report,
        outcome.upsert,
        strict,
    )
}

async fn cmd_players(
    config: IngestConfig,
    cache_dir: &Path,
    data_dir: &Path,
    no_store: bool,
    out: Option<&Path>,
    strict: bool,
) -> Result<()> {
    std::fs::create_dir_all(cache_dir)
        .with_context(|| format!("Failed to create cache dir {}", cache_dir.display()))?;

    let fetcher = MediaWikiClient::new().map_err(|e| anyhow::anyhow!(e))?;
    let tournament_cache = JsonCacheStore::new(cache_dir.join("tournaments.json"));
    let player_cache = JsonCacheStore::new(cache_dir.join("players.json"));

    let outcome = if no_store {
        IngestService::<_, _, NullRecordStore>::new(
            fetcher,
            tournament_cache,
            player_cache,
            config,
        )
        .ingest_players()
        .await
        .map_err(|e| anyhow::anyhow!(e))?
    } else {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;
        let store = JsonRecordStore::new(data_dir);
        IngestService::with_store(fetcher, tournament_cache, player_cache, store, config)
            .ingest_players()
            .await
            .map_err(|e| anyhow::anyhow!(e))?
    };

    if let Some(path) = out {
        let json = serde_json::to_string_pretty(&outcome.records)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Wrote {} records to {}", outcome.records.len(), path.display());
    }

    finish(
        "player",
        outcome.records.len(),
        &outcome.report,
        outcome.upsert,
        strict,
    )
}

/// Print the run summary and apply `--strict`.
fn finish(
    kind: &str,
    record_count: usize,
    report: &IngestReport,
    upsert: Option<UpsertReport>,
    strict: bool,
) -> Result<()> {
    println!(
        "Parsed {} {} records: {} fetched, {} cached, {} skipped, {} failed",
        record_count,
        kind,
        report.fetched(),
        report.cached(),
        report.skipped(),
        report.failed()
    );
    for result in report.failures() {
        if let PageOutcome::Failed(reason) = &result.outcome {
            println!("  FAILED {}: {}", result.page, reason);
        }
    }
    if let Some(counts) = upsert {
        println!("Inserted {}, modified {}", counts.inserted, counts.modified);
    }

    if strict && report.has_failures() {
        anyhow::bail!("{} page(s) failed this run", report.failed());
    }
    Ok(())
}
