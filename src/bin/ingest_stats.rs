use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use matchday_features::ingest::parse_ingest_batch;
use matchday_features::store::SqliteMatchStore;
use matchday_features::{PipelineConfig, telemetry};

fn main() -> Result<()> {
    telemetry::init();

    let cfg = PipelineConfig::from_env();
    let input = arg_value("--input")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("missing --input <payloads.json>"))?;
    let db_path = arg_value("--db")
        .map(PathBuf::from)
        .unwrap_or_else(|| cfg.db_path.clone());

    let raw = std::fs::read_to_string(&input)
        .with_context(|| format!("read ingest payloads {}", input.display()))?;
    let batch = parse_ingest_batch(&raw).context("parse ingest payloads")?;

    let mut store = SqliteMatchStore::create(&db_path)
        .with_context(|| format!("open sqlite store {}", db_path.display()))?;
    let upserted = store
        .upsert_rows(&batch.rows)
        .context("write ingest batch")?;

    println!("Statistics ingest complete");
    println!("DB: {}", db_path.display());
    println!("League: {} ({})", cfg.league, cfg.league_id);
    println!("Matches upserted: {upserted}");
    if !batch.errors.is_empty() {
        println!("  rejected: {}", batch.errors.len());
        for err in batch.errors.iter().take(6) {
            println!("   - {err}");
        }
    }

    Ok(())
}

fn arg_value(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}
