use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use matchday_features::dataset::{FeatureDatasetBuilder, read_fixture_list, write_targets_csv};
use matchday_features::store::StoreKind;
use matchday_features::{HistoryPolicy, MatchTables, PipelineConfig, telemetry};

fn main() -> Result<()> {
    telemetry::init();

    let mut cfg = PipelineConfig::from_env();
    if let Some(dir) = arg_value("--data-dir") {
        cfg = cfg.relocated(dir);
    }
    if let Some(raw) = arg_value("--policy") {
        cfg.history_policy = raw.parse::<HistoryPolicy>().map_err(|e| anyhow!(e))?;
    }

    let tables = load_tables(&cfg)?;

    let builder = FeatureDatasetBuilder::new(&cfg, &tables);

    let training = builder.build_training_set();
    let train_path = cfg.features_train_csv();
    training
        .write_csv(&train_path)
        .with_context(|| format!("write {}", train_path.display()))?;

    let targets = builder.build_training_targets();
    let targets_path = cfg.targets_train_csv();
    write_targets_csv(&targets_path, &targets)
        .with_context(|| format!("write {}", targets_path.display()))?;

    println!("Feature build complete");
    println!("League: {} ({})", cfg.league, cfg.league_id);
    println!("History policy: {}", cfg.history_policy);
    println!("Training rows: {} -> {}", training.len(), train_path.display());
    println!("Target rows: {} -> {}", targets.len(), targets_path.display());

    let fixtures_path = arg_value("--fixtures")
        .map(PathBuf::from)
        .unwrap_or_else(|| cfg.next_round_csv());
    if fixtures_path.exists() {
        let fixtures = read_fixture_list(&fixtures_path)
            .with_context(|| format!("read fixtures {}", fixtures_path.display()))?;
        let next_round = builder.build_next_round_set(&fixtures);
        let next_path = cfg.features_next_round_csv();
        next_round
            .write_csv(&next_path)
            .with_context(|| format!("write {}", next_path.display()))?;
        println!("Next-round rows: {} -> {}", next_round.len(), next_path.display());
    } else {
        println!("No fixture list at {}, skipped next round", fixtures_path.display());
    }

    Ok(())
}

fn load_tables(cfg: &PipelineConfig) -> Result<MatchTables> {
    let kind = arg_value("--source")
        .map(|raw| raw.parse::<StoreKind>())
        .transpose()
        .map_err(|e| anyhow!(e))?
        .unwrap_or_default();
    let db_path = arg_value("--db").map(PathBuf::from);
    let store = kind.open(cfg, db_path.as_deref()).context("open match store")?;
    store.load().context("load match store")
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
