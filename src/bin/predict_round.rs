use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use matchday_features::dataset::{FeatureDatasetBuilder, FeatureTable};
use matchday_features::export::export_workbook;
use matchday_features::predict::{EstimatorSet, corners_signal, write_predictions_csv};
use matchday_features::store::StoreKind;
use matchday_features::{MatchTables, PipelineConfig, telemetry};

fn main() -> Result<()> {
    telemetry::init();

    let mut cfg = PipelineConfig::from_env();
    if let Some(dir) = arg_value("--data-dir") {
        cfg = cfg.relocated(dir);
    }
    if let Some(line) = arg_value("--line").and_then(|v| v.parse::<f64>().ok()) {
        cfg.corners_line = line;
    }

    let features_path = arg_value("--features")
        .map(PathBuf::from)
        .unwrap_or_else(|| cfg.features_next_round_csv());
    let features = FeatureTable::read_csv(&features_path).with_context(|| {
        format!(
            "read {} (build next-round features first)",
            features_path.display()
        )
    })?;

    let estimators = EstimatorSet::baseline().context("build baseline estimators")?;
    let predictions = estimators.predict_rows(&features);
    let signals = predictions
        .iter()
        .map(|p| corners_signal(p, cfg.corners_line))
        .collect::<Vec<_>>();

    let predictions_path = cfg.predictions_csv();
    write_predictions_csv(&predictions_path, &predictions)
        .with_context(|| format!("write {}", predictions_path.display()))?;

    println!("Predictions: {} -> {}", predictions.len(), predictions_path.display());
    for (target, estimator) in estimators.describe() {
        println!("  {target} <- {estimator}");
    }
    for s in &signals {
        println!(
            "  {} vs {}: {} ({})",
            s.home_team, s.away_team, s.suggestion, s.rationale
        );
    }

    if has_flag("--xlsx") {
        let tables = load_tables(&cfg)?;
        let profiles = FeatureDatasetBuilder::new(&cfg, &tables).team_profiles();
        let report_path = cfg.report_xlsx();
        let report = export_workbook(&report_path, &features, &predictions, &signals, &profiles)
            .with_context(|| format!("write {}", report_path.display()))?;
        println!(
            "Report: {} ({} fixtures, {} teams)",
            report_path.display(),
            report.predictions,
            report.teams
        );
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

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
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
