use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::history::HistoryPolicy;

pub const DEFAULT_LEAGUE: &str = "Primeira Liga";
pub const DEFAULT_LEAGUE_ID: u32 = 238;
pub const DEFAULT_FORM_WINDOW: usize = 5;
pub const DEFAULT_CORNERS_LINE: f64 = 9.5;

/// Everything a pipeline run needs to know about where data lives and how
/// features are cut. Passed explicitly to stores and builders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub predictions_dir: PathBuf,
    pub db_path: PathBuf,
    pub league: String,
    pub league_id: u32,
    pub form_window: usize,
    pub history_policy: HistoryPolicy,
    pub corners_line: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::with_data_dir("data")
    }
}

impl PipelineConfig {
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        let data_dir = dir.into();
        Self {
            raw_dir: data_dir.join("raw"),
            processed_dir: data_dir.join("processed"),
            predictions_dir: data_dir.join("predictions"),
            db_path: data_dir.join("matches.sqlite"),
            data_dir,
            league: DEFAULT_LEAGUE.to_string(),
            league_id: DEFAULT_LEAGUE_ID,
            form_window: DEFAULT_FORM_WINDOW,
            history_policy: HistoryPolicy::default(),
            corners_line: DEFAULT_CORNERS_LINE,
        }
    }

    /// Same settings with every path re-derived under `dir`.
    pub fn relocated(self, dir: impl Into<PathBuf>) -> Self {
        let base = Self::with_data_dir(dir);
        Self {
            data_dir: base.data_dir,
            raw_dir: base.raw_dir,
            processed_dir: base.processed_dir,
            predictions_dir: base.predictions_dir,
            db_path: base.db_path,
            ..self
        }
    }

    /// Loads `.env.local` / `.env`, then reads `APP_*` variables over the defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let opt = |key: &str| {
            lookup(key).and_then(|val| {
                let trimmed = val.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            })
        };

        let mut cfg = match opt("APP_DATA_DIR") {
            Some(dir) => Self::with_data_dir(dir),
            None => Self::default(),
        };
        if let Some(path) = opt("APP_DB_PATH") {
            cfg.db_path = PathBuf::from(path);
        }
        if let Some(league) = opt("APP_LEAGUE") {
            cfg.league = league;
        }
        if let Some(id) = opt("APP_LEAGUE_ID").and_then(|v| v.parse::<u32>().ok()) {
            cfg.league_id = id;
        }
        if let Some(n) = opt("APP_FORM_WINDOW").and_then(|v| v.parse::<usize>().ok()) {
            cfg.form_window = n.max(1);
        }
        if let Some(raw) = opt("APP_HISTORY_POLICY") {
            match raw.parse::<HistoryPolicy>() {
                Ok(policy) => cfg.history_policy = policy,
                Err(err) => warn!(%err, "ignoring APP_HISTORY_POLICY"),
            }
        }
        if let Some(line) = opt("APP_CORNERS_LINE").and_then(|v| v.parse::<f64>().ok()) {
            cfg.corners_line = line;
        }
        cfg
    }

    pub fn matches_csv(&self) -> PathBuf {
        self.raw_dir.join("matches.csv")
    }

    pub fn stats_csv(&self) -> PathBuf {
        self.raw_dir.join("match_stats.csv")
    }

    pub fn next_round_csv(&self) -> PathBuf {
        self.raw_dir.join("next_round.csv")
    }

    pub fn features_train_csv(&self) -> PathBuf {
        self.processed_dir.join("features_train.csv")
    }

    pub fn targets_train_csv(&self) -> PathBuf {
        self.processed_dir.join("targets_train.csv")
    }

    pub fn features_next_round_csv(&self) -> PathBuf {
        self.processed_dir.join("features_next_round.csv")
    }

    pub fn predictions_csv(&self) -> PathBuf {
        self.predictions_dir.join("predictions_next_round.csv")
    }

    pub fn report_xlsx(&self) -> PathBuf {
        self.predictions_dir.join("next_round.xlsx")
    }
}

pub(crate) fn ensure_parent(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
