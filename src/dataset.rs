//! Feature Dataset Builder: drives the assembler over the whole match log
//! (training) or over one round of fixtures (inference).

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::TeamProfile;
use crate::config::{PipelineConfig, ensure_parent};
use crate::domain::{Fixture, Metric, Side};
use crate::error::{PipelineError, Result};
use crate::features::{AssemblerOptions, FEATURE_COLUMNS, FeatureAssembler, FeatureVector, ID_COLUMNS};
use crate::history::history_of;
use crate::ingest::normalize_date_str;
use crate::store::{HeaderIndex, MatchTables, open_csv, require_team};

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub rows: Vec<FeatureVector>,
}

impl FeatureTable {
    pub fn new(rows: Vec<FeatureVector>) -> Self {
        Self {
            columns: Self::table_columns(),
            rows,
        }
    }

    /// `match_id, home_team, away_team` followed by the feature columns.
    pub fn table_columns() -> Vec<String> {
        ID_COLUMNS
            .iter()
            .chain(FEATURE_COLUMNS.iter())
            .map(|c| c.to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        ensure_parent(path)?;
        let mut writer = csv::Writer::from_path(path)?;
        if self.rows.is_empty() {
            writer.write_record(&self.columns)?;
        }
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        debug!(rows = self.rows.len(), path = %path.display(), "wrote feature table");
        Ok(())
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = open_csv(path, "features")?;
        let header = HeaderIndex::new("features", reader.headers()?);
        for column in Self::table_columns() {
            header.require(&column)?;
        }
        let mut rows = Vec::new();
        for row in reader.deserialize::<FeatureVector>() {
            rows.push(row?);
        }
        Ok(Self::new(rows))
    }
}

/// Observed per-match values the estimators learn to predict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingTarget {
    pub match_id: String,
    pub corners_home: f64,
    pub corners_away: f64,
    pub shots_home: f64,
    pub shots_away: f64,
    pub yellow_cards_home: f64,
    pub yellow_cards_away: f64,
    pub xg_home: f64,
    pub xg_away: f64,
}

pub struct FeatureDatasetBuilder<'a> {
    tables: &'a MatchTables,
    options: AssemblerOptions,
}

impl<'a> FeatureDatasetBuilder<'a> {
    pub fn new(cfg: &PipelineConfig, tables: &'a MatchTables) -> Self {
        Self::with_options(tables, AssemblerOptions::from_config(cfg))
    }

    pub fn with_options(tables: &'a MatchTables, options: AssemblerOptions) -> Self {
        Self { tables, options }
    }

    fn assembler(&self) -> FeatureAssembler<'a> {
        FeatureAssembler::new(self.tables, self.options)
    }

    /// One row per match in the log, built from the match's own teams.
    pub fn build_training_set(&self) -> FeatureTable {
        let assembler = self.assembler();
        let rows = self
            .tables
            .matches
            .iter()
            .map(|m| assembler.build(&m.to_fixture()))
            .collect::<Vec<_>>();
        info!(
            rows = rows.len(),
            policy = %self.options.policy,
            "built training feature table"
        );
        FeatureTable::new(rows)
    }

    /// One row per upcoming fixture.
    pub fn build_next_round_set(&self, fixtures: &[Fixture]) -> FeatureTable {
        let assembler = self.assembler();
        let rows = fixtures
            .iter()
            .map(|f| {
                if self
                    .tables
                    .matches
                    .iter()
                    .any(|m| m.match_id == f.match_id && m.is_played())
                {
                    warn!(match_id = %f.match_id, "fixture already has a result in the match log");
                }
                assembler.build(f)
            })
            .collect::<Vec<_>>();
        info!(rows = rows.len(), "built next-round feature table");
        FeatureTable::new(rows)
    }

    /// Observed targets for every played match that has statistics.
    pub fn build_training_targets(&self) -> Vec<TrainingTarget> {
        let mut out = Vec::new();
        for m in self.tables.matches.iter().filter(|m| m.is_played()) {
            let Some(stats) = self.tables.stats_for(&m.match_id) else {
                debug!(match_id = %m.match_id, "no statistics, skipping target row");
                continue;
            };
            let pair = |metric: Metric| (stats.get(metric, Side::Home), stats.get(metric, Side::Away));
            let (corners_home, corners_away) = pair(Metric::Corners);
            let (shots_home, shots_away) = pair(Metric::Shots);
            let (yellow_cards_home, yellow_cards_away) = pair(Metric::YellowCards);
            let (xg_home, xg_away) = pair(Metric::Xg);
            out.push(TrainingTarget {
                match_id: m.match_id.clone(),
                corners_home,
                corners_away,
                shots_home,
                shots_away,
                yellow_cards_home,
                yellow_cards_away,
                xg_home,
                xg_away,
            });
        }
        out
    }

    /// Whole-log summary per team.
    pub fn team_profiles(&self) -> Vec<TeamProfile> {
        self.tables
            .teams()
            .iter()
            .map(|team| {
                let view = history_of(team, &self.tables.matches, &self.tables.stats);
                TeamProfile::from_view(&view, self.options.form_window)
            })
            .collect()
    }
}

pub fn write_targets_csv(path: &Path, targets: &[TrainingTarget]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    for row in targets {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads the next-round fixture list. `match_id`, `home_team` and `away_team`
/// are required; `date`, `season` and `round_number` are optional.
pub fn read_fixture_list(path: &Path) -> Result<Vec<Fixture>> {
    let mut reader = open_csv(path, "fixtures")?;
    let header = HeaderIndex::new("fixtures", reader.headers()?);
    let id = header.require("match_id")?;
    let home = header.require("home_team")?;
    let away = header.require("away_team")?;
    let date = header.optional("date");
    let season = header.optional("season");
    let round = header.optional("round_number");

    let mut out = Vec::new();
    for row in reader.records() {
        let row = row?;
        let cell = |i: usize| row.get(i).unwrap_or("").trim();
        let opt_cell = |i: Option<usize>| i.map(cell).filter(|s| !s.is_empty());
        if cell(id).is_empty() {
            continue;
        }
        let home_team = require_team(cell(home), "home_team", "fixtures", cell(id))?;
        let away_team = require_team(cell(away), "away_team", "fixtures", cell(id))?;
        let mut fixture = Fixture::new(cell(id), home_team, away_team);
        fixture.date = opt_cell(date).map(normalize_date_str).transpose()?;
        fixture.season = opt_cell(season).map(|s| s.to_string());
        fixture.round_number = opt_cell(round).and_then(|s| s.parse::<i64>().ok());
        out.push(fixture);
    }
    if out.is_empty() {
        return Err(PipelineError::unavailable(format!(
            "no fixtures in {}",
            path.display()
        )));
    }
    Ok(out)
}
