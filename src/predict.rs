//! Next-round predictions from a feature table.
//!
//! The regression algorithms live outside this crate; anything implementing
//! [`Estimator`] can be plugged into an [`EstimatorSet`].

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::config::ensure_parent;
use crate::dataset::FeatureTable;
use crate::domain::{MODELED_METRICS, Metric, Side};
use crate::error::{PipelineError, Result};
use crate::features::{FEATURE_COLUMNS, FeatureVector, feature_index};

/// One modelled quantity: a metric for one side of the fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    pub metric: Metric,
    pub side: Side,
}

impl Target {
    pub fn all() -> impl Iterator<Item = Target> {
        MODELED_METRICS.into_iter().flat_map(|metric| {
            [Side::Home, Side::Away]
                .into_iter()
                .map(move |side| Target { metric, side })
        })
    }

    pub fn name(self) -> String {
        self.metric.column(self.side)
    }

    /// Feature column holding this side's historical average of the metric.
    pub fn average_column(self) -> String {
        format!("{}_avg_{}", self.side.suffix(), self.metric.name())
    }
}

pub trait Estimator {
    fn name(&self) -> &str;

    /// `features` are in [`FEATURE_COLUMNS`] order.
    fn predict(&self, features: &[f64]) -> f64;
}

/// Predicts the value of one feature column unchanged.
#[derive(Debug, Clone)]
pub struct ColumnBaseline {
    column: String,
    index: usize,
}

impl ColumnBaseline {
    pub fn new(column: &str) -> Result<Self> {
        let index = feature_index(column)
            .ok_or_else(|| PipelineError::missing_column("features", column))?;
        Ok(Self {
            column: column.to_string(),
            index,
        })
    }
}

impl Estimator for ColumnBaseline {
    fn name(&self) -> &str {
        &self.column
    }

    fn predict(&self, features: &[f64]) -> f64 {
        features.get(self.index).copied().unwrap_or(0.0)
    }
}

#[derive(Default)]
pub struct EstimatorSet {
    estimators: HashMap<Target, Box<dyn Estimator>>,
}

impl EstimatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every target predicted by its own side's historical average.
    pub fn baseline() -> Result<Self> {
        let mut set = Self::new();
        for target in Target::all() {
            set.insert(target, ColumnBaseline::new(&target.average_column())?);
        }
        Ok(set)
    }

    pub fn insert(&mut self, target: Target, estimator: impl Estimator + 'static) {
        self.estimators.insert(target, Box::new(estimator));
    }

    pub fn len(&self) -> usize {
        self.estimators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimators.is_empty()
    }

    /// `(target, estimator)` names, sorted by target.
    pub fn describe(&self) -> Vec<(String, String)> {
        let mut out = self
            .estimators
            .iter()
            .map(|(target, est)| (target.name(), est.name().to_string()))
            .collect::<Vec<_>>();
        out.sort();
        out
    }

    fn predict_target(&self, target: Target, features: &[f64]) -> f64 {
        self.estimators
            .get(&target)
            .map_or(0.0, |est| est.predict(features))
    }

    /// Targets without an estimator predict `0.0`.
    pub fn predict(&self, row: &FeatureVector) -> PredictionRecord {
        let features = row.values();
        let p = |metric, side| self.predict_target(Target { metric, side }, &features);
        PredictionRecord {
            match_id: row.match_id.clone(),
            home_team: row.home_team.clone(),
            away_team: row.away_team.clone(),
            predicted_corners_home: p(Metric::Corners, Side::Home),
            predicted_corners_away: p(Metric::Corners, Side::Away),
            predicted_shots_home: p(Metric::Shots, Side::Home),
            predicted_shots_away: p(Metric::Shots, Side::Away),
            predicted_yellow_cards_home: p(Metric::YellowCards, Side::Home),
            predicted_yellow_cards_away: p(Metric::YellowCards, Side::Away),
            predicted_xg_home: p(Metric::Xg, Side::Home),
            predicted_xg_away: p(Metric::Xg, Side::Away),
            confidence_low: None,
            confidence_high: None,
        }
    }

    pub fn predict_rows(&self, table: &FeatureTable) -> Vec<PredictionRecord> {
        debug_assert_eq!(table.columns.len(), FEATURE_COLUMNS.len() + 3);
        let out = table.rows.iter().map(|row| self.predict(row)).collect::<Vec<_>>();
        for (target, estimator) in self.describe() {
            debug!(%target, %estimator, "estimator in use");
        }
        debug!(rows = out.len(), estimators = self.len(), "scored feature rows");
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionRecord {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub predicted_corners_home: f64,
    pub predicted_corners_away: f64,
    pub predicted_shots_home: f64,
    pub predicted_shots_away: f64,
    pub predicted_yellow_cards_home: f64,
    pub predicted_yellow_cards_away: f64,
    pub predicted_xg_home: f64,
    pub predicted_xg_away: f64,
    /// Lower bound per target name, e.g. `corners_home`.
    pub confidence_low: Option<HashMap<String, f64>>,
    pub confidence_high: Option<HashMap<String, f64>>,
}

impl PredictionRecord {
    pub fn total_corners(&self) -> f64 {
        self.predicted_corners_home + self.predicted_corners_away
    }
}

const PREDICTION_COLUMNS: [&str; 11] = [
    "match_id",
    "home_team",
    "away_team",
    "predicted_corners_home",
    "predicted_corners_away",
    "predicted_shots_home",
    "predicted_shots_away",
    "predicted_yellow_cards_home",
    "predicted_yellow_cards_away",
    "predicted_xg_home",
    "predicted_xg_away",
];

/// Writes the flat prediction table. Confidence maps are not part of the csv.
pub fn write_predictions_csv(path: &Path, predictions: &[PredictionRecord]) -> Result<()> {
    ensure_parent(path)?;
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(PREDICTION_COLUMNS)?;
    for p in predictions {
        let numbers = [
            p.predicted_corners_home,
            p.predicted_corners_away,
            p.predicted_shots_home,
            p.predicted_shots_away,
            p.predicted_yellow_cards_home,
            p.predicted_yellow_cards_away,
            p.predicted_xg_home,
            p.predicted_xg_away,
        ];
        let mut record = vec![p.match_id.clone(), p.home_team.clone(), p.away_team.clone()];
        record.extend(numbers.iter().map(|v| format!("{v:.4}")));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Suggestion {
    Over,
    Under,
    None,
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Suggestion::Over => "over",
            Suggestion::Under => "under",
            Suggestion::None => "none",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BettingSignal {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub market: String,
    pub suggestion: Suggestion,
    pub rationale: String,
}

const CORNERS_MARGIN: f64 = 1.0;

/// Over/under call on total corners: more than one corner clear of `line`
/// either way, otherwise no call.
pub fn corners_signal(pred: &PredictionRecord, line: f64) -> BettingSignal {
    let total = pred.total_corners();
    let (suggestion, rationale) = if total > line + CORNERS_MARGIN {
        (
            Suggestion::Over,
            format!("expected total corners ({total:.2}) above line {line}"),
        )
    } else if total < line - CORNERS_MARGIN {
        (
            Suggestion::Under,
            format!("expected total corners ({total:.2}) below line {line}"),
        )
    } else {
        (
            Suggestion::None,
            format!("expected total corners ({total:.2}) close to line {line}"),
        )
    };

    BettingSignal {
        match_id: pred.match_id.clone(),
        home_team: pred.home_team.clone(),
        away_team: pred.away_team.clone(),
        market: format!("Total Corners {line}"),
        suggestion,
        rationale,
    }
}
