//! Feature Assembler: one fixed-schema row per fixture.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::aggregate::{average_metric, away_performance, home_performance, recent_form};
use crate::config::{DEFAULT_FORM_WINDOW, PipelineConfig};
use crate::domain::{Fixture, MatchRecord, MatchStatistics, Metric};
use crate::history::{HistoryPolicy, TeamHistoryView, history_for_fixture};
use crate::store::MatchTables;

pub const ID_COLUMNS: [&str; 3] = ["match_id", "home_team", "away_team"];

/// Numeric feature columns, in output order. Estimators are trained against
/// exactly this order.
pub const FEATURE_COLUMNS: [&str; 16] = [
    "home_avg_corners",
    "away_avg_corners",
    "home_avg_shots",
    "away_avg_shots",
    "home_avg_yellow_cards",
    "away_avg_yellow_cards",
    "home_avg_xg",
    "away_avg_xg",
    "home_form_last5",
    "away_form_last5",
    "home_home_performance",
    "away_away_performance",
    "delta_corners",
    "delta_shots",
    "delta_xg",
    "delta_yellow_cards",
];

/// Metric behind the role-restricted performance columns.
pub const PERFORMANCE_METRIC: Metric = Metric::Shots;

/// Field order mirrors [`ID_COLUMNS`] followed by [`FEATURE_COLUMNS`]; the csv
/// header is derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub home_avg_corners: f64,
    pub away_avg_corners: f64,
    pub home_avg_shots: f64,
    pub away_avg_shots: f64,
    pub home_avg_yellow_cards: f64,
    pub away_avg_yellow_cards: f64,
    pub home_avg_xg: f64,
    pub away_avg_xg: f64,
    pub home_form_last5: f64,
    pub away_form_last5: f64,
    pub home_home_performance: f64,
    pub away_away_performance: f64,
    pub delta_corners: f64,
    pub delta_shots: f64,
    pub delta_xg: f64,
    pub delta_yellow_cards: f64,
}

impl FeatureVector {
    /// Numeric values in [`FEATURE_COLUMNS`] order.
    pub fn values(&self) -> [f64; FEATURE_COLUMNS.len()] {
        [
            self.home_avg_corners,
            self.away_avg_corners,
            self.home_avg_shots,
            self.away_avg_shots,
            self.home_avg_yellow_cards,
            self.away_avg_yellow_cards,
            self.home_avg_xg,
            self.away_avg_xg,
            self.home_form_last5,
            self.away_form_last5,
            self.home_home_performance,
            self.away_away_performance,
            self.delta_corners,
            self.delta_shots,
            self.delta_xg,
            self.delta_yellow_cards,
        ]
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        let idx = feature_index(column)?;
        Some(self.values()[idx])
    }
}

pub fn feature_index(column: &str) -> Option<usize> {
    FEATURE_COLUMNS.iter().position(|c| *c == column)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssemblerOptions {
    pub policy: HistoryPolicy,
    pub form_window: usize,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            policy: HistoryPolicy::default(),
            form_window: DEFAULT_FORM_WINDOW,
        }
    }
}

impl AssemblerOptions {
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            policy: cfg.history_policy,
            form_window: cfg.form_window,
        }
    }
}

struct TeamAverages {
    corners: f64,
    shots: f64,
    yellow_cards: f64,
    xg: f64,
}

impl TeamAverages {
    fn of(view: &TeamHistoryView<'_>) -> Self {
        Self {
            corners: average_metric(view, Metric::Corners),
            shots: average_metric(view, Metric::Shots),
            yellow_cards: average_metric(view, Metric::YellowCards),
            xg: average_metric(view, Metric::Xg),
        }
    }
}

/// Builds feature rows from a borrowed match log. The same `build` serves
/// played and upcoming fixtures so both share one history cut-off.
pub struct FeatureAssembler<'a> {
    matches: &'a [MatchRecord],
    stats: &'a HashMap<String, MatchStatistics>,
    options: AssemblerOptions,
}

impl<'a> FeatureAssembler<'a> {
    pub fn new(tables: &'a MatchTables, options: AssemblerOptions) -> Self {
        Self::from_parts(&tables.matches, &tables.stats, options)
    }

    pub fn from_parts(
        matches: &'a [MatchRecord],
        stats: &'a HashMap<String, MatchStatistics>,
        options: AssemblerOptions,
    ) -> Self {
        Self {
            matches,
            stats,
            options,
        }
    }

    pub fn options(&self) -> AssemblerOptions {
        self.options
    }

    pub fn history(&self, team: &str, fixture: &Fixture) -> TeamHistoryView<'a> {
        history_for_fixture(team, fixture, self.options.policy, self.matches, self.stats)
    }

    pub fn build(&self, fixture: &Fixture) -> FeatureVector {
        let home_view = self.history(&fixture.home_team, fixture);
        let away_view = self.history(&fixture.away_team, fixture);

        let home = TeamAverages::of(&home_view);
        let away = TeamAverages::of(&away_view);
        let window = self.options.form_window;

        FeatureVector {
            match_id: fixture.match_id.clone(),
            home_team: fixture.home_team.clone(),
            away_team: fixture.away_team.clone(),
            home_avg_corners: home.corners,
            away_avg_corners: away.corners,
            home_avg_shots: home.shots,
            away_avg_shots: away.shots,
            home_avg_yellow_cards: home.yellow_cards,
            away_avg_yellow_cards: away.yellow_cards,
            home_avg_xg: home.xg,
            away_avg_xg: away.xg,
            home_form_last5: recent_form(&home_view.recent(window)),
            away_form_last5: recent_form(&away_view.recent(window)),
            home_home_performance: home_performance(&home_view, PERFORMANCE_METRIC),
            away_away_performance: away_performance(&away_view, PERFORMANCE_METRIC),
            delta_corners: home.corners - away.corners,
            delta_shots: home.shots - away.shots,
            delta_xg: home.xg - away.xg,
            delta_yellow_cards: home.yellow_cards - away.yellow_cards,
        }
    }
}
