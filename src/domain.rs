use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Home => Side::Away,
            Side::Away => Side::Home,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Every paired statistic a match row can carry. Declaration order is the
/// storage order inside [`MatchStatistics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Xg,
    Possession,
    Shots,
    ShotsOnTarget,
    BigChances,
    Corners,
    PassesCompleted,
    PassesTotal,
    YellowCards,
    Xgot,
    ShotsOffTarget,
    ShotsBlocked,
    ShotsInsideBox,
    ShotsOutsideBox,
    HitWoodwork,
    HeadedGoals,
    TouchesInBox,
    AccurateThroughBalls,
    Offsides,
    FreeKicks,
    LongPassesCompleted,
    LongPassesTotal,
    FinalThirdPassesCompleted,
    FinalThirdPassesTotal,
    CrossesCompleted,
    CrossesTotal,
    Xa,
    ThrowIns,
    Fouls,
    TacklesWon,
    TacklesTotal,
    DuelsWon,
    Clearances,
    Interceptions,
    ErrorsShot,
    ErrorsGoal,
    Saves,
    XgotFaced,
    GoalsPrevented,
}

impl Metric {
    pub const COUNT: usize = 39;

    pub const ALL: [Metric; Metric::COUNT] = [
        Metric::Xg,
        Metric::Possession,
        Metric::Shots,
        Metric::ShotsOnTarget,
        Metric::BigChances,
        Metric::Corners,
        Metric::PassesCompleted,
        Metric::PassesTotal,
        Metric::YellowCards,
        Metric::Xgot,
        Metric::ShotsOffTarget,
        Metric::ShotsBlocked,
        Metric::ShotsInsideBox,
        Metric::ShotsOutsideBox,
        Metric::HitWoodwork,
        Metric::HeadedGoals,
        Metric::TouchesInBox,
        Metric::AccurateThroughBalls,
        Metric::Offsides,
        Metric::FreeKicks,
        Metric::LongPassesCompleted,
        Metric::LongPassesTotal,
        Metric::FinalThirdPassesCompleted,
        Metric::FinalThirdPassesTotal,
        Metric::CrossesCompleted,
        Metric::CrossesTotal,
        Metric::Xa,
        Metric::ThrowIns,
        Metric::Fouls,
        Metric::TacklesWon,
        Metric::TacklesTotal,
        Metric::DuelsWon,
        Metric::Clearances,
        Metric::Interceptions,
        Metric::ErrorsShot,
        Metric::ErrorsGoal,
        Metric::Saves,
        Metric::XgotFaced,
        Metric::GoalsPrevented,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Metric::Xg => "xg",
            Metric::Possession => "possession",
            Metric::Shots => "shots",
            Metric::ShotsOnTarget => "shots_on_target",
            Metric::BigChances => "big_chances",
            Metric::Corners => "corners",
            Metric::PassesCompleted => "passes_completed",
            Metric::PassesTotal => "passes_total",
            Metric::YellowCards => "yellow_cards",
            Metric::Xgot => "xgot",
            Metric::ShotsOffTarget => "shots_off_target",
            Metric::ShotsBlocked => "shots_blocked",
            Metric::ShotsInsideBox => "shots_inside_box",
            Metric::ShotsOutsideBox => "shots_outside_box",
            Metric::HitWoodwork => "hit_woodwork",
            Metric::HeadedGoals => "headed_goals",
            Metric::TouchesInBox => "touches_in_box",
            Metric::AccurateThroughBalls => "accurate_through_balls",
            Metric::Offsides => "offsides",
            Metric::FreeKicks => "free_kicks",
            Metric::LongPassesCompleted => "long_passes_completed",
            Metric::LongPassesTotal => "long_passes_total",
            Metric::FinalThirdPassesCompleted => "final_third_passes_completed",
            Metric::FinalThirdPassesTotal => "final_third_passes_total",
            Metric::CrossesCompleted => "crosses_completed",
            Metric::CrossesTotal => "crosses_total",
            Metric::Xa => "xa",
            Metric::ThrowIns => "throw_ins",
            Metric::Fouls => "fouls",
            Metric::TacklesWon => "tackles_won",
            Metric::TacklesTotal => "tackles_total",
            Metric::DuelsWon => "duels_won",
            Metric::Clearances => "clearances",
            Metric::Interceptions => "interceptions",
            Metric::ErrorsShot => "errors_shot",
            Metric::ErrorsGoal => "errors_goal",
            Metric::Saves => "saves",
            Metric::XgotFaced => "xgot_faced",
            Metric::GoalsPrevented => "goals_prevented",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.name() == name)
    }

    /// Column name of one side of the pair, e.g. `corners_home`.
    pub fn column(self, side: Side) -> String {
        format!("{}_{}", self.name(), side.suffix())
    }

    /// Inverse of [`Metric::column`].
    pub fn parse_column(column: &str) -> Option<(Metric, Side)> {
        if let Some(name) = column.strip_suffix("_home") {
            return Self::from_name(name).map(|m| (m, Side::Home));
        }
        if let Some(name) = column.strip_suffix("_away") {
            return Self::from_name(name).map(|m| (m, Side::Away));
        }
        None
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Metrics the feature set averages and the estimators are trained on.
pub const MODELED_METRICS: [Metric; 4] = [
    Metric::Corners,
    Metric::Shots,
    Metric::YellowCards,
    Metric::Xg,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ratio {
    PassAccuracy,
    ShotsOnTarget,
}

/// Per-match statistics, one `(home, away)` pair for every [`Metric`].
#[derive(Debug, Clone, PartialEq)]
pub struct MatchStatistics {
    pub match_id: String,
    values: [[f64; 2]; Metric::COUNT],
}

impl MatchStatistics {
    pub fn zeroed(match_id: impl Into<String>) -> Self {
        Self {
            match_id: match_id.into(),
            values: [[0.0; 2]; Metric::COUNT],
        }
    }

    pub fn get(&self, metric: Metric, side: Side) -> f64 {
        self.values[metric.index()][side_slot(side)]
    }

    pub fn set(&mut self, metric: Metric, side: Side, value: f64) {
        self.values[metric.index()][side_slot(side)] = value;
    }

    pub fn set_pair(&mut self, metric: Metric, home: f64, away: f64) {
        self.values[metric.index()] = [home, away];
    }

    pub fn with_pair(mut self, metric: Metric, home: f64, away: f64) -> Self {
        self.set_pair(metric, home, away);
        self
    }

    pub fn ratio(&self, ratio: Ratio, side: Side) -> f64 {
        let (num, den) = match ratio {
            Ratio::PassAccuracy => (Metric::PassesCompleted, Metric::PassesTotal),
            Ratio::ShotsOnTarget => (Metric::ShotsOnTarget, Metric::Shots),
        };
        let den = self.get(den, side);
        let den = if den == 0.0 { 1.0 } else { den };
        self.get(num, side) / den
    }
}

fn side_slot(side: Side) -> usize {
    match side {
        Side::Home => 0,
        Side::Away => 1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    pub fn from_scores(goals_for: i32, goals_against: i32) -> Self {
        if goals_for > goals_against {
            Outcome::Win
        } else if goals_for < goals_against {
            Outcome::Loss
        } else {
            Outcome::Draw
        }
    }

    pub fn points(self) -> u8 {
        match self {
            Outcome::Win => 3,
            Outcome::Draw => 1,
            Outcome::Loss => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub match_id: String,
    pub season: String,
    pub round_number: i64,
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

impl MatchRecord {
    pub fn is_played(&self) -> bool {
        self.home_score.is_some() && self.away_score.is_some()
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }

    pub fn score(&self, side: Side) -> Option<i32> {
        match side {
            Side::Home => self.home_score,
            Side::Away => self.away_score,
        }
    }

    /// Side the team played on, or `None` if it did not take part.
    pub fn role_of(&self, team: &str) -> Option<Side> {
        if self.home_team == team {
            Some(Side::Home)
        } else if self.away_team == team {
            Some(Side::Away)
        } else {
            None
        }
    }

    pub fn outcome_for(&self, side: Side) -> Option<Outcome> {
        let goals_for = self.score(side)?;
        let goals_against = self.score(side.opposite())?;
        Some(Outcome::from_scores(goals_for, goals_against))
    }

    pub fn to_fixture(&self) -> Fixture {
        Fixture {
            match_id: self.match_id.clone(),
            home_team: self.home_team.clone(),
            away_team: self.away_team.clone(),
            date: Some(self.date),
            season: Some(self.season.clone()),
            round_number: Some(self.round_number),
        }
    }
}

/// A scheduled match, played or upcoming. Only the identity and the two teams
/// are required; the date drives [`crate::HistoryPolicy::PriorOnly`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub round_number: Option<i64>,
}

impl Fixture {
    pub fn new(
        match_id: impl Into<String>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            home_team: home_team.into(),
            away_team: away_team.into(),
            date: None,
            season: None,
            round_number: None,
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}
