//! Aggregate feature functions over a [`TeamHistoryView`].
//!
//! All functions are total: an empty view yields `0.0`. A team without history
//! is an expected cold-start case, not an error.

use serde::Serialize;

use crate::domain::{Metric, Outcome, Ratio, Side};
use crate::history::TeamHistoryView;

/// Mean of the team's own (role-selected) value across every match in the view.
pub fn average_metric(view: &TeamHistoryView<'_>, metric: Metric) -> f64 {
    mean(view.entries().iter().map(|e| e.metric(metric)))
}

/// Mean match points (3 win, 1 draw, 0 loss). Pass a view already cut with
/// [`TeamHistoryView::recent`] for a trailing window.
pub fn recent_form(view: &TeamHistoryView<'_>) -> f64 {
    mean(
        view.entries()
            .iter()
            .filter_map(|e| e.points())
            .map(f64::from),
    )
}

/// Average of `metric` over the matches the team played at home.
pub fn home_performance(view: &TeamHistoryView<'_>, metric: Metric) -> f64 {
    mean(view.in_role(Side::Home).map(|e| e.metric(metric)))
}

/// Average of `metric` over the matches the team played away.
pub fn away_performance(view: &TeamHistoryView<'_>, metric: Metric) -> f64 {
    mean(view.in_role(Side::Away).map(|e| e.metric(metric)))
}

pub fn average_conceded(view: &TeamHistoryView<'_>, metric: Metric) -> f64 {
    mean(view.entries().iter().map(|e| e.conceded(metric)))
}

pub fn average_ratio(view: &TeamHistoryView<'_>, ratio: Ratio) -> f64 {
    mean(view.entries().iter().map(|e| e.ratio(ratio)))
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0_f64, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

/// Historical summary of one team, used for the team sheet of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamProfile {
    pub team: String,
    pub matches_played: usize,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub form: f64,
    pub avg_corners_for: f64,
    pub avg_corners_against: f64,
    pub avg_shots: f64,
    pub avg_xg: f64,
    pub avg_yellow_cards: f64,
    pub pass_accuracy: f64,
    pub shots_on_target_ratio: f64,
}

impl TeamProfile {
    pub fn from_view(view: &TeamHistoryView<'_>, form_window: usize) -> Self {
        let mut wins = 0usize;
        let mut draws = 0usize;
        let mut losses = 0usize;
        for entry in view.entries() {
            match entry.outcome() {
                Some(Outcome::Win) => wins += 1,
                Some(Outcome::Draw) => draws += 1,
                Some(Outcome::Loss) => losses += 1,
                None => {}
            }
        }

        Self {
            team: view.team().to_string(),
            matches_played: view.len(),
            wins,
            draws,
            losses,
            form: recent_form(&view.recent(form_window)),
            avg_corners_for: average_metric(view, Metric::Corners),
            avg_corners_against: average_conceded(view, Metric::Corners),
            avg_shots: average_metric(view, Metric::Shots),
            avg_xg: average_metric(view, Metric::Xg),
            avg_yellow_cards: average_metric(view, Metric::YellowCards),
            pass_accuracy: average_ratio(view, Ratio::PassAccuracy),
            shots_on_target_ratio: average_ratio(view, Ratio::ShotsOnTarget),
        }
    }
}
