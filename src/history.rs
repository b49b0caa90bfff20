//! Team History Index: every played match a team took part in, tagged with
//! the side it played on.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{Fixture, MatchRecord, MatchStatistics, Metric, Outcome, Ratio, Side};

/// Which part of the match log may feed a fixture's own features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPolicy {
    /// The fixture's own match counts towards its history.
    IncludeTarget,
    /// Everything except the fixture's own `match_id`.
    ExcludeTarget,
    /// Only matches dated strictly before the fixture. Falls back to
    /// `ExcludeTarget` when the fixture has no date.
    #[default]
    PriorOnly,
}

impl HistoryPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryPolicy::IncludeTarget => "include_target",
            HistoryPolicy::ExcludeTarget => "exclude_target",
            HistoryPolicy::PriorOnly => "prior_only",
        }
    }

    fn admits(self, record: &MatchRecord, fixture: &Fixture) -> bool {
        match self {
            HistoryPolicy::IncludeTarget => true,
            HistoryPolicy::ExcludeTarget => record.match_id != fixture.match_id,
            HistoryPolicy::PriorOnly => match fixture.date {
                Some(date) => record.date < date,
                None => record.match_id != fixture.match_id,
            },
        }
    }
}

impl fmt::Display for HistoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HistoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "include" | "include_target" => Ok(HistoryPolicy::IncludeTarget),
            "exclude" | "exclude_target" => Ok(HistoryPolicy::ExcludeTarget),
            "prior" | "prior_only" => Ok(HistoryPolicy::PriorOnly),
            other => Err(format!("unknown history policy `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HistoryEntry<'a> {
    pub record: &'a MatchRecord,
    /// `None` when the match has no statistics row; every metric then reads as zero.
    pub stats: Option<&'a MatchStatistics>,
    pub role: Side,
    position: usize,
}

impl HistoryEntry<'_> {
    /// The team's own value for `metric` in this match.
    pub fn metric(&self, metric: Metric) -> f64 {
        self.stats.map_or(0.0, |s| s.get(metric, self.role))
    }

    /// The opponent's value for `metric` in this match.
    pub fn conceded(&self, metric: Metric) -> f64 {
        self.stats.map_or(0.0, |s| s.get(metric, self.role.opposite()))
    }

    pub fn ratio(&self, ratio: Ratio) -> f64 {
        self.stats.map_or(0.0, |s| s.ratio(ratio, self.role))
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.record.outcome_for(self.role)
    }

    pub fn points(&self) -> Option<u8> {
        self.outcome().map(Outcome::points)
    }
}

#[derive(Debug, Clone)]
pub struct TeamHistoryView<'a> {
    team: String,
    entries: Vec<HistoryEntry<'a>>,
}

impl<'a> TeamHistoryView<'a> {
    pub fn team(&self) -> &str {
        &self.team
    }

    pub fn entries(&self) -> &[HistoryEntry<'a>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `n` most recent matches, newest first. Matches on the same date keep
    /// their reverse log order.
    pub fn recent(&self, n: usize) -> TeamHistoryView<'a> {
        let mut entries = self.entries.clone();
        entries.sort_by(|a, b| {
            b.record
                .date
                .cmp(&a.record.date)
                .then(b.position.cmp(&a.position))
        });
        entries.truncate(n);
        TeamHistoryView {
            team: self.team.clone(),
            entries,
        }
    }

    pub fn in_role(&self, role: Side) -> impl Iterator<Item = &HistoryEntry<'a>> + '_ {
        self.entries.iter().filter(move |e| e.role == role)
    }

    fn retain(mut self, mut keep: impl FnMut(&HistoryEntry<'a>) -> bool) -> Self {
        self.entries.retain(|e| keep(e));
        self
    }
}

/// Every played match involving `team`, in log order.
pub fn history_of<'a>(
    team: &str,
    matches: &'a [MatchRecord],
    stats: &'a HashMap<String, MatchStatistics>,
) -> TeamHistoryView<'a> {
    let entries = matches
        .iter()
        .enumerate()
        .filter(|(_, record)| record.is_played())
        .filter_map(|(position, record)| {
            let role = record.role_of(team)?;
            Some(HistoryEntry {
                record,
                stats: stats.get(&record.match_id),
                role,
                position,
            })
        })
        .collect();
    TeamHistoryView {
        team: team.to_string(),
        entries,
    }
}

/// History of `team` as visible to `fixture` under `policy`. Training rows and
/// next-round rows both go through here.
pub fn history_for_fixture<'a>(
    team: &str,
    fixture: &Fixture,
    policy: HistoryPolicy,
    matches: &'a [MatchRecord],
    stats: &'a HashMap<String, MatchStatistics>,
) -> TeamHistoryView<'a> {
    history_of(team, matches, stats).retain(|e| policy.admits(e.record, fixture))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn record(id: &str, day: u32, home: &str, away: &str, score: Option<(i32, i32)>) -> MatchRecord {
        MatchRecord {
            match_id: id.to_string(),
            season: "2023-2024".to_string(),
            round_number: day as i64,
            date: NaiveDate::from_ymd_opt(2023, 9, day).unwrap(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            home_score: score.map(|s| s.0),
            away_score: score.map(|s| s.1),
        }
    }

    #[test]
    fn history_tags_roles_and_skips_unplayed() {
        let matches = vec![
            record("m1", 1, "Porto", "Braga", Some((1, 0))),
            record("m2", 8, "Benfica", "Porto", Some((2, 2))),
            record("m3", 15, "Porto", "Vizela", None),
            record("m4", 22, "Braga", "Benfica", Some((0, 1))),
        ];
        let stats = HashMap::new();
        let view = history_of("Porto", &matches, &stats);
        let roles: Vec<_> = view.entries().iter().map(|e| (e.record.match_id.as_str(), e.role)).collect();
        assert_eq!(roles, vec![("m1", Side::Home), ("m2", Side::Away)]);
    }

    #[test]
    fn recent_orders_newest_first_and_truncates() {
        let matches = vec![
            record("m1", 1, "Porto", "Braga", Some((1, 0))),
            record("m3", 15, "Porto", "Vizela", Some((3, 0))),
            record("m2", 8, "Benfica", "Porto", Some((2, 2))),
        ];
        let stats = HashMap::new();
        let view = history_of("Porto", &matches, &stats);
        let ids: Vec<_> = view.recent(2).entries().iter().map(|e| e.record.match_id.clone()).collect();
        assert_eq!(ids, vec!["m3", "m2"]);
        assert_eq!(view.recent(10).len(), 3);
        assert!(history_of("Arouca", &matches, &stats).recent(5).is_empty());
    }

    #[test]
    fn policies_cut_history_differently() {
        let matches = vec![
            record("m1", 1, "Porto", "Braga", Some((1, 0))),
            record("m2", 8, "Benfica", "Porto", Some((2, 2))),
            record("m3", 8, "Porto", "Arouca", Some((4, 0))),
        ];
        let stats = HashMap::new();
        let target = matches[1].to_fixture();

        let count = |policy| history_for_fixture("Porto", &target, policy, &matches, &stats).len();
        assert_eq!(count(HistoryPolicy::IncludeTarget), 3);
        assert_eq!(count(HistoryPolicy::ExcludeTarget), 2);
        assert_eq!(count(HistoryPolicy::PriorOnly), 1);

        let undated = Fixture::new("m2", "Benfica", "Porto");
        assert_eq!(
            history_for_fixture("Porto", &undated, HistoryPolicy::PriorOnly, &matches, &stats).len(),
            2
        );
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("prior".parse::<HistoryPolicy>().unwrap(), HistoryPolicy::PriorOnly);
        assert_eq!(
            "Exclude-Target".parse::<HistoryPolicy>().unwrap(),
            HistoryPolicy::ExcludeTarget
        );
        assert!("later".parse::<HistoryPolicy>().is_err());
    }
}
