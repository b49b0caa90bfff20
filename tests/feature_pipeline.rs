use std::collections::HashMap;

use chrono::NaiveDate;

use matchday_features::aggregate::{
    average_metric, away_performance, home_performance, recent_form,
};
use matchday_features::dataset::{FeatureDatasetBuilder, FeatureTable};
use matchday_features::features::{AssemblerOptions, FEATURE_COLUMNS, ID_COLUMNS};
use matchday_features::history::history_of;
use matchday_features::{
    FeatureAssembler, Fixture, HistoryPolicy, MatchRecord, MatchStatistics, MatchTables, Metric,
    Side,
};

const EPS: f64 = 1e-9;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 8, 1).unwrap() + chrono::Days::new(u64::from(d))
}

fn played(id: &str, d: u32, home: &str, away: &str, hs: i32, aws: i32) -> MatchRecord {
    MatchRecord {
        match_id: id.to_string(),
        season: "2023-2024".to_string(),
        round_number: i64::from(d / 7 + 1),
        date: day(d),
        home_team: home.to_string(),
        away_team: away.to_string(),
        home_score: Some(hs),
        away_score: Some(aws),
    }
}

fn stat_row(id: &str, corners: (f64, f64), shots: (f64, f64), cards: (f64, f64), xg: (f64, f64)) -> MatchStatistics {
    MatchStatistics::zeroed(id)
        .with_pair(Metric::Corners, corners.0, corners.1)
        .with_pair(Metric::Shots, shots.0, shots.1)
        .with_pair(Metric::YellowCards, cards.0, cards.1)
        .with_pair(Metric::Xg, xg.0, xg.1)
}

fn league() -> MatchTables {
    let matches = vec![
        played("m1", 0, "Porto", "Braga", 2, 0),
        played("m2", 7, "Benfica", "Porto", 1, 1),
        played("m3", 7, "Braga", "Sporting", 0, 3),
        played("m4", 14, "Sporting", "Porto", 2, 1),
        played("m5", 14, "Benfica", "Braga", 4, 2),
        played("m6", 21, "Porto", "Sporting", 1, 0),
    ];
    let stats = vec![
        stat_row("m1", (6.0, 4.0), (14.0, 8.0), (2.0, 3.0), (1.8, 0.6)),
        stat_row("m2", (5.0, 7.0), (11.0, 12.0), (1.0, 2.0), (1.1, 1.3)),
        stat_row("m3", (3.0, 8.0), (7.0, 16.0), (4.0, 1.0), (0.4, 2.2)),
        stat_row("m4", (9.0, 2.0), (18.0, 6.0), (0.0, 4.0), (2.1, 0.9)),
        stat_row("m5", (4.0, 4.0), (10.0, 9.0), (3.0, 3.0), (2.9, 1.7)),
        stat_row("m6", (7.0, 5.0), (13.0, 10.0), (2.0, 2.0), (1.2, 0.8)),
    ];
    MatchTables::new(matches, stats)
}

fn options(policy: HistoryPolicy) -> AssemblerOptions {
    AssemblerOptions {
        policy,
        form_window: 5,
    }
}

#[test]
fn porto_corners_average_uses_role_selected_values() {
    let matches = vec![
        played("p1", 0, "Porto", "Braga", 1, 0),
        played("p2", 7, "Benfica", "Porto", 0, 0),
    ];
    let tables = MatchTables::new(
        matches,
        vec![
            MatchStatistics::zeroed("p1").with_pair(Metric::Corners, 6.0, 4.0),
            MatchStatistics::zeroed("p2").with_pair(Metric::Corners, 5.0, 7.0),
        ],
    );
    let view = history_of("Porto", &tables.matches, &tables.stats);
    assert!((average_metric(&view, Metric::Corners) - 6.5).abs() < EPS);
}

#[test]
fn team_average_never_reads_the_opponent_column() {
    let tables = league();
    for team in tables.teams() {
        let view = history_of(&team, &tables.matches, &tables.stats);
        let mut expected = Vec::new();
        for m in tables.matches.iter().filter(|m| m.home_team == team || m.away_team == team) {
            let s = &tables.stats[&m.match_id];
            let side = if m.home_team == team { Side::Home } else { Side::Away };
            expected.push(s.get(Metric::Shots, side));
        }
        let mean = expected.iter().sum::<f64>() / expected.len() as f64;
        assert!(
            (average_metric(&view, Metric::Shots) - mean).abs() < EPS,
            "shots average for {team}"
        );
    }

    let poisoned = MatchTables::new(
        vec![played("x1", 0, "Porto", "Braga", 1, 1), played("x2", 7, "Braga", "Porto", 0, 1)],
        vec![
            MatchStatistics::zeroed("x1").with_pair(Metric::Xg, 1.0, 1000.0),
            MatchStatistics::zeroed("x2").with_pair(Metric::Xg, 1000.0, 2.0),
        ],
    );
    let view = history_of("Porto", &poisoned.matches, &poisoned.stats);
    assert!((average_metric(&view, Metric::Xg) - 1.5).abs() < EPS);
}

#[test]
fn form_over_win_draw_loss_is_four_thirds() {
    let tables = MatchTables::new(
        vec![
            played("f1", 0, "Porto", "Braga", 3, 1),
            played("f2", 7, "Benfica", "Porto", 2, 2),
            played("f3", 14, "Porto", "Sporting", 0, 1),
        ],
        Vec::new(),
    );
    let view = history_of("Porto", &tables.matches, &tables.stats);
    assert!((recent_form(&view.recent(3)) - 4.0 / 3.0).abs() < EPS);
}

#[test]
fn recent_form_window_keeps_latest_matches() {
    let tables = MatchTables::new(
        vec![
            played("f1", 0, "Porto", "Braga", 0, 1),
            played("f2", 7, "Porto", "Benfica", 0, 1),
            played("f3", 14, "Sporting", "Porto", 0, 2),
            played("f4", 21, "Porto", "Vizela", 5, 0),
        ],
        Vec::new(),
    );
    let view = history_of("Porto", &tables.matches, &tables.stats);
    assert!((recent_form(&view.recent(2)) - 3.0).abs() < EPS);
    assert!((recent_form(&view.recent(4)) - 1.5).abs() < EPS);
}

#[test]
fn cold_start_team_yields_zeros() {
    let tables = league();
    let view = history_of("Arouca", &tables.matches, &tables.stats);
    assert!(view.is_empty());
    assert_eq!(average_metric(&view, Metric::Corners), 0.0);
    assert_eq!(recent_form(&view.recent(5)), 0.0);
    assert_eq!(home_performance(&view, Metric::Shots), 0.0);
    assert_eq!(away_performance(&view, Metric::Shots), 0.0);

    let assembler = FeatureAssembler::new(&tables, options(HistoryPolicy::PriorOnly));
    let row = assembler.build(&Fixture::new("new1", "Arouca", "Vizela"));
    assert_eq!(row.match_id, "new1");
    assert!(row.values().iter().all(|v| *v == 0.0));
}

#[test]
fn match_without_statistics_counts_as_zero() {
    let tables = MatchTables::new(
        vec![
            played("z1", 0, "Porto", "Braga", 1, 0),
            played("z2", 7, "Porto", "Benfica", 1, 0),
        ],
        vec![MatchStatistics::zeroed("z1").with_pair(Metric::Corners, 8.0, 2.0)],
    );
    let view = history_of("Porto", &tables.matches, &tables.stats);
    assert_eq!(view.len(), 2);
    assert!((average_metric(&view, Metric::Corners) - 4.0).abs() < EPS);
}

#[test]
fn role_performance_is_restricted_to_that_role() {
    let tables = league();
    let view = history_of("Porto", &tables.matches, &tables.stats);
    // Porto at home: m1 (14 shots), m6 (13). Away: m2 (12), m4 (6).
    assert!((home_performance(&view, Metric::Shots) - 13.5).abs() < EPS);
    assert!((away_performance(&view, Metric::Shots) - 9.0).abs() < EPS);
    assert!((average_metric(&view, Metric::Shots) - 11.25).abs() < EPS);
}

#[test]
fn deltas_equal_home_minus_away_averages() {
    let tables = league();
    for policy in [
        HistoryPolicy::IncludeTarget,
        HistoryPolicy::ExcludeTarget,
        HistoryPolicy::PriorOnly,
    ] {
        let table = FeatureDatasetBuilder::with_options(&tables, options(policy)).build_training_set();
        assert_eq!(table.len(), tables.matches.len());
        for row in &table.rows {
            assert!((row.delta_corners - (row.home_avg_corners - row.away_avg_corners)).abs() < EPS);
            assert!((row.delta_shots - (row.home_avg_shots - row.away_avg_shots)).abs() < EPS);
            assert!((row.delta_xg - (row.home_avg_xg - row.away_avg_xg)).abs() < EPS);
            assert!(
                (row.delta_yellow_cards - (row.home_avg_yellow_cards - row.away_avg_yellow_cards))
                    .abs()
                    < EPS
            );
        }
    }
}

#[test]
fn training_row_respects_history_policy() {
    let tables = league();
    let target = tables.matches[5].to_fixture(); // m6: Porto v Sporting
    let build = |policy| FeatureAssembler::new(&tables, options(policy)).build(&target);

    let included = build(HistoryPolicy::IncludeTarget);
    let excluded = build(HistoryPolicy::ExcludeTarget);
    let prior = build(HistoryPolicy::PriorOnly);

    // Porto corners: m1 6, m2 7, m4 2, m6 7.
    assert!((included.home_avg_corners - 22.0 / 4.0).abs() < EPS);
    assert!((excluded.home_avg_corners - 15.0 / 3.0).abs() < EPS);
    assert_eq!(excluded, prior);
}

#[test]
fn future_fixture_is_unaffected_by_policy() {
    let tables = league();
    let fixture = Fixture::new("next1", "Braga", "Porto").on(day(28));
    let rows: Vec<_> = [
        HistoryPolicy::IncludeTarget,
        HistoryPolicy::ExcludeTarget,
        HistoryPolicy::PriorOnly,
    ]
    .into_iter()
    .map(|policy| FeatureAssembler::new(&tables, options(policy)).build(&fixture))
    .collect();
    assert_eq!(rows[0], rows[1]);
    assert_eq!(rows[1], rows[2]);
    assert!(rows[0].away_form_last5 > 0.0);
}

#[test]
fn training_and_next_round_tables_share_columns() {
    let tables = league();
    let builder = FeatureDatasetBuilder::with_options(&tables, AssemblerOptions::default());
    let training = builder.build_training_set();
    let next = builder.build_next_round_set(&[
        Fixture::new("n1", "Porto", "Benfica").on(day(28)),
        Fixture::new("n2", "Arouca", "Braga"),
    ]);
    assert_eq!(training.columns, next.columns);
    assert_eq!(next.len(), 2);

    let expected: Vec<String> = ID_COLUMNS
        .iter()
        .chain(FEATURE_COLUMNS.iter())
        .map(|c| c.to_string())
        .collect();
    assert_eq!(training.columns, expected);
    assert_eq!(FeatureTable::table_columns(), expected);
}

#[test]
fn feature_lookup_by_column_name() {
    let tables = league();
    let row = FeatureAssembler::new(&tables, AssemblerOptions::default())
        .build(&Fixture::new("n1", "Porto", "Benfica").on(day(28)));
    assert_eq!(row.get("home_avg_corners"), Some(row.home_avg_corners));
    assert_eq!(row.get("delta_xg"), Some(row.delta_xg));
    assert_eq!(row.get("match_id"), None);
}

#[test]
fn targets_and_profiles_cover_the_log() {
    let mut tables = league();
    tables.matches.push(MatchRecord {
        home_score: None,
        away_score: None,
        ..played("m7", 28, "Braga", "Porto", 0, 0)
    });
    let builder = FeatureDatasetBuilder::with_options(&tables, AssemblerOptions::default());

    let targets = builder.build_training_targets();
    assert_eq!(targets.len(), 6);
    let m4 = targets.iter().find(|t| t.match_id == "m4").unwrap();
    assert_eq!((m4.corners_home, m4.corners_away), (9.0, 2.0));

    let training = builder.build_training_set();
    assert_eq!(training.len(), 7);

    let teams = builder.team_profiles();
    let porto = teams.iter().find(|p| p.team == "Porto").unwrap();
    assert_eq!(porto.matches_played, 4);
    assert_eq!((porto.wins, porto.draws, porto.losses), (2, 1, 1));
    assert!((porto.form - 7.0 / 4.0).abs() < EPS);
    let played: HashMap<_, _> = teams.iter().map(|p| (p.team.as_str(), p.matches_played)).collect();
    assert_eq!(played["Benfica"], 2);
    assert_eq!(played["Sporting"], 3);
}
