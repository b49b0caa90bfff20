use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use chrono::NaiveDate;

use matchday_features::dataset::FeatureDatasetBuilder;
use matchday_features::features::AssemblerOptions;
use matchday_features::history::history_of;
use matchday_features::{
    FeatureAssembler, Fixture, HistoryPolicy, MatchRecord, MatchStatistics, MatchTables, Metric,
};

const TEAMS: [&str; 18] = [
    "Porto", "Benfica", "Sporting", "Braga", "Vitoria", "Arouca", "Famalicao", "Casa Pia",
    "Moreirense", "Rio Ave", "Gil Vicente", "Estoril", "Boavista", "Farense", "Estrela",
    "Portimonense", "Chaves", "Vizela",
];

/// Two seasons of a double round robin with deterministic statistics.
fn synthetic_league() -> MatchTables {
    let start = NaiveDate::from_ymd_opt(2022, 8, 6).unwrap();
    let mut matches = Vec::new();
    let mut stats = Vec::new();
    let mut seq = 0u64;
    for season in 0..2 {
        for (h, home) in TEAMS.iter().enumerate() {
            for (a, away) in TEAMS.iter().enumerate() {
                if h == a {
                    continue;
                }
                seq += 1;
                let match_id = format!("{season}-{h}-{a}");
                let date = start + chrono::Days::new(seq / 9 * 7);
                let v = (seq % 7) as f64;
                matches.push(MatchRecord {
                    match_id: match_id.clone(),
                    season: format!("{}-{}", 2022 + season, 2023 + season),
                    round_number: (seq / 9) as i64 + 1,
                    date,
                    home_team: home.to_string(),
                    away_team: away.to_string(),
                    home_score: Some((seq % 4) as i32),
                    away_score: Some((seq % 3) as i32),
                });
                stats.push(
                    MatchStatistics::zeroed(match_id)
                        .with_pair(Metric::Corners, 3.0 + v, 8.0 - v)
                        .with_pair(Metric::Shots, 9.0 + v, 14.0 - v)
                        .with_pair(Metric::YellowCards, v / 2.0, 3.0 - v / 3.0)
                        .with_pair(Metric::Xg, 0.4 + v / 5.0, 1.6 - v / 7.0),
                );
            }
        }
    }
    MatchTables::new(matches, stats)
}

fn bench_training_set(c: &mut Criterion) {
    let tables = synthetic_league();
    let builder = FeatureDatasetBuilder::with_options(&tables, AssemblerOptions::default());
    c.bench_function("build_training_set", |b| {
        b.iter(|| {
            let table = builder.build_training_set();
            black_box(table.len());
        })
    });
}

fn bench_single_fixture(c: &mut Criterion) {
    let tables = synthetic_league();
    let assembler = FeatureAssembler::new(
        &tables,
        AssemblerOptions {
            policy: HistoryPolicy::IncludeTarget,
            form_window: 5,
        },
    );
    let fixture = Fixture::new("next", "Porto", "Benfica");
    c.bench_function("assemble_fixture", |b| {
        b.iter(|| {
            let row = assembler.build(black_box(&fixture));
            black_box(row.delta_corners);
        })
    });
}

fn bench_history_recent(c: &mut Criterion) {
    let tables = synthetic_league();
    c.bench_function("history_recent_form_window", |b| {
        b.iter(|| {
            let view = history_of(black_box("Sporting"), &tables.matches, &tables.stats);
            black_box(view.recent(5).len());
        })
    });
}

criterion_group!(
    benches,
    bench_training_set,
    bench_single_fixture,
    bench_history_recent
);
criterion_main!(benches);
