//! Match Store: read-only access to the match log and its statistics.
//!
//! Two backends share the [`MatchStore`] contract. [`CsvMatchStore`] reads the
//! raw `matches.csv` / `match_stats.csv` exports, [`SqliteMatchStore`] keeps the
//! same tables in SQLite and is also what the ingestion binary writes into.

use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{NaiveDate, Utc};
use csv::StringRecord;
use rusqlite::{Connection, Transaction, params};
use tracing::{debug, info, warn};

use crate::config::{PipelineConfig, ensure_parent};
use crate::domain::{MODELED_METRICS, MatchRecord, MatchStatistics, Metric, Side};
use crate::error::{PipelineError, Result, StatsParseError};
use crate::ingest::{IngestRow, normalize_date_str, parse_number};

const MATCH_COLUMNS: [&str; 8] = [
    "match_id",
    "season",
    "round_number",
    "date",
    "home_team",
    "away_team",
    "home_score",
    "away_score",
];

/// Both tables of one run, loaded in full.
#[derive(Debug, Clone, Default)]
pub struct MatchTables {
    pub matches: Vec<MatchRecord>,
    pub stats: HashMap<String, MatchStatistics>,
}

impl MatchTables {
    pub fn new(matches: Vec<MatchRecord>, stats: Vec<MatchStatistics>) -> Self {
        let mut by_id = HashMap::with_capacity(stats.len());
        for row in stats {
            if let Some(prev) = by_id.insert(row.match_id.clone(), row) {
                warn!(match_id = %prev.match_id, "duplicate statistics row, keeping the last one");
            }
        }
        Self {
            matches,
            stats: by_id,
        }
    }

    pub fn stats_for(&self, match_id: &str) -> Option<&MatchStatistics> {
        self.stats.get(match_id)
    }

    /// Every team name in the log, sorted.
    pub fn teams(&self) -> Vec<String> {
        let mut teams = BTreeSet::new();
        for m in &self.matches {
            teams.insert(m.home_team.clone());
            teams.insert(m.away_team.clone());
        }
        teams.into_iter().collect()
    }

    fn ensure_available(&self, source: &str) -> Result<()> {
        if self.matches.is_empty() {
            return Err(PipelineError::unavailable(format!("{source}: no match rows")));
        }
        if self.stats.is_empty() {
            return Err(PipelineError::unavailable(format!("{source}: no statistics rows")));
        }
        Ok(())
    }
}

pub trait MatchStore {
    /// Loads the match log and statistics. Fails with `DataUnavailable` when
    /// either table is missing or empty.
    fn load(&self) -> Result<MatchTables>;
}

/// Which backend a run reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Csv,
    Sqlite,
}

impl FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(StoreKind::Csv),
            "sqlite" | "db" => Ok(StoreKind::Sqlite),
            other => Err(format!("unknown store `{other}` (expected csv or sqlite)")),
        }
    }
}

impl StoreKind {
    /// Opens the configured store. `db_path` overrides `cfg.db_path` for SQLite.
    pub fn open(self, cfg: &PipelineConfig, db_path: Option<&Path>) -> Result<Box<dyn MatchStore>> {
        match self {
            StoreKind::Csv => Ok(Box::new(CsvMatchStore::new(cfg))),
            StoreKind::Sqlite => {
                let path = db_path.unwrap_or(cfg.db_path.as_path());
                Ok(Box::new(SqliteMatchStore::open(path)?))
            }
        }
    }
}

/// Statistics columns the feature set cannot be built without.
pub fn required_stats_columns() -> Vec<String> {
    MODELED_METRICS
        .iter()
        .flat_map(|m| [m.column(Side::Home), m.column(Side::Away)])
        .collect()
}

#[derive(Debug, Clone)]
pub struct CsvMatchStore {
    matches_path: PathBuf,
    stats_path: PathBuf,
}

impl CsvMatchStore {
    pub fn new(cfg: &PipelineConfig) -> Self {
        Self::from_paths(cfg.matches_csv(), cfg.stats_csv())
    }

    pub fn from_paths(matches_path: impl Into<PathBuf>, stats_path: impl Into<PathBuf>) -> Self {
        Self {
            matches_path: matches_path.into(),
            stats_path: stats_path.into(),
        }
    }
}

impl MatchStore for CsvMatchStore {
    fn load(&self) -> Result<MatchTables> {
        let matches = read_matches_csv(&self.matches_path)?;
        let stats = read_stats_csv(&self.stats_path)?;
        let tables = MatchTables::new(matches, stats);
        tables.ensure_available("csv store")?;
        info!(
            matches = tables.matches.len(),
            stats = tables.stats.len(),
            path = %self.matches_path.display(),
            "loaded match tables from csv"
        );
        Ok(tables)
    }
}

pub(crate) struct HeaderIndex {
    table: &'static str,
    columns: HashMap<String, usize>,
}

impl HeaderIndex {
    pub(crate) fn new(table: &'static str, headers: &StringRecord) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_string(), idx))
            .collect();
        Self { table, columns }
    }

    pub(crate) fn require(&self, column: &str) -> Result<usize> {
        self.optional(column)
            .ok_or_else(|| PipelineError::missing_column(self.table, column))
    }

    pub(crate) fn optional(&self, column: &str) -> Option<usize> {
        self.columns.get(column).copied()
    }

    fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.columns.iter().map(|(name, idx)| (name.as_str(), *idx))
    }
}

pub(crate) fn open_csv(path: &Path, table: &str) -> Result<csv::Reader<File>> {
    if !path.exists() {
        return Err(PipelineError::unavailable(format!(
            "{table} table not found at {}",
            path.display()
        )));
    }
    Ok(csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?)
}

fn read_matches_csv(path: &Path) -> Result<Vec<MatchRecord>> {
    let mut reader = open_csv(path, "matches")?;
    let header = HeaderIndex::new("matches", reader.headers()?);
    let mut idx = [0usize; MATCH_COLUMNS.len()];
    for (slot, column) in idx.iter_mut().zip(MATCH_COLUMNS) {
        *slot = header.require(column)?;
    }
    let [id, season, round, date, home, away, home_score, away_score] = idx;

    let mut out = Vec::new();
    for row in reader.records() {
        let row = row?;
        let cell = |i: usize| row.get(i).unwrap_or("").trim();
        let match_id = cell(id);
        if match_id.is_empty() {
            warn!(line = ?row.position().map(|p| p.line()), "skipping match row without match_id");
            continue;
        }
        let home_team = require_team(cell(home), "home_team", "matches", match_id)?;
        let away_team = require_team(cell(away), "away_team", "matches", match_id)?;
        out.push(MatchRecord {
            match_id: match_id.to_string(),
            season: cell(season).to_string(),
            round_number: parse_int(cell(round)).unwrap_or(0),
            date: normalize_date_str(cell(date))?,
            home_team,
            away_team,
            home_score: parse_int(cell(home_score)).and_then(|v| i32::try_from(v).ok()),
            away_score: parse_int(cell(away_score)).and_then(|v| i32::try_from(v).ok()),
        });
    }
    Ok(out)
}

fn read_stats_csv(path: &Path) -> Result<Vec<MatchStatistics>> {
    let mut reader = open_csv(path, "match_stats")?;
    let header = HeaderIndex::new("match_stats", reader.headers()?);
    let id = header.require("match_id")?;
    for column in required_stats_columns() {
        header.require(&column)?;
    }
    let metric_columns: Vec<(Metric, Side, usize)> = header
        .iter()
        .filter_map(|(name, idx)| Metric::parse_column(name).map(|(m, s)| (m, s, idx)))
        .collect();
    for (metric, side, _) in &metric_columns {
        header.require(&metric.column(side.opposite()))?;
    }
    debug!(columns = metric_columns.len(), "recognised statistics columns");

    let mut out = Vec::new();
    for row in reader.records() {
        let row = row?;
        let match_id = row.get(id).unwrap_or("").trim();
        if match_id.is_empty() {
            continue;
        }
        let mut stats = MatchStatistics::zeroed(match_id);
        for (metric, side, idx) in &metric_columns {
            let value = row.get(*idx).and_then(parse_number).unwrap_or(0.0);
            stats.set(*metric, *side, value);
        }
        out.push(stats);
    }
    Ok(out)
}

/// A team cell must name a team; a blank one would pass for a cold start.
pub(crate) fn require_team(
    raw: &str,
    field: &'static str,
    table: &str,
    match_id: &str,
) -> Result<String> {
    if raw.is_empty() {
        warn!(%table, %match_id, field, "row has a blank team cell");
        return Err(StatsParseError::MissingField(field).into());
    }
    Ok(raw.to_string())
}

/// Integers as exported by spreadsheet tools, which may write `2.0`.
fn parse_int(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return Some(v);
    }
    let v = trimmed.parse::<f64>().ok()?;
    if v.is_finite() && v.fract() == 0.0 {
        Some(v as i64)
    } else {
        None
    }
}

pub struct SqliteMatchStore {
    conn: Connection,
}

impl SqliteMatchStore {
    /// Opens an existing database; a missing file is `DataUnavailable`.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::unavailable(format!(
                "sqlite store not found at {}",
                path.display()
            )));
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens or creates the database, including parent directories.
    pub fn create(path: &Path) -> Result<Self> {
        ensure_parent(path)?;
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn upsert_match(&self, m: &MatchRecord) -> Result<()> {
        upsert_match(&self.conn, m)
    }

    pub fn upsert_stats(&self, s: &MatchStatistics) -> Result<()> {
        upsert_stats(&self.conn, s)
    }

    /// Writes a parsed ingest batch in one transaction.
    pub fn upsert_rows(&mut self, rows: &[IngestRow]) -> Result<usize> {
        let tx: Transaction<'_> = self.conn.transaction()?;
        for (record, stats) in rows {
            upsert_match(&tx, record)?;
            upsert_stats(&tx, stats)?;
        }
        tx.commit()?;
        Ok(rows.len())
    }

    fn load_matches(&self) -> Result<Vec<MatchRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT match_id, season, round_number, date, home_team, away_team,
                   home_score, away_score
            FROM matches
            ORDER BY date ASC, match_id ASC
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, Option<i32>>(6)?,
                row.get::<_, Option<i32>>(7)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (match_id, season, round_number, date, home_team, away_team, home_score, away_score) =
                row?;
            let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .map_err(|_| StatsParseError::InvalidDate(date.clone()))?;
            out.push(MatchRecord {
                match_id,
                season,
                round_number,
                date,
                home_team,
                away_team,
                home_score,
                away_score,
            });
        }
        Ok(out)
    }

    fn load_stats(&self) -> Result<Vec<MatchStatistics>> {
        let mut stmt = self.conn.prepare(
            "SELECT match_id, metric, home_value, away_value FROM match_stats ORDER BY match_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
            ))
        })?;

        let mut by_id: HashMap<String, MatchStatistics> = HashMap::new();
        for row in rows {
            let (match_id, metric, home, away) = row?;
            let Some(metric) = Metric::from_name(&metric) else {
                warn!(%match_id, %metric, "unknown metric in store, skipping");
                continue;
            };
            by_id
                .entry(match_id.clone())
                .or_insert_with(|| MatchStatistics::zeroed(match_id))
                .set_pair(metric, home, away);
        }
        Ok(by_id.into_values().collect())
    }
}

impl MatchStore for SqliteMatchStore {
    fn load(&self) -> Result<MatchTables> {
        let tables = MatchTables::new(self.load_matches()?, self.load_stats()?);
        tables.ensure_available("sqlite store")?;
        info!(
            matches = tables.matches.len(),
            stats = tables.stats.len(),
            "loaded match tables from sqlite"
        );
        Ok(tables)
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS matches (
            match_id TEXT PRIMARY KEY,
            season TEXT NOT NULL,
            round_number INTEGER NOT NULL,
            date TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            home_score INTEGER NULL,
            away_score INTEGER NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(date);
        CREATE INDEX IF NOT EXISTS idx_matches_home ON matches(home_team);
        CREATE INDEX IF NOT EXISTS idx_matches_away ON matches(away_team);

        CREATE TABLE IF NOT EXISTS match_stats (
            match_id TEXT NOT NULL,
            metric TEXT NOT NULL,
            home_value REAL NOT NULL,
            away_value REAL NOT NULL,
            PRIMARY KEY (match_id, metric)
        );
        "#,
    )?;
    Ok(())
}

fn upsert_match(conn: &Connection, m: &MatchRecord) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO matches (
            match_id, season, round_number, date, home_team, away_team,
            home_score, away_score, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(match_id) DO UPDATE SET
            season = excluded.season,
            round_number = excluded.round_number,
            date = excluded.date,
            home_team = excluded.home_team,
            away_team = excluded.away_team,
            home_score = excluded.home_score,
            away_score = excluded.away_score,
            updated_at = excluded.updated_at
        "#,
        params![
            m.match_id,
            m.season,
            m.round_number,
            m.date.format("%Y-%m-%d").to_string(),
            m.home_team,
            m.away_team,
            m.home_score,
            m.away_score,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn upsert_stats(conn: &Connection, s: &MatchStatistics) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        r#"
        INSERT INTO match_stats (match_id, metric, home_value, away_value)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(match_id, metric) DO UPDATE SET
            home_value = excluded.home_value,
            away_value = excluded.away_value
        "#,
    )?;
    for metric in Metric::ALL {
        stmt.execute(params![
            s.match_id,
            metric.name(),
            s.get(metric, Side::Home),
            s.get(metric, Side::Away),
        ])?;
    }
    Ok(())
}
