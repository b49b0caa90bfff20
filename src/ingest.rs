//! Strict parsing at the ingestion boundary.
//!
//! Scraper payloads arrive as loosely shaped JSON. Everything here either yields
//! fully typed [`MatchRecord`] / [`MatchStatistics`] values or a named
//! [`StatsParseError`]; the feature code never sees raw maps.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::{MatchRecord, MatchStatistics, Metric, Side};
use crate::error::{PipelineError, StatsParseError};

/// One parsed document: the match row and its statistics.
pub type IngestRow = (MatchRecord, MatchStatistics);

#[derive(Debug, Default)]
pub struct IngestBatch {
    pub rows: Vec<IngestRow>,
    pub errors: Vec<String>,
}

/// Parses a numeric cell. Accepts plain numbers and percentages such as `"55%"`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_stats_payload(
    match_id: &str,
    payload: &Value,
) -> Result<MatchStatistics, StatsParseError> {
    let Some(obj) = payload.as_object() else {
        return Err(StatsParseError::NotAnObject {
            match_id: match_id.to_string(),
        });
    };

    let mut stats = MatchStatistics::zeroed(match_id);
    let mut present: BTreeMap<Metric, (bool, bool)> = BTreeMap::new();
    for (key, value) in obj {
        if key == "match_id" {
            continue;
        }
        let Some((metric, side)) = Metric::parse_column(key) else {
            return Err(StatsParseError::UnknownField(key.clone()));
        };
        if value.is_null() {
            continue;
        }
        let Some(number) = as_f64_any(value) else {
            return Err(StatsParseError::InvalidValue {
                field: key.clone(),
                raw: value.to_string(),
            });
        };
        stats.set(metric, side, number);
        let seen = present.entry(metric).or_default();
        match side {
            Side::Home => seen.0 = true,
            Side::Away => seen.1 = true,
        }
    }

    if let Some((metric, _)) = present.iter().find(|(_, (home, away))| home != away) {
        return Err(StatsParseError::UnpairedMetric(metric.name()));
    }
    Ok(stats)
}

/// Combines two stats payloads for the same match. Keys from `fallback` win,
/// matching how the secondary source overrides the primary one. A payload that
/// is not an object contributes nothing.
pub fn merge_payloads(primary: &Value, fallback: &Value) -> Value {
    let mut merged = primary.as_object().cloned().unwrap_or_else(Map::new);
    if let Some(extra) = fallback.as_object() {
        for (key, value) in extra {
            merged.insert(key.clone(), value.clone());
        }
    }
    Value::Object(merged)
}

/// Accepts epoch seconds (number or digit string), ISO dates and ISO datetimes.
pub fn normalize_date(raw: &Value) -> Result<NaiveDate, StatsParseError> {
    if let Some(secs) = raw.as_i64() {
        return date_from_epoch(secs).ok_or_else(|| StatsParseError::InvalidDate(raw.to_string()));
    }
    if let Some(secs) = raw.as_f64() {
        return date_from_epoch(secs as i64)
            .ok_or_else(|| StatsParseError::InvalidDate(raw.to_string()));
    }
    match raw.as_str() {
        Some(s) => normalize_date_str(s),
        None => Err(StatsParseError::InvalidDate(raw.to_string())),
    }
}

pub fn normalize_date_str(raw: &str) -> Result<NaiveDate, StatsParseError> {
    let trimmed = raw.trim();
    let invalid = || StatsParseError::InvalidDate(raw.to_string());
    if trimmed.is_empty() {
        return Err(invalid());
    }
    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        let secs = trimmed.parse::<i64>().map_err(|_| invalid())?;
        return date_from_epoch(secs).ok_or_else(invalid);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt.date());
        }
    }
    Err(invalid())
}

pub fn parse_match_payload(v: &Value) -> Result<MatchRecord, StatsParseError> {
    let match_id = v
        .get("match_id")
        .and_then(as_string_any)
        .filter(|s| !s.is_empty())
        .ok_or(StatsParseError::MissingField("match_id"))?;
    let date = normalize_date(v.get("date").ok_or(StatsParseError::MissingField("date"))?)?;
    let home_team = v
        .get("home_team")
        .and_then(|x| x.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(StatsParseError::MissingField("home_team"))?;
    let away_team = v
        .get("away_team")
        .and_then(|x| x.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(StatsParseError::MissingField("away_team"))?;

    Ok(MatchRecord {
        match_id,
        season: v
            .get("season")
            .and_then(as_string_any)
            .unwrap_or_default(),
        round_number: v.get("round_number").and_then(as_i64_any).unwrap_or(0),
        date,
        home_team,
        away_team,
        home_score: v.get("home_score").and_then(as_i32_any),
        away_score: v.get("away_score").and_then(as_i32_any),
    })
}

/// Parses one `{ "match": {...}, "stats": {...}, "fallback_stats": {...} }` document.
pub fn parse_ingest_document(doc: &Value) -> Result<IngestRow, StatsParseError> {
    let record = parse_match_payload(doc.get("match").ok_or(StatsParseError::MissingField("match"))?)?;
    let primary = doc.get("stats").cloned().unwrap_or(Value::Null);
    let payload = match doc.get("fallback_stats") {
        Some(fallback) => merge_payloads(&primary, fallback),
        None if primary.is_null() => Value::Object(Map::new()),
        None => primary,
    };
    let stats = parse_stats_payload(&record.match_id, &payload)?;
    Ok((record, stats))
}

/// Parses a JSON array of ingest documents. Rejected documents are collected
/// as error strings instead of failing the batch.
pub fn parse_ingest_batch(raw: &str) -> Result<IngestBatch, PipelineError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(IngestBatch::default());
    }
    let value: Value = serde_json::from_str(trimmed)?;
    let Some(docs) = value.as_array() else {
        return Err(PipelineError::unavailable("ingest payload is not a JSON array"));
    };

    let mut batch = IngestBatch::default();
    for (idx, doc) in docs.iter().enumerate() {
        match parse_ingest_document(doc) {
            Ok(row) => batch.rows.push(row),
            Err(err) => {
                warn!(document = idx, error = %err, "rejected ingest document");
                batch.errors.push(format!("document {idx}: {err}"));
            }
        }
    }
    debug!(
        accepted = batch.rows.len(),
        rejected = batch.errors.len(),
        "parsed ingest batch"
    );
    Ok(batch)
}

fn date_from_epoch(secs: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.date_naive())
}

fn as_f64_any(v: &Value) -> Option<f64> {
    if let Some(n) = v.as_f64() {
        return Some(n);
    }
    parse_number(v.as_str()?)
}

fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}

fn as_i32_any(v: &Value) -> Option<i32> {
    let n = as_i64_any(v)?;
    i32::try_from(n).ok()
}

fn as_string_any(v: &Value) -> Option<String> {
    if let Some(s) = v.as_str() {
        return Some(s.trim().to_string());
    }
    v.as_u64().map(|n| n.to_string())
}
