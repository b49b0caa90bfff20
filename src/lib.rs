//! Point-in-time team features for football match statistics.
//!
//! Raw match logs are loaded from a [`store::MatchStore`], turned into per-team
//! history views and aggregates, and assembled into one fixed-schema
//! [`features::FeatureVector`] per fixture for both training and next-round inference.

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod export;
pub mod features;
pub mod history;
pub mod ingest;
pub mod predict;
pub mod store;
pub mod telemetry;

pub use config::PipelineConfig;
pub use domain::{Fixture, MatchRecord, MatchStatistics, Metric, Side};
pub use error::{PipelineError, Result, StatsParseError};
pub use features::{FEATURE_COLUMNS, FeatureAssembler, FeatureVector};
pub use history::{HistoryPolicy, TeamHistoryView};
pub use store::{MatchStore, MatchTables};
