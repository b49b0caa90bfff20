use thiserror::Error;

/// Rejections raised while turning a raw ingestion payload into typed values.
#[derive(Debug, Error)]
pub enum StatsParseError {
    #[error("payload for match {match_id} is not a JSON object")]
    NotAnObject { match_id: String },

    #[error("payload is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("unknown stats field `{0}`")]
    UnknownField(String),

    #[error("field `{field}` has non-numeric value {raw}")]
    InvalidValue { field: String, raw: String },

    #[error("metric `{0}` has a value for only one side")]
    UnpairedMetric(&'static str),

    #[error("unrecognised date `{0}`")]
    InvalidDate(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("data unavailable: {what}")]
    DataUnavailable { what: String },

    #[error("schema mismatch: table `{table}` has no column `{column}`")]
    SchemaMismatch { table: String, column: String },

    #[error("parse error: {0}")]
    Parse(#[from] StatsParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl PipelineError {
    pub fn unavailable(what: impl Into<String>) -> Self {
        PipelineError::DataUnavailable { what: what.into() }
    }

    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        PipelineError::SchemaMismatch {
            table: table.into(),
            column: column.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
