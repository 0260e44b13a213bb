//! Error types for the ETL pipeline stages.
//!
//! Each stage has its own error enum; [`PipelineError`] is the umbrella the
//! pipeline reports through. Coercion misses are deliberately absent here —
//! they are a lossy-but-non-fatal policy surfaced as warnings, never errors.

use std::path::PathBuf;
use thiserror::Error;

use crate::table::SemanticType;

/// Errors raised while fetching or parsing the source dataset.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Remote fetch failed.
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Failed to read or write the local dataset file.
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Every candidate encoding failed to decode the payload.
    #[error("no candidate encoding could decode the file (tried: {})", tried.join(", "))]
    EncodingExhausted { tried: Vec<&'static str> },

    /// The delimiter layout is malformed; encoding fallback does not apply.
    #[error("malformed delimited layout (decoded as {encoding}): {message}")]
    Malformed {
        encoding: &'static str,
        message: String,
    },
}

/// Structural pre-conditions violated by the freshly parsed table.
#[derive(Debug, Error)]
pub enum StructuralError {
    /// The parsed table has zero rows.
    #[error("dataset is empty")]
    EmptyTable,

    /// A required column is absent.
    #[error("missing required columns: {}", missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    /// Columns of unequal length cannot form a table.
    #[error("column '{column}' has {actual} values, expected {expected}")]
    RaggedColumns {
        column: String,
        expected: usize,
        actual: usize,
    },
}

/// Post-transformation type invariant violated.
#[derive(Debug, Error)]
pub enum TypeError {
    /// A declared-numeric column holds values of another type.
    #[error("column '{column}' is not uniformly {expected}")]
    NotUniform {
        column: String,
        expected: SemanticType,
    },
}

/// Errors raised while persisting the transformed table.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Connection settings are missing or malformed.
    #[error("database settings unavailable: {reason}")]
    Settings { reason: String },

    /// Could not establish a database connection.
    #[error("failed to connect to database '{database}': {source}")]
    Connect {
        database: String,
        #[source]
        source: sqlx::Error,
    },

    /// A DDL statement or bulk write failed.
    #[error("failed to write table '{table}': {source}")]
    Write {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// Failed to create or write the columnar output file.
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Arrow conversion failed.
    #[error("arrow conversion failed: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet serialization failed.
    #[error("parquet write failed: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}

/// Read-back verification failure. Reported, never fatal — the load has
/// already committed by the time verification runs.
#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("read-back query against '{table}' failed: {source}")]
    Query {
        table: String,
        #[source]
        source: sqlx::Error,
    },
}

/// Umbrella error carried in a failed pipeline outcome.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("extraction failed")]
    Extraction(#[from] ExtractionError),

    #[error("raw validation failed")]
    Structural(#[from] StructuralError),

    #[error("output validation failed")]
    Type(#[from] TypeError),

    #[error("load failed")]
    Load(#[from] LoadError),
}

/// Render an error and its source chain as a single human-readable line.
pub fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
