//! Compound ETL
//!
//! A single-shot ETL pipeline that moves a chemical-compound dataset from a
//! remote CSV into a PostgreSQL table and/or a Parquet file, with light
//! validation at each stage.

pub mod error;
pub mod etl;
pub mod settings;
pub mod table;

// Re-exports for convenience
pub use error::{
    ExtractionError, LoadError, PipelineError, StructuralError, TypeError, VerificationError,
};
pub use etl::{
    Extractor, Loader, Outcome, OutputMode, OutputValidator, Pipeline, PipelineResult,
    PipelineState, RawValidator, Transformer,
};
pub use settings::ConnectionSettings;
pub use table::{Column, SemanticType, Table, Value};
