//! Core ETL (Extract, Transform, Load) stages
//!
//! One module per pipeline stage: extraction with encoding fallback,
//! structural and type validation, normalization, persistence, and the
//! state machine that sequences them.

mod extract;
mod load;
mod pipeline;
mod transform;
mod validate;

pub use extract::{ENCODING_CANDIDATES, Extractor, RawDataset};
pub use load::{LoadResult, Loader, OutputMode, VerificationReport};
pub use pipeline::{Outcome, Pipeline, PipelineResult, PipelineState};
pub use transform::{TransformOutput, Transformer, clean_column_name};
pub use validate::{OutputValidator, RawValidator};
