//! Pipeline orchestration and run reporting
//!
//! Stages run strictly in sequence; the first unrecoverable failure jumps
//! straight to `Failed` with the originating error chain attached, skipping
//! every remaining stage. There is no resume capability — a rerun starts
//! over, including the fetch.

use super::extract::Extractor;
use super::load::Loader;
use super::transform::Transformer;
use super::validate::{OutputValidator, RawValidator};
use crate::error::{PipelineError, error_chain};
use crate::settings::ConnectionSettings;

/// Observable stage of a pipeline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Extracting,
    RawValidating,
    Transforming,
    OutputValidating,
    Loading,
    Verifying,
    Succeeded,
    Failed,
}

/// Terminal outcome of a run.
#[derive(Debug)]
pub enum Outcome {
    Success,
    Failure(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// The sole externally observable result of a pipeline run.
#[derive(Debug)]
pub struct PipelineResult {
    pub rows_processed: usize,
    pub rows_loaded: usize,
    /// Warnings and informational notes, in the order the stages produced
    /// them. Nothing is ever only printed.
    pub validation_warnings: Vec<String>,
    pub outcome: Outcome,
}

/// Sequences extraction, validation, transformation, and loading.
pub struct Pipeline {
    extractor: Extractor,
    transformer: Transformer,
    loader: Loader,
    row_limit: usize,
    state: PipelineState,
}

impl Pipeline {
    pub fn new(
        extractor: Extractor,
        transformer: Transformer,
        loader: Loader,
        row_limit: usize,
    ) -> Self {
        Self {
            extractor,
            transformer,
            loader,
            row_limit,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run the pipeline to completion.
    ///
    /// Fatal errors end up in the returned outcome rather than an `Err` —
    /// the result is the single report a caller acts on.
    pub async fn run(&mut self) -> PipelineResult {
        let mut warnings = Vec::new();

        self.state = PipelineState::Extracting;
        log::info!("Extracting source dataset");
        let raw = match self.extractor.fetch_and_parse().await {
            Ok(raw) => raw,
            Err(e) => return self.fail(e.into(), 0, warnings),
        };
        log::info!(
            "Extracted {} rows, {} columns ('{}' encoding)",
            raw.table.row_count(),
            raw.table.column_count(),
            raw.encoding
        );

        self.state = PipelineState::RawValidating;
        match RawValidator::check_raw(&raw.table) {
            Ok(observed) => warnings.extend(observed),
            Err(e) => return self.fail(e.into(), 0, warnings),
        }

        self.state = PipelineState::Transforming;
        let output = self.transformer.normalize(raw.table);
        let table = output.table;
        warnings.extend(output.notes);
        let rows_processed = table.row_count();
        log::info!("Transformed down to {} rows", rows_processed);

        self.state = PipelineState::OutputValidating;
        match OutputValidator::check_output(&table, self.row_limit) {
            Ok(observed) => warnings.extend(observed),
            Err(e) => return self.fail(e.into(), rows_processed, warnings),
        }

        self.state = PipelineState::Loading;
        let settings = if self.loader.mode().includes_database() {
            match ConnectionSettings::from_env() {
                Ok(settings) => Some(settings),
                Err(e) => return self.fail(e.into(), rows_processed, warnings),
            }
        } else {
            None
        };
        let loaded = match self.loader.persist(&table, settings.as_ref()).await {
            Ok(loaded) => loaded,
            Err(e) => return self.fail(e.into(), rows_processed, warnings),
        };
        for destination in &loaded.destinations {
            log::info!("Loaded {} rows to {}", loaded.rows_loaded, destination);
        }

        self.state = PipelineState::Verifying;
        if let Some(settings) = &settings {
            match self.loader.verify(&table, settings).await {
                Ok(report) => {
                    log::info!(
                        "Read-back: {} rows in '{}'",
                        report.row_count,
                        self.loader.table_name()
                    );
                    for row in &report.sample {
                        log::info!("  {}", row);
                    }
                }
                // Verification runs after the load committed; report only
                Err(e) => warnings.push(error_chain(&e)),
            }
        }

        self.state = PipelineState::Succeeded;
        PipelineResult {
            rows_processed,
            rows_loaded: loaded.rows_loaded,
            validation_warnings: warnings,
            outcome: Outcome::Success,
        }
    }

    fn fail(
        &mut self,
        error: PipelineError,
        rows_processed: usize,
        warnings: Vec<String>,
    ) -> PipelineResult {
        self.state = PipelineState::Failed;
        let reason = error_chain(&error);
        log::error!("Pipeline failed: {}", reason);
        PipelineResult {
            rows_processed,
            rows_loaded: 0,
            validation_warnings: warnings,
            outcome: Outcome::Failure(reason),
        }
    }
}
