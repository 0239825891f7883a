//! Error types for the birdwatch cleaning pipeline.
//!
//! - [`SourceError`] - a single raw source could not be read (recoverable)
//! - [`PipelineError`] - top-level run errors, the fatal ones included
//! - [`ValidationError`] - cleaned record schema violations
//! - [`ConfigError`] - environment configuration errors
//! - [`ServerError`] - HTTP layer errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Source Errors
// =============================================================================

/// Errors while loading one raw source.
///
/// These never abort a run on their own: the pipeline logs them and carries
/// on with whatever other sources are usable.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Delimited text could not be parsed.
    #[error("Invalid delimited text: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet workbook could not be opened or read.
    #[error("Invalid spreadsheet: {0}")]
    Spreadsheet(String),

    /// Source has no header row.
    #[error("No headers found")]
    NoHeaders,

    /// Source has a header but no data rows.
    #[error("Source has no data rows")]
    EmptyFile,
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors while validating cleaned records.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Schema validation failed.
    #[error("Validation failed: {errors:?}")]
    SchemaError { errors: Vec<String> },

    /// The embedded schema itself is unusable.
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline errors.
///
/// Only [`PipelineError::AllSourcesUnavailable`] and
/// [`PipelineError::EmptyAfterCleaning`] come out of the cleaning logic
/// itself; the rest wrap I/O at the edges (reading a cleaned file back,
/// writing the output).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No source could be loaded.
    #[error("No usable input: all {0} source(s) are missing or unreadable")]
    AllSourcesUnavailable(usize),

    /// Every row or every column was dropped by the cleaning passes.
    #[error("Nothing left after cleaning: {rows} row(s), {columns} column(s)")]
    EmptyAfterCleaning { rows: usize, columns: usize },

    /// Source error surfaced outside the merge step (e.g. reading a cleaned file).
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but its value is unusable.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Socket or runtime failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for source loading.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
