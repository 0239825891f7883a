//! # Birdwatch - bird-observation data normalizer
//!
//! Birdwatch merges spreadsheet exports of bird-monitoring field data
//! (grassland and forest plots), cleans them into one schema-stable dataset
//! and serves filterable summaries of it.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ XLSX / CSV  │────▶│   Parser    │────▶│  Transform  │────▶│ Cleaned CSV │
//! │  exports    │     │ (auto-fmt)  │     │ (std/impute)│     │   / JSON    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//!                                         ┌─────────────┐     ┌──────▼──────┐
//!                                         │  HTTP API   │◀────│  Insights   │
//!                                         │  (lenses)   │     │ (filter/agg)│
//!                                         └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use birdwatch::{run, CleanOptions};
//!
//! let report = run(&["grassland.xlsx", "forest.xlsx"], "cleaned.csv", &CleanOptions::default())?;
//! println!("Cleaned {} rows", report.rows);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Cells, tables, seasons, typed observations
//! - [`parser`] - Spreadsheet and delimited-text loading with auto-detection
//! - [`transform`] - Standardization, temporal derivation, imputation, pipeline
//! - [`readiness`] - Advisory readiness report
//! - [`validation`] - Cleaned-record schema validation
//! - [`insights`] - Loader, filters and lenses over the cleaned dataset
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Cleaning
pub mod transform;

// Reporting
pub mod readiness;

// Validation
pub mod validation;

// Analysis
pub mod insights;

// Configuration
pub mod config;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    PipelineError,
    PipelineResult,
    ServerError,
    SourceError,
    ValidationError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Cell,
    Observation,
    Season,
    Table,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    parse_bytes_auto,
    parse_file_auto,
    RawSource,
    SourceFormat,
    SourceInfo,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    clean_bytes,
    clean_files,
    clean_table,
    load,
    merge,
    persist,
    run,
    CleanOptions,
    CleanOutcome,
    CleanReport,
    OutputFormat,
};

pub use transform::{
    derive_temporal,
    impute,
    standardize,
    ColumnRule,
    RuleSet,
};

// =============================================================================
// Re-exports - Reporting & Validation
// =============================================================================

pub use readiness::{summarize_readiness, ReadinessReport};

pub use validation::{
    is_valid,
    is_valid_cleaned_record,
    validate,
    validate_cleaned_record,
    validate_records,
};

// =============================================================================
// Re-exports - Insights
// =============================================================================

pub use insights::{
    apply_filters,
    load_cleaned,
    summarize,
    DateRange,
    FilterCriteria,
    Lens,
    LensSummary,
};

// =============================================================================
// Re-exports - Config
// =============================================================================

pub use config::AppConfig;

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
