//! Cleaning steps.
//!
//! - Rules: declarative column → imputation rule table
//! - Standardize: names, trimming, empty rows/columns, duplicates
//! - Temporal: date parsing and derived calendar columns
//! - Impute: rule-driven fills
//! - Pipeline: load, merge, orchestration, persist

pub mod impute;
pub mod pipeline;
pub mod rules;
pub mod standardize;
pub mod temporal;

pub use impute::{impute, ImputeStats};
pub use rules::{ColumnRule, RuleSet, UNKNOWN};
pub use standardize::{standardize, StandardizeStats};
pub use temporal::{derive_periods, derive_temporal, TemporalOutcome};
