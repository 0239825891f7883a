//! Read-side of the cleaned dataset.
//!
//! - [`loader`] - load a persisted cleaned file and re-derive its temporal columns
//! - [`filters`] - immutable filter criteria, pure row subsetting
//! - [`lenses`] - the seven analytical summaries
//! - [`stats`] - numeric summaries, histograms, value counts

pub mod filters;
pub mod lenses;
pub mod loader;
pub mod stats;

pub use filters::{apply_filters, DateRange, FilterCriteria};
pub use lenses::{summarize, Lens, LensSummary};
pub use loader::load_cleaned;
pub use stats::{NumericSummary, ValueCount};
