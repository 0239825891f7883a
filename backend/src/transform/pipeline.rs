//! High-level cleaning pipeline.
//!
//! ```text
//! load (per source) ─▶ merge ─▶ standardize ─▶ [non-empty?] ─▶ derive_temporal ─▶ impute ─▶ persist
//!                                                   │
//!                                                   └─▶ EmptyAfterCleaning (fatal)
//! ```
//!
//! Two conditions abort a run: no usable source, and nothing left after
//! standardization. Both are decided before any output is written. Every
//! other problem (an unreadable source, a missing column, an unparseable
//! value) degrades into the data and is only logged.
//!
//! # Example
//!
//! ```rust,ignore
//! use birdwatch::transform::pipeline::{run, CleanOptions};
//!
//! let report = run(
//!     &["grassland.xlsx", "forest.xlsx"],
//!     "cleaned.csv",
//!     &CleanOptions::default(),
//! )?;
//! println!("{} rows written", report.rows);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use super::impute::{impute, ImputeStats};
use super::rules::RuleSet;
use super::standardize::{standardize, StandardizeStats};
use super::temporal::{derive_temporal, TemporalOutcome};
use crate::api::logs::{log_error, log_info, log_info_indent, log_success, log_warning, log_warning_indent};
use crate::error::{PipelineError, PipelineResult};
use crate::models::{Cell, Table};
use crate::parser::{parse_bytes_auto, parse_file_auto, RawSource, SourceFormat, SourceInfo};
use crate::readiness::{summarize_readiness, ReadinessReport};
use crate::validation::{validate_records, ValidationStats};

/// Serialized form of the cleaned dataset.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Delimited text with a header row.
    #[default]
    Csv,
    /// JSON array of records, absent values as `null`.
    Json,
}

impl OutputFormat {
    /// Guess from a file extension, CSV otherwise.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => OutputFormat::Json,
            _ => OutputFormat::Csv,
        }
    }
}

/// Options for one cleaning run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanOptions {
    /// Impute the extended column set (field conditions, id method, sex).
    pub extended: bool,

    pub format: OutputFormat,

    /// Check every cleaned record against the embedded schema.
    pub validate: bool,
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            extended: false,
            format: OutputFormat::Csv,
            validate: true,
        }
    }
}

impl CleanOptions {
    pub fn rules(&self) -> RuleSet {
        RuleSet::for_options(self.extended)
    }
}

/// Everything a run found out, without the data itself.
#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    pub sources: Vec<SourceInfo>,
    /// Sources that could not be used, by name.
    pub skipped: Vec<String>,
    pub rows: usize,
    pub columns: Vec<String>,
    pub standardize: StandardizeStats,
    pub temporal: TemporalOutcome,
    pub imputation: ImputeStats,
    pub readiness: ReadinessReport,
    pub validation: Option<ValidationStats>,
}

/// Cleaned table plus its run report.
#[derive(Debug, Clone)]
pub struct CleanOutcome {
    pub table: Table,
    pub report: CleanReport,
}

// =============================================================================
// Load / merge
// =============================================================================

/// Read one source. Failures are logged and yield `None`.
pub fn load<P: AsRef<Path>>(path: P) -> Option<RawSource> {
    let path = path.as_ref();
    match parse_file_auto(path) {
        Ok(source) => {
            log_loaded(&source);
            Some(source)
        }
        Err(e) => {
            log_warning(format!("Skipping {}: {}", path.display(), e));
            None
        }
    }
}

/// Same as [`load`] for an in-memory upload.
pub fn load_bytes(name: &str, bytes: &[u8]) -> Option<RawSource> {
    match parse_bytes_auto(name, bytes) {
        Ok(source) => {
            log_loaded(&source);
            Some(source)
        }
        Err(e) => {
            log_warning(format!("Skipping {}: {}", name, e));
            None
        }
    }
}

fn log_loaded(source: &RawSource) {
    let info = &source.info;
    match info.format {
        SourceFormat::Spreadsheet => log_success(format!(
            "Loaded {} (spreadsheet): {} rows, {} columns",
            info.name,
            info.row_count,
            info.headers.len()
        )),
        SourceFormat::Delimited => log_success(format!(
            "Loaded {} ({}, '{}'): {} rows, {} columns",
            info.name,
            info.encoding.as_deref().unwrap_or("utf-8"),
            format_delimiter(info.delimiter.unwrap_or(',')),
            info.row_count,
            info.headers.len()
        )),
    }
}

/// Format delimiter for display
fn format_delimiter(d: char) -> &'static str {
    match d {
        ';' => ";",
        ',' => ",",
        '\t' => "TAB",
        '|' => "|",
        _ => "?",
    }
}

/// Concatenate the usable tables row-wise, in order.
///
/// Columns are the union of all source columns in first-seen order; a row
/// from a source lacking a column gets an absent cell there. A single
/// usable table is returned unchanged.
pub fn merge<I>(tables: I) -> PipelineResult<Table>
where
    I: IntoIterator<Item = Option<Table>>,
{
    let mut offered = 0;
    let mut usable: Vec<Table> = Vec::new();
    for table in tables {
        offered += 1;
        if let Some(table) = table {
            usable.push(table);
        }
    }

    match usable.len() {
        0 => Err(PipelineError::AllSourcesUnavailable(offered)),
        1 => Ok(usable.remove(0)),
        _ => {
            let mut columns: Vec<String> = Vec::new();
            for table in &usable {
                for name in table.columns() {
                    if !columns.contains(name) {
                        columns.push(name.clone());
                    }
                }
            }

            let mut merged = Table::new(columns);
            for table in usable {
                let positions: Vec<usize> = table
                    .columns()
                    .iter()
                    .map(|name| merged.column_index(name).unwrap_or_default())
                    .collect();
                let width = merged.width();
                let (_, rows) = table.into_parts();
                for row in rows {
                    let mut out = vec![Cell::Empty; width];
                    for (cell, &idx) in row.into_iter().zip(&positions) {
                        out[idx] = cell;
                    }
                    merged.push_row(out);
                }
            }
            Ok(merged)
        }
    }
}

// =============================================================================
// Cleaning
// =============================================================================

/// Clean an already merged table.
///
/// The emptiness check right after standardization is the only place this
/// function can fail.
pub fn clean_table(merged: Table, options: &CleanOptions) -> PipelineResult<(Table, CleanReport)> {
    log_info(format!(
        "🧹 Standardizing {} rows x {} columns...",
        merged.len(),
        merged.width()
    ));
    let (table, standardize_stats) = standardize(merged);
    log_standardize(&standardize_stats);

    if table.is_empty() || table.width() == 0 {
        log_error("Nothing left after cleaning");
        return Err(PipelineError::EmptyAfterCleaning {
            rows: table.len(),
            columns: table.width(),
        });
    }

    log_info("📅 Deriving temporal columns...");
    let (table, temporal) = derive_temporal(table);
    match temporal {
        TemporalOutcome::NoDateColumn => log_warning("No date column; temporal features skipped"),
        TemporalOutcome::FromMonth { rows } => {
            log_warning(format!("No date column; season derived from month for {} rows", rows))
        }
        TemporalOutcome::Derived { parsed, unparsed } => {
            log_success(format!("{} dates parsed", parsed));
            if unparsed > 0 {
                log_warning_indent(format!("{} unparseable date(s) left absent (season Unknown)", unparsed), 1);
            }
        }
        TemporalOutcome::Dropped { rows } => log_warning(format!(
            "None of {} dates could be parsed; date, year, month and season removed",
            rows
        )),
    }

    let rules = options.rules();
    log_info(format!("🩹 Imputing ({} rules)...", rules.len()));
    let (table, imputation) = impute(table, &rules);
    for fill in &imputation.columns {
        match &fill.fill_value {
            Some(value) => log_info_indent(
                format!("{}: {} filled with {}", fill.column, fill.filled, value),
                1,
            ),
            None => log_warning_indent(
                format!("{}: no numeric value, left absent", fill.column),
                1,
            ),
        }
    }

    let readiness = summarize_readiness(&table);
    for category in &readiness.categories {
        if !category.is_usable() {
            log_warning_indent(format!("No {} columns available", category.category), 1);
        }
    }

    let validation = if options.validate {
        check_records(&table)
    } else {
        None
    };

    log_success(format!("Cleaned dataset: {} rows x {} columns", table.len(), table.width()));

    let report = CleanReport {
        sources: Vec::new(),
        skipped: Vec::new(),
        rows: table.len(),
        columns: table.columns().to_vec(),
        standardize: standardize_stats,
        temporal,
        imputation,
        readiness,
        validation,
    };
    Ok((table, report))
}

fn log_standardize(stats: &StandardizeStats) {
    if !stats.merged_columns.is_empty() {
        log_info_indent(
            format!("Coalesced columns differing only by case/whitespace: {}", stats.merged_columns.join(", ")),
            1,
        );
    }
    if stats.empty_rows_dropped > 0 {
        log_info_indent(format!("{} empty row(s) dropped", stats.empty_rows_dropped), 1);
    }
    if !stats.empty_columns_dropped.is_empty() {
        log_info_indent(
            format!("Empty column(s) dropped: {}", stats.empty_columns_dropped.join(", ")),
            1,
        );
    }
    if stats.duplicates_dropped > 0 {
        log_info_indent(format!("{} duplicate row(s) dropped", stats.duplicates_dropped), 1);
    }
}

fn check_records(table: &Table) -> Option<ValidationStats> {
    log_info("✔️  Validating cleaned records...");
    match validate_records(&table.to_json_records()) {
        Ok(stats) => {
            if stats.invalid == 0 {
                log_success(format!("All {} records valid", stats.valid));
            } else {
                log_warning(format!("{} of {} records failed validation", stats.invalid, stats.total));
                for err in stats.errors.iter().take(3) {
                    log_warning_indent(format!("Row {}: {}", err.row, err.errors.join(", ")), 1);
                }
            }
            Some(stats)
        }
        Err(e) => {
            log_error(format!("Validation unavailable: {}", e));
            None
        }
    }
}

/// Merge and clean loaded sources. `None` entries are sources that failed
/// to load.
pub fn clean_sources(
    sources: Vec<Option<RawSource>>,
    names: Vec<String>,
    options: &CleanOptions,
) -> PipelineResult<CleanOutcome> {
    let mut infos = Vec::new();
    let mut skipped = Vec::new();
    let mut tables = Vec::new();
    for (source, name) in sources.into_iter().zip(names) {
        match source {
            Some(source) => {
                infos.push(source.info);
                tables.push(Some(source.table));
            }
            None => {
                skipped.push(name);
                tables.push(None);
            }
        }
    }

    let merged = merge(tables).map_err(|e| {
        log_error(e.to_string());
        e
    })?;
    if infos.len() > 1 {
        log_info(format!("Merged {} sources into {} rows", infos.len(), merged.len()));
    }

    let (table, mut report) = clean_table(merged, options)?;
    report.sources = infos;
    report.skipped = skipped;
    Ok(CleanOutcome { table, report })
}

/// Load and clean source files.
pub fn clean_files<P: AsRef<Path>>(paths: &[P], options: &CleanOptions) -> PipelineResult<CleanOutcome> {
    log_info(format!("📖 Reading {} source(s)...", paths.len()));
    let sources = paths.iter().map(load).collect();
    let names = paths
        .iter()
        .map(|p| p.as_ref().display().to_string())
        .collect();
    clean_sources(sources, names, options)
}

/// Load and clean uploaded files, given as `(name, bytes)`.
pub fn clean_bytes(files: &[(String, Vec<u8>)], options: &CleanOptions) -> PipelineResult<CleanOutcome> {
    log_info(format!("📖 Reading {} upload(s)...", files.len()));
    let sources = files.iter().map(|(name, bytes)| load_bytes(name, bytes)).collect();
    let names = files.iter().map(|(name, _)| name.clone()).collect();
    clean_sources(sources, names, options)
}

// =============================================================================
// Persist
// =============================================================================

/// Write the table to `destination`, replacing any previous file.
///
/// Data goes to a uniquely named temporary file in the destination
/// directory and is renamed into place, so a failed or concurrent write
/// never leaves a partial output. Values are written exactly as they are
/// in the table.
pub fn persist<P: AsRef<Path>>(table: &Table, destination: P, format: OutputFormat) -> PipelineResult<()> {
    let destination = destination.as_ref();
    let dir = match destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => {
            fs::create_dir_all(parent)?;
            parent
        }
        None => Path::new("."),
    };

    // Removed on drop if anything below fails.
    let mut tmp = NamedTempFile::new_in(dir)?;
    match format {
        OutputFormat::Csv => write_csv(table, tmp.as_file_mut())?,
        OutputFormat::Json => write_json(table, tmp.as_file_mut())?,
    }
    tmp.persist(destination).map_err(|e| e.error)?;
    Ok(())
}

fn write_csv<W: Write>(table: &Table, out: W) -> PipelineResult<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|c| c.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json<W: Write>(table: &Table, out: W) -> PipelineResult<()> {
    let mut writer = BufWriter::new(out);
    serde_json::to_writer_pretty(&mut writer, &table.to_json_records())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Clean `inputs` and persist the result. Nothing is written on failure.
pub fn run<P, Q>(inputs: &[P], destination: Q, options: &CleanOptions) -> PipelineResult<CleanReport>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let outcome = clean_files(inputs, options)?;
    let destination = destination.as_ref();
    persist(&outcome.table, destination, options.format)?;
    log_success(format!("💾 Wrote {}", destination.display()));
    Ok(outcome.report)
}
