//! Read a persisted cleaned dataset back for analysis.
//!
//! Values come back as text, so cell types are inferred, then the temporal
//! columns are recomputed with the same functions the cleaning run used.
//! This keeps `season` identical whether it was read from the file or
//! derived again.

use serde_json::Value;
use std::path::Path;

use crate::error::{PipelineResult, SourceError};
use crate::models::{Cell, Table};
use crate::transform::pipeline::OutputFormat;
use crate::transform::temporal::{derive_periods, derive_temporal};

/// Load a cleaned CSV or JSON file (chosen by extension) and re-derive
/// `year`, `month`, `season`, `month_year` and `hour`.
pub fn load_cleaned<P: AsRef<Path>>(path: P) -> PipelineResult<Table> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let table = match OutputFormat::from_path(path) {
        OutputFormat::Csv => parse_cleaned_csv(&content)?,
        OutputFormat::Json => parse_cleaned_json(&content)?,
    };
    tracing::debug!(path = %path.display(), rows = table.len(), "loaded cleaned dataset");
    Ok(rederive(table))
}

/// Recompute the derived temporal columns in place of whatever was stored.
pub fn rederive(table: Table) -> Table {
    let (mut table, _) = derive_temporal(table);
    derive_periods(&mut table);
    table
}

fn parse_cleaned_csv(content: &str) -> PipelineResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if headers.is_empty() {
        return Err(SourceError::NoHeaders.into());
    }

    let mut table = Table::new(headers);
    for record in reader.records() {
        table.push_row(record?.iter().map(Cell::infer).collect());
    }
    Ok(table)
}

fn parse_cleaned_json(content: &str) -> PipelineResult<Table> {
    let records: Vec<serde_json::Map<String, Value>> = serde_json::from_str(content)?;

    let mut columns: Vec<String> = Vec::new();
    for record in &records {
        for key in record.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let mut table = Table::new(columns.clone());
    for record in &records {
        table.push_row(
            columns
                .iter()
                .map(|c| record.get(c).map(cell_from_json).unwrap_or_default())
                .collect(),
        );
    }
    Ok(table)
}

fn cell_from_json(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::Bool(b) => Cell::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Cell::Int(i),
            None => n.as_f64().map(Cell::number).unwrap_or_default(),
        },
        Value::String(s) => Cell::text(s),
        other => Cell::text(&other.to_string()),
    }
}
