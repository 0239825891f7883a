//! Domain models for the birdwatch cleaning pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Cell`] - One value of a table, possibly absent
//! - [`Table`] - Ordered columns and rows, the unit every step works on
//! - [`Season`] - Meteorological season derived from a month
//! - [`Observation`] - Typed view of one cleaned row

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::transform::temporal::cell_date;

/// Text that spreadsheet exports use to mean "no value".
pub const MISSING_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "NULL", "null", "None", "<NA>", "#N/A",
];

// =============================================================================
// Cell
// =============================================================================

/// A single table value.
///
/// `Empty` is the only representation of an absent value. `Number` is always
/// finite.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Int(i64),
    Number(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Build a text cell, trimming it and mapping missing-value tokens to `Empty`.
    pub fn text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if MISSING_TOKENS.contains(&trimmed) {
            Cell::Empty
        } else {
            Cell::Text(trimmed.to_string())
        }
    }

    /// Build a numeric cell; non-finite values are absent.
    pub fn number(value: f64) -> Self {
        if value.is_finite() {
            Cell::Number(value)
        } else {
            Cell::Empty
        }
    }

    /// Parse text written by [`Cell`]'s `Display`, guessing int / float / text.
    pub fn infer(raw: &str) -> Self {
        match Cell::text(raw) {
            Cell::Text(s) => {
                if let Ok(i) = s.parse::<i64>() {
                    Cell::Int(i)
                } else if let Some(f) = s.parse::<f64>().ok().filter(|f| f.is_finite()) {
                    Cell::Number(f)
                } else {
                    Cell::Text(s)
                }
            }
            other => other,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Numeric coercion. Text is parsed after trimming; anything else that is
    /// not a number yields `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Number(f) => Some(*f),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Cell::Int(i) => Some(*i),
            Cell::Number(f) if f.fract() == 0.0 => Some(*f as i64),
            Cell::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Display text, `None` when absent.
    pub fn label(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string())
        }
    }

    /// JSON representation used for validation and JSON output.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Empty => Value::Null,
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Int(i) => Value::from(*i),
            Cell::Number(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Date(_) | Cell::DateTime(_) => Value::String(self.to_string()),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Int(i) => write!(f, "{}", i),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

// =============================================================================
// Table
// =============================================================================

/// Ordered columns and rows. Every row holds exactly one cell per column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Build a table, padding short rows with `Empty` and cutting long ones.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Cell>>) {
        (self.columns, self.rows)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// All cells of a column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Replace a column's cells, or append the column if it does not exist.
    pub fn set_column(&mut self, name: &str, cells: Vec<Cell>) {
        debug_assert_eq!(cells.len(), self.rows.len());
        let mut cells = cells.into_iter();
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = cells.next().unwrap_or_default();
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(cells.next().unwrap_or_default());
                }
            }
        }
    }

    /// Apply `f` to every cell of a column. No-op when the column is absent.
    pub fn map_column<F>(&mut self, name: &str, mut f: F)
    where
        F: FnMut(&Cell) -> Cell,
    {
        if let Some(idx) = self.column_index(name) {
            for row in &mut self.rows {
                row[idx] = f(&row[idx]);
            }
        }
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Vec<Cell>> {
        let idx = self.column_index(name)?;
        self.columns.remove(idx);
        Some(self.rows.iter_mut().map(|r| r.remove(idx)).collect())
    }

    /// Keep rows for which `keep` returns true, preserving order.
    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Cell]) -> bool,
    {
        self.rows.retain(|r| keep(r));
    }

    /// A new table holding the rows at `indices`, in that order.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: indices.iter().filter_map(|&i| self.rows.get(i).cloned()).collect(),
        }
    }

    /// Row as a JSON object, absent cells as `null`.
    pub fn row_to_json(&self, row: usize) -> Value {
        let mut obj = serde_json::Map::new();
        if let Some(cells) = self.rows.get(row) {
            for (name, cell) in self.columns.iter().zip(cells) {
                obj.insert(name.clone(), cell.to_json());
            }
        }
        Value::Object(obj)
    }

    pub fn to_json_records(&self) -> Vec<Value> {
        (0..self.len()).map(|i| self.row_to_json(i)).collect()
    }
}

// =============================================================================
// Season
// =============================================================================

/// Meteorological season.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
    Unknown,
}

impl Season {
    /// Display order used by every season breakdown.
    pub const ORDER: [Season; 5] = [
        Season::Winter,
        Season::Spring,
        Season::Summer,
        Season::Autumn,
        Season::Unknown,
    ];

    /// The one month → season mapping used everywhere in the crate.
    ///
    /// {12, 1, 2} Winter, {3, 4, 5} Spring, {6, 7, 8} Summer,
    /// {9, 10, 11} Autumn; absent or out-of-range months are `Unknown`.
    pub fn from_month(month: Option<u32>) -> Self {
        match month {
            Some(12 | 1 | 2) => Season::Winter,
            Some(3..=5) => Season::Spring,
            Some(6..=8) => Season::Summer,
            Some(9..=11) => Season::Autumn,
            _ => Season::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "Winter",
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Autumn => "Autumn",
            Season::Unknown => "Unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|season| season.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Observation
// =============================================================================

/// Columns tried, in order, to identify the observed species.
pub const SPECIES_COLUMNS: &[&str] = &["taxoncode", "npstaxoncode", "common_name", "scientific_name"];

/// Typed view of one cleaned row.
///
/// Every field is optional: the cleaned schema is best-effort and a field is
/// `None` both when its column is missing and when the cell is absent.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Observation {
    pub date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub season: Option<Season>,
    pub species: Option<String>,
    pub ecosystem: Option<String>,
    pub location_type: Option<String>,
    pub pif_watchlist_status: Option<String>,
    pub observer: Option<String>,
    pub flyover: Option<String>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub distance: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Observation {
    pub fn from_row(table: &Table, row: usize) -> Self {
        let cell = |name: &str| table.get(row, name).filter(|c| !c.is_empty());
        let label = |name: &str| cell(name).map(|c| c.to_string());
        let number = |name: &str| cell(name).and_then(Cell::as_f64);

        Self {
            date: cell("date").and_then(cell_date),
            year: cell("year").and_then(Cell::as_i64).map(|y| y as i32),
            month: cell("month").and_then(Cell::as_i64).map(|m| m as u32),
            season: cell("season").and_then(|c| c.as_str()).and_then(Season::parse),
            species: SPECIES_COLUMNS.iter().find_map(|c| label(c)),
            ecosystem: label("ecosystem"),
            location_type: label("location_type"),
            pif_watchlist_status: label("pif_watchlist_status"),
            observer: label("observer"),
            flyover: label("flyover_observed").or_else(|| label("flyover")),
            temperature: number("temperature"),
            humidity: number("humidity"),
            distance: number("distance"),
            latitude: number("latitude"),
            longitude: number("longitude"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            vec!["date".into(), "observer".into(), "temperature".into()],
            vec![
                vec![Cell::text("2021-05-01"), Cell::text("Ann"), Cell::Number(12.5)],
                vec![Cell::Empty, Cell::text("Bob")],
            ],
        )
    }

    #[test]
    fn test_missing_tokens_are_empty() {
        assert_eq!(Cell::text("  NA "), Cell::Empty);
        assert_eq!(Cell::text(""), Cell::Empty);
        assert_eq!(Cell::text(" Unknown "), Cell::Text("Unknown".into()));
    }

    #[test]
    fn test_infer() {
        assert_eq!(Cell::infer("42"), Cell::Int(42));
        assert_eq!(Cell::infer("4.5"), Cell::Number(4.5));
        assert_eq!(Cell::infer("50m"), Cell::Text("50m".into()));
        assert_eq!(Cell::infer("nan"), Cell::Empty);
    }

    #[test]
    fn test_number_rejects_nan() {
        assert_eq!(Cell::number(f64::NAN), Cell::Empty);
        assert_eq!(Cell::number(1.5), Cell::Number(1.5));
    }

    #[test]
    fn test_short_rows_are_padded() {
        let table = sample();
        assert_eq!(table.rows()[1].len(), 3);
        assert_eq!(table.get(1, "temperature"), Some(&Cell::Empty));
    }

    #[test]
    fn test_set_and_remove_column() {
        let mut table = sample();
        table.set_column("year", vec![Cell::Int(2021), Cell::Empty]);
        assert_eq!(table.columns().last().map(String::as_str), Some("year"));
        assert_eq!(table.remove_column("year"), Some(vec![Cell::Int(2021), Cell::Empty]));
        assert!(!table.has_column("year"));
    }

    #[test]
    fn test_season_mapping() {
        assert_eq!(Season::from_month(Some(12)), Season::Winter);
        assert_eq!(Season::from_month(Some(2)), Season::Winter);
        assert_eq!(Season::from_month(Some(4)), Season::Spring);
        assert_eq!(Season::from_month(Some(7)), Season::Summer);
        assert_eq!(Season::from_month(Some(10)), Season::Autumn);
        assert_eq!(Season::from_month(Some(13)), Season::Unknown);
        assert_eq!(Season::from_month(None), Season::Unknown);
    }

    #[test]
    fn test_observation_from_row() {
        let table = sample();
        let obs = Observation::from_row(&table, 0);
        assert_eq!(obs.date, NaiveDate::from_ymd_opt(2021, 5, 1));
        assert_eq!(obs.observer.as_deref(), Some("Ann"));
        assert_eq!(obs.temperature, Some(12.5));

        let obs = Observation::from_row(&table, 1);
        assert_eq!(obs.date, None);
        assert_eq!(obs.temperature, None);
    }
}
