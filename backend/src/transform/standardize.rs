//! Schema standardization.
//!
//! Normalizes column names, trims cells, and removes rows and columns that
//! carry no information, then exact duplicates.

use serde::Serialize;
use std::collections::HashSet;

use crate::models::{Cell, Table};

/// What [`standardize`] removed or merged.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct StandardizeStats {
    pub rows_in: usize,
    /// Normalized names that more than one raw column collapsed into.
    pub merged_columns: Vec<String>,
    pub empty_rows_dropped: usize,
    pub empty_columns_dropped: Vec<String>,
    pub duplicates_dropped: usize,
}

/// Lowercase + trim a column name.
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Standardize a merged table.
///
/// Order: names, cell trimming, all-absent rows, all-absent columns,
/// duplicates (first occurrence kept).
pub fn standardize(table: Table) -> (Table, StandardizeStats) {
    let mut stats = StandardizeStats {
        rows_in: table.len(),
        ..Default::default()
    };

    let mut table = normalize_columns(table, &mut stats);

    let names: Vec<String> = table.columns().to_vec();
    for name in &names {
        table.map_column(name, |cell| match cell {
            Cell::Text(s) => Cell::text(s),
            other => other.clone(),
        });
    }

    let before = table.len();
    table.retain_rows(|row| row.iter().any(|c| !c.is_empty()));
    stats.empty_rows_dropped = before - table.len();

    for name in &names {
        let all_empty = table
            .column(name)
            .map(|cells| cells.iter().all(|c| c.is_empty()))
            .unwrap_or(false);
        if all_empty {
            table.remove_column(name);
            stats.empty_columns_dropped.push(name.clone());
        }
    }

    let before = table.len();
    let mut seen = HashSet::new();
    table.retain_rows(|row| seen.insert(row_key(row)));
    stats.duplicates_dropped = before - table.len();

    (table, stats)
}

/// Rename columns and coalesce the ones that collide after normalization,
/// taking the first non-absent value left to right.
fn normalize_columns(table: Table, stats: &mut StandardizeStats) -> Table {
    let (raw_columns, rows) = table.into_parts();

    let mut columns: Vec<String> = Vec::new();
    let mut target: Vec<usize> = Vec::with_capacity(raw_columns.len());
    for raw in &raw_columns {
        let name = normalize_column_name(raw);
        match columns.iter().position(|c| *c == name) {
            Some(idx) => {
                if !stats.merged_columns.contains(&name) {
                    stats.merged_columns.push(name);
                }
                target.push(idx);
            }
            None => {
                target.push(columns.len());
                columns.push(name);
            }
        }
    }

    let width = columns.len();
    let mut out = Table::new(columns);
    for row in rows {
        let mut merged = vec![Cell::Empty; width];
        for (cell, &idx) in row.into_iter().zip(&target) {
            if merged[idx].is_empty() {
                merged[idx] = cell;
            }
        }
        out.push_row(merged);
    }
    out
}

fn row_key(row: &[Cell]) -> String {
    let mut key = String::new();
    for cell in row {
        key.push_str(&cell.to_string());
        key.push('\u{1f}');
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter().map(|r| r.iter().map(|v| Cell::text(v)).collect()).collect(),
        )
    }

    #[test]
    fn test_column_names_normalized() {
        let (out, _) = standardize(table(&[" Date ", "OBSERVER"], &[&["2021-01-01", "Ann"]]));
        assert_eq!(out.columns(), &["date", "observer"]);
    }

    #[test]
    fn test_colliding_columns_coalesced() {
        let t = table(&["Date", "date "], &[&["2021-01-01", ""], &["", "2021-02-02"]]);
        let (out, stats) = standardize(t);

        assert_eq!(out.columns(), &["date"]);
        assert_eq!(out.get(0, "date"), Some(&Cell::text("2021-01-01")));
        assert_eq!(out.get(1, "date"), Some(&Cell::text("2021-02-02")));
        assert_eq!(stats.merged_columns, vec!["date"]);
    }

    #[test]
    fn test_empty_rows_and_columns_dropped() {
        let t = table(
            &["a", "b", "c"],
            &[&["1", "", ""], &["", "", ""], &["2", "x", ""]],
        );
        let (out, stats) = standardize(t);

        assert_eq!(out.len(), 2);
        assert_eq!(out.columns(), &["a", "b"]);
        assert_eq!(stats.empty_rows_dropped, 1);
        assert_eq!(stats.empty_columns_dropped, vec!["c"]);
    }

    #[test]
    fn test_duplicates_removed_after_trim() {
        let t = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![
                vec![Cell::Text(" x ".into()), Cell::text("1")],
                vec![Cell::Text("x".into()), Cell::text("1")],
                vec![Cell::Text("X".into()), Cell::text("1")],
            ],
        );
        let (out, stats) = standardize(t);

        assert_eq!(out.len(), 2);
        assert_eq!(stats.duplicates_dropped, 1);
        assert_eq!(out.get(0, "a"), Some(&Cell::text("x")));
        assert_eq!(out.get(1, "a"), Some(&Cell::text("X")));
    }

    #[test]
    fn test_whitespace_only_cells_are_absent() {
        let t = Table::from_rows(
            vec!["a".into(), "b".into()],
            vec![vec![Cell::Text("   ".into()), Cell::text("1")]],
        );
        let (out, _) = standardize(t);
        assert_eq!(out.columns(), &["b"]);
    }
}
