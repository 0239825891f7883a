//! Rule-driven imputation.
//!
//! Every median is computed once per column, over the whole table as it
//! stands when imputation starts, ignoring absent cells.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use super::rules::{ColumnRule, RuleSet, UNKNOWN};
use crate::models::{Cell, Table};

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digit-run pattern is valid"));

/// What was filled in one column.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColumnFill {
    pub column: String,
    pub rule: ColumnRule,
    /// Cells that were absent (or became absent by coercion) and got filled.
    pub filled: usize,
    /// `None` when the column has no numeric value to take a median of.
    pub fill_value: Option<String>,
}

/// Per-column results of [`impute`], in rule order.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ImputeStats {
    pub columns: Vec<ColumnFill>,
}

impl ImputeStats {
    pub fn total_filled(&self) -> usize {
        self.columns.iter().map(|c| c.filled).sum()
    }

    /// Numeric columns left with absent cells because no median exists.
    pub fn unfilled_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.fill_value.is_none())
            .map(|c| c.column.as_str())
    }
}

/// Median of the values, `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// First run of ASCII digits in the cell's text, as a number.
///
/// `"50m"` → 50, `"12.5"` → 12, `"Unknown"` → `None`.
pub fn extract_digit_run(cell: &Cell) -> Option<f64> {
    let text = cell.to_string();
    DIGIT_RUN
        .find(&text)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

/// Apply every rule whose column exists; missing columns are skipped.
pub fn impute(mut table: Table, rules: &RuleSet) -> (Table, ImputeStats) {
    let mut stats = ImputeStats::default();

    for (column, rule) in rules.iter() {
        let Some(cells) = table.column(column) else {
            continue;
        };

        let fill = match rule {
            ColumnRule::Categorical => fill_categorical(&cells),
            ColumnRule::Median => fill_median(cells.iter().map(|c| c.as_f64()).collect()),
            ColumnRule::DigitRunMedian => {
                fill_median(cells.iter().map(|c| extract_digit_run(c)).collect())
            }
        };

        table.set_column(column, fill.cells);
        stats.columns.push(ColumnFill {
            column: column.to_string(),
            rule,
            filled: fill.filled,
            fill_value: fill.fill_value,
        });
    }

    (table, stats)
}

/// A column after filling, with what went into it.
struct Filled {
    cells: Vec<Cell>,
    filled: usize,
    fill_value: Option<String>,
}

fn fill_categorical(cells: &[&Cell]) -> Filled {
    let mut filled = 0;
    let cells = cells
        .iter()
        .map(|c| {
            if c.is_empty() {
                filled += 1;
                Cell::Text(UNKNOWN.to_string())
            } else {
                (*c).clone()
            }
        })
        .collect();
    Filled {
        cells,
        filled,
        fill_value: Some(UNKNOWN.to_string()),
    }
}

fn fill_median(values: Vec<Option<f64>>) -> Filled {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let fill = median(&present);
    let filled = if fill.is_some() { values.len() - present.len() } else { 0 };

    let cells = values
        .into_iter()
        .map(|v| v.or(fill).map(Cell::number).unwrap_or_default())
        .collect();
    Filled {
        cells,
        filled,
        fill_value: fill.map(|f| Cell::Number(f).to_string()),
    }
}
