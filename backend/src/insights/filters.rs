//! Immutable filter criteria and the pure function applying them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::models::Table;
use crate::transform::temporal::cell_date;

/// Column the species filter applies to.
pub const SPECIES_FILTER_COLUMN: &str = "taxoncode";

/// Column the observer filter applies to.
pub const OBSERVER_FILTER_COLUMN: &str = "observer";

/// Inclusive date bounds; a missing bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// What to keep. The default keeps everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub date_range: Option<DateRange>,
    /// Column → accepted values. An empty set selects nothing and is
    /// therefore ignored.
    pub selections: BTreeMap<String, BTreeSet<String>>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_selection<I, S>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selections
            .entry(column.to_string())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    pub fn with_species<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_selection(SPECIES_FILTER_COLUMN, values)
    }

    pub fn with_observer<I, S>(self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_selection(OBSERVER_FILTER_COLUMN, values)
    }

    /// True when no filter would remove a row.
    pub fn is_empty(&self) -> bool {
        self.date_range.map_or(true, |r| r.is_open()) && self.selections.values().all(|v| v.is_empty())
    }
}

/// Rows of `table` matching every active criterion, in their original order.
///
/// - date range: inclusive on both ends; rows without a parseable date are
///   excluded. Ignored when the table has no `date` column.
/// - selection: the cell's text must be one of the values. Ignored when
///   empty or when the table lacks the column.
pub fn apply_filters(table: &Table, criteria: &FilterCriteria) -> Table {
    let date_idx = criteria
        .date_range
        .filter(|r| !r.is_open())
        .and_then(|range| table.column_index("date").map(|idx| (idx, range)));

    let selections: Vec<(usize, &BTreeSet<String>)> = criteria
        .selections
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .filter_map(|(column, values)| table.column_index(column).map(|idx| (idx, values)))
        .collect();

    let keep: Vec<usize> = table
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| {
            let in_range = date_idx.map_or(true, |(idx, range)| {
                cell_date(&row[idx]).map_or(false, |d| range.contains(d))
            });
            in_range
                && selections.iter().all(|(idx, values)| {
                    row[*idx].label().map_or(false, |label| values.contains(&label))
                })
        })
        .map(|(i, _)| i)
        .collect();

    table.select_rows(&keep)
}
