//! Date parsing and temporal columns.
//!
//! Every derived temporal value in the crate (`year`, `month`, `season`,
//! `month_year`, `hour`) is computed here, both when cleaning and when a
//! cleaned file is loaded back for analysis.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::Serialize;

use crate::models::{Cell, Season, Table};

/// Columns owned by [`derive_temporal`].
pub const TEMPORAL_COLUMNS: &[&str] = &["date", "year", "month", "season"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m/%d/%y",
    "%m-%d-%Y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %d %Y",
    "%d-%b-%y",
    "%d %b %y",
];

/// `%Y` also takes one or two digits, so `5/1/18` would read as year 5
/// under `%Y/%m/%d`. Anything earlier than this is a misread short year.
const MIN_YEAR: i32 = 1000;

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p", "%H:%M:%S%.f"];

/// Parse a date-or-datetime string. Month-first for slashed dates.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .chain(
            DATE_FORMATS
                .iter()
                .filter_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .filter_map(|d| d.and_hms_opt(0, 0, 0)),
        )
        .find(|dt| dt.year() >= MIN_YEAR)
}

/// Parse the calendar date part of a string; `None` when unparseable.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    parse_datetime(raw).map(|dt| dt.date())
}

/// Date of a cell. Numbers are never dates.
pub fn cell_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Date(d) => Some(*d),
        Cell::DateTime(dt) => Some(dt.date()),
        Cell::Text(s) => parse_date(s),
        _ => None,
    }
}

/// Time of day of a cell holding a time or a full datetime.
pub fn cell_time(cell: &Cell) -> Option<NaiveTime> {
    match cell {
        Cell::DateTime(dt) => Some(dt.time()),
        Cell::Text(s) => {
            let s = s.trim();
            TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
                .or_else(|| parse_datetime(s).map(|dt| dt.time()))
        }
        _ => None,
    }
}

/// `YYYY-MM` period label.
pub fn month_year(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// What [`derive_temporal`] did.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TemporalOutcome {
    /// No `date` column; nothing derived.
    NoDateColumn,
    /// No `date` column, but `season` was derived from a `month` column.
    FromMonth { rows: usize },
    /// Dates parsed; unparseable ones became absent.
    Derived { parsed: usize, unparsed: usize },
    /// No date parsed at all; the temporal columns were removed.
    Dropped { rows: usize },
}

/// Parse `date` and derive `year`, `month` and `season`.
///
/// Unparseable dates become absent (their rows get `Unknown` season). When
/// not a single date parses, `date`, `year`, `month` and `season` are all
/// removed instead. Without a `date` column, an existing `month` column
/// still determines `season`.
pub fn derive_temporal(mut table: Table) -> (Table, TemporalOutcome) {
    if !table.has_column("date") {
        if !table.has_column("month") {
            return (table, TemporalOutcome::NoDateColumn);
        }
        season_from_month(&mut table);
        let rows = table.len();
        return (table, TemporalOutcome::FromMonth { rows });
    }
    let Some(cells) = table.column("date") else {
        return (table, TemporalOutcome::NoDateColumn);
    };
    let dates: Vec<Option<NaiveDate>> = cells.into_iter().map(cell_date).collect();

    let parsed = dates.iter().filter(|d| d.is_some()).count();
    if parsed == 0 {
        for column in TEMPORAL_COLUMNS {
            table.remove_column(column);
        }
        let rows = table.len();
        return (table, TemporalOutcome::Dropped { rows });
    }

    let months: Vec<Option<u32>> = dates.iter().map(|d| d.map(|d| d.month())).collect();

    table.set_column(
        "date",
        dates.iter().map(|d| d.map(Cell::Date).unwrap_or_default()).collect(),
    );
    table.set_column(
        "year",
        dates
            .iter()
            .map(|d| d.map(|d| Cell::Int(i64::from(d.year()))).unwrap_or_default())
            .collect(),
    );
    table.set_column(
        "month",
        months
            .iter()
            .map(|m| m.map(|m| Cell::Int(i64::from(m))).unwrap_or_default())
            .collect(),
    );
    table.set_column(
        "season",
        months
            .iter()
            .map(|m| Cell::Text(Season::from_month(*m).to_string()))
            .collect(),
    );

    let unparsed = dates.len() - parsed;
    (table, TemporalOutcome::Derived { parsed, unparsed })
}

/// Normalize `month` to an integer in 1..=12 (absent otherwise) and write
/// `season` from it.
fn season_from_month(table: &mut Table) {
    table.map_column("month", |c| {
        c.as_i64()
            .filter(|m| (1..=12).contains(m))
            .map(Cell::Int)
            .unwrap_or_default()
    });
    let seasons: Option<Vec<Cell>> = table.column("month").map(|cells| {
        cells
            .into_iter()
            .map(|c| {
                let month = c.as_i64().and_then(|m| u32::try_from(m).ok());
                Cell::Text(Season::from_month(month).to_string())
            })
            .collect()
    });
    if let Some(seasons) = seasons {
        table.set_column("season", seasons);
    }
}

/// Add the analysis-only columns `month_year` (from `date`) and `hour`
/// (from `start_time`). Each is skipped when its source column is missing.
pub fn derive_periods(table: &mut Table) {
    let labels: Option<Vec<Cell>> = table.column("date").map(|cells| {
        cells
            .into_iter()
            .map(|c| cell_date(c).map(|d| Cell::Text(month_year(d))).unwrap_or_default())
            .collect()
    });
    if let Some(labels) = labels {
        table.set_column("month_year", labels);
    }

    let hours: Option<Vec<Cell>> = table.column("start_time").map(|cells| {
        cells
            .into_iter()
            .map(|c| cell_time(c).map(|t| Cell::Int(i64::from(t.hour()))).unwrap_or_default())
            .collect()
    });
    if let Some(hours) = hours {
        table.set_column("hour", hours);
    }
}
