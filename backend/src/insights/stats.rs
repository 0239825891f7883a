//! Descriptive statistics over table columns: numeric summaries,
//! histograms and value counts.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::Table;

/// Summary of a numeric column.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NumericSummary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
    pub sum: f64,
}

impl NumericSummary {
    /// `None` for an empty slice.
    pub fn compute(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let sum: f64 = sorted.iter().sum();

        Some(NumericSummary {
            count,
            mean: sum / count as f64,
            min: sorted[0],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            max: sorted[count - 1],
            sum,
        })
    }

    /// Summary of every numeric cell of a column.
    pub fn of_column(table: &Table, column: &str) -> Option<Self> {
        Self::compute(&numeric_values(table, column))
    }
}

/// Numeric cells of a column; absent and non-numeric cells are skipped.
pub fn numeric_values(table: &Table, column: &str) -> Vec<f64> {
    table
        .column(column)
        .map(|cells| cells.into_iter().filter_map(|c| c.as_f64()).collect())
        .unwrap_or_default()
}

/// Linearly interpolated quantile of sorted values.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// One histogram bin, `[start, end)` except the last which includes `end`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width histogram between the smallest and largest value.
///
/// All-equal values fall into a single bin.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![HistogramBin { start: min, end: max, count: values.len() }];
    }

    let width = (max - min) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            start: min + width * i as f64,
            end: if i + 1 == bins { max } else { min + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

/// Occurrences of one value.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Counts of the non-absent values of a column, most frequent first, ties
/// by value. Empty when the column is missing.
pub fn value_counts(table: &Table, column: &str) -> Vec<ValueCount> {
    let Some(cells) = table.column(column) else {
        return Vec::new();
    };
    count_labels(cells.into_iter().filter_map(|c| c.label()))
}

/// Same ordering as [`value_counts`] over arbitrary labels.
pub fn count_labels<I>(labels: I) -> Vec<ValueCount>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }

    let mut out: Vec<ValueCount> = counts
        .into_iter()
        .map(|(value, count)| ValueCount { value, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Cell;

    #[test]
    fn test_numeric_summary() {
        let stats = NumericSummary::compute(&[10.0, 20.0, 30.0, 40.0, 50.0]).unwrap();

        assert_eq!(stats.count, 5);
        assert_eq!(stats.mean, 30.0);
        assert_eq!(stats.min, 10.0);
        assert_eq!(stats.q1, 20.0);
        assert_eq!(stats.median, 30.0);
        assert_eq!(stats.q3, 40.0);
        assert_eq!(stats.max, 50.0);
        assert_eq!(stats.sum, 150.0);
    }

    #[test]
    fn test_numeric_summary_empty() {
        assert!(NumericSummary::compute(&[]).is_none());
    }

    #[test]
    fn test_quantile_interpolates() {
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0], 0.5), 2.5);
        assert_eq!(quantile(&[50.0, 120.0], 0.5), 85.0);
    }

    #[test]
    fn test_histogram() {
        let values: Vec<f64> = (0..=10).map(f64::from).collect();
        let bins = histogram(&values, 5);

        assert_eq!(bins.len(), 5);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), values.len());
        assert_eq!(bins[0].start, 0.0);
        assert_eq!(bins[4].end, 10.0);
        // the maximum lands in the last bin
        assert_eq!(bins[4].count, 3);
    }

    #[test]
    fn test_histogram_constant_values() {
        let bins = histogram(&[7.0, 7.0], 20);
        assert_eq!(bins, vec![HistogramBin { start: 7.0, end: 7.0, count: 2 }]);
    }

    #[test]
    fn test_value_counts_order() {
        let table = Table::from_rows(
            vec!["observer".into()],
            ["Bob", "Ann", "Cid", "Bob", "", "Ann"]
                .iter()
                .map(|v| vec![Cell::text(v)])
                .collect(),
        );
        let counts = value_counts(&table, "observer");

        let flat: Vec<(&str, usize)> = counts.iter().map(|c| (c.value.as_str(), c.count)).collect();
        assert_eq!(flat, vec![("Ann", 2), ("Bob", 2), ("Cid", 1)]);
        assert!(value_counts(&table, "missing").is_empty());
    }
}
