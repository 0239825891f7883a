//! Readiness report.
//!
//! Lists, per analytical feature category, which expected columns survived
//! cleaning. Purely advisory: nothing here can fail a run.

use serde::Serialize;
use std::fmt;

use crate::models::Table;

/// Expected columns for each feature category.
pub const FEATURE_CATEGORIES: &[(&str, &[&str])] = &[
    ("temporal", &["date", "year", "month", "season", "start_time", "end_time"]),
    ("species", &["taxoncode", "npstaxoncode", "common_name", "scientific_name", "aou_code"]),
    ("location", &["location_type", "ecosystem", "site_name", "plot_name", "latitude", "longitude"]),
    ("environment", &["temperature", "humidity", "sky", "wind", "disturbance"]),
    ("behavior", &["distance", "flyover_observed", "flyover", "id_method", "interval_length"]),
    ("observer", &["observer", "visit"]),
    ("conservation", &["pif_watchlist_status", "regional_stewardship_status"]),
    ("demographics", &["sex", "initial_three_min_cnt"]),
];

/// Presence of one category's expected columns.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryReadiness {
    pub category: String,
    pub present: Vec<String>,
    pub missing: Vec<String>,
}

impl CategoryReadiness {
    /// At least one expected column is available.
    pub fn is_usable(&self) -> bool {
        !self.present.is_empty()
    }
}

/// Advisory summary of a cleaned table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReadinessReport {
    pub rows: usize,
    pub columns: Vec<String>,
    pub categories: Vec<CategoryReadiness>,
}

impl ReadinessReport {
    pub fn category(&self, name: &str) -> Option<&CategoryReadiness> {
        self.categories.iter().find(|c| c.category == name)
    }
}

pub fn summarize_readiness(table: &Table) -> ReadinessReport {
    let categories = FEATURE_CATEGORIES
        .iter()
        .map(|(category, expected)| {
            let (present, missing): (Vec<&str>, Vec<&str>) =
                expected.iter().copied().partition(|c| table.has_column(c));
            CategoryReadiness {
                category: category.to_string(),
                present: present.into_iter().map(String::from).collect(),
                missing: missing.into_iter().map(String::from).collect(),
            }
        })
        .collect();

    ReadinessReport {
        rows: table.len(),
        columns: table.columns().to_vec(),
        categories,
    }
}

impl fmt::Display for ReadinessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dataset: {} rows x {} columns", self.rows, self.columns.len())?;
        for cat in &self.categories {
            let mark = if cat.is_usable() { "✓" } else { "✗" };
            write!(f, "  {} {:<13}", mark, cat.category)?;
            if cat.present.is_empty() {
                write!(f, "none")?;
            } else {
                write!(f, "{}", cat.present.join(", "))?;
            }
            if !cat.missing.is_empty() {
                write!(f, "  (missing: {})", cat.missing.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_readiness() {
        let table = Table::new(vec!["date".into(), "season".into(), "observer".into()]);
        let report = summarize_readiness(&table);

        let temporal = report.category("temporal").unwrap();
        assert_eq!(temporal.present, vec!["date", "season"]);
        assert!(temporal.missing.contains(&"year".to_string()));

        let species = report.category("species").unwrap();
        assert!(!species.is_usable());

        assert_eq!(report.categories.len(), FEATURE_CATEGORIES.len());
    }

    #[test]
    fn test_display_mentions_every_category() {
        let report = summarize_readiness(&Table::new(vec!["observer".into()]));
        let text = report.to_string();
        for (category, _) in FEATURE_CATEGORIES {
            assert!(text.contains(category));
        }
    }
}
