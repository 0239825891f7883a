//! Column rules for imputation.
//!
//! The cleaned schema is sparse: any known column may be missing from a
//! given export. Instead of guarding each column by hand, the imputer walks a
//! [`RuleSet`] and applies each rule to its column when that column exists.
//! Supporting a new field means adding a row to one of the tables below.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Fill value for absent categorical cells.
pub const UNKNOWN: &str = "Unknown";

/// How one column is imputed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRule {
    /// Absent → `"Unknown"`.
    Categorical,

    /// Coerce to a number (failures become absent), then absent → column median.
    Median,

    /// Take the first run of digits of the cell's text, then absent → median
    /// of the extracted values.
    DigitRunMedian,
}

impl ColumnRule {
    pub fn description(&self) -> &'static str {
        match self {
            ColumnRule::Categorical => "absent → \"Unknown\"",
            ColumnRule::Median => "coerce to number, absent → column median",
            ColumnRule::DigitRunMedian => "first digit run, absent → median of extracted values",
        }
    }
}

const STANDARD_RULES: &[(&str, ColumnRule)] = &[
    ("ecosystem", ColumnRule::Categorical),
    ("location_type", ColumnRule::Categorical),
    ("pif_watchlist_status", ColumnRule::Categorical),
    ("observer", ColumnRule::Categorical),
    ("flyover", ColumnRule::Categorical),
    ("temperature", ColumnRule::Median),
    ("humidity", ColumnRule::Median),
    ("distance", ColumnRule::DigitRunMedian),
    ("latitude", ColumnRule::Median),
    ("longitude", ColumnRule::Median),
];

const EXTENDED_RULES: &[(&str, ColumnRule)] = &[
    ("sky", ColumnRule::Categorical),
    ("wind", ColumnRule::Categorical),
    ("disturbance", ColumnRule::Categorical),
    ("id_method", ColumnRule::Categorical),
    ("flyover_observed", ColumnRule::Categorical),
    ("sex", ColumnRule::Categorical),
    ("interval_length", ColumnRule::Median),
];

/// Ordered list of `(column, rule)` pairs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleSet {
    rules: Vec<(String, ColumnRule)>,
}

impl RuleSet {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Columns every export is expected to carry.
    pub fn standard() -> Self {
        Self::empty().with_rules(STANDARD_RULES)
    }

    /// Standard columns plus field-condition and method columns.
    pub fn extended() -> Self {
        Self::standard().with_rules(EXTENDED_RULES)
    }

    pub fn for_options(extended: bool) -> Self {
        if extended {
            Self::extended()
        } else {
            Self::standard()
        }
    }

    /// Add or replace the rule for one column.
    pub fn with_rule(mut self, column: &str, rule: ColumnRule) -> Self {
        let column = column.trim().to_lowercase();
        match self.rules.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = rule,
            None => self.rules.push((column, rule)),
        }
        self
    }

    fn with_rules(self, rules: &[(&str, ColumnRule)]) -> Self {
        rules.iter().fold(self, |set, (c, r)| set.with_rule(c, *r))
    }

    pub fn rule_for(&self, column: &str) -> Option<ColumnRule> {
        self.rules.iter().find(|(c, _)| c == column).map(|(_, r)| *r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnRule)> {
        self.rules.iter().map(|(c, r)| (c.as_str(), *r))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Human-readable table of the rules, for the CLI.
    pub fn describe(&self) -> String {
        let width = self.rules.iter().map(|(c, _)| c.len()).max().unwrap_or(0);
        let mut out = String::new();
        for (column, rule) in &self.rules {
            let _ = writeln!(out, "  {:width$}  {}", column, rule.description(), width = width);
        }
        out
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}
