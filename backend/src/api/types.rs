//! REST API request and response types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::insights::filters::{DateRange, FilterCriteria};
use crate::insights::lenses::Lens;
use crate::transform::pipeline::CleanReport;
use crate::transform::temporal::parse_date;

/// Response of `POST /api/clean`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanResponse {
    /// "ready", or "warning" when some source was skipped or some record
    /// failed validation.
    pub status: String,
    /// Where the cleaned dataset was written.
    pub output: String,
    pub report: CleanReport,
}

impl CleanResponse {
    pub fn new(report: CleanReport, output: String) -> Self {
        let invalid = report.validation.as_ref().map_or(0, |v| v.invalid);
        let status = if report.skipped.is_empty() && invalid == 0 {
            "ready"
        } else {
            "warning"
        };
        Self {
            status: status.to_string(),
            output,
            report,
        }
    }
}

/// Entry of `GET /api/lenses`.
#[derive(Debug, Clone, Serialize)]
pub struct LensInfo {
    pub name: &'static str,
    pub title: &'static str,
}

impl From<Lens> for LensInfo {
    fn from(lens: Lens) -> Self {
        Self {
            name: lens.as_str(),
            title: lens.title(),
        }
    }
}

/// Query string of `GET /api/lenses/{lens}`.
///
/// Dates accept the same formats as the cleaning run; `species` and
/// `observer` are comma-separated lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LensQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub species: Option<String>,
    pub observer: Option<String>,
}

impl LensQuery {
    pub fn to_criteria(&self) -> Result<FilterCriteria, String> {
        let start = parse_bound("start", self.start.as_deref())?;
        let end = parse_bound("end", self.end.as_deref())?;

        let mut criteria = FilterCriteria::new();
        if start.is_some() || end.is_some() {
            criteria = criteria.with_date_range(DateRange::new(start, end));
        }
        if let Some(species) = &self.species {
            criteria = criteria.with_species(split_list(species));
        }
        if let Some(observer) = &self.observer {
            criteria = criteria.with_observer(split_list(observer));
        }
        Ok(criteria)
    }
}

fn parse_bound(name: &str, raw: Option<&str>) -> Result<Option<chrono::NaiveDate>, String> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_date(s)
            .map(Some)
            .ok_or_else(|| format!("Invalid {} date: '{}'", name, s)),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Create an error response
pub fn error_response(error: &str) -> Value {
    json!({
        "status": "error",
        "error": error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_query_to_criteria() {
        let query = LensQuery {
            start: Some("2018-05-01".into()),
            end: None,
            species: Some("BCCH, NOCA,".into()),
            observer: None,
        };
        let criteria = query.to_criteria().unwrap();

        assert_eq!(
            criteria.date_range,
            Some(DateRange::new(NaiveDate::from_ymd_opt(2018, 5, 1), None))
        );
        let species: Vec<&str> = criteria.selections["taxoncode"].iter().map(String::as_str).collect();
        assert_eq!(species, vec!["BCCH", "NOCA"]);
        assert!(!criteria.selections.contains_key("observer"));
    }

    #[test]
    fn test_empty_query_is_identity() {
        assert!(LensQuery::default().to_criteria().unwrap().is_empty());
    }

    #[test]
    fn test_bad_date_rejected() {
        let query = LensQuery {
            end: Some("someday".into()),
            ..Default::default()
        };
        assert!(query.to_criteria().unwrap_err().contains("end"));
    }

    #[test]
    fn test_error_response() {
        let value = error_response("boom");
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "boom");
    }
}
