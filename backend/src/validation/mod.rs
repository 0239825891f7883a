//! JSON Schema validation for cleaned observation records.
//!
//! The cleaned-record schema is embedded at compile time from
//! `schemas/cleaned-observation.json` (JSON Schema Draft 7). Every field is
//! optional since column presence depends on the exports, but a present
//! field must hold a value of the right shape: `season` is one of the five
//! labels, categorical columns are never empty strings, measures are
//! numbers, coordinates are in range.
//!
//! Validation is advisory: the pipeline counts and logs invalid records,
//! it never drops or rejects them.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use birdwatch::validation::{is_valid_cleaned_record, validate_cleaned_record};
//!
//! let record = json!({ "date": "2018-05-01", "month": 5, "season": "Spring" });
//! assert!(is_valid_cleaned_record(&record));
//!
//! let bad = json!({ "season": "Monsoon" });
//! assert!(validate_cleaned_record(&bad).is_err());
//! ```

use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationError;

const CLEANED_SCHEMA: &str = include_str!("../../schemas/cleaned-observation.json");

static CLEANED_SCHEMA_VALUE: Lazy<Result<Value, String>> =
    Lazy::new(|| serde_json::from_str(CLEANED_SCHEMA).map_err(|e| e.to_string()));

/// Validate a JSON value against a schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with one message per violation
///
/// # Example
/// ```ignore
/// use serde_json::json;
/// use birdwatch::validation::validate;
///
/// let schema = json!({
///     "type": "object",
///     "required": ["observer"],
///     "properties": { "observer": { "type": "string" } }
/// });
///
/// assert!(validate(&schema, &json!({ "observer": "Ann" })).is_ok());
/// assert!(validate(&schema, &json!({ "distance": 50 })).is_err());
/// ```
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Simpler variant: just true/false.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// The embedded cleaned-record schema.
pub fn cleaned_schema() -> Result<&'static Value, ValidationError> {
    CLEANED_SCHEMA_VALUE
        .as_ref()
        .map_err(|e| ValidationError::InvalidSchema(e.clone()))
}

/// Validate one cleaned record.
pub fn validate_cleaned_record(data: &Value) -> Result<(), ValidationError> {
    let schema = cleaned_schema()?;
    validate(schema, data).map_err(|errors| ValidationError::SchemaError { errors })
}

/// Quick check against the cleaned-record schema.
pub fn is_valid_cleaned_record(data: &Value) -> bool {
    cleaned_schema()
        .map(|schema| is_valid(schema, data))
        .unwrap_or(false)
}

// =============================================================================
// Batch validation
// =============================================================================

/// One invalid record, by position in the table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RecordError {
    pub row: usize,
    pub errors: Vec<String>,
}

/// Outcome of validating a whole dataset.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ValidationStats {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Capped at [`MAX_REPORTED_ERRORS`] entries.
    pub errors: Vec<RecordError>,
}

/// Invalid records kept in [`ValidationStats::errors`].
pub const MAX_REPORTED_ERRORS: usize = 20;

/// Validate every record against the cleaned schema, compiling it once.
pub fn validate_records(records: &[Value]) -> Result<ValidationStats, ValidationError> {
    let schema = cleaned_schema()?;
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| ValidationError::InvalidSchema(e.to_string()))?;

    let mut stats = ValidationStats {
        total: records.len(),
        ..Default::default()
    };

    for (row, record) in records.iter().enumerate() {
        if validator.is_valid(record) {
            stats.valid += 1;
            continue;
        }
        stats.invalid += 1;
        if stats.errors.len() < MAX_REPORTED_ERRORS {
            stats.errors.push(RecordError {
                row,
                errors: validator
                    .iter_errors(record)
                    .map(|e| e.to_string())
                    .collect(),
            });
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_embedded_schema_compiles() {
        let schema = cleaned_schema().unwrap();
        assert!(jsonschema::draft7::new(schema).is_ok());
    }

    #[test]
    fn test_valid_cleaned_record() {
        let record = json!({
            "date": "2018-05-01",
            "year": 2018,
            "month": 5,
            "season": "Spring",
            "observer": "Elizabeth Oswald",
            "flyover_observed": true,
            "temperature": 19.5,
            "distance": 50,
            "latitude": 38.9,
            "longitude": -77.0,
            "admin_unit_code": "ANTI"
        });
        assert!(is_valid_cleaned_record(&record));
    }

    #[test]
    fn test_absent_date_is_valid() {
        let record = json!({ "date": null, "year": null, "month": null, "season": "Unknown" });
        assert!(is_valid_cleaned_record(&record));
    }

    #[test]
    fn test_invalid_cleaned_records() {
        assert!(!is_valid_cleaned_record(&json!({ "season": "Monsoon" })));
        assert!(!is_valid_cleaned_record(&json!({ "month": 13 })));
        assert!(!is_valid_cleaned_record(&json!({ "observer": "" })));
        assert!(!is_valid_cleaned_record(&json!({ "temperature": "warm" })));
        assert!(!is_valid_cleaned_record(&json!({ "latitude": 123.0 })));
        assert!(!is_valid_cleaned_record(&json!({ "date": "05/01/2018" })));
    }

    #[test]
    fn test_validate_reports_errors() {
        let result = validate_cleaned_record(&json!({ "season": "Monsoon", "month": 0 }));
        match result {
            Err(ValidationError::SchemaError { errors }) => assert_eq!(errors.len(), 2),
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_records() {
        let records = vec![
            json!({ "season": "Winter" }),
            json!({ "season": "Monsoon" }),
            json!({ "observer": "Ann" }),
        ];
        let stats = validate_records(&records).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.valid, 2);
        assert_eq!(stats.invalid, 1);
        assert_eq!(stats.errors[0].row, 1);
    }
}
