//! # Error Hierarchy
//!
//! Structured error types shared by the workspace, built with `thiserror`.
//! Errors carry the offending input so that a bad reference row or an
//! unrecognized category can be diagnosed from the log line alone.

use thiserror::Error;

/// Top-level error type for core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Domain value validation failure.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors for reference rows and regulatory vocabulary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A reference entry has an empty (or whitespace-only) canonical name.
    #[error("reference entry in {dataset} has an empty canonical name")]
    EmptyCanonicalName {
        /// Dataset the row was read from.
        dataset: String,
    },

    /// A synonym normalizes to the empty string.
    #[error("reference entry \"{canonical_name}\" has an empty synonym at position {index}")]
    EmptySynonym {
        /// Canonical name of the owning entry.
        canonical_name: String,
        /// Zero-based position in the synonym list.
        index: usize,
    },

    /// A row was delivered for a different dataset than the one requested.
    #[error("reference entry \"{canonical_name}\" belongs to {actual}, expected {expected}")]
    DatasetMismatch {
        /// Canonical name of the row.
        canonical_name: String,
        /// Dataset that was being loaded.
        expected: String,
        /// Dataset declared on the row.
        actual: String,
    },

    /// Dataset name not recognized.
    #[error("unknown reference dataset: \"{0}\" (expected GRAS, NDI, ODI or ALLERGEN_DERIVATIVE)")]
    UnknownDataset(String),

    /// Product category not recognized.
    #[error("unknown product category: \"{0}\" (expected CONVENTIONAL_FOOD, NON_ALCOHOLIC_BEVERAGE, ALCOHOLIC_BEVERAGE or DIETARY_SUPPLEMENT)")]
    UnknownCategory(String),

    /// Panel type not recognized.
    #[error("unknown panel type: \"{0}\" (expected NUTRITION_FACTS or SUPPLEMENT_FACTS)")]
    UnknownPanel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_error_wraps_validation() {
        let err = CoreError::from(ValidationError::UnknownDataset("XYZ".to_string()));
        let msg = format!("{err}");
        assert!(msg.contains("validation error"));
        assert!(msg.contains("XYZ"));
    }

    #[test]
    fn empty_synonym_reports_position() {
        let err = ValidationError::EmptySynonym {
            canonical_name: "Caffeine".to_string(),
            index: 2,
        };
        let msg = format!("{err}");
        assert!(msg.contains("Caffeine"));
        assert!(msg.contains("position 2"));
    }

    #[test]
    fn dataset_mismatch_names_both_sides() {
        let err = ValidationError::DatasetMismatch {
            canonical_name: "Whey".to_string(),
            expected: "GRAS".to_string(),
            actual: "ALLERGEN_DERIVATIVE".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("GRAS"));
        assert!(msg.contains("ALLERGEN_DERIVATIVE"));
    }
}
