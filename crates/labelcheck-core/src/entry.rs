//! # Reference Entries
//!
//! One canonical row of a regulatory reference dataset, as delivered by the
//! reference-data store. The engine never mutates entries; it only caches
//! snapshots of them.

use serde::{Deserialize, Serialize};

use crate::dataset::DatasetKind;
use crate::error::ValidationError;
use crate::normalize::normalize;

/// A canonical reference-dataset row.
///
/// Fields use `#[serde(default)]` where the upstream store may omit them, so
/// that a sparse row parses and is then rejected (or accepted) by
/// [`validate()`](Self::validate) rather than failing the whole page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    /// Human-readable ingredient or allergen name.
    pub canonical_name: String,
    /// Alternate names and forms. Order carries no meaning.
    #[serde(default)]
    pub synonyms: Vec<String>,
    /// Regulatory citation, possibly combining several authorities, e.g.
    /// `"21 CFR 182.8988 (gluconate), Self-affirmed GRAS (other chelated forms)"`.
    #[serde(default)]
    pub source_citation: String,
    /// Dataset this row belongs to.
    pub dataset_kind: DatasetKind,
    /// Inactive rows are retained by the store but never cached.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ReferenceEntry {
    /// Build an active entry. Convenience for stores and tests.
    pub fn new(
        dataset_kind: DatasetKind,
        canonical_name: impl Into<String>,
        synonyms: impl IntoIterator<Item = impl Into<String>>,
        source_citation: impl Into<String>,
    ) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            synonyms: synonyms.into_iter().map(Into::into).collect(),
            source_citation: source_citation.into(),
            dataset_kind,
            active: true,
        }
    }

    /// Check the per-row invariants.
    ///
    /// - The canonical name must not normalize to the empty string.
    /// - No synonym may normalize to the empty string.
    ///
    /// Uniqueness of canonical names is a dataset-level property and is
    /// enforced when a snapshot is built.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if normalize(&self.canonical_name).is_empty() {
            return Err(ValidationError::EmptyCanonicalName {
                dataset: self.dataset_kind.to_string(),
            });
        }
        for (index, synonym) in self.synonyms.iter().enumerate() {
            if normalize(synonym).is_empty() {
                return Err(ValidationError::EmptySynonym {
                    canonical_name: self.canonical_name.clone(),
                    index,
                });
            }
        }
        Ok(())
    }

    /// Citation text, or `None` when the store supplied none.
    pub fn citation(&self) -> Option<&str> {
        let trimmed = self.source_citation.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }
}
