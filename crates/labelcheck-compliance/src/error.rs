//! Compliance engine errors.

use labelcheck_core::DatasetKind;
use labelcheck_refdata::CacheError;
use thiserror::Error;

/// Failures that abort an analysis.
///
/// Everything else (unknown ingredients, ambiguous fuzzy hits, stale
/// reference data) is reported inside the [`ComplianceReport`](crate::ComplianceReport).
#[derive(Error, Debug)]
pub enum ComplianceError {
    /// A dataset the category requires has never loaded successfully.
    #[error(transparent)]
    DataUnavailable(#[from] CacheError),
}

impl ComplianceError {
    /// Dataset whose absence aborted the analysis.
    pub fn dataset(&self) -> DatasetKind {
        match self {
            Self::DataUnavailable(err) => err.dataset(),
        }
    }
}
