//! Reference-data error types.
//!
//! Only [`CacheError::DataUnavailable`] ever reaches the caller of an
//! analysis. Store and paging failures that happen while a previous snapshot
//! exists are logged and absorbed by the cache.

use std::path::PathBuf;

use labelcheck_core::DatasetKind;
use thiserror::Error;

/// Errors raised by a [`ReferenceStore`](crate::ReferenceStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or refused the read.
    #[error("reference store unavailable: {0}")]
    Unavailable(String),

    /// The page token was not issued by this store.
    #[error("invalid page token {token:?}")]
    InvalidPageToken { token: String },

    /// A reference file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A YAML reference file failed to parse.
    #[error("failed to parse YAML at {path}: {source}")]
    YamlParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// A JSON reference file failed to parse.
    #[error("failed to parse JSON at {path}: {source}")]
    JsonParse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Why a bulk load did not produce a snapshot.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// A page read failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The store kept returning full pages past the configured limit.
    #[error("pagination exceeded {max_pages} pages")]
    PageLimitExceeded { max_pages: usize },

    /// The store handed back a page token it had already issued.
    #[error("store repeated page token {token:?}")]
    RepeatedPageToken { token: String },
}

/// Errors surfaced by the [`ReferenceCache`](crate::ReferenceCache).
#[derive(Debug, Error)]
pub enum CacheError {
    /// No snapshot of this dataset has ever loaded successfully.
    #[error("reference data unavailable for {dataset}: {source}")]
    DataUnavailable {
        dataset: DatasetKind,
        #[source]
        source: RefreshError,
    },
}

impl CacheError {
    /// Dataset the failure concerns.
    pub fn dataset(&self) -> DatasetKind {
        match self {
            Self::DataUnavailable { dataset, .. } => *dataset,
        }
    }
}
