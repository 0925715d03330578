//! # Admin Mutation Hook
//!
//! The only coupling between reference-data administration and the engine:
//! every create, update, or delete of a reference row must invalidate the
//! owning dataset in the cache. [`ReferenceAdmin`] performs the write and the
//! invalidation together so callers cannot forget the second half.

use std::sync::Arc;

use labelcheck_core::{DatasetKind, ReferenceEntry, ValidationError};

use crate::memory::InMemoryReferenceStore;

/// Receiver of "dataset changed" notifications.
pub trait InvalidationSink: Send + Sync {
    /// Mark `kind` as changed so its next read refreshes.
    fn invalidate(&self, kind: DatasetKind);
}

/// Outcome of an admin write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// A new row was added.
    Created,
    /// An existing row was replaced.
    Updated,
    /// A row was deactivated or removed.
    Deleted,
    /// Nothing matched; the cache was not touched.
    NotFound,
}

/// Admin-side writer over an [`InMemoryReferenceStore`].
pub struct ReferenceAdmin {
    store: Arc<InMemoryReferenceStore>,
    sink: Arc<dyn InvalidationSink>,
}

impl ReferenceAdmin {
    /// Pair a store with the sink to notify.
    pub fn new(store: Arc<InMemoryReferenceStore>, sink: Arc<dyn InvalidationSink>) -> Self {
        Self { store, sink }
    }

    /// Create or replace a row, then invalidate its dataset.
    ///
    /// # Errors
    ///
    /// Rejects rows that fail [`ReferenceEntry::validate`]; the store and
    /// cache are left untouched.
    pub fn upsert(&self, entry: ReferenceEntry) -> Result<Mutation, ValidationError> {
        entry.validate()?;
        let kind = entry.dataset_kind;
        let name = entry.canonical_name.clone();
        let outcome = if self.store.upsert(entry) {
            Mutation::Updated
        } else {
            Mutation::Created
        };
        tracing::info!(dataset = %kind, canonical_name = %name, ?outcome, "reference row written");
        self.sink.invalidate(kind);
        Ok(outcome)
    }

    /// Soft-delete a row (mark it inactive), then invalidate its dataset.
    pub fn deactivate(&self, kind: DatasetKind, canonical_name: &str) -> Mutation {
        if self.store.deactivate(kind, canonical_name) {
            tracing::info!(dataset = %kind, canonical_name, "reference row deactivated");
            self.sink.invalidate(kind);
            Mutation::Deleted
        } else {
            Mutation::NotFound
        }
    }

    /// Hard-delete a row, then invalidate its dataset.
    pub fn remove(&self, kind: DatasetKind, canonical_name: &str) -> Mutation {
        if self.store.remove(kind, canonical_name) {
            tracing::info!(dataset = %kind, canonical_name, "reference row removed");
            self.sink.invalidate(kind);
            Mutation::Deleted
        } else {
            Mutation::NotFound
        }
    }
}
