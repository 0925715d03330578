//! # Reference Store Contract
//!
//! The engine reads reference rows through one paginated call. The store must
//! paginate stably: the same dataset contents yield the same page boundaries,
//! and a page token is only meaningful to the store that issued it.

use labelcheck_core::{DatasetKind, ReferenceEntry};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Parameters for one page read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum rows the store should return.
    pub page_size: usize,
    /// Token from the previous page, `None` for the first page.
    pub page_token: Option<String>,
}

impl PageRequest {
    /// The first page of a read.
    pub fn first(page_size: usize) -> Self {
        Self {
            page_size,
            page_token: None,
        }
    }
}

/// One page of active reference rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferencePage {
    /// Rows on this page.
    pub entries: Vec<ReferenceEntry>,
    /// Token for the next page; `None` when this is the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Read access to the external reference-data store.
///
/// Implementations must be safe to call from several threads; the cache
/// guarantees at most one bulk read per dataset is in flight at a time.
pub trait ReferenceStore: Send + Sync {
    /// Return one page of active rows for `kind`.
    fn list_active(
        &self,
        kind: DatasetKind,
        request: &PageRequest,
    ) -> Result<ReferencePage, StoreError>;
}
