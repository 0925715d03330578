#![deny(missing_docs)]

//! # labelcheck-core: Foundational Types for the Label Compliance Engine
//!
//! Every other crate in the workspace depends on `labelcheck-core`; it depends
//! on nothing internal.
//!
//! ## Design Principles
//!
//! 1. **One normalizer.** [`normalize()`] is the only text-folding path. The
//!    reference cache uses it to build lookup keys and the matcher uses it on
//!    queries, so matching is symmetric by construction.
//!
//! 2. **Closed enums for regulatory vocabulary.** [`DatasetKind`],
//!    [`ProductCategory`] and [`PanelType`] are exhaustive; adding a dataset
//!    forces every router and aggregator `match` to handle it.
//!
//! 3. **Validation at the boundary.** [`ReferenceEntry::validate()`] rejects
//!    rows that would break the snapshot invariants before they are indexed.
//!
//! 4. **Structured errors.** `thiserror` enums, no `.unwrap()` outside tests.

pub mod dataset;
pub mod digest;
pub mod entry;
pub mod error;
pub mod normalize;

pub use dataset::{DatasetKind, PanelType, ProductCategory};
pub use digest::{sha256_digest, ContentDigest};
pub use entry::ReferenceEntry;
pub use error::{CoreError, ValidationError};
pub use normalize::{normalize, tokens};
