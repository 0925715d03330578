//! # labelcheck-refdata: Reference Data Store and Cache
//!
//! Everything between the external reference-data store and the matcher:
//!
//! - [`ReferenceStore`]: the paginated read contract the store must honor.
//! - [`InMemoryReferenceStore`]: a mutable store, loadable from YAML/JSON
//!   reference files, used by the CLI and tests.
//! - [`DatasetSnapshot`]: an immutable, versioned copy of one dataset with
//!   normalized lookup maps.
//! - [`ReferenceCache`]: per-dataset TTL cache with single-flight refresh,
//!   manual invalidation, and stale-snapshot fallback.
//! - [`ReferenceAdmin`]: admin mutation helper that invalidates the cache on
//!   every write.
//!
//! ## Architecture
//!
//! ```text
//! reference store  -->  ReferenceCache  -->  Arc<DatasetSnapshot>  -->  matcher
//!   (paged reads)        (TTL, 1 refresh       (read-only, shared
//!                         in flight/dataset)     across requests)
//! ```
//!
//! The cache is an explicit service object. Construct it once at process
//! start, share it behind an `Arc`, and drop it at shutdown.

pub mod admin;
pub mod cache;
pub mod config;
pub mod error;
pub mod memory;
pub mod snapshot;
pub mod store;

pub use admin::{InvalidationSink, Mutation, ReferenceAdmin};
pub use cache::{CacheStats, ReferenceCache};
pub use config::{CacheConfig, ConfigError};
pub use error::{CacheError, RefreshError, StoreError};
pub use memory::{InMemoryReferenceStore, ReferenceFile};
pub use snapshot::DatasetSnapshot;
pub use store::{PageRequest, ReferencePage, ReferenceStore};
