//! # labelcheck-cli: Command-Line Front End
//!
//! Provides the `labelcheck` binary. Both subcommands load reference data
//! from a directory of per-dataset files into an in-memory store and put a
//! [`ReferenceCache`] in front of it, exactly as a long-running service
//! would.
//!
//! ```bash
//! labelcheck analyze --category supplement \
//!     --ingredients "Whey Protein Isolate, Cordyceps Extract, Vitamin D3 (as cholecalciferol)"
//! labelcheck analyze --input extracted.json --format json
//! labelcheck datasets --reference-dir data/reference
//! ```
//!
//! Exit codes: 0 success (and print-ready, for `analyze`), 1 operational
//! error, 2 report not print-ready.

pub mod analyze;
pub mod datasets;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use labelcheck_compliance::EngineConfig;
use labelcheck_refdata::{CacheConfig, InMemoryReferenceStore, ReferenceCache};

/// Reference directory used when none is given.
pub const DEFAULT_REFERENCE_DIR: &str = "data/reference";

/// Exit code for a report with blocking recommendations.
pub const EXIT_NOT_PRINT_READY: u8 = 2;

/// Load engine configuration from `path` (YAML or JSON), or from the
/// environment when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            // YAML is a superset of JSON, so one parser covers both.
            serde_yaml::from_str::<EngineConfig>(&raw)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => EngineConfig::from_env().context("invalid configuration in environment")?,
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Build a cache over the reference files in `dir`.
pub fn open_cache(dir: &Path, config: CacheConfig) -> Result<Arc<ReferenceCache>> {
    let store = InMemoryReferenceStore::from_dir(dir)
        .with_context(|| format!("failed to load reference data from {}", dir.display()))?;
    Ok(Arc::new(ReferenceCache::new(Arc::new(store), config)))
}

/// `dir`, or the default reference directory.
pub fn reference_dir(dir: Option<&Path>) -> PathBuf {
    dir.map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REFERENCE_DIR))
}
