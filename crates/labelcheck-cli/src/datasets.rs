//! # Datasets Subcommand
//!
//! Loads every reference dataset through the cache and prints what was
//! published: entry counts, snapshot versions, content digests, pages read,
//! and rows rejected at the boundary.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use labelcheck_core::DatasetKind;
use labelcheck_refdata::DatasetSnapshot;
use serde::Serialize;

use crate::analyze::OutputFormat;

/// Arguments for `labelcheck datasets`.
#[derive(Args, Debug)]
pub struct DatasetsArgs {
    /// Directory holding gras/ndi/odi/allergens reference files.
    #[arg(long, value_name = "DIR")]
    pub reference_dir: Option<PathBuf>,

    /// Restrict to one dataset (gras, ndi, odi, allergens).
    #[arg(long)]
    pub dataset: Option<DatasetKind>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// One dataset's load outcome.
#[derive(Debug, Serialize)]
pub struct DatasetSummary {
    pub dataset: DatasetKind,
    pub entries: usize,
    pub version: u64,
    pub digest: String,
    pub pages: usize,
    pub rejected_rows: usize,
    pub loaded_at: String,
}

impl From<&DatasetSnapshot> for DatasetSummary {
    fn from(snapshot: &DatasetSnapshot) -> Self {
        Self {
            dataset: snapshot.kind(),
            entries: snapshot.len(),
            version: snapshot.version(),
            digest: snapshot.digest().to_string(),
            pages: snapshot.page_count(),
            rejected_rows: snapshot.rejected_rows(),
            loaded_at: snapshot.loaded_at().to_rfc3339(),
        }
    }
}

/// Execute the datasets subcommand.
///
/// Returns 1 if any requested dataset could not be loaded.
pub fn run_datasets(args: &DatasetsArgs, config: &labelcheck_compliance::EngineConfig) -> Result<u8> {
    let dir = crate::reference_dir(args.reference_dir.as_deref());
    let cache = crate::open_cache(&dir, config.cache.clone())?;

    let kinds: Vec<DatasetKind> = match args.dataset {
        Some(kind) => vec![kind],
        None => DatasetKind::all().to_vec(),
    };

    let mut summaries = Vec::with_capacity(kinds.len());
    let mut failed = false;
    for kind in kinds {
        match cache.get(kind) {
            Ok(snapshot) => summaries.push(DatasetSummary::from(snapshot.as_ref())),
            Err(e) => {
                tracing::error!(dataset = %kind, error = %e, "dataset unavailable");
                failed = true;
            }
        }
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summaries)?),
        OutputFormat::Text => {
            println!(
                "{:<20} {:>8} {:>8} {:>6} {:>9}  digest",
                "dataset", "entries", "version", "pages", "rejected"
            );
            for s in &summaries {
                println!(
                    "{:<20} {:>8} {:>8} {:>6} {:>9}  {}",
                    s.dataset.as_str(),
                    s.entries,
                    s.version,
                    s.pages,
                    s.rejected_rows,
                    s.digest
                );
            }
        }
    }

    Ok(u8::from(failed))
}
