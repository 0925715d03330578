//! # In-Memory Reference Store
//!
//! A mutable [`ReferenceStore`] backed by per-dataset vectors. It paginates
//! with offset tokens over the active rows in insertion order, which is
//! stable as long as no mutation happens mid-read.
//!
//! Reference files are loaded from a directory holding one file per dataset:
//!
//! ```text
//! reference/
//!   gras.yaml        # or gras.yml / gras.json
//!   ndi.yaml
//!   odi.yaml
//!   allergens.yaml
//! ```
//!
//! ```yaml
//! dataset: GRAS
//! entries:
//!   - canonical_name: Caffeine
//!     synonyms: [coffee extract]
//!     source_citation: 21 CFR 182.1180
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use labelcheck_core::{normalize, DatasetKind, ReferenceEntry};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::{PageRequest, ReferencePage, ReferenceStore};

/// On-disk layout of one reference file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceFile {
    /// Dataset every row in the file belongs to.
    pub dataset: DatasetKind,
    /// Rows, without a per-row dataset field.
    #[serde(default)]
    pub entries: Vec<ReferenceFileRow>,
}

/// One row of a [`ReferenceFile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceFileRow {
    pub canonical_name: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub source_citation: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl ReferenceFile {
    /// Convert the rows into typed entries tagged with the file's dataset.
    pub fn into_entries(self) -> Vec<ReferenceEntry> {
        let dataset = self.dataset;
        self.entries
            .into_iter()
            .map(|row| ReferenceEntry {
                canonical_name: row.canonical_name,
                synonyms: row.synonyms,
                source_citation: row.source_citation,
                dataset_kind: dataset,
                active: row.active,
            })
            .collect()
    }
}

/// Thread-safe in-memory store.
#[derive(Debug, Default)]
pub struct InMemoryReferenceStore {
    datasets: RwLock<BTreeMap<DatasetKind, Vec<ReferenceEntry>>>,
}

impl InMemoryReferenceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `entries`, each filed under its own dataset.
    pub fn with_entries(entries: impl IntoIterator<Item = ReferenceEntry>) -> Self {
        let store = Self::new();
        store.extend(entries);
        store
    }

    /// Append rows without deduplication, preserving their order.
    pub fn extend(&self, entries: impl IntoIterator<Item = ReferenceEntry>) {
        let mut datasets = self.datasets.write();
        for entry in entries {
            datasets.entry(entry.dataset_kind).or_default().push(entry);
        }
    }

    /// Insert or replace the row with the same normalized canonical name.
    ///
    /// Returns `true` if an existing row was replaced.
    pub fn upsert(&self, entry: ReferenceEntry) -> bool {
        let key = normalize(&entry.canonical_name);
        let mut datasets = self.datasets.write();
        let rows = datasets.entry(entry.dataset_kind).or_default();
        match rows
            .iter_mut()
            .find(|row| normalize(&row.canonical_name) == key)
        {
            Some(existing) => {
                *existing = entry;
                true
            }
            None => {
                rows.push(entry);
                false
            }
        }
    }

    /// Mark the named row inactive. Returns `false` if no such row exists.
    pub fn deactivate(&self, kind: DatasetKind, canonical_name: &str) -> bool {
        let key = normalize(canonical_name);
        let mut datasets = self.datasets.write();
        datasets
            .get_mut(&kind)
            .and_then(|rows| {
                rows.iter_mut()
                    .find(|row| normalize(&row.canonical_name) == key)
            })
            .map(|row| row.active = false)
            .is_some()
    }

    /// Remove the named row entirely. Returns `false` if no such row exists.
    pub fn remove(&self, kind: DatasetKind, canonical_name: &str) -> bool {
        let key = normalize(canonical_name);
        let mut datasets = self.datasets.write();
        match datasets.get_mut(&kind) {
            Some(rows) => {
                let before = rows.len();
                rows.retain(|row| normalize(&row.canonical_name) != key);
                rows.len() != before
            }
            None => false,
        }
    }

    /// Number of active rows in `kind`.
    pub fn active_count(&self, kind: DatasetKind) -> usize {
        self.datasets
            .read()
            .get(&kind)
            .map(|rows| rows.iter().filter(|row| row.active).count())
            .unwrap_or(0)
    }

    /// Load every dataset file found in `dir`.
    ///
    /// A dataset without a file is left empty and logged; the cache will
    /// then publish an empty snapshot for it.
    pub fn from_dir(dir: &Path) -> Result<Self, StoreError> {
        let store = Self::new();
        for kind in DatasetKind::all() {
            match find_dataset_file(dir, *kind) {
                Some(path) => {
                    let file = read_reference_file(&path)?;
                    if file.dataset != *kind {
                        tracing::warn!(
                            path = %path.display(),
                            declared = %file.dataset,
                            expected = %kind,
                            "reference file declares a different dataset than its name"
                        );
                    }
                    let entries = file.into_entries();
                    tracing::debug!(
                        path = %path.display(),
                        rows = entries.len(),
                        "loaded reference file"
                    );
                    store.extend(entries);
                }
                None => {
                    tracing::warn!(
                        dir = %dir.display(),
                        dataset = %kind,
                        "no reference file for dataset"
                    );
                }
            }
        }
        Ok(store)
    }
}

impl ReferenceStore for InMemoryReferenceStore {
    fn list_active(
        &self,
        kind: DatasetKind,
        request: &PageRequest,
    ) -> Result<ReferencePage, StoreError> {
        let datasets = self.datasets.read();
        let active: Vec<&ReferenceEntry> = datasets
            .get(&kind)
            .map(|rows| rows.iter().filter(|row| row.active).collect())
            .unwrap_or_default();

        let offset = match &request.page_token {
            None => 0,
            Some(token) => token
                .parse::<usize>()
                .ok()
                .filter(|offset| *offset <= active.len())
                .ok_or_else(|| StoreError::InvalidPageToken {
                    token: token.clone(),
                })?,
        };

        let end = offset
            .saturating_add(request.page_size.max(1))
            .min(active.len());
        let entries = active[offset..end].iter().map(|e| (*e).clone()).collect();
        let next_page_token = (end < active.len()).then(|| end.to_string());

        Ok(ReferencePage {
            entries,
            next_page_token,
        })
    }
}

fn find_dataset_file(dir: &Path, kind: DatasetKind) -> Option<PathBuf> {
    ["yaml", "yml", "json"]
        .iter()
        .map(|ext| dir.join(format!("{}.{ext}", kind.file_stem())))
        .find(|path| path.is_file())
}

/// Parse a reference file, choosing YAML or JSON by extension.
pub fn read_reference_file(path: &Path) -> Result<ReferenceFile, StoreError> {
    let raw = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&raw).map_err(|source| StoreError::JsonParse {
            path: path.to_path_buf(),
            source,
        })
    } else {
        serde_yaml::from_str(&raw).map_err(|source| StoreError::YamlParse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gras(name: &str) -> ReferenceEntry {
        ReferenceEntry::new(DatasetKind::Gras, name, Vec::<String>::new(), "21 CFR 182")
    }

    fn read_all(store: &InMemoryReferenceStore, kind: DatasetKind, page_size: usize) -> Vec<String> {
        let mut names = Vec::new();
        let mut request = PageRequest::first(page_size);
        loop {
            let page = store.list_active(kind, &request).unwrap();
            names.extend(page.entries.into_iter().map(|e| e.canonical_name));
            match page.next_page_token {
                Some(token) => request.page_token = Some(token),
                None => break,
            }
        }
        names
    }

    #[test]
    fn paginates_in_insertion_order() {
        let store = InMemoryReferenceStore::with_entries((0..7).map(|i| gras(&format!("Item {i}"))));
        let first = store
            .list_active(DatasetKind::Gras, &PageRequest::first(3))
            .unwrap();
        assert_eq!(first.entries.len(), 3);
        assert_eq!(first.next_page_token.as_deref(), Some("3"));

        let names = read_all(&store, DatasetKind::Gras, 3);
        assert_eq!(names.len(), 7);
        assert_eq!(names[0], "Item 0");
        assert_eq!(names[6], "Item 6");
    }

    #[test]
    fn exact_multiple_of_page_size_ends_without_token() {
        let store = InMemoryReferenceStore::with_entries((0..4).map(|i| gras(&format!("Item {i}"))));
        let second = store
            .list_active(
                DatasetKind::Gras,
                &PageRequest {
                    page_size: 2,
                    page_token: Some("2".into()),
                },
            )
            .unwrap();
        assert_eq!(second.entries.len(), 2);
        assert!(second.next_page_token.is_none());
    }

    #[test]
    fn inactive_rows_are_not_listed() {
        let store = InMemoryReferenceStore::with_entries([gras("Caffeine"), gras("Guar Gum")]);
        assert!(store.deactivate(DatasetKind::Gras, "caffeine"));
        assert_eq!(read_all(&store, DatasetKind::Gras, 10), vec!["Guar Gum"]);
        assert_eq!(store.active_count(DatasetKind::Gras), 1);
    }

    #[test]
    fn unknown_dataset_is_empty() {
        let store = InMemoryReferenceStore::new();
        let page = store
            .list_active(DatasetKind::Odi, &PageRequest::first(10))
            .unwrap();
        assert!(page.entries.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[test]
    fn bad_token_rejected() {
        let store = InMemoryReferenceStore::with_entries([gras("Caffeine")]);
        let result = store.list_active(
            DatasetKind::Gras,
            &PageRequest {
                page_size: 10,
                page_token: Some("not-a-number".into()),
            },
        );
        assert!(matches!(result, Err(StoreError::InvalidPageToken { .. })));
    }

    #[test]
    fn upsert_replaces_by_normalized_name() {
        let store = InMemoryReferenceStore::with_entries([gras("Caffeine")]);
        let mut updated = gras("CAFFEINE");
        updated.synonyms.push("guaranine".into());
        assert!(store.upsert(updated));
        assert!(!store.upsert(gras("Pectin")));
        assert_eq!(store.active_count(DatasetKind::Gras), 2);
    }

    #[test]
    fn remove_deletes_row() {
        let store = InMemoryReferenceStore::with_entries([gras("Caffeine")]);
        assert!(store.remove(DatasetKind::Gras, "Caffeine"));
        assert!(!store.remove(DatasetKind::Gras, "Caffeine"));
        assert_eq!(store.active_count(DatasetKind::Gras), 0);
    }

    #[test]
    fn loads_yaml_and_json_files_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("gras.yaml"),
            "dataset: GRAS\nentries:\n  - canonical_name: Caffeine\n    synonyms: [coffee extract]\n    source_citation: 21 CFR 182.1180\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("allergens.json"),
            r#"{"dataset":"ALLERGEN_DERIVATIVE","entries":[{"canonical_name":"Milk","synonyms":["whey","casein"]}]}"#,
        )
        .unwrap();

        let store = InMemoryReferenceStore::from_dir(dir.path()).unwrap();
        assert_eq!(store.active_count(DatasetKind::Gras), 1);
        assert_eq!(store.active_count(DatasetKind::AllergenDerivative), 1);
        assert_eq!(store.active_count(DatasetKind::Ndi), 0);
    }

    #[test]
    fn malformed_yaml_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ndi.yaml"), "dataset: [unclosed").unwrap();
        let err = InMemoryReferenceStore::from_dir(dir.path()).unwrap_err();
        assert!(format!("{err}").contains("ndi.yaml"));
    }
}
