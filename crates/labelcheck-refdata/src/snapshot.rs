//! # Dataset Snapshots
//!
//! An immutable copy of one dataset's active rows plus the normalized lookup
//! maps the matcher needs. Snapshots are built off to the side and published
//! whole, so a reader holding an `Arc<DatasetSnapshot>` never observes a
//! partially indexed dataset.
//!
//! ## Canonical Order
//!
//! Entries are sorted by normalized canonical name. Every "first entry
//! wins" decision (synonym collisions at build time, ambiguous fuzzy matches
//! at query time) uses this order, so results do not depend on how the store
//! paginated.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use labelcheck_core::{normalize, sha256_digest, ContentDigest, DatasetKind, ReferenceEntry};
use labelcheck_core::ValidationError;

/// Normalized forms of one entry's names.
#[derive(Debug, Clone)]
pub struct EntryTerms {
    /// Normalized canonical name.
    pub canonical: String,
    /// Normalized synonyms, in the entry's order, empty ones removed.
    pub synonyms: Vec<String>,
}

impl EntryTerms {
    /// Canonical name followed by synonyms.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical.as_str()).chain(self.synonyms.iter().map(String::as_str))
    }
}

/// Immutable, versioned view of one reference dataset.
#[derive(Debug)]
pub struct DatasetSnapshot {
    kind: DatasetKind,
    version: u64,
    loaded_at: DateTime<Utc>,
    page_count: usize,
    digest: ContentDigest,
    rejected_rows: usize,
    entries: Vec<ReferenceEntry>,
    terms: Vec<EntryTerms>,
    canonical_index: HashMap<String, usize>,
    synonym_index: HashMap<String, usize>,
}

impl DatasetSnapshot {
    /// Build a snapshot from raw store rows.
    ///
    /// Rows are dropped (and logged) when they are inactive, belong to a
    /// different dataset, fail [`ReferenceEntry::validate`], or repeat a
    /// canonical name already present. A synonym claimed by two entries
    /// resolves to the first in canonical order.
    pub fn build(
        kind: DatasetKind,
        rows: Vec<ReferenceEntry>,
        version: u64,
        page_count: usize,
    ) -> Self {
        let mut rejected_rows = 0usize;
        let mut keyed: Vec<(String, ReferenceEntry)> = Vec::with_capacity(rows.len());

        for row in rows {
            if !row.active {
                rejected_rows += 1;
                continue;
            }
            if row.dataset_kind != kind {
                let err = ValidationError::DatasetMismatch {
                    canonical_name: row.canonical_name.clone(),
                    expected: kind.to_string(),
                    actual: row.dataset_kind.to_string(),
                };
                tracing::warn!(dataset = %kind, error = %err, "skipping reference row");
                rejected_rows += 1;
                continue;
            }
            if let Err(err) = row.validate() {
                tracing::warn!(dataset = %kind, error = %err, "skipping reference row");
                rejected_rows += 1;
                continue;
            }
            keyed.push((normalize(&row.canonical_name), row));
        }

        // Stable sort keeps store order among identical keys.
        keyed.sort_by(|(ka, _), (kb, _)| ka.cmp(kb));

        let mut entries = Vec::with_capacity(keyed.len());
        let mut terms = Vec::with_capacity(keyed.len());
        let mut canonical_index = HashMap::with_capacity(keyed.len());
        let mut synonym_index = HashMap::new();

        for (key, entry) in keyed {
            if canonical_index.contains_key(&key) {
                tracing::warn!(
                    dataset = %kind,
                    canonical_name = %entry.canonical_name,
                    "duplicate canonical name; keeping the first row"
                );
                rejected_rows += 1;
                continue;
            }
            let idx = entries.len();
            canonical_index.insert(key.clone(), idx);

            let mut synonyms = Vec::with_capacity(entry.synonyms.len());
            for synonym in &entry.synonyms {
                let norm = normalize(synonym);
                if norm.is_empty() {
                    continue;
                }
                match synonym_index.get(&norm) {
                    Some(&owner) if owner != idx => {
                        let owner_entry: &ReferenceEntry = &entries[owner];
                        tracing::warn!(
                            dataset = %kind,
                            synonym = %norm,
                            kept = %owner_entry.canonical_name,
                            dropped = %entry.canonical_name,
                            "synonym shared by several entries"
                        );
                    }
                    Some(_) => {}
                    None => {
                        synonym_index.insert(norm.clone(), idx);
                    }
                }
                synonyms.push(norm);
            }

            terms.push(EntryTerms {
                canonical: key,
                synonyms,
            });
            entries.push(entry);
        }

        let digest = digest_entries(&entries);

        Self {
            kind,
            version,
            loaded_at: Utc::now(),
            page_count,
            digest,
            rejected_rows,
            entries,
            terms,
            canonical_index,
            synonym_index,
        }
    }

    /// Dataset this snapshot covers.
    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    /// Monotonic version assigned by the cache at publication.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// When the rows were loaded.
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Number of store pages read to build this snapshot.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// SHA-256 over the entries in canonical order.
    pub fn digest(&self) -> ContentDigest {
        self.digest
    }

    /// Rows dropped while building.
    pub fn rejected_rows(&self) -> usize {
        self.rejected_rows
    }

    /// Entries in canonical order.
    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries paired with their normalized names, in canonical order.
    pub fn iter_terms(&self) -> impl Iterator<Item = (&ReferenceEntry, &EntryTerms)> {
        self.entries.iter().zip(self.terms.iter())
    }

    /// Entry whose normalized canonical name equals `normalized`.
    pub fn by_canonical(&self, normalized: &str) -> Option<&ReferenceEntry> {
        self.canonical_index
            .get(normalized)
            .map(|&idx| &self.entries[idx])
    }

    /// Entry owning the normalized synonym `normalized`.
    pub fn by_synonym(&self, normalized: &str) -> Option<&ReferenceEntry> {
        self.synonym_index
            .get(normalized)
            .map(|&idx| &self.entries[idx])
    }
}

/// Hash entries field by field with separators; synonym order is not
/// significant and is sorted first.
fn digest_entries(entries: &[ReferenceEntry]) -> ContentDigest {
    let mut buf = Vec::new();
    for entry in entries {
        let mut synonyms: Vec<&str> = entry.synonyms.iter().map(String::as_str).collect();
        synonyms.sort_unstable();
        buf.extend_from_slice(entry.dataset_kind.as_str().as_bytes());
        buf.push(0x1f);
        buf.extend_from_slice(entry.canonical_name.as_bytes());
        buf.push(0x1f);
        for synonym in synonyms {
            buf.extend_from_slice(synonym.as_bytes());
            buf.push(0x1e);
        }
        buf.push(0x1f);
        buf.extend_from_slice(entry.source_citation.as_bytes());
        buf.push(b'\n');
    }
    sha256_digest(&buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, synonyms: &[&str]) -> ReferenceEntry {
        ReferenceEntry::new(
            DatasetKind::Gras,
            name,
            synonyms.iter().copied(),
            format!("citation for {name}"),
        )
    }

    #[test]
    fn indexes_canonical_names_and_synonyms() {
        let snap = DatasetSnapshot::build(
            DatasetKind::Gras,
            vec![entry("Caffeine", &["Coffee Extract"])],
            1,
            1,
        );
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.by_canonical("caffeine").unwrap().canonical_name, "Caffeine");
        assert_eq!(snap.by_synonym("coffee extract").unwrap().canonical_name, "Caffeine");
        assert!(snap.by_canonical("coffee extract").is_none());
    }

    #[test]
    fn entries_are_sorted_canonically() {
        let snap = DatasetSnapshot::build(
            DatasetKind::Gras,
            vec![entry("Xanthan Gum", &[]), entry("acacia gum", &[]), entry("Guar Gum", &[])],
            1,
            1,
        );
        let names: Vec<&str> = snap.entries().iter().map(|e| e.canonical_name.as_str()).collect();
        assert_eq!(names, vec!["acacia gum", "Guar Gum", "Xanthan Gum"]);
    }

    #[test]
    fn invalid_inactive_and_foreign_rows_are_rejected() {
        let mut inactive = entry("Pectin", &[]);
        inactive.active = false;
        let mut foreign = entry("Whey", &[]);
        foreign.dataset_kind = DatasetKind::AllergenDerivative;
        let blank = entry("   ", &[]);

        let snap = DatasetSnapshot::build(
            DatasetKind::Gras,
            vec![entry("Caffeine", &[]), inactive, foreign, blank],
            1,
            1,
        );
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.rejected_rows(), 3);
    }

    #[test]
    fn duplicate_canonical_keeps_first_store_row() {
        let snap = DatasetSnapshot::build(
            DatasetKind::Gras,
            vec![entry("Caffeine", &["a first"]), entry("CAFFEINE", &["a second"])],
            1,
            1,
        );
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.rejected_rows(), 1);
        assert!(snap.by_synonym("a second").is_none());
    }

    #[test]
    fn shared_synonym_resolves_to_first_canonical_entry() {
        let snap = DatasetSnapshot::build(
            DatasetKind::Gras,
            vec![entry("Zinc Gluconate", &["zinc"]), entry("Zinc Citrate", &["zinc"])],
            1,
            1,
        );
        assert_eq!(snap.by_synonym("zinc").unwrap().canonical_name, "Zinc Citrate");
    }

    #[test]
    fn digest_ignores_store_and_synonym_order() {
        let a = DatasetSnapshot::build(
            DatasetKind::Gras,
            vec![entry("Caffeine", &["x", "y"]), entry("Pectin", &[])],
            1,
            1,
        );
        let b = DatasetSnapshot::build(
            DatasetKind::Gras,
            vec![entry("Pectin", &[]), entry("Caffeine", &["y", "x"])],
            2,
            3,
        );
        assert_eq!(a.digest(), b.digest());

        let c = DatasetSnapshot::build(DatasetKind::Gras, vec![entry("Pectin", &[])], 3, 1);
        assert_ne!(a.digest(), c.digest());
    }

    #[test]
    fn terms_include_canonical_then_synonyms() {
        let snap = DatasetSnapshot::build(
            DatasetKind::Gras,
            vec![entry("Caffeine", &["Coffee Extract", "Guaraná"])],
            1,
            1,
        );
        let (_, terms) = snap.iter_terms().next().unwrap();
        let all: Vec<&str> = terms.all().collect();
        assert_eq!(all, vec!["caffeine", "coffee extract", "guarana"]);
    }
}
