//! # Ingredient Matcher
//!
//! Resolves one ingredient string against one dataset snapshot in three
//! tiers, stopping at the first that matches:
//!
//! 1. **Exact**: the normalized query equals a normalized canonical name.
//! 2. **Synonym**: the normalized query equals a normalized synonym.
//! 3. **Fuzzy**: some discriminating token of an entry's names occurs as a
//!    whole word in the query.
//!
//! Fuzzy containment only runs one way. "Cordyceps Extract" matches an
//! entry named "Cordyceps" because "cordyceps" is a word of the query, but a
//! short query never matches a longer reference name. Tokens that are short,
//! numeric, or on the configured stoplist are ignored on both sides, so
//! "Shellfish Extract" and "Cordyceps Extract" do not meet through
//! "extract". When several entries qualify, the first in the snapshot's
//! canonical order wins.

use std::collections::HashSet;

use labelcheck_core::{normalize, tokens, DatasetKind, ReferenceEntry};
use labelcheck_refdata::DatasetSnapshot;
use serde::{Deserialize, Serialize};

use crate::config::MatcherConfig;

/// Tier that produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    /// Normalized canonical name equality.
    Exact,
    /// Normalized synonym equality.
    Synonym,
    /// Whole-word token containment.
    Fuzzy,
    /// Nothing matched.
    None,
}

impl MatchType {
    /// Confidence carried by a match of this type.
    pub fn confidence(self) -> Option<Confidence> {
        match self {
            Self::Exact | Self::Synonym => Some(Confidence::High),
            Self::Fuzzy => Some(Confidence::Medium),
            Self::None => None,
        }
    }
}

/// How much a match can be relied on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Confidence {
    High,
    Medium,
}

/// Outcome of matching one ingredient against one dataset.
///
/// Constructed only through [`MatchResult::hit`] and [`MatchResult::miss`],
/// so `matched` is true exactly when an entry is present and the type is
/// not [`MatchType::None`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    query_text: String,
    dataset: DatasetKind,
    matched: bool,
    matched_entry: Option<ReferenceEntry>,
    match_type: MatchType,
    confidence: Option<Confidence>,
}

impl MatchResult {
    fn hit(query_text: &str, dataset: DatasetKind, entry: &ReferenceEntry, match_type: MatchType) -> Self {
        Self {
            query_text: query_text.to_string(),
            dataset,
            matched: true,
            matched_entry: Some(entry.clone()),
            match_type,
            confidence: match_type.confidence(),
        }
    }

    fn miss(query_text: &str, dataset: DatasetKind) -> Self {
        Self {
            query_text: query_text.to_string(),
            dataset,
            matched: false,
            matched_entry: None,
            match_type: MatchType::None,
            confidence: None,
        }
    }

    /// The ingredient text as supplied.
    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    /// Dataset the query was matched against.
    pub fn dataset(&self) -> DatasetKind {
        self.dataset
    }

    /// Whether any tier matched.
    pub fn matched(&self) -> bool {
        self.matched
    }

    /// The matched entry, if any.
    pub fn matched_entry(&self) -> Option<&ReferenceEntry> {
        self.matched_entry.as_ref()
    }

    /// Tier that matched.
    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    /// `High` for exact/synonym, `Medium` for fuzzy, `None` on a miss.
    pub fn confidence(&self) -> Option<Confidence> {
        self.confidence
    }
}

/// Three-tier matcher. Stateless apart from its configuration.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
    config: MatcherConfig,
}

impl Matcher {
    /// Create a matcher with the given fuzzy-tier configuration.
    pub fn new(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Fuzzy-tier configuration.
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Match `query` against `snapshot`.
    ///
    /// Deterministic: the same query against the same snapshot always yields
    /// the same result.
    pub fn match_ingredient(&self, query: &str, snapshot: &DatasetSnapshot) -> MatchResult {
        let dataset = snapshot.kind();
        let normalized = normalize(query);
        if normalized.is_empty() {
            return MatchResult::miss(query, dataset);
        }

        let result = if let Some(entry) = snapshot.by_canonical(&normalized) {
            MatchResult::hit(query, dataset, entry, MatchType::Exact)
        } else if let Some(entry) = snapshot.by_synonym(&normalized) {
            MatchResult::hit(query, dataset, entry, MatchType::Synonym)
        } else if let Some(entry) = self.fuzzy(&normalized, snapshot) {
            MatchResult::hit(query, dataset, entry, MatchType::Fuzzy)
        } else {
            MatchResult::miss(query, dataset)
        };

        tracing::debug!(
            dataset = %dataset,
            query,
            match_type = ?result.match_type,
            matched = result.matched_entry.as_ref().map(|e| e.canonical_name.as_str()),
            "ingredient matched"
        );
        result
    }

    fn fuzzy<'s>(&self, normalized: &str, snapshot: &'s DatasetSnapshot) -> Option<&'s ReferenceEntry> {
        let query_tokens: HashSet<&str> = tokens(normalized)
            .filter(|t| self.config.is_discriminating(t))
            .collect();
        if query_tokens.is_empty() {
            return None;
        }

        snapshot
            .iter_terms()
            .find(|(_, terms)| {
                terms
                    .all()
                    .flat_map(tokens)
                    .filter(|t| self.config.is_discriminating(t))
                    .any(|t| query_tokens.contains(t))
            })
            .map(|(entry, _)| entry)
    }
}
