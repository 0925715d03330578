//! Matcher and engine configuration.
//!
//! The fuzzy tier is where false positives come from, so both of its knobs
//! (minimum token length and the generic-term stoplist) are configurable.
//! Defaults were chosen against label text like "Cordyceps Extract" and
//! "Whey Protein Isolate".

use std::collections::BTreeSet;

use labelcheck_refdata::config::env_parse;
use labelcheck_refdata::{CacheConfig, ConfigError};
use serde::{Deserialize, Serialize};

/// Tokens shorter than this never participate in fuzzy matching.
pub const DEFAULT_MIN_TOKEN_LEN: usize = 4;

/// Generic label vocabulary excluded from fuzzy matching.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "extract",
    "extracts",
    "powder",
    "powdered",
    "flavor",
    "flavors",
    "flavour",
    "flavours",
    "natural",
    "artificial",
    "organic",
    "concentrate",
    "isolate",
    "protein",
    "acid",
    "vitamin",
    "blend",
    "mixed",
    "dried",
    "whole",
    "sodium",
    "calcium",
    "potassium",
    "magnesium",
    "chloride",
    "from",
    "with",
];

/// Fuzzy-tier tuning for the [`Matcher`](crate::Matcher).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Minimum token length (in characters) a token needs to be considered.
    pub min_token_len: usize,
    /// Normalized words that are too generic to identify an ingredient.
    pub stopwords: BTreeSet<String>,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            min_token_len: DEFAULT_MIN_TOKEN_LEN,
            stopwords: DEFAULT_STOPWORDS.iter().map(|w| (*w).to_string()).collect(),
        }
    }
}

impl MatcherConfig {
    /// Load from the environment.
    ///
    /// - `LABELCHECK_FUZZY_MIN_TOKEN_LEN` (default: 4, must be > 0)
    /// - `LABELCHECK_FUZZY_STOPWORDS` (comma separated; replaces the default list)
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(len) = env_parse::<usize>("LABELCHECK_FUZZY_MIN_TOKEN_LEN")? {
            config.min_token_len = len;
        }
        if let Ok(raw) = std::env::var("LABELCHECK_FUZZY_STOPWORDS") {
            config.stopwords = parse_stopwords(&raw);
        }
        config.validate()?;
        Ok(config)
    }

    /// A zero minimum would let single characters drive fuzzy matches.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_token_len == 0 {
            return Err(ConfigError::OutOfRange {
                key: "min_token_len".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Whether a normalized token may drive a fuzzy match.
    ///
    /// A token qualifies when it is long enough, contains a letter, and is
    /// not on the stoplist.
    pub fn is_discriminating(&self, token: &str) -> bool {
        token.chars().count() >= self.min_token_len
            && token.chars().any(char::is_alphabetic)
            && !self.stopwords.contains(token)
    }
}

fn parse_stopwords(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(labelcheck_core::normalize)
        .filter(|w| !w.is_empty())
        .collect()
}

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Reference cache tuning.
    pub cache: CacheConfig,
    /// Fuzzy matching tuning.
    pub matcher: MatcherConfig,
}

impl EngineConfig {
    /// Load both halves from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            cache: CacheConfig::from_env()?,
            matcher: MatcherConfig::from_env()?,
        })
    }

    /// Validate both halves.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()?;
        self.matcher.validate()
    }
}
