//! # Text Normalization
//!
//! The single folding path shared by snapshot indexing and query matching.
//! Applying the same function on both sides is what makes an exact lookup
//! of `"Café Extract"` hit an entry stored as `"cafe extract"`.
//!
//! Pipeline, in order:
//!
//! 1. Unicode NFKD decomposition (compatibility forms such as `ﬁ` or `²`
//!    become their plain equivalents).
//! 2. Strip combining marks (diacritics).
//! 3. Lowercase. Lowercasing can reintroduce decomposable sequences
//!    (`İ` → `i̇`), so decomposition and mark stripping run once more.
//! 4. Replace punctuation with spaces. Hyphens separate words, so the
//!    allergen in `Whey-Derived Peptides` is a token of its own. Word-internal
//!    apostrophes are kept (`brewer's yeast`).
//! 5. Collapse whitespace and trim.
//!
//! The result is a fixed point: `normalize(normalize(x)) == normalize(x)`.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize label or reference text for matching.
///
/// Total and deterministic; never fails. Empty or punctuation-only input
/// yields an empty string.
///
/// ```
/// use labelcheck_core::normalize;
///
/// assert_eq!(normalize("  Crème   Fraîche "), "creme fraiche");
/// assert_eq!(normalize("Vitamin C (Ascorbic Acid)"), "vitamin c ascorbic acid");
/// assert_eq!(normalize("L-Selenomethionine"), "l selenomethionine");
/// ```
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect();

    let cleaned: String = folded
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            '\u{2019}' | '\u{2018}' => '\'',
            c if c.is_alphanumeric() || c == '\'' => c,
            _ => ' ',
        })
        .collect();

    cleaned
        .split_whitespace()
        .map(|word| word.trim_matches('\''))
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split already-normalized text into whole-word tokens.
pub fn tokens(normalized: &str) -> impl Iterator<Item = &str> {
    normalized.split_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_trims() {
        assert_eq!(normalize("  Caffeine  "), "caffeine");
    }

    #[test]
    fn collapses_internal_whitespace() {
        assert_eq!(normalize("coffee \t\n  extract"), "coffee extract");
    }

    #[test]
    fn strips_diacritics() {
        assert_eq!(normalize("Açaí Berry"), "acai berry");
        assert_eq!(normalize("JALAPEÑO"), "jalapeno");
    }

    #[test]
    fn folds_compatibility_forms() {
        assert_eq!(normalize("Vitamin D₃"), "vitamin d3");
        assert_eq!(normalize("ﬁber"), "fiber");
    }

    #[test]
    fn punctuation_becomes_word_boundary() {
        assert_eq!(normalize("Salt, Sugar."), "salt sugar");
        assert_eq!(normalize("Natural Flavor(s)"), "natural flavor s");
    }

    #[test]
    fn hyphen_separates_words() {
        assert_eq!(normalize("Whey-Derived Peptides"), "whey derived peptides");
        assert_eq!(normalize("Omega-3 Fatty Acids"), "omega 3 fatty acids");
        assert_eq!(normalize("Peanut--Flour"), "peanut flour");
        assert_eq!(normalize("- Whey -"), "whey");
        assert_eq!(normalize("--"), "");
    }

    #[test]
    fn keeps_word_internal_apostrophe() {
        assert_eq!(normalize("Brewer’s Yeast"), "brewer's yeast");
        assert_eq!(normalize("'quoted'"), "quoted");
    }

    #[test]
    fn empty_and_blank_inputs() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("(),;"), "");
    }

    #[test]
    fn dotted_capital_i_is_stable() {
        let once = normalize("İnulin");
        assert_eq!(once, "inulin");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn tokens_split_on_whitespace() {
        let n = normalize("Whey Protein Concentrate");
        let t: Vec<&str> = tokens(&n).collect();
        assert_eq!(t, vec!["whey", "protein", "concentrate"]);
    }

    #[test]
    fn hyphenated_compound_yields_each_word_as_token() {
        let n = normalize("Casein-Hydrolysate");
        let t: Vec<&str> = tokens(&n).collect();
        assert_eq!(t, vec!["casein", "hydrolysate"]);
    }
}
