//! # Compliance Findings
//!
//! A finding is the compliance conclusion for one subject (an ingredient,
//! the nutrition panel, or an upstream label issue). Findings carry the
//! rule they were judged under; the rule's enforcement risk later decides
//! how urgent the resulting recommendation is.

use std::fmt;

use labelcheck_core::DatasetKind;
use serde::{Deserialize, Serialize};

use crate::matcher::MatchType;

/// Outcome of a compliance check.
///
/// Ordered by severity, so `max()` over a set of statuses gives the worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceStatus {
    /// No action required.
    Compliant,
    /// Status could not be confirmed from the reference data; a human must check.
    RequiresVerification,
    /// A regulatory requirement is not met.
    Violation,
}

impl ComplianceStatus {
    /// Worst status among `statuses`, `Compliant` when empty.
    pub fn worst(statuses: impl IntoIterator<Item = ComplianceStatus>) -> ComplianceStatus {
        statuses.into_iter().max().unwrap_or(ComplianceStatus::Compliant)
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compliant => "COMPLIANT",
            Self::RequiresVerification => "REQUIRES_VERIFICATION",
            Self::Violation => "VIOLATION",
        }
    }
}

impl fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How likely regulators are to act on a violation of a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnforcementRisk {
    /// Recall or warning-letter territory.
    High,
    /// Real but rarely enforced on its own.
    Low,
    /// Not a requirement at all.
    Advisory,
}

/// Regulatory rule a finding was judged under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleCategory {
    /// Ingredient regulatory status (GRAS, NDI, ODI listing).
    IngredientStatus,
    /// Major food allergen declaration (FALCPA).
    AllergenDeclaration,
    /// Disease or drug claims on a food or supplement.
    ProhibitedClaim,
    /// Nutrition Facts vs Supplement Facts.
    PanelType,
    /// Ingredients listed in descending order by weight.
    IngredientOrdering,
    /// Other mandatory labeling elements.
    GeneralLabeling,
    /// Best practice, not a requirement.
    VoluntaryImprovement,
}

impl RuleCategory {
    /// Enforcement risk of violating this rule.
    pub fn enforcement_risk(self) -> EnforcementRisk {
        match self {
            Self::AllergenDeclaration | Self::ProhibitedClaim | Self::PanelType => EnforcementRisk::High,
            Self::IngredientStatus | Self::IngredientOrdering | Self::GeneralLabeling => EnforcementRisk::Low,
            Self::VoluntaryImprovement => EnforcementRisk::Advisory,
        }
    }
}

/// The compliance conclusion for one subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceFinding {
    /// What was judged: ingredient text, panel title, or issue summary.
    ///
    /// For dataset findings this is the ingredient exactly as listed on the
    /// label; [`ingredient()`](Self::ingredient) returns it only for those.
    pub subject: String,
    /// Outcome.
    pub status: ComplianceStatus,
    /// Rule judged under.
    pub rule: RuleCategory,
    /// Why this status was assigned.
    pub rationale: String,
    /// Regulatory citation, taken from the matched entry when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<String>,
    /// Dataset that produced the finding, for ingredient findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<DatasetKind>,
    /// Matching tier, for ingredient findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_type: Option<MatchType>,
    /// Canonical name of the matched entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_name: Option<String>,
    /// Specific fix, when the producer knows one better than the rule default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remedy: Option<String>,
}

impl ComplianceFinding {
    /// A finding that did not come from a dataset lookup.
    pub fn new(
        subject: impl Into<String>,
        status: ComplianceStatus,
        rule: RuleCategory,
        rationale: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            status,
            rule,
            rationale: rationale.into(),
            citation: None,
            dataset: None,
            match_type: None,
            matched_name: None,
            remedy: None,
        }
    }

    /// Attach a citation.
    pub fn with_citation(mut self, citation: Option<impl Into<String>>) -> Self {
        self.citation = citation.map(Into::into);
        self
    }

    /// Attach a specific fix.
    pub fn with_remedy(mut self, remedy: Option<impl Into<String>>) -> Self {
        self.remedy = remedy.map(Into::into);
        self
    }

    /// The label ingredient this finding judges, or `None` for panel and
    /// label-issue findings.
    pub fn ingredient(&self) -> Option<&str> {
        self.dataset.map(|_| self.subject.as_str())
    }
}

/// A labeling problem already detected upstream (e.g. by the label-reading
/// model) and passed in with the ingredient list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelIssue {
    /// Rule the issue falls under.
    pub rule: RuleCategory,
    /// What is wrong.
    pub description: String,
    /// Suggested fix, if the upstream step produced one.
    #[serde(default)]
    pub recommendation: Option<String>,
    /// Regulatory citation.
    #[serde(default)]
    pub citation: Option<String>,
}
