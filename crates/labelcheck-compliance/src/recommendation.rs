//! # Recommendations and Priority Classification
//!
//! Every non-compliant finding yields exactly one recommendation; compliant
//! findings yield one only when they carry a voluntary improvement.
//!
//! | finding | priority |
//! |---|---|
//! | VIOLATION, high-enforcement rule (allergen, prohibited claim, panel) | CRITICAL |
//! | VIOLATION, any other rule | HIGH |
//! | REQUIRES_VERIFICATION | MEDIUM |
//! | COMPLIANT, voluntary improvement | LOW |
//! | COMPLIANT, otherwise | none |
//!
//! A REQUIRES_VERIFICATION finding can never produce a blocking priority.

use std::fmt;

use labelcheck_core::DatasetKind;
use serde::{Deserialize, Serialize};

use crate::finding::{ComplianceFinding, ComplianceStatus, EnforcementRisk, RuleCategory};

/// Urgency of a recommendation. Ordered so that `Critical` is the greatest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    /// Whether a recommendation at this priority blocks printing.
    pub fn is_blocking(self) -> bool {
        matches!(self, Self::Critical | Self::High)
    }

    /// Overall report status implied by an outstanding recommendation at this priority.
    pub fn implied_status(self) -> ComplianceStatus {
        match self {
            Self::Critical | Self::High => ComplianceStatus::Violation,
            Self::Medium => ComplianceStatus::RequiresVerification,
            Self::Low => ComplianceStatus::Compliant,
        }
    }

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An actionable item derived from one or more findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Urgency.
    pub priority: Priority,
    /// Rule of the finding(s) this addresses.
    pub rule: RuleCategory,
    /// What to do.
    pub text: String,
    /// Regulation the action satisfies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulation_reference: Option<String>,
    /// Subjects of the findings this recommendation covers.
    #[serde(default)]
    pub subjects: Vec<String>,
}

impl Recommendation {
    /// Whether this recommendation addresses `finding`.
    pub fn covers(&self, finding: &ComplianceFinding) -> bool {
        self.rule == finding.rule && self.subjects.iter().any(|s| s == &finding.subject)
    }
}

/// Priority a finding with this status under this rule receives, if any.
pub fn priority_for(status: ComplianceStatus, rule: RuleCategory) -> Option<Priority> {
    match (status, rule.enforcement_risk()) {
        (ComplianceStatus::Violation, EnforcementRisk::High) => Some(Priority::Critical),
        (ComplianceStatus::Violation, _) => Some(Priority::High),
        (ComplianceStatus::RequiresVerification, _) => Some(Priority::Medium),
        (ComplianceStatus::Compliant, EnforcementRisk::Advisory) => Some(Priority::Low),
        (ComplianceStatus::Compliant, _) => None,
    }
}

/// Derive the recommendation for a finding, or `None` when nothing needs doing.
pub fn classify(finding: &ComplianceFinding) -> Option<Recommendation> {
    let priority = priority_for(finding.status, finding.rule)?;
    Some(Recommendation {
        priority,
        rule: finding.rule,
        text: finding
            .remedy
            .clone()
            .unwrap_or_else(|| default_remedy(finding)),
        regulation_reference: finding
            .citation
            .clone()
            .or_else(|| default_reference(finding).map(str::to_string)),
        subjects: vec![finding.subject.clone()],
    })
}

fn default_remedy(finding: &ComplianceFinding) -> String {
    let subject = &finding.subject;
    match (finding.rule, finding.dataset) {
        (RuleCategory::IngredientStatus, Some(DatasetKind::Gras)) => format!(
            "Verify the GRAS status of {subject} (FDA GRAS notice, food additive regulation, or \
             documented self-affirmed GRAS determination) and keep the evidence on file."
        ),
        (RuleCategory::IngredientStatus, Some(DatasetKind::Ndi | DatasetKind::Odi)) => format!(
            "Confirm {subject} was marketed as a dietary ingredient before 15 October 1994 or that \
             an NDI notification has been filed, and keep the evidence on file."
        ),
        (RuleCategory::AllergenDeclaration, _) => match &finding.matched_name {
            Some(allergen) => format!(
                "Declare {allergen} in a \"Contains\" statement or parenthetically in the ingredient \
                 list; {subject} is derived from {allergen}."
            ),
            None => format!("Review the allergen declaration for {subject}."),
        },
        (RuleCategory::ProhibitedClaim, _) => {
            format!("Remove or rephrase the claim: {subject}.")
        }
        (RuleCategory::PanelType, _) => format!("Correct the nutrition panel: {subject}."),
        (RuleCategory::IngredientOrdering, _) => format!(
            "List ingredients in descending order of predominance by weight: {subject}."
        ),
        (RuleCategory::VoluntaryImprovement, _) => format!("Consider: {subject}."),
        _ => format!("Resolve: {subject}."),
    }
}

fn default_reference(finding: &ComplianceFinding) -> Option<&'static str> {
    match (finding.rule, finding.dataset) {
        (RuleCategory::IngredientStatus, Some(DatasetKind::Gras)) => Some("21 CFR 170.30"),
        (RuleCategory::IngredientStatus, Some(DatasetKind::Ndi | DatasetKind::Odi)) => {
            Some("21 U.S.C. 350b")
        }
        (RuleCategory::AllergenDeclaration, _) => Some("21 U.S.C. 343(w)"),
        (RuleCategory::ProhibitedClaim, _) => Some("21 U.S.C. 343(r)"),
        (RuleCategory::IngredientOrdering, _) => Some("21 CFR 101.4(a)"),
        _ => None,
    }
}
