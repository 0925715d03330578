//! # Compliance Aggregator
//!
//! Turns match results into findings, one per distinct ingredient per
//! section, and findings into recommendations. This is the only place
//! statuses and priorities are assigned.
//!
//! | section | match | no match |
//! |---|---|---|
//! | GRAS | COMPLIANT | REQUIRES_VERIFICATION |
//! | NDI, then ODI | COMPLIANT | REQUIRES_VERIFICATION |
//! | Allergens | VIOLATION, or COMPLIANT when a declaration is present | COMPLIANT |
//!
//! Absence from GRAS, NDI or ODI is never a violation: those lists are not
//! exhaustive, so a miss only means a human has to check.

use std::collections::HashSet;
use std::sync::Arc;

use labelcheck_core::{normalize, DatasetKind, PanelType, ProductCategory};
use labelcheck_refdata::DatasetSnapshot;

use crate::finding::{ComplianceFinding, ComplianceStatus, LabelIssue, RuleCategory};
use crate::matcher::{MatchResult, MatchType, Matcher};
use crate::recommendation::{classify, Recommendation};
use crate::report::{DatasetReport, ReportSection, SnapshotRef};
use crate::router::expected_panel;

/// Builds section reports from ingredients, snapshots and label facts.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    matcher: Matcher,
}

impl Aggregator {
    pub fn new(matcher: Matcher) -> Self {
        Self { matcher }
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    /// Screen every distinct ingredient against a section's snapshots.
    ///
    /// `snapshots` must be in the section's screening order. Within a
    /// section the first snapshot that matches decides the finding.
    pub fn screen_section(
        &self,
        section: ReportSection,
        snapshots: &[Arc<DatasetSnapshot>],
        ingredients: &[String],
        allergen_declaration_present: bool,
    ) -> DatasetReport {
        let findings = distinct_ingredients(ingredients)
            .into_iter()
            .filter_map(|ingredient| {
                let result = self.first_match(ingredient, snapshots)?;
                Some(ingredient_finding(&result, allergen_declaration_present))
            })
            .collect();
        let refs = snapshots.iter().map(|s| SnapshotRef::from(s.as_ref())).collect();
        DatasetReport::new(section, refs, findings)
    }

    /// Panel check plus upstream label issues.
    pub fn labeling_section(
        &self,
        category: ProductCategory,
        detected_panel: Option<PanelType>,
        issues: &[LabelIssue],
    ) -> DatasetReport {
        let mut findings = Vec::with_capacity(issues.len() + 1);
        if let Some(found) = detected_panel {
            findings.push(panel_finding(category, found));
        }
        findings.extend(issues.iter().map(issue_finding));
        DatasetReport::new(ReportSection::Labeling, Vec::new(), findings)
    }

    /// One recommendation per actionable finding, in section order.
    pub fn recommendations(sections: &[DatasetReport]) -> Vec<Recommendation> {
        sections
            .iter()
            .flat_map(|s| s.findings.iter())
            .filter_map(classify)
            .collect()
    }

    /// First matching result across `snapshots`, or the last miss.
    fn first_match(&self, ingredient: &str, snapshots: &[Arc<DatasetSnapshot>]) -> Option<MatchResult> {
        let mut last = None;
        for snapshot in snapshots {
            let result = self.matcher.match_ingredient(ingredient, snapshot);
            if result.matched() {
                return Some(result);
            }
            last = Some(result);
        }
        last
    }
}

/// Ingredients with blanks removed and case/spacing duplicates collapsed,
/// first spelling kept.
fn distinct_ingredients(ingredients: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    ingredients
        .iter()
        .map(|s| s.trim())
        .filter(|s| {
            let key = normalize(s);
            !key.is_empty() && seen.insert(key)
        })
        .collect()
}

fn ingredient_finding(result: &MatchResult, allergen_declaration_present: bool) -> ComplianceFinding {
    let dataset = result.dataset();
    let rule = match dataset {
        DatasetKind::AllergenDerivative => RuleCategory::AllergenDeclaration,
        DatasetKind::Gras | DatasetKind::Ndi | DatasetKind::Odi => RuleCategory::IngredientStatus,
    };

    let (status, rationale) = match (result.matched_entry(), dataset) {
        (Some(entry), DatasetKind::AllergenDerivative) if allergen_declaration_present => (
            ComplianceStatus::Compliant,
            format!(
                "Derived from {}; the label carries an allergen declaration.",
                entry.canonical_name
            ),
        ),
        (Some(entry), DatasetKind::AllergenDerivative) => (
            ComplianceStatus::Violation,
            format!(
                "Derived from {}, a major food allergen, and the label has no allergen declaration.",
                entry.canonical_name
            ),
        ),
        (Some(entry), _) => {
            let mut rationale = format!("Listed on the {} as {}", dataset.display_name(), entry.canonical_name);
            if result.match_type() == MatchType::Fuzzy {
                rationale.push_str(" (partial name match; confirm the listed form is the one used)");
            }
            rationale.push('.');
            (ComplianceStatus::Compliant, rationale)
        }
        (None, kind) if kind.absence_is_inconclusive() => (
            ComplianceStatus::RequiresVerification,
            match kind {
                DatasetKind::Ndi | DatasetKind::Odi => format!(
                    "Not found on the {} or the {}; it may still be a grandfathered ingredient that \
                     was never enumerated.",
                    DatasetKind::Ndi.display_name(),
                    DatasetKind::Odi.display_name()
                ),
                _ => format!(
                    "Not found on the {}; it may still be GRAS through an unlisted self-affirmed \
                     determination.",
                    kind.display_name()
                ),
            },
        ),
        (None, _) => (
            ComplianceStatus::Compliant,
            "No major food allergen detected.".to_string(),
        ),
    };

    ComplianceFinding {
        subject: result.query_text().trim().to_string(),
        status,
        rule,
        rationale,
        citation: result
            .matched_entry()
            .and_then(|e| e.citation())
            .map(str::to_string),
        dataset: Some(dataset),
        match_type: Some(result.match_type()),
        matched_name: result.matched_entry().map(|e| e.canonical_name.clone()),
        remedy: None,
    }
}

fn panel_finding(category: ProductCategory, found: PanelType) -> ComplianceFinding {
    let subject = format!("{} panel", found.title());
    match expected_panel(category) {
        Some(expected) if expected != found => ComplianceFinding::new(
            subject,
            ComplianceStatus::Violation,
            RuleCategory::PanelType,
            format!(
                "A {} label must carry a {} panel, not {}.",
                category.display_name(),
                expected.title(),
                found.title()
            ),
        )
        .with_citation(Some(expected.regulation()))
        .with_remedy(Some(format!(
            "Replace the {} panel with a {} panel.",
            found.title(),
            expected.title()
        ))),
        Some(_) => ComplianceFinding::new(
            subject,
            ComplianceStatus::Compliant,
            RuleCategory::PanelType,
            format!("Panel type is correct for a {}.", category.display_name()),
        )
        .with_citation(Some(found.regulation())),
        None => ComplianceFinding::new(
            subject,
            ComplianceStatus::Compliant,
            RuleCategory::PanelType,
            format!("No nutrition panel is required for an {}.", category.display_name()),
        ),
    }
}

fn issue_finding(issue: &LabelIssue) -> ComplianceFinding {
    let status = match issue.rule {
        RuleCategory::VoluntaryImprovement => ComplianceStatus::Compliant,
        _ => ComplianceStatus::Violation,
    };
    ComplianceFinding::new(
        issue.description.trim(),
        status,
        issue.rule,
        "Reported by label review.",
    )
    .with_citation(issue.citation.as_deref())
    .with_remedy(issue.recommendation.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommendation::Priority;
    use labelcheck_core::ReferenceEntry;

    fn snap(kind: DatasetKind, rows: Vec<ReferenceEntry>) -> Arc<DatasetSnapshot> {
        Arc::new(DatasetSnapshot::build(kind, rows, 7, 1))
    }

    fn allergens() -> Arc<DatasetSnapshot> {
        snap(
            DatasetKind::AllergenDerivative,
            vec![ReferenceEntry::new(
                DatasetKind::AllergenDerivative,
                "Milk",
                ["whey", "casein", "lactose"],
                "FALCPA, 21 U.S.C. 343(qq)",
            )],
        )
    }

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn gras_hit_and_miss() {
        let gras = snap(
            DatasetKind::Gras,
            vec![ReferenceEntry::new(DatasetKind::Gras, "Citric Acid", Vec::<String>::new(), "21 CFR 184.1033")],
        );
        let report = Aggregator::default().screen_section(
            ReportSection::Gras,
            &[gras],
            &list(&["Citric Acid", "Moringa Leaf"]),
            false,
        );
        assert_eq!(report.findings.len(), 2);
        assert_eq!(report.findings[0].status, ComplianceStatus::Compliant);
        assert_eq!(report.findings[0].citation.as_deref(), Some("21 CFR 184.1033"));
        assert_eq!(report.findings[1].status, ComplianceStatus::RequiresVerification);
        assert_eq!(report.status, ComplianceStatus::RequiresVerification);
        assert_eq!(report.snapshots[0].version, 7);
    }

    #[test]
    fn ndi_then_odi() {
        let ndi = snap(
            DatasetKind::Ndi,
            vec![ReferenceEntry::new(DatasetKind::Ndi, "Huperzine A", Vec::<String>::new(), "NDI 1023")],
        );
        let odi = snap(
            DatasetKind::Odi,
            vec![ReferenceEntry::new(DatasetKind::Odi, "Ginseng", ["panax ginseng"], "pre-1994")],
        );
        let report = Aggregator::default().screen_section(
            ReportSection::DietaryIngredients,
            &[ndi, odi],
            &list(&["Huperzine A", "Panax Ginseng", "Unobtanium"]),
            false,
        );
        let datasets: Vec<_> = report.findings.iter().map(|f| f.dataset).collect();
        assert_eq!(
            datasets,
            vec![Some(DatasetKind::Ndi), Some(DatasetKind::Odi), Some(DatasetKind::Odi)]
        );
        assert_eq!(report.findings[1].match_type, Some(MatchType::Synonym));
        assert_eq!(report.findings[2].status, ComplianceStatus::RequiresVerification);
    }

    #[test]
    fn undeclared_allergen_is_a_critical_violation() {
        let report = Aggregator::default().screen_section(
            ReportSection::Allergens,
            &[allergens()],
            &list(&["Whey Protein Isolate", "Cane Sugar"]),
            false,
        );
        let whey = &report.findings[0];
        assert_eq!(whey.status, ComplianceStatus::Violation);
        assert_eq!(whey.matched_name.as_deref(), Some("Milk"));
        assert_eq!(report.findings[1].status, ComplianceStatus::Compliant);

        let recs = Aggregator::recommendations(&[report]);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].priority, Priority::Critical);
    }

    #[test]
    fn declared_allergen_is_compliant() {
        let report = Aggregator::default().screen_section(
            ReportSection::Allergens,
            &[allergens()],
            &list(&["Whey"]),
            true,
        );
        assert_eq!(report.status, ComplianceStatus::Compliant);
        assert!(report.findings[0].rationale.contains("Milk"));
    }

    #[test]
    fn duplicate_ingredients_produce_one_finding() {
        let report = Aggregator::default().screen_section(
            ReportSection::Allergens,
            &[allergens()],
            &list(&["Whey", " WHEY ", "", "   "]),
            false,
        );
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].subject, "Whey");
    }

    #[test]
    fn wrong_panel_is_critical() {
        let report = Aggregator::default().labeling_section(
            ProductCategory::DietarySupplement,
            Some(PanelType::NutritionFacts),
            &[],
        );
        assert_eq!(report.status, ComplianceStatus::Violation);
        let recs = Aggregator::recommendations(&[report]);
        assert_eq!(recs[0].priority, Priority::Critical);
        assert_eq!(recs[0].regulation_reference.as_deref(), Some("21 CFR 101.36"));
        assert!(recs[0].text.contains("Supplement Facts"));
    }

    #[test]
    fn alcoholic_beverages_need_no_panel() {
        let report = Aggregator::default().labeling_section(
            ProductCategory::AlcoholicBeverage,
            Some(PanelType::NutritionFacts),
            &[],
        );
        assert_eq!(report.status, ComplianceStatus::Compliant);
    }

    #[test]
    fn label_issues_map_by_rule() {
        let issues = vec![
            LabelIssue {
                rule: RuleCategory::IngredientOrdering,
                description: "Sugar should precede water".into(),
                recommendation: None,
                citation: None,
            },
            LabelIssue {
                rule: RuleCategory::VoluntaryImprovement,
                description: "Add a QR code with sourcing details".into(),
                recommendation: Some("Add a QR code".into()),
                citation: None,
            },
        ];
        let report = Aggregator::default().labeling_section(ProductCategory::ConventionalFood, None, &issues);
        assert_eq!(report.findings.len(), 2);
        let recs = Aggregator::recommendations(&[report]);
        assert_eq!(recs[0].priority, Priority::High);
        assert_eq!(recs[0].regulation_reference.as_deref(), Some("21 CFR 101.4(a)"));
        assert_eq!(recs[1].priority, Priority::Low);
        assert_eq!(recs[1].text, "Add a QR code");
    }
}
