//! Property tests: whatever recommendations go in, the finalized report is
//! internally consistent.

use labelcheck_compliance::enforcer::overall_status;
use labelcheck_compliance::{
    ComplianceFinding, ComplianceStatus, ConsistencyEnforcer, DatasetReport, Priority, Recommendation,
    ReportSection, RuleCategory,
};
use labelcheck_core::ProductCategory;
use proptest::prelude::*;

fn priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
        Just(Priority::Critical),
    ]
}

fn status() -> impl Strategy<Value = ComplianceStatus> {
    prop_oneof![
        Just(ComplianceStatus::Compliant),
        Just(ComplianceStatus::RequiresVerification),
        Just(ComplianceStatus::Violation),
    ]
}

fn rule() -> impl Strategy<Value = RuleCategory> {
    prop_oneof![
        Just(RuleCategory::IngredientStatus),
        Just(RuleCategory::AllergenDeclaration),
        Just(RuleCategory::ProhibitedClaim),
        Just(RuleCategory::PanelType),
        Just(RuleCategory::IngredientOrdering),
        Just(RuleCategory::GeneralLabeling),
        Just(RuleCategory::VoluntaryImprovement),
    ]
}

fn recommendation() -> impl Strategy<Value = Recommendation> {
    (priority(), rule(), 0usize..4, 0usize..6).prop_map(|(priority, rule, text, subject)| Recommendation {
        priority,
        rule,
        text: format!("action {text}"),
        regulation_reference: None,
        subjects: vec![format!("subject {subject}")],
    })
}

fn finding() -> impl Strategy<Value = ComplianceFinding> {
    (status(), rule(), 0usize..6).prop_map(|(status, rule, subject)| {
        ComplianceFinding::new(format!("subject {subject}"), status, rule, "generated")
    })
}

proptest! {
    #[test]
    fn finalized_reports_are_consistent(
        findings in prop::collection::vec(finding(), 0..8),
        recs in prop::collection::vec(recommendation(), 0..8),
    ) {
        let sections = vec![DatasetReport::new(ReportSection::Labeling, Vec::new(), findings)];
        let report = ConsistencyEnforcer::finalize(ProductCategory::ConventionalFood, sections, recs);
        let out = report.recommendations();

        // Sorted CRITICAL first.
        prop_assert!(out.windows(2).all(|w| w[0].priority >= w[1].priority));

        // Overall status agrees with the highest priority.
        prop_assert_eq!(report.overall_status(), overall_status(out));

        // Print-ready iff nothing blocking.
        let blocking = out.iter().any(|r| r.priority.is_blocking());
        prop_assert_eq!(report.is_print_ready(), !blocking);
        prop_assert_eq!(report.is_print_ready(), report.overall_status() != ComplianceStatus::Violation);

        // Every violation is covered by a blocking recommendation.
        for f in report.findings() {
            if f.status == ComplianceStatus::Violation {
                prop_assert!(out.iter().any(|r| r.covers(f) && r.priority.is_blocking()));
            }
            if f.status == ComplianceStatus::RequiresVerification {
                prop_assert!(out.iter().any(|r| r.covers(f) && r.priority == Priority::Medium));
            }
        }
    }

    #[test]
    fn adding_a_blocking_recommendation_revokes_print_readiness(
        recs in prop::collection::vec(recommendation(), 0..6),
        extra in prop_oneof![Just(Priority::High), Just(Priority::Critical)],
    ) {
        let (category, sections, mut recs) =
            ConsistencyEnforcer::finalize(ProductCategory::DietarySupplement, Vec::new(), recs).into_parts();
        recs.push(Recommendation {
            priority: extra,
            rule: RuleCategory::GeneralLabeling,
            text: "new blocking action".into(),
            regulation_reference: None,
            subjects: vec!["new subject".into()],
        });
        let report = ConsistencyEnforcer::finalize(category, sections, recs);
        prop_assert!(!report.is_print_ready());
        prop_assert_eq!(report.overall_status(), ComplianceStatus::Violation);
    }
}
