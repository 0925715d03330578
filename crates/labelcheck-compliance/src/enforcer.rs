//! # Consistency Enforcer
//!
//! Last step before a report leaves the engine. Whatever the caller hands
//! in, the report that comes out satisfies:
//!
//! - every VIOLATION finding is covered by a CRITICAL or HIGH recommendation;
//! - every REQUIRES_VERIFICATION finding is covered by a MEDIUM
//!   recommendation, and a blocking recommendation covering only unverified
//!   findings is lowered to MEDIUM;
//! - identical recommendations appear once, at their highest priority;
//! - recommendations are ordered CRITICAL, HIGH, MEDIUM, LOW;
//! - the overall status is the status implied by the highest remaining
//!   priority (CRITICAL/HIGH give VIOLATION, MEDIUM gives
//!   REQUIRES_VERIFICATION, LOW or nothing gives COMPLIANT);
//! - the report is print-ready iff no CRITICAL or HIGH recommendation remains.
//!
//! Section statuses are recomputed from their findings rather than trusted.

use std::collections::HashMap;

use labelcheck_core::ProductCategory;

use crate::finding::{ComplianceFinding, ComplianceStatus, RuleCategory};
use crate::recommendation::{classify, Priority, Recommendation};
use crate::report::{ComplianceReport, DatasetReport};

/// Builds the final report and enforces its invariants.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsistencyEnforcer;

impl ConsistencyEnforcer {
    /// Reconcile sections and recommendations into a finished report.
    pub fn finalize(
        category: ProductCategory,
        sections: Vec<DatasetReport>,
        recommendations: Vec<Recommendation>,
    ) -> ComplianceReport {
        let sections: Vec<DatasetReport> = sections
            .into_iter()
            .map(|s| DatasetReport::new(s.section, s.snapshots, s.findings))
            .collect();
        let findings: Vec<&ComplianceFinding> = sections.iter().flat_map(|s| s.findings.iter()).collect();

        let mut recommendations = dedupe(recommendations);
        cap_unverified(&findings, &mut recommendations);
        repair_missing(&findings, &mut recommendations);
        recommendations.sort_by(|a, b| b.priority.cmp(&a.priority));

        let overall = overall_status(&recommendations);
        let print_ready = !recommendations.iter().any(|r| r.priority.is_blocking());

        tracing::debug!(
            category = %category,
            overall = %overall,
            print_ready,
            recommendations = recommendations.len(),
            "report finalized"
        );
        ComplianceReport::assemble(category, sections, recommendations, overall, print_ready)
    }
}

/// Status implied by the highest-priority recommendation.
pub fn overall_status(recommendations: &[Recommendation]) -> ComplianceStatus {
    ComplianceStatus::worst(recommendations.iter().map(|r| r.priority.implied_status()))
}

/// Blocking recommendations that only cover findings awaiting verification
/// are lowered to MEDIUM.
fn cap_unverified(findings: &[&ComplianceFinding], recommendations: &mut [Recommendation]) {
    for rec in recommendations.iter_mut().filter(|r| r.priority.is_blocking()) {
        let covered: Vec<&&ComplianceFinding> = findings.iter().filter(|f| rec.covers(f)).collect();
        let unverified_only = covered
            .iter()
            .any(|f| f.status == ComplianceStatus::RequiresVerification)
            && covered.iter().all(|f| f.status != ComplianceStatus::Violation);
        if unverified_only {
            tracing::warn!(
                rule = ?rec.rule,
                from = %rec.priority,
                subjects = ?rec.subjects,
                "blocking recommendation for an unverified finding; lowering to MEDIUM"
            );
            rec.priority = Priority::Medium;
        }
    }
}

/// Add the classified recommendation for any non-compliant finding that
/// nothing covers at the right priority.
fn repair_missing(findings: &[&ComplianceFinding], recommendations: &mut Vec<Recommendation>) {
    for finding in findings {
        let satisfied = |rec: &Recommendation| match finding.status {
            ComplianceStatus::Violation => rec.priority.is_blocking(),
            ComplianceStatus::RequiresVerification => rec.priority == Priority::Medium,
            ComplianceStatus::Compliant => true,
        };
        if finding.status == ComplianceStatus::Compliant
            || recommendations.iter().any(|r| r.covers(finding) && satisfied(r))
        {
            continue;
        }
        if let Some(rec) = classify(finding) {
            tracing::warn!(
                subject = %finding.subject,
                status = %finding.status,
                priority = %rec.priority,
                "finding had no matching recommendation; adding one"
            );
            recommendations.push(rec);
        }
    }
}

type DedupKey = (RuleCategory, String, Option<String>);

/// Merge recommendations with identical rule, text and reference.
fn dedupe(recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
    let mut index: HashMap<DedupKey, usize> = HashMap::new();
    let mut out: Vec<Recommendation> = Vec::with_capacity(recommendations.len());
    for rec in recommendations {
        let key = (rec.rule, rec.text.clone(), rec.regulation_reference.clone());
        match index.get(&key) {
            Some(&at) => {
                let kept = &mut out[at];
                kept.priority = kept.priority.max(rec.priority);
                for subject in rec.subjects {
                    if !kept.subjects.contains(&subject) {
                        kept.subjects.push(subject);
                    }
                }
            }
            None => {
                index.insert(key, out.len());
                out.push(rec);
            }
        }
    }
    out
}
