//! # Compliance Reports
//!
//! A [`ComplianceReport`] is only ever built by the
//! [`ConsistencyEnforcer`](crate::ConsistencyEnforcer), and its fields are
//! read-only afterwards, so a report in hand always satisfies the
//! consistency invariants (overall status agrees with the highest
//! outstanding priority; print readiness agrees with both).

use chrono::{DateTime, Utc};
use labelcheck_core::{DatasetKind, ProductCategory};
use labelcheck_refdata::DatasetSnapshot;
use serde::Serialize;
use uuid::Uuid;

use crate::finding::{ComplianceFinding, ComplianceStatus};
use crate::recommendation::Recommendation;

/// A report section and the datasets it screens, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportSection {
    /// GRAS screening for foods and beverages.
    Gras,
    /// NDI, then ODI, screening for dietary supplements.
    DietaryIngredients,
    /// Major allergen detection.
    Allergens,
    /// Panel type and upstream label issues.
    Labeling,
}

impl ReportSection {
    /// Datasets screened in this section. A later dataset is consulted only
    /// for ingredients the earlier ones did not match.
    pub fn datasets(self) -> &'static [DatasetKind] {
        match self {
            Self::Gras => &[DatasetKind::Gras],
            Self::DietaryIngredients => &[DatasetKind::Ndi, DatasetKind::Odi],
            Self::Allergens => &[DatasetKind::AllergenDerivative],
            Self::Labeling => &[],
        }
    }

    /// Section heading.
    pub fn title(self) -> &'static str {
        match self {
            Self::Gras => "GRAS compliance",
            Self::DietaryIngredients => "Dietary ingredient (NDI/ODI) compliance",
            Self::Allergens => "Allergen declaration",
            Self::Labeling => "Labeling",
        }
    }
}

/// Which snapshot a section was computed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotRef {
    pub dataset: DatasetKind,
    pub version: u64,
    pub digest: String,
    pub entries: usize,
    pub loaded_at: DateTime<Utc>,
}

impl From<&DatasetSnapshot> for SnapshotRef {
    fn from(snapshot: &DatasetSnapshot) -> Self {
        Self {
            dataset: snapshot.kind(),
            version: snapshot.version(),
            digest: snapshot.digest().to_string(),
            entries: snapshot.len(),
            loaded_at: snapshot.loaded_at(),
        }
    }
}

/// Finding counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FindingSummary {
    pub compliant: usize,
    pub requires_verification: usize,
    pub violations: usize,
}

impl FindingSummary {
    /// Tally `findings`.
    pub fn of(findings: &[ComplianceFinding]) -> Self {
        findings.iter().fold(Self::default(), |mut acc, f| {
            match f.status {
                ComplianceStatus::Compliant => acc.compliant += 1,
                ComplianceStatus::RequiresVerification => acc.requires_verification += 1,
                ComplianceStatus::Violation => acc.violations += 1,
            }
            acc
        })
    }
}

/// Findings for one report section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetReport {
    pub section: ReportSection,
    /// Snapshots consulted, in screening order.
    pub snapshots: Vec<SnapshotRef>,
    /// One finding per subject.
    pub findings: Vec<ComplianceFinding>,
    /// Worst finding status.
    pub status: ComplianceStatus,
    pub summary: FindingSummary,
}

impl DatasetReport {
    /// Build a section report, deriving status and counts from `findings`.
    pub fn new(section: ReportSection, snapshots: Vec<SnapshotRef>, findings: Vec<ComplianceFinding>) -> Self {
        let status = ComplianceStatus::worst(findings.iter().map(|f| f.status));
        let summary = FindingSummary::of(&findings);
        Self {
            section,
            snapshots,
            findings,
            status,
            summary,
        }
    }
}

/// Final, self-consistent compliance report.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceReport {
    report_id: Uuid,
    generated_at: DateTime<Utc>,
    product_category: ProductCategory,
    overall_status: ComplianceStatus,
    print_ready: bool,
    sections: Vec<DatasetReport>,
    recommendations: Vec<Recommendation>,
}

impl ComplianceReport {
    pub(crate) fn assemble(
        product_category: ProductCategory,
        sections: Vec<DatasetReport>,
        recommendations: Vec<Recommendation>,
        overall_status: ComplianceStatus,
        print_ready: bool,
    ) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            product_category,
            overall_status,
            print_ready,
            sections,
            recommendations,
        }
    }

    pub fn report_id(&self) -> Uuid {
        self.report_id
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn product_category(&self) -> ProductCategory {
        self.product_category
    }

    /// Worst outstanding status, derived from the recommendations.
    pub fn overall_status(&self) -> ComplianceStatus {
        self.overall_status
    }

    /// True iff no CRITICAL or HIGH recommendation is outstanding.
    pub fn is_print_ready(&self) -> bool {
        self.print_ready
    }

    pub fn sections(&self) -> &[DatasetReport] {
        &self.sections
    }

    /// Section report for `section`, if the category produced one.
    pub fn section(&self, section: ReportSection) -> Option<&DatasetReport> {
        self.sections.iter().find(|s| s.section == section)
    }

    /// Recommendations, CRITICAL first.
    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    /// Every finding across all sections.
    pub fn findings(&self) -> impl Iterator<Item = &ComplianceFinding> {
        self.sections.iter().flat_map(|s| s.findings.iter())
    }

    /// Take the parts back out, e.g. to re-run the enforcer with extra
    /// recommendations.
    pub fn into_parts(self) -> (ProductCategory, Vec<DatasetReport>, Vec<Recommendation>) {
        (self.product_category, self.sections, self.recommendations)
    }

    /// Pretty JSON rendering.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
