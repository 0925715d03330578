//! # Compliance Engine
//!
//! The public entry point. One engine is built at process start around a
//! shared [`ReferenceCache`] and serves any number of concurrent analyses;
//! each analysis reads whole snapshots and never blocks another except while
//! a dataset is refreshing.

use std::sync::Arc;

use labelcheck_core::{CoreError, PanelType, ProductCategory};
use labelcheck_refdata::ReferenceCache;
use serde::{Deserialize, Serialize};

use crate::aggregator::Aggregator;
use crate::config::MatcherConfig;
use crate::enforcer::ConsistencyEnforcer;
use crate::error::ComplianceError;
use crate::finding::LabelIssue;
use crate::matcher::Matcher;
use crate::report::{ComplianceReport, ReportSection};
use crate::router;

/// Everything the upstream label-reading step extracted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Ingredient strings as printed, in label order.
    pub ingredients: Vec<String>,
    /// Category assigned by the upstream classifier.
    pub category: ProductCategory,
    /// Whether the label carries an allergen declaration ("Contains: ...").
    #[serde(default)]
    pub allergen_declaration_present: bool,
    /// Nutrition panel format detected on the label, if any.
    #[serde(default)]
    pub panel_type: Option<PanelType>,
    /// Labeling issues detected upstream.
    #[serde(default)]
    pub label_issues: Vec<LabelIssue>,
}

impl AnalysisRequest {
    /// A request carrying only the three core inputs.
    pub fn new(ingredients: Vec<String>, category: ProductCategory, allergen_declaration_present: bool) -> Self {
        Self {
            ingredients,
            category,
            allergen_declaration_present,
            panel_type: None,
            label_issues: Vec::new(),
        }
    }

    /// Parse a request from upstream JSON.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Runs analyses against a shared reference cache.
#[derive(Clone)]
pub struct ComplianceEngine {
    cache: Arc<ReferenceCache>,
    aggregator: Aggregator,
}

impl ComplianceEngine {
    /// Create an engine over `cache` with the given fuzzy-matching tuning.
    pub fn new(cache: Arc<ReferenceCache>, matcher: MatcherConfig) -> Self {
        Self {
            cache,
            aggregator: Aggregator::new(Matcher::new(matcher)),
        }
    }

    /// The reference cache this engine reads.
    pub fn cache(&self) -> &Arc<ReferenceCache> {
        &self.cache
    }

    /// Analyze an ingredient list for a category.
    ///
    /// # Errors
    ///
    /// [`ComplianceError::DataUnavailable`] when a dataset the category
    /// needs has never loaded. Stale data is used silently.
    pub fn analyze_compliance(
        &self,
        ingredients: &[String],
        category: ProductCategory,
        allergen_declaration_present: bool,
    ) -> Result<ComplianceReport, ComplianceError> {
        self.analyze(&AnalysisRequest::new(
            ingredients.to_vec(),
            category,
            allergen_declaration_present,
        ))
    }

    /// Analyze a full request, including panel type and upstream label issues.
    pub fn analyze(&self, request: &AnalysisRequest) -> Result<ComplianceReport, ComplianceError> {
        let plan = router::plan(request.category);
        let mut sections = Vec::with_capacity(plan.len());

        for &section in plan {
            if section == ReportSection::Labeling {
                sections.push(self.aggregator.labeling_section(
                    request.category,
                    request.panel_type,
                    &request.label_issues,
                ));
                continue;
            }
            let snapshots = section
                .datasets()
                .iter()
                .map(|&kind| self.cache.get(kind))
                .collect::<Result<Vec<_>, _>>()?;
            sections.push(self.aggregator.screen_section(
                section,
                &snapshots,
                &request.ingredients,
                request.allergen_declaration_present,
            ));
        }

        let recommendations = Aggregator::recommendations(&sections);
        let report = ConsistencyEnforcer::finalize(request.category, sections, recommendations);
        tracing::info!(
            report_id = %report.report_id(),
            category = %request.category,
            ingredients = request.ingredients.len(),
            overall = %report.overall_status(),
            print_ready = report.is_print_ready(),
            "compliance analysis complete"
        );
        Ok(report)
    }
}

/// True iff `report` has no CRITICAL or HIGH recommendation.
pub fn is_print_ready(report: &ComplianceReport) -> bool {
    report.is_print_ready()
}
