//! # labelcheck-compliance: Ingredient Compliance Engine
//!
//! Turns an extracted ingredient list and a product category into a
//! prioritized, self-consistent compliance report.
//!
//! ```text
//! AnalysisRequest
//!      |
//!      v
//! router::plan(category) ----> sections: GRAS | NDI->ODI | Allergens | Labeling
//!      |
//!      v
//! Matcher (exact -> synonym -> fuzzy) per ingredient, per dataset snapshot
//!      |
//!      v
//! Aggregator: MatchResult -> ComplianceFinding -> Recommendation
//!      |
//!      v
//! ConsistencyEnforcer::finalize -> ComplianceReport (overall status, print-ready)
//! ```
//!
//! The only failure an analysis can surface is reference data that has never
//! loaded ([`ComplianceError::DataUnavailable`]). Unknown ingredients, fuzzy
//! ambiguity and stale reference data are all absorbed into the report.

pub mod aggregator;
pub mod config;
pub mod engine;
pub mod enforcer;
pub mod error;
pub mod finding;
pub mod matcher;
pub mod recommendation;
pub mod report;
pub mod router;

pub use aggregator::Aggregator;
pub use config::{EngineConfig, MatcherConfig};
pub use engine::{is_print_ready, AnalysisRequest, ComplianceEngine};
pub use enforcer::ConsistencyEnforcer;
pub use error::ComplianceError;
pub use finding::{ComplianceFinding, ComplianceStatus, EnforcementRisk, LabelIssue, RuleCategory};
pub use matcher::{Confidence, MatchResult, MatchType, Matcher};
pub use recommendation::{classify, Priority, Recommendation};
pub use report::{ComplianceReport, DatasetReport, FindingSummary, ReportSection, SnapshotRef};
pub use router::{applicable_datasets, expected_panel};
