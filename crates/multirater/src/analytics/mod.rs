pub mod aggregator;
pub mod alignment;
pub mod cache;
pub mod comparison;
pub mod definition;
pub mod domain;
pub mod engine;
pub mod export;
pub mod import;
pub mod normalizer;
pub mod privacy;
pub mod rollup;
pub mod service;
pub mod store;
pub mod views;

#[cfg(test)]
mod tests;

pub use aggregator::{Aggregator, BucketStats, CompetencyResult, QuestionResult, ScoreSummary};
pub use alignment::{AlignmentLabel, ScoreBand, ThresholdPolicy};
pub use cache::{AnalyticsCache, AnalyticsScope, CachedReport, ReportKind};
pub use comparison::{ComparisonEngine, ComparisonReport, ComparisonResult};
pub use definition::{AssessmentDefinition, Competency, Question, RatingScale, Section};
pub use domain::{
    AssessmentId, Assignment, AssignmentId, AssignmentStatus, CompetencyId, OrganizationId,
    QuestionId, RatingRecord, RelationshipType, RespondentId, SectionId, SubjectId,
};
pub use engine::{AnalyticsEngine, EngineConfig, EngineError, SubjectReport};
pub use export::{ExportError, ExportRow};
pub use import::ImportError;
pub use normalizer::{
    Diagnostic, DiagnosticKind, NormalizedBatch, RawRating, RawResponseRow, RejectionReason,
};
pub use privacy::{Disclosure, PrivacyGuard, PrivacyPolicy};
pub use rollup::{OrganizationAnalytics, OrganizationReport, RollupBuilder, SectionResult};
pub use service::{AnalyticsService, ServiceError};
pub use store::{ResponseStore, StoreError};
pub use views::{
    BucketView, ComparisonReportView, ComparisonResultView, CompetencyResultView,
    OrganizationAnalyticsView, QuestionResultView, ScoreSummaryView, SectionResultView,
    SubjectReportView,
};
