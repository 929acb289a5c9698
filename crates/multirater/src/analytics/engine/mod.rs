mod config;

pub use config::{EngineConfig, EngineError};

use super::aggregator::{Aggregator, CompetencyResult, QuestionResult};
use super::alignment::ThresholdPolicy;
use super::comparison::{ComparisonEngine, ComparisonReport};
use super::definition::AssessmentDefinition;
use super::domain::{AssessmentId, Assignment, QuestionId};
use super::normalizer::{normalize, Diagnostic, NormalizedBatch, RawResponseRow};
use super::privacy::{PrivacyGuard, PrivacyPolicy};
use super::rollup::{OrganizationReport, RollupBuilder, SectionResult};

/// Everything computed for one subject's assessment.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectReport {
    pub assessment_id: AssessmentId,
    pub sections: Vec<SectionResult>,
    pub competencies: Vec<CompetencyResult>,
    pub diagnostics: Vec<Diagnostic>,
    pub records_accepted: usize,
}

impl SubjectReport {
    pub fn questions(&self) -> impl Iterator<Item = &QuestionResult> {
        self.sections.iter().flat_map(|section| section.questions.iter())
    }

    pub fn question(&self, id: &QuestionId) -> Option<&QuestionResult> {
        self.questions().find(|result| &result.question_id == id)
    }
}

/// Stateless entry point: normalize, aggregate, classify and roll up.
///
/// Every method is a pure function of its arguments, so one engine can be
/// shared across threads and callers.
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    config: EngineConfig,
    thresholds: ThresholdPolicy,
    guard: PrivacyGuard,
}

impl AnalyticsEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let thresholds = ThresholdPolicy::new(config.alignment_gap)?;
        let privacy = PrivacyPolicy::new(config.min_reviewers)?;
        if config.top_n == 0 {
            return Err(EngineError::InvalidTopN);
        }

        Ok(Self {
            config,
            thresholds,
            guard: PrivacyGuard::new(privacy, thresholds),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn thresholds(&self) -> &ThresholdPolicy {
        &self.thresholds
    }

    pub fn guard(&self) -> &PrivacyGuard {
        &self.guard
    }

    pub fn normalize(&self, definition: &AssessmentDefinition, rows: &[RawResponseRow]) -> NormalizedBatch {
        normalize(rows, definition)
    }

    fn aggregator<'a>(&self, definition: &'a AssessmentDefinition) -> Aggregator<'a> {
        Aggregator::new(definition, self.thresholds, self.config.parallel)
    }

    fn rollup<'a>(&self, definition: &'a AssessmentDefinition) -> RollupBuilder<'a> {
        RollupBuilder::new(definition, *self.guard.policy(), self.config.top_n)
    }

    /// Rows are expected to belong to a single subject.
    pub fn subject_report(&self, definition: &AssessmentDefinition, rows: &[RawResponseRow]) -> SubjectReport {
        let batch = self.normalize(definition, rows);
        let aggregator = self.aggregator(definition);
        let grouped = aggregator.group(&batch.records);
        let questions = aggregator.questions(&grouped);
        let competencies = aggregator.competencies(&grouped);
        let sections = self
            .rollup(definition)
            .sections(&aggregator, &batch.records, &grouped, &questions);

        SubjectReport {
            assessment_id: definition.id().clone(),
            sections,
            competencies,
            records_accepted: batch.records.len(),
            diagnostics: batch.diagnostics,
        }
    }

    pub fn organization(
        &self,
        definition: &AssessmentDefinition,
        assignments: &[Assignment],
        rows: &[RawResponseRow],
    ) -> OrganizationReport {
        let batch = self.normalize(definition, rows);
        let grouped = self.aggregator(definition).group(&batch.records);
        let (analytics, question_breakdown) = self
            .rollup(definition)
            .organization(assignments, &batch.records, &grouped);

        OrganizationReport {
            analytics,
            question_breakdown,
            diagnostics: batch.diagnostics,
        }
    }

    pub fn compare(
        &self,
        definition: &AssessmentDefinition,
        question_ids: &[QuestionId],
        rows: &[RawResponseRow],
    ) -> ComparisonReport {
        let batch = self.normalize(definition, rows);
        let mut report = ComparisonEngine::new(definition, self.config.parallel)
            .compare(question_ids, &batch.records);
        report.diagnostics = batch.diagnostics;
        report
    }
}
