//! Serializable, privacy-gated output. Nothing in here carries a respondent id,
//! and every reviewer-derived number is wrapped in a [`Disclosure`].

use super::alignment::{AlignmentLabel, ScoreBand};
use super::domain::{AssessmentId, CompetencyId, QuestionId, RelationshipType, SectionId};
use super::normalizer::Diagnostic;
use super::privacy::Disclosure;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketView {
    pub relationship_type: RelationshipType,
    pub relationship_label: &'static str,
    pub count: usize,
    pub average: Disclosure<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummaryView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_rating: Option<f64>,
    pub avg_reviewer_rating: Disclosure<f64>,
    pub reviewer_count: usize,
    pub gap: Disclosure<f64>,
    pub alignment: AlignmentLabel,
    pub alignment_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_band: Option<ScoreBand>,
    pub comments: Disclosure<Vec<String>>,
    pub relationship_breakdown: Vec<BucketView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionResultView {
    pub question_id: QuestionId,
    pub question_text: String,
    #[serde(flatten)]
    pub summary: ScoreSummaryView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetencyResultView {
    pub competency_id: CompetencyId,
    pub competency_name: String,
    #[serde(flatten)]
    pub summary: ScoreSummaryView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionResultView {
    pub section_id: SectionId,
    pub section_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_average: Option<f64>,
    pub reviewer_average: Disclosure<f64>,
    pub overall_gap: Disclosure<f64>,
    pub overall_alignment: AlignmentLabel,
    pub questions: Vec<QuestionResultView>,
    pub competency_results: Vec<CompetencyResultView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectReportView {
    pub assessment_id: AssessmentId,
    pub assessment_title: String,
    pub sections: Vec<SectionResultView>,
    pub competencies: Vec<CompetencyResultView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

impl SubjectReportView {
    pub fn questions(&self) -> impl Iterator<Item = &QuestionResultView> {
        self.sections.iter().flat_map(|section| section.questions.iter())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonResultView {
    pub question_id: QuestionId,
    pub question_text: String,
    pub average_score: Disclosure<f64>,
    pub total_responses: usize,
    pub score_distribution: Disclosure<BTreeMap<u8, usize>>,
    pub relationship_type_averages: Vec<BucketView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReportView {
    pub results: Vec<ComparisonResultView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unknown_questions: Vec<QuestionId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopedAverageView<I> {
    pub id: I,
    pub label: String,
    pub average: Disclosure<f64>,
    pub response_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionBreakdownView {
    pub question_id: QuestionId,
    pub buckets: Vec<BucketView>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrganizationAnalyticsView {
    pub assessment_id: AssessmentId,
    pub total_assessments: usize,
    pub completed_assessments: usize,
    pub average_score: Disclosure<f64>,
    pub section_averages: Vec<ScopedAverageView<SectionId>>,
    pub question_averages: Vec<ScopedAverageView<QuestionId>>,
    pub relationship_type_breakdown: BTreeMap<RelationshipType, usize>,
    pub completion_rate: f64,
    pub response_rate: f64,
    pub top_strengths: Vec<QuestionId>,
    pub areas_for_improvement: Vec<QuestionId>,
    pub question_breakdown: Vec<QuestionBreakdownView>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}
