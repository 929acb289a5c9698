//! Minimum-reviewer disclosure rule.
//!
//! Results are always computed on true values; the guard only decides what a
//! caller gets to see. Each relationship bucket is judged on its own, so a
//! question with four peers and one supervisor shows the peer average and
//! hides the supervisor one.

use super::aggregator::{BucketStats, CompetencyResult, QuestionResult, ScoreSummary};
use super::alignment::{AlignmentLabel, ThresholdPolicy};
use super::comparison::{ComparisonReport, ComparisonResult};
use super::definition::AssessmentDefinition;
use super::domain::RelationshipType;
use super::engine::{EngineError, SubjectReport};
use super::rollup::{OrganizationReport, ScopedAverage, SectionResult};
use super::views::{
    BucketView, ComparisonReportView, ComparisonResultView, CompetencyResultView,
    OrganizationAnalyticsView, QuestionBreakdownView, QuestionResultView, ScopedAverageView,
    ScoreSummaryView, SectionResultView, SubjectReportView,
};
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_MIN_REVIEWERS: usize = 3;

/// A gated value: shown, withheld for privacy, or never computable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Disclosure<T> {
    Disclosed(T),
    Suppressed,
    InsufficientData,
}

impl<T> Disclosure<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Disclosed(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_suppressed(&self) -> bool {
        matches!(self, Self::Suppressed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivacyPolicy {
    min_reviewers: usize,
}

impl PrivacyPolicy {
    pub fn new(min_reviewers: usize) -> Result<Self, EngineError> {
        if min_reviewers == 0 {
            return Err(EngineError::InvalidPrivacyFloor);
        }
        Ok(Self { min_reviewers })
    }

    pub fn min_reviewers(&self) -> usize {
        self.min_reviewers
    }

    pub fn allows(&self, distinct_reviewers: usize) -> bool {
        distinct_reviewers >= self.min_reviewers
    }

    /// `InsufficientData` when there is nothing to show, `Suppressed` when
    /// fewer than the floor of distinct reviewers contributed.
    pub fn gate<T>(&self, value: Option<T>, distinct_reviewers: usize) -> Disclosure<T> {
        match value {
            None => Disclosure::InsufficientData,
            Some(_) if !self.allows(distinct_reviewers) => Disclosure::Suppressed,
            Some(value) => Disclosure::Disclosed(value),
        }
    }
}

impl Default for PrivacyPolicy {
    fn default() -> Self {
        Self {
            min_reviewers: DEFAULT_MIN_REVIEWERS,
        }
    }
}

/// Converts computed results into their disclosed views.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrivacyGuard {
    policy: PrivacyPolicy,
    thresholds: ThresholdPolicy,
}

impl PrivacyGuard {
    pub fn new(policy: PrivacyPolicy, thresholds: ThresholdPolicy) -> Self {
        Self { policy, thresholds }
    }

    pub fn policy(&self) -> &PrivacyPolicy {
        &self.policy
    }

    /// The subject's own bucket is never gated.
    pub fn bucket_view(&self, relationship: RelationshipType, stats: &BucketStats) -> BucketView {
        let average = if relationship.is_self() {
            stats.average.map_or(Disclosure::InsufficientData, Disclosure::Disclosed)
        } else {
            self.policy.gate(stats.average, stats.distinct_respondents)
        };

        BucketView {
            relationship_type: relationship,
            relationship_label: relationship.label(),
            count: stats.count,
            average,
        }
    }

    fn buckets(&self, buckets: &BTreeMap<RelationshipType, BucketStats>) -> Vec<BucketView> {
        buckets
            .iter()
            .map(|(relationship, stats)| self.bucket_view(*relationship, stats))
            .collect()
    }

    /// A suppressed reviewer average also hides the gap, the comments and the
    /// alignment label, which is reported as insufficient data.
    pub fn summary_view(&self, summary: &ScoreSummary, definition: &AssessmentDefinition) -> ScoreSummaryView {
        let avg_reviewer_rating = self
            .policy
            .gate(summary.avg_reviewer_rating, summary.distinct_reviewers);

        let (gap, alignment, comments) = match &avg_reviewer_rating {
            Disclosure::Disclosed(_) => (
                summary
                    .gap
                    .map_or(Disclosure::InsufficientData, Disclosure::Disclosed),
                summary.alignment,
                Disclosure::Disclosed(summary.comments.clone()),
            ),
            Disclosure::Suppressed => (
                Disclosure::Suppressed,
                AlignmentLabel::InsufficientData,
                Disclosure::Suppressed,
            ),
            Disclosure::InsufficientData => (
                Disclosure::InsufficientData,
                AlignmentLabel::InsufficientData,
                Disclosure::InsufficientData,
            ),
        };

        let score_band = avg_reviewer_rating
            .value()
            .map(|average| self.thresholds.band(*average, definition.scale()));

        ScoreSummaryView {
            self_rating: summary.self_rating,
            avg_reviewer_rating,
            reviewer_count: summary.reviewer_count,
            gap,
            alignment,
            alignment_label: alignment.label(),
            score_band,
            comments,
            relationship_breakdown: self.buckets(&summary.relationship_breakdown),
        }
    }

    pub fn question_view(&self, result: &QuestionResult, definition: &AssessmentDefinition) -> QuestionResultView {
        QuestionResultView {
            question_id: result.question_id.clone(),
            question_text: definition
                .question(&result.question_id)
                .map(|question| question.text.clone())
                .unwrap_or_default(),
            summary: self.summary_view(&result.summary, definition),
        }
    }

    pub fn competency_view(
        &self,
        result: &CompetencyResult,
        definition: &AssessmentDefinition,
    ) -> CompetencyResultView {
        CompetencyResultView {
            competency_id: result.competency_id.clone(),
            competency_name: definition
                .competency(&result.competency_id)
                .map(|competency| competency.name.clone())
                .unwrap_or_default(),
            summary: self.summary_view(&result.summary, definition),
        }
    }

    pub fn section_view(&self, section: &SectionResult, definition: &AssessmentDefinition) -> SectionResultView {
        let reviewer_average = self
            .policy
            .gate(section.reviewer_average, section.distinct_reviewers);
        let (overall_gap, overall_alignment) = match reviewer_average {
            Disclosure::Disclosed(_) => (
                section
                    .overall_gap
                    .map_or(Disclosure::InsufficientData, Disclosure::Disclosed),
                section.overall_alignment,
            ),
            Disclosure::Suppressed => (Disclosure::Suppressed, AlignmentLabel::InsufficientData),
            Disclosure::InsufficientData => {
                (Disclosure::InsufficientData, AlignmentLabel::InsufficientData)
            }
        };

        SectionResultView {
            section_id: section.section_id.clone(),
            section_title: section.section_title.clone(),
            self_average: section.self_average,
            reviewer_average,
            overall_gap,
            overall_alignment,
            questions: section
                .questions
                .iter()
                .map(|question| self.question_view(question, definition))
                .collect(),
            competency_results: section
                .competency_results
                .iter()
                .map(|competency| self.competency_view(competency, definition))
                .collect(),
        }
    }

    pub fn subject_view(&self, report: &SubjectReport, definition: &AssessmentDefinition) -> SubjectReportView {
        SubjectReportView {
            assessment_id: definition.id().clone(),
            assessment_title: definition.title().to_string(),
            sections: report
                .sections
                .iter()
                .map(|section| self.section_view(section, definition))
                .collect(),
            competencies: report
                .competencies
                .iter()
                .map(|competency| self.competency_view(competency, definition))
                .collect(),
            diagnostics: report.diagnostics.clone(),
        }
    }

    pub fn comparison_result_view(&self, result: &ComparisonResult) -> ComparisonResultView {
        let distinct = result.distinct_reviewers;
        ComparisonResultView {
            question_id: result.question_id.clone(),
            question_text: result.question_text.clone(),
            average_score: self.policy.gate(result.average_score, distinct),
            total_responses: result.total_responses,
            score_distribution: if result.total_responses == 0 {
                Disclosure::InsufficientData
            } else {
                self.policy
                    .gate(Some(result.score_distribution.clone()), distinct)
            },
            relationship_type_averages: self.buckets(&result.relationship_type_averages),
        }
    }

    pub fn comparison_view(&self, report: &ComparisonReport) -> ComparisonReportView {
        ComparisonReportView {
            results: report
                .results
                .iter()
                .map(|result| self.comparison_result_view(result))
                .collect(),
            unknown_questions: report.unknown_questions.clone(),
            diagnostics: report.diagnostics.clone(),
        }
    }

    fn scoped<I: Clone>(&self, id: &I, label: String, score: &ScopedAverage) -> ScopedAverageView<I> {
        ScopedAverageView {
            id: id.clone(),
            label,
            average: self.policy.gate(score.average, score.distinct_reviewers),
            response_count: score.response_count,
        }
    }

    pub fn organization_view(
        &self,
        report: &OrganizationReport,
        definition: &AssessmentDefinition,
    ) -> OrganizationAnalyticsView {
        let analytics = &report.analytics;
        OrganizationAnalyticsView {
            assessment_id: definition.id().clone(),
            total_assessments: analytics.total_assessments,
            completed_assessments: analytics.completed_assessments,
            average_score: self.policy.gate(
                analytics.average_score.average,
                analytics.average_score.distinct_reviewers,
            ),
            section_averages: analytics
                .section_averages
                .iter()
                .zip(definition.sections())
                .map(|(entry, section)| self.scoped(&entry.section_id, section.title.clone(), &entry.score))
                .collect(),
            question_averages: analytics
                .question_averages
                .iter()
                .zip(definition.questions())
                .map(|(entry, question)| self.scoped(&entry.question_id, question.text.clone(), &entry.score))
                .collect(),
            relationship_type_breakdown: analytics.relationship_type_breakdown.clone(),
            completion_rate: analytics.completion_rate,
            response_rate: analytics.response_rate,
            top_strengths: analytics.top_strengths.clone(),
            areas_for_improvement: analytics.areas_for_improvement.clone(),
            question_breakdown: report
                .question_breakdown
                .iter()
                .map(|breakdown| QuestionBreakdownView {
                    question_id: breakdown.question_id.clone(),
                    buckets: self.buckets(&breakdown.buckets),
                })
                .collect(),
            diagnostics: report.diagnostics.clone(),
        }
    }
}
