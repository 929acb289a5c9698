use super::aggregator::{
    Aggregator, BucketStats, CompetencyResult, GroupedRatings, QuestionResult, RatingGroup,
};
use super::alignment::AlignmentLabel;
use super::definition::{AssessmentDefinition, Section};
use super::domain::{
    Assignment, QuestionId, RatingRecord, RelationshipType, SectionId,
};
use super::normalizer::Diagnostic;
use super::privacy::PrivacyPolicy;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct SectionResult {
    pub section_id: SectionId,
    pub section_title: String,
    pub self_average: Option<f64>,
    pub reviewer_average: Option<f64>,
    pub reviewer_count: usize,
    pub distinct_reviewers: usize,
    pub overall_gap: Option<f64>,
    pub overall_alignment: AlignmentLabel,
    pub questions: Vec<QuestionResult>,
    /// Competencies touched by this section, computed from the section's ratings only.
    pub competency_results: Vec<CompetencyResult>,
}

/// Mean over every rating in a scope plus the reviewer count that gates it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScopedAverage {
    pub average: Option<f64>,
    pub response_count: usize,
    pub distinct_reviewers: usize,
}

impl ScopedAverage {
    fn from_group(group: &RatingGroup) -> Self {
        let combined = group.combined();
        Self {
            average: combined.average(),
            response_count: combined.count(),
            distinct_reviewers: group.reviewers().distinct_respondents(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionAverage {
    pub section_id: SectionId,
    pub score: ScopedAverage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionAverage {
    pub question_id: QuestionId,
    pub score: ScopedAverage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationAnalytics {
    pub total_assessments: usize,
    pub completed_assessments: usize,
    pub average_score: ScopedAverage,
    pub section_averages: Vec<SectionAverage>,
    pub question_averages: Vec<QuestionAverage>,
    /// Assignment records per relationship type, answered or not.
    pub relationship_type_breakdown: BTreeMap<RelationshipType, usize>,
    pub completion_rate: f64,
    pub response_rate: f64,
    pub top_strengths: Vec<QuestionId>,
    pub areas_for_improvement: Vec<QuestionId>,
}

/// Per-relationship figures for one question, the source of flat exports.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionBreakdown {
    pub question_id: QuestionId,
    pub buckets: BTreeMap<RelationshipType, BucketStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrganizationReport {
    pub analytics: OrganizationAnalytics,
    pub question_breakdown: Vec<QuestionBreakdown>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Composes question and competency figures into section and organization views.
pub struct RollupBuilder<'a> {
    definition: &'a AssessmentDefinition,
    privacy: PrivacyPolicy,
    top_n: usize,
}

impl<'a> RollupBuilder<'a> {
    pub fn new(definition: &'a AssessmentDefinition, privacy: PrivacyPolicy, top_n: usize) -> Self {
        Self {
            definition,
            privacy,
            top_n,
        }
    }

    pub fn sections(
        &self,
        aggregator: &Aggregator<'_>,
        records: &[RatingRecord],
        grouped: &GroupedRatings,
        questions: &[QuestionResult],
    ) -> Vec<SectionResult> {
        self.definition
            .sections()
            .iter()
            .map(|section| self.section(section, aggregator, records, grouped, questions))
            .collect()
    }

    fn section(
        &self,
        section: &Section,
        aggregator: &Aggregator<'_>,
        records: &[RatingRecord],
        grouped: &GroupedRatings,
        questions: &[QuestionResult],
    ) -> SectionResult {
        let mut pooled = RatingGroup::default();
        for (position, _) in self.definition.questions_in_section(&section.id) {
            pooled.merge(&grouped.questions[position]);
        }
        let summary = pooled.summarize(aggregator.thresholds(), self.definition.scale());

        let in_section = records.iter().filter(|record| {
            self.definition
                .question(&record.question_id)
                .map(|question| question.section_id == section.id)
                .unwrap_or(false)
        });
        let section_grouped = aggregator.group(in_section);
        let competency_results = aggregator
            .competencies(&section_grouped)
            .into_iter()
            .zip(&section_grouped.competencies)
            .filter(|(_, group)| !group.is_empty())
            .map(|(result, _)| result)
            .collect();

        SectionResult {
            section_id: section.id.clone(),
            section_title: section.title.clone(),
            self_average: summary.self_rating,
            reviewer_average: summary.avg_reviewer_rating,
            reviewer_count: summary.reviewer_count,
            distinct_reviewers: summary.distinct_reviewers,
            overall_gap: summary.gap,
            overall_alignment: summary.alignment,
            questions: questions
                .iter()
                .filter(|result| result.section_id == section.id)
                .cloned()
                .collect(),
            competency_results,
        }
    }

    pub fn organization(
        &self,
        assignments: &[Assignment],
        records: &[RatingRecord],
        grouped: &GroupedRatings,
    ) -> (OrganizationAnalytics, Vec<QuestionBreakdown>) {
        let total_assessments = assignments.len();
        let completed_assessments = assignments
            .iter()
            .filter(|assignment| assignment.is_completed())
            .count();

        let mut relationship_type_breakdown = BTreeMap::new();
        for assignment in assignments {
            *relationship_type_breakdown
                .entry(assignment.relationship_type)
                .or_insert(0) += 1;
        }

        let answered: HashSet<_> = records.iter().map(|record| &record.assignment_id).collect();
        let responded = assignments
            .iter()
            .filter(|assignment| answered.contains(&assignment.id))
            .count();

        let mut everything = RatingGroup::default();
        for group in &grouped.questions {
            everything.merge(group);
        }

        let section_averages = self
            .definition
            .sections()
            .iter()
            .map(|section| {
                let mut pooled = RatingGroup::default();
                for (position, _) in self.definition.questions_in_section(&section.id) {
                    pooled.merge(&grouped.questions[position]);
                }
                SectionAverage {
                    section_id: section.id.clone(),
                    score: ScopedAverage::from_group(&pooled),
                }
            })
            .collect();

        let question_averages: Vec<QuestionAverage> = self
            .definition
            .questions()
            .iter()
            .zip(&grouped.questions)
            .map(|(question, group)| QuestionAverage {
                question_id: question.id.clone(),
                score: ScopedAverage::from_group(group),
            })
            .collect();

        let question_breakdown = self
            .definition
            .questions()
            .iter()
            .zip(&grouped.questions)
            .map(|(question, group)| QuestionBreakdown {
                question_id: question.id.clone(),
                buckets: group
                    .buckets()
                    .iter()
                    .map(|(relationship, tally)| (*relationship, tally.stats()))
                    .collect(),
            })
            .collect();

        let (top_strengths, areas_for_improvement) = self.rank(&question_averages);

        let analytics = OrganizationAnalytics {
            total_assessments,
            completed_assessments,
            average_score: ScopedAverage::from_group(&everything),
            section_averages,
            question_averages,
            relationship_type_breakdown,
            completion_rate: ratio(completed_assessments, total_assessments),
            response_rate: ratio(responded, total_assessments),
            top_strengths,
            areas_for_improvement,
        };

        (analytics, question_breakdown)
    }

    /// Ranks questions that clear the privacy floor. Equal scores fall back to
    /// ascending question id.
    fn rank(&self, averages: &[QuestionAverage]) -> (Vec<QuestionId>, Vec<QuestionId>) {
        let mut eligible: Vec<(&QuestionId, f64)> = averages
            .iter()
            .filter(|entry| self.privacy.allows(entry.score.distinct_reviewers))
            .filter_map(|entry| entry.score.average.map(|average| (&entry.question_id, average)))
            .collect();

        eligible.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let strengths = eligible
            .iter()
            .take(self.top_n)
            .map(|(id, _)| (*id).clone())
            .collect();

        eligible.sort_by(|a, b| match a.1.total_cmp(&b.1) {
            Ordering::Equal => a.0.cmp(b.0),
            other => other,
        });
        let improvements = eligible
            .iter()
            .take(self.top_n)
            .map(|(id, _)| (*id).clone())
            .collect();

        (strengths, improvements)
    }
}

/// `0.0` for an empty denominator.
pub fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
