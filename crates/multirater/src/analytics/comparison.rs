use super::aggregator::{BucketStats, RatingGroup};
use super::definition::{AssessmentDefinition, Question};
use super::domain::{QuestionId, RatingRecord, RelationshipType};
use super::normalizer::Diagnostic;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonResult {
    pub question_id: QuestionId,
    pub question_text: String,
    /// Mean over self and reviewer ratings alike.
    pub average_score: Option<f64>,
    pub total_responses: usize,
    pub distinct_reviewers: usize,
    /// Only observed ratings appear as keys.
    pub score_distribution: BTreeMap<u8, usize>,
    pub relationship_type_averages: BTreeMap<RelationshipType, BucketStats>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonReport {
    pub results: Vec<ComparisonResult>,
    /// Requested ids the definition does not contain.
    pub unknown_questions: Vec<QuestionId>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Cross-question breakdown over every record in scope.
pub struct ComparisonEngine<'a> {
    definition: &'a AssessmentDefinition,
    parallel: bool,
}

impl<'a> ComparisonEngine<'a> {
    pub fn new(definition: &'a AssessmentDefinition, parallel: bool) -> Self {
        Self {
            definition,
            parallel,
        }
    }

    /// Results follow the order of `question_ids`; repeated ids are reported once.
    pub fn compare(&self, question_ids: &[QuestionId], records: &[RatingRecord]) -> ComparisonReport {
        let mut report = ComparisonReport::default();
        let mut requested = Vec::new();
        let mut seen = HashSet::new();

        for id in question_ids {
            if !seen.insert(id) {
                continue;
            }
            match self.definition.question(id) {
                Some(question) => requested.push(question),
                None => report.unknown_questions.push(id.clone()),
            }
        }

        let wanted: HashSet<&QuestionId> = requested.iter().map(|question| &question.id).collect();
        let mut by_question: BTreeMap<&QuestionId, Vec<&RatingRecord>> = BTreeMap::new();
        for record in records.iter().filter(|record| wanted.contains(&record.question_id)) {
            by_question.entry(&record.question_id).or_default().push(record);
        }

        let build = |question: &&Question| {
            let scoped = by_question.get(&question.id).map(Vec::as_slice).unwrap_or(&[]);
            compare_question(&question.id, &question.text, scoped)
        };

        report.results = if self.parallel {
            requested.par_iter().map(build).collect()
        } else {
            requested.iter().map(build).collect()
        };

        report
    }
}

fn compare_question(id: &QuestionId, text: &str, records: &[&RatingRecord]) -> ComparisonResult {
    let group = RatingGroup::from_records(records.iter().copied());
    let combined = group.combined();

    let mut score_distribution = BTreeMap::new();
    for record in records {
        *score_distribution.entry(record.rating).or_insert(0) += 1;
    }

    ComparisonResult {
        question_id: id.clone(),
        question_text: text.to_string(),
        average_score: combined.average(),
        total_responses: combined.count(),
        distinct_reviewers: group.reviewers().distinct_respondents(),
        score_distribution,
        relationship_type_averages: group
            .buckets()
            .iter()
            .map(|(relationship, tally)| (*relationship, tally.stats()))
            .collect(),
    }
}
