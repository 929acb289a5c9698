use super::alignment::{AlignmentLabel, ThresholdPolicy};
use super::definition::{AssessmentDefinition, RatingScale};
use super::domain::{CompetencyId, QuestionId, RatingRecord, RelationshipType, RespondentId, SectionId};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

/// Running sum of integer ratings. Sums stay integral so averages do not
/// depend on the order records were folded in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingTally {
    sum: u64,
    count: usize,
    respondents: BTreeSet<RespondentId>,
}

impl RatingTally {
    pub fn add(&mut self, record: &RatingRecord) {
        self.sum += u64::from(record.rating);
        self.count += 1;
        self.respondents.insert(record.respondent_id.clone());
    }

    pub fn merge(&mut self, other: &RatingTally) {
        self.sum += other.sum;
        self.count += other.count;
        self.respondents.extend(other.respondents.iter().cloned());
    }

    pub fn sum(&self) -> u64 {
        self.sum
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn distinct_respondents(&self) -> usize {
        self.respondents.len()
    }

    /// `None` for an empty tally.
    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum as f64 / self.count as f64)
        }
    }

    pub fn stats(&self) -> BucketStats {
        BucketStats {
            average: self.average(),
            count: self.count,
            distinct_respondents: self.distinct_respondents(),
        }
    }
}

/// Mean, rating count and distinct respondents of one bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketStats {
    pub average: Option<f64>,
    pub count: usize,
    pub distinct_respondents: usize,
}

/// Ratings of one question, competency or section split by who gave them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingGroup {
    self_ratings: RatingTally,
    reviewers: RatingTally,
    buckets: BTreeMap<RelationshipType, RatingTally>,
    comments: Vec<String>,
}

impl RatingGroup {
    pub fn from_records<'r>(records: impl IntoIterator<Item = &'r RatingRecord>) -> Self {
        let mut group = Self::default();
        for record in records {
            group.add(record);
        }
        group
    }

    pub fn add(&mut self, record: &RatingRecord) {
        if record.is_reviewer() {
            self.reviewers.add(record);
            if let Some(comment) = &record.comment {
                self.comments.push(comment.clone());
            }
        } else {
            self.self_ratings.add(record);
        }
        self.buckets
            .entry(record.relationship_type)
            .or_default()
            .add(record);
    }

    pub fn merge(&mut self, other: &RatingGroup) {
        self.self_ratings.merge(&other.self_ratings);
        self.reviewers.merge(&other.reviewers);
        for (relationship, tally) in &other.buckets {
            self.buckets.entry(*relationship).or_default().merge(tally);
        }
        self.comments.extend(other.comments.iter().cloned());
    }

    pub fn self_ratings(&self) -> &RatingTally {
        &self.self_ratings
    }

    pub fn reviewers(&self) -> &RatingTally {
        &self.reviewers
    }

    pub fn buckets(&self) -> &BTreeMap<RelationshipType, RatingTally> {
        &self.buckets
    }

    /// Self and reviewer ratings pooled together.
    pub fn combined(&self) -> RatingTally {
        let mut all = self.self_ratings.clone();
        all.merge(&self.reviewers);
        all
    }

    pub fn is_empty(&self) -> bool {
        self.self_ratings.count() == 0 && self.reviewers.count() == 0
    }

    pub fn summarize(&self, thresholds: &ThresholdPolicy, scale: RatingScale) -> ScoreSummary {
        let self_rating = self.self_ratings.average();
        let avg_reviewer_rating = self.reviewers.average();
        let alignment = thresholds.classify(
            self_rating,
            avg_reviewer_rating,
            self.reviewers.count(),
            scale,
        );

        let mut comments = self.comments.clone();
        comments.sort();

        ScoreSummary {
            self_rating,
            self_count: self.self_ratings.count(),
            avg_reviewer_rating,
            reviewer_count: self.reviewers.count(),
            distinct_reviewers: self.reviewers.distinct_respondents(),
            gap: alignment.gap,
            alignment: alignment.label,
            comments,
            relationship_breakdown: self
                .buckets
                .iter()
                .map(|(relationship, tally)| (*relationship, tally.stats()))
                .collect(),
        }
    }
}

/// Figures shared by question, competency and section results.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreSummary {
    pub self_rating: Option<f64>,
    pub self_count: usize,
    /// Mean over non-self ratings only; `None` when nobody else answered.
    pub avg_reviewer_rating: Option<f64>,
    pub reviewer_count: usize,
    pub distinct_reviewers: usize,
    /// `self_rating - avg_reviewer_rating`, absent unless both exist.
    pub gap: Option<f64>,
    pub alignment: AlignmentLabel,
    /// Reviewer comments, sorted so their order says nothing about who wrote them.
    pub comments: Vec<String>,
    pub relationship_breakdown: BTreeMap<RelationshipType, BucketStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub section_id: SectionId,
    pub summary: ScoreSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompetencyResult {
    pub competency_id: CompetencyId,
    pub summary: ScoreSummary,
}

/// Record groups in definition order, one per question and one per competency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedRatings {
    pub questions: Vec<RatingGroup>,
    pub competencies: Vec<RatingGroup>,
}

/// Groups records by question and competency and summarizes each group.
pub struct Aggregator<'a> {
    definition: &'a AssessmentDefinition,
    thresholds: ThresholdPolicy,
    parallel: bool,
}

impl<'a> Aggregator<'a> {
    pub fn new(definition: &'a AssessmentDefinition, thresholds: ThresholdPolicy, parallel: bool) -> Self {
        Self {
            definition,
            thresholds,
            parallel,
        }
    }

    pub fn aggregate(&self, records: &[RatingRecord]) -> Vec<QuestionResult> {
        self.questions(&self.group(records))
    }

    pub fn aggregate_competencies(&self, records: &[RatingRecord]) -> Vec<CompetencyResult> {
        self.competencies(&self.group(records))
    }

    /// A rating pinned to a competency feeds only that competency; otherwise it
    /// fans out to every competency its question maps to.
    pub fn group<'r>(&self, records: impl IntoIterator<Item = &'r RatingRecord>) -> GroupedRatings {
        let mut by_question: Vec<Vec<&RatingRecord>> = vec![Vec::new(); self.definition.questions().len()];
        let mut by_competency: Vec<Vec<&RatingRecord>> =
            vec![Vec::new(); self.definition.competencies().len()];

        for record in records {
            let Some(position) = self.definition.question_position(&record.question_id) else {
                continue;
            };
            by_question[position].push(record);

            match &record.competency_id {
                Some(competency) => {
                    if let Some(idx) = self.definition.competency_position(competency) {
                        by_competency[idx].push(record);
                    }
                }
                None => {
                    let question = &self.definition.questions()[position];
                    for competency in &question.competencies {
                        if let Some(idx) = self.definition.competency_position(competency) {
                            by_competency[idx].push(record);
                        }
                    }
                }
            }
        }

        GroupedRatings {
            questions: self.tally(by_question),
            competencies: self.tally(by_competency),
        }
    }

    pub fn questions(&self, grouped: &GroupedRatings) -> Vec<QuestionResult> {
        let scale = self.definition.scale();
        self.definition
            .questions()
            .iter()
            .zip(&grouped.questions)
            .map(|(question, group)| QuestionResult {
                question_id: question.id.clone(),
                section_id: question.section_id.clone(),
                summary: group.summarize(&self.thresholds, scale),
            })
            .collect()
    }

    pub fn competencies(&self, grouped: &GroupedRatings) -> Vec<CompetencyResult> {
        let scale = self.definition.scale();
        self.definition
            .competencies()
            .iter()
            .zip(&grouped.competencies)
            .map(|(competency, group)| CompetencyResult {
                competency_id: competency.id.clone(),
                summary: group.summarize(&self.thresholds, scale),
            })
            .collect()
    }

    pub fn thresholds(&self) -> &ThresholdPolicy {
        &self.thresholds
    }

    fn tally(&self, buckets: Vec<Vec<&RatingRecord>>) -> Vec<RatingGroup> {
        if self.parallel {
            buckets
                .par_iter()
                .map(|bucket| RatingGroup::from_records(bucket.iter().copied()))
                .collect()
        } else {
            buckets
                .iter()
                .map(|bucket| RatingGroup::from_records(bucket.iter().copied()))
                .collect()
        }
    }
}
