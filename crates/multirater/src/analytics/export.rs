//! Flat question × relationship rows for spreadsheet exports.
//!
//! Organization exports also carry one question-level row per question, with
//! an empty `relationship_type`, gated on the question's own floor. That row
//! lets a disclosed question mean be rebuilt even when one of its buckets is
//! hidden.

use super::domain::{QuestionId, RelationshipType};
use super::privacy::Disclosure;
use super::views::{BucketView, OrganizationAnalyticsView, ScopedAverageView, SubjectReportView};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid export CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// One question × relationship bucket, or the whole question when
/// `relationship_type` is empty. `average` is empty whenever the figure is
/// suppressed or has no ratings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRow {
    pub question_id: QuestionId,
    pub relationship_type: Option<RelationshipType>,
    pub average: Option<f64>,
    pub count: usize,
    pub suppressed: bool,
}

impl ExportRow {
    fn from_bucket(question_id: &QuestionId, bucket: &BucketView) -> Self {
        Self {
            question_id: question_id.clone(),
            relationship_type: Some(bucket.relationship_type),
            average: bucket.average.value().copied(),
            count: bucket.count,
            suppressed: bucket.average.is_suppressed(),
        }
    }

    fn from_question(entry: &ScopedAverageView<QuestionId>) -> Self {
        Self {
            question_id: entry.id.clone(),
            relationship_type: None,
            average: entry.average.value().copied(),
            count: entry.response_count,
            suppressed: entry.average.is_suppressed(),
        }
    }
}

pub fn flatten_organization(view: &OrganizationAnalyticsView) -> Vec<ExportRow> {
    let mut rows = Vec::new();
    for question in &view.question_breakdown {
        if let Some(entry) = view
            .question_averages
            .iter()
            .find(|entry| entry.id == question.question_id)
        {
            rows.push(ExportRow::from_question(entry));
        }
        rows.extend(
            question
                .buckets
                .iter()
                .map(|bucket| ExportRow::from_bucket(&question.question_id, bucket)),
        );
    }
    rows
}

pub fn flatten_subject(view: &SubjectReportView) -> Vec<ExportRow> {
    view.questions()
        .flat_map(|question| {
            question
                .summary
                .relationship_breakdown
                .iter()
                .map(move |bucket| ExportRow::from_bucket(&question.question_id, bucket))
        })
        .collect()
}

pub fn write_csv<W: Write>(rows: &[ExportRow], writer: W) -> Result<(), ExportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<ExportRow>, ExportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();
    for row in csv_reader.deserialize::<ExportRow>() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Rebuilds per-question means from exported rows.
///
/// A question-level row is taken as is when disclosed and drops the question
/// when hidden. Without one, bucket rows are recombined weighted by count;
/// ratings are whole numbers, so `average * count` rounds back to each
/// bucket's integral sum and the mean comes out exact. A question with any
/// suppressed or empty bucket cannot be rebuilt that way and is left out.
pub fn reaggregate(rows: &[ExportRow]) -> BTreeMap<QuestionId, f64> {
    let mut whole: BTreeMap<&QuestionId, Option<f64>> = BTreeMap::new();
    let mut totals: BTreeMap<&QuestionId, Option<(u64, usize)>> = BTreeMap::new();

    for row in rows {
        let disclosed = row.average.filter(|_| !row.suppressed);
        if row.relationship_type.is_none() {
            whole.insert(&row.question_id, disclosed);
            continue;
        }

        let entry = totals.entry(&row.question_id).or_insert(Some((0, 0)));
        let Some(average) = disclosed else {
            *entry = None;
            continue;
        };
        if let Some((sum, count)) = entry {
            *sum += (average * row.count as f64).round() as u64;
            *count += row.count;
        }
    }

    let mut rebuilt: BTreeMap<QuestionId, f64> = totals
        .into_iter()
        .filter(|(question, _)| !whole.contains_key(question))
        .filter_map(|(question, total)| match total {
            Some((sum, count)) if count > 0 => Some((question.clone(), sum as f64 / count as f64)),
            _ => None,
        })
        .collect();
    rebuilt.extend(
        whole
            .into_iter()
            .filter_map(|(question, average)| average.map(|average| (question.clone(), average))),
    );
    rebuilt
}

/// Disclosed question means from an organization view, keyed like [`reaggregate`].
pub fn disclosed_question_averages(view: &OrganizationAnalyticsView) -> BTreeMap<QuestionId, f64> {
    view.question_averages
        .iter()
        .filter_map(|entry| match entry.average {
            Disclosure::Disclosed(average) => Some((entry.id.clone(), average)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(question: &str, relationship: RelationshipType, average: Option<f64>, count: usize) -> ExportRow {
        ExportRow {
            question_id: QuestionId::from(question),
            relationship_type: Some(relationship),
            average,
            count,
            suppressed: false,
        }
    }

    #[test]
    fn reaggregate_weights_by_count() {
        let rows = vec![
            row("q1", RelationshipType::SelfReview, Some(6.0), 1),
            row("q1", RelationshipType::Peer, Some(5.0 / 3.0 + 3.0), 3),
        ];
        let averages = reaggregate(&rows);
        // (6 + 14) / 4
        assert_eq!(averages.get(&QuestionId::from("q1")), Some(&5.0));
    }

    #[test]
    fn reaggregate_skips_questions_with_hidden_buckets() {
        let mut hidden = row("q2", RelationshipType::Supervisor, None, 2);
        hidden.suppressed = true;
        let rows = vec![
            row("q1", RelationshipType::Peer, Some(4.0), 3),
            row("q2", RelationshipType::Peer, Some(5.0), 3),
            hidden,
        ];
        let averages = reaggregate(&rows);
        assert_eq!(averages.len(), 1);
        assert!(averages.contains_key(&QuestionId::from("q1")));
    }

    #[test]
    fn question_rows_take_precedence_over_buckets() {
        let mut hidden = row("q1", RelationshipType::Supervisor, None, 1);
        hidden.suppressed = true;
        let whole = ExportRow {
            relationship_type: None,
            ..row("q1", RelationshipType::Peer, Some(19.0 / 5.0), 5)
        };
        let mut hidden_whole = ExportRow {
            relationship_type: None,
            ..row("q2", RelationshipType::Peer, None, 2)
        };
        hidden_whole.suppressed = true;
        let rows = vec![
            whole,
            row("q1", RelationshipType::Peer, Some(4.5), 4),
            hidden,
            hidden_whole,
            row("q2", RelationshipType::Peer, Some(5.0), 2),
        ];

        let averages = reaggregate(&rows);
        assert_eq!(averages.len(), 1);
        assert_eq!(averages[&QuestionId::from("q1")], 19.0 / 5.0);
    }

    #[test]
    fn csv_keeps_empty_average_for_suppressed_rows() {
        let mut hidden = row("q1", RelationshipType::Supervisor, None, 1);
        hidden.suppressed = true;
        let whole = ExportRow {
            relationship_type: None,
            ..row("q1", RelationshipType::Peer, Some(4.4), 5)
        };
        let rows = vec![whole, row("q1", RelationshipType::Peer, Some(4.5), 4), hidden];

        let mut buffer = Vec::new();
        write_csv(&rows, &mut buffer).expect("write");
        let text = String::from_utf8(buffer.clone()).expect("utf8");
        assert!(text.starts_with("question_id,relationship_type,average,count,suppressed"));
        assert!(text.contains("q1,supervisor,,1,true"));
        assert!(text.contains("q1,,4.4,5,false"));

        let parsed = read_csv(buffer.as_slice()).expect("read");
        assert_eq!(parsed, rows);
    }
}
