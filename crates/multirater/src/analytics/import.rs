//! File adapters for the CLI and tests: CSV response and assignment exports,
//! JSON assessment definitions.

use super::definition::AssessmentDefinition;
use super::domain::{
    Assignment, AssignmentId, AssignmentStatus, RelationshipType, RespondentId, SubjectId,
};
use super::normalizer::{RawRating, RawResponseRow};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid assessment definition: {0}")]
    Json(#[from] serde_json::Error),
    #[error("assignment row {row}: {detail}")]
    InvalidAssignment { row: usize, detail: String },
}

#[derive(Debug, Deserialize)]
struct ResponseCsvRow {
    assignment_id: String,
    question_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    rating: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    comment: Option<String>,
    respondent_id: String,
    relationship_type: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    competency_id: Option<String>,
}

/// Rating cells stay text so a bad cell becomes a normalizer diagnostic
/// instead of failing the whole file.
pub fn responses_from_reader<R: Read>(reader: R) -> Result<Vec<RawResponseRow>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut rows = Vec::new();

    for record in csv_reader.deserialize::<ResponseCsvRow>() {
        let row = record?;
        rows.push(RawResponseRow {
            assignment_id: row.assignment_id,
            question_id: row.question_id,
            rating: row.rating.map(RawRating::Text),
            comment: row.comment,
            respondent_id: row.respondent_id,
            relationship_type: row.relationship_type,
            competency_id: row.competency_id,
        });
    }

    Ok(rows)
}

pub fn responses_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RawResponseRow>, ImportError> {
    responses_from_reader(std::fs::File::open(path)?)
}

#[derive(Debug, Deserialize)]
struct AssignmentCsvRow {
    assignment_id: String,
    subject_id: String,
    respondent_id: String,
    relationship_type: String,
    status: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    completed_at: Option<String>,
}

pub fn assignments_from_reader<R: Read>(reader: R) -> Result<Vec<Assignment>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut assignments = Vec::new();

    for (idx, record) in csv_reader.deserialize::<AssignmentCsvRow>().enumerate() {
        let row = record?;
        let invalid = |detail: String| ImportError::InvalidAssignment { row: idx + 1, detail };

        let relationship_type = RelationshipType::parse(&row.relationship_type)
            .ok_or_else(|| invalid(format!("unknown relationship '{}'", row.relationship_type)))?;
        let status = AssignmentStatus::parse(&row.status)
            .ok_or_else(|| invalid(format!("unknown status '{}'", row.status)))?;
        let completed_at = match row.completed_at.as_deref() {
            Some(raw) => Some(
                parse_timestamp(raw).ok_or_else(|| invalid(format!("unreadable timestamp '{raw}'")))?,
            ),
            None => None,
        };

        assignments.push(Assignment {
            id: AssignmentId::new(row.assignment_id),
            subject_id: SubjectId::new(row.subject_id),
            respondent_id: RespondentId::new(row.respondent_id),
            relationship_type,
            status,
            completed_at,
        });
    }

    Ok(assignments)
}

pub fn assignments_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Assignment>, ImportError> {
    assignments_from_reader(std::fs::File::open(path)?)
}

pub fn definition_from_reader<R: Read>(reader: R) -> Result<AssessmentDefinition, ImportError> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn definition_from_path<P: AsRef<Path>>(path: P) -> Result<AssessmentDefinition, ImportError> {
    definition_from_reader(std::fs::File::open(path)?)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_rows_keep_bad_ratings_as_text() {
        let csv = "assignment_id,question_id,rating,comment,respondent_id,relationship_type,competency_id\n\
a1,q1,6,Strong communicator,r1,peer,\n\
a2,q1,,,r2,manager,\n\
a3,q1,seven,,r3,peer,comm\n";
        let rows = responses_from_reader(csv.as_bytes()).expect("csv parses");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].rating, Some(RawRating::Text("6".to_string())));
        assert_eq!(rows[0].comment.as_deref(), Some("Strong communicator"));
        assert!(rows[0].competency_id.is_none());
        assert!(rows[1].rating.is_none());
        assert_eq!(rows[2].rating, Some(RawRating::Text("seven".to_string())));
        assert_eq!(rows[2].competency_id.as_deref(), Some("comm"));
    }

    #[test]
    fn assignments_parse_status_and_timestamps() {
        let csv = "assignment_id,subject_id,respondent_id,relationship_type,status,completed_at\n\
a1,s1,r1,self,completed,2025-03-01T09:30:00Z\n\
a2,s1,r2,peer,in progress,\n\
a3,s1,r3,direct report,complete,2025-03-04\n";
        let assignments = assignments_from_reader(csv.as_bytes()).expect("csv parses");
        assert_eq!(assignments.len(), 3);
        assert!(assignments[0].is_completed());
        assert_eq!(assignments[1].status, AssignmentStatus::InProgress);
        assert_eq!(assignments[2].relationship_type, RelationshipType::Subordinate);
        assert_eq!(
            assignments[2].completed_at.map(|dt| dt.date_naive()),
            NaiveDate::from_ymd_opt(2025, 3, 4)
        );
    }

    #[test]
    fn assignments_reject_unknown_relationship() {
        let csv = "assignment_id,subject_id,respondent_id,relationship_type,status,completed_at\n\
a1,s1,r1,mentor,pending,\n";
        let err = assignments_from_reader(csv.as_bytes()).expect_err("unknown relationship");
        assert!(matches!(err, ImportError::InvalidAssignment { row: 1, .. }));
    }
}
