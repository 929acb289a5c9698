use super::definition::AssessmentDefinition;
use super::domain::{AssignmentId, CompetencyId, QuestionId, RatingRecord, RelationshipType, RespondentId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Rating cell as delivered upstream: JSON numbers, or text from CSV exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawRating {
    Integer(i64),
    Decimal(f64),
    Text(String),
}

/// Unvalidated response row handed over by the response store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponseRow {
    pub assignment_id: String,
    pub question_id: String,
    #[serde(default)]
    pub rating: Option<RawRating>,
    #[serde(default)]
    pub comment: Option<String>,
    pub respondent_id: String,
    pub relationship_type: String,
    #[serde(default)]
    pub competency_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    MissingRating,
    InvalidRating,
    OutOfRange,
    UnknownQuestion,
    UnknownCompetency,
    UnknownRelationship,
    MissingRespondent,
    DuplicateResponse,
    ConflictingResponse,
}

impl RejectionReason {
    pub const fn kind(self) -> DiagnosticKind {
        match self {
            Self::UnknownQuestion | Self::UnknownCompetency => DiagnosticKind::Configuration,
            _ => DiagnosticKind::Validation,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::MissingRating => "missing_rating",
            Self::InvalidRating => "invalid_rating",
            Self::OutOfRange => "out_of_range",
            Self::UnknownQuestion => "unknown_question",
            Self::UnknownCompetency => "unknown_competency",
            Self::UnknownRelationship => "unknown_relationship",
            Self::MissingRespondent => "missing_respondent",
            Self::DuplicateResponse => "duplicate_response",
            Self::ConflictingResponse => "conflicting_response",
        }
    }
}

/// Malformed row vs. row pointing at something the definition does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Validation,
    Configuration,
}

/// Data-quality warning for one dropped row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub row: usize,
    pub assignment_id: String,
    pub question_id: String,
    pub kind: DiagnosticKind,
    pub reason: RejectionReason,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatch {
    pub records: Vec<RatingRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl NormalizedBatch {
    pub fn rejected(&self) -> usize {
        self.diagnostics.len()
    }
}

/// Validates rows against the definition. Bad rows become diagnostics.
///
/// Repeated answers for an (assignment, question) pair are settled without
/// looking at row order: identical copies collapse to one record, while
/// answers that disagree are all rejected as conflicting.
pub fn normalize(rows: &[RawResponseRow], definition: &AssessmentDefinition) -> NormalizedBatch {
    let mut batch = NormalizedBatch::default();
    let mut accepted: Vec<(usize, RatingRecord)> = Vec::new();

    for (row_idx, row) in rows.iter().enumerate() {
        match normalize_row(row, definition) {
            Ok(record) => accepted.push((row_idx, record)),
            Err((reason, detail)) => reject(&mut batch, row_idx, row, reason, detail),
        }
    }

    let mut answers: HashMap<(&AssignmentId, &QuestionId), Vec<usize>> = HashMap::new();
    for (position, (_, record)) in accepted.iter().enumerate() {
        answers
            .entry((&record.assignment_id, &record.question_id))
            .or_default()
            .push(position);
    }

    let mut verdicts: Vec<Option<(RejectionReason, String)>> = vec![None; accepted.len()];
    for positions in answers.values() {
        let [first, rest @ ..] = positions.as_slice() else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        let conflicting = rest
            .iter()
            .any(|position| accepted[*position].1 != accepted[*first].1);
        if conflicting {
            for position in positions {
                verdicts[*position] = Some((
                    RejectionReason::ConflictingResponse,
                    format!("assignment answered this question {} different ways", positions.len()),
                ));
            }
        } else {
            for position in rest {
                verdicts[*position] = Some((
                    RejectionReason::DuplicateResponse,
                    "assignment already answered this question".to_string(),
                ));
            }
        }
    }

    for ((row_idx, record), verdict) in accepted.into_iter().zip(verdicts) {
        match verdict {
            Some((reason, detail)) => reject(&mut batch, row_idx, &rows[row_idx], reason, detail),
            None => batch.records.push(record),
        }
    }
    batch.diagnostics.sort_by_key(|diagnostic| diagnostic.row);

    if !batch.diagnostics.is_empty() {
        warn!(
            assessment = %definition.id(),
            accepted = batch.records.len(),
            rejected = batch.diagnostics.len(),
            "dropped malformed rating rows"
        );
    }

    batch
}

fn reject(
    batch: &mut NormalizedBatch,
    row: usize,
    raw: &RawResponseRow,
    reason: RejectionReason,
    detail: String,
) {
    debug!(row, reason = reason.label(), %detail, "rating row rejected");
    batch.diagnostics.push(Diagnostic {
        row,
        assignment_id: raw.assignment_id.clone(),
        question_id: raw.question_id.clone(),
        kind: reason.kind(),
        reason,
        detail,
    });
}

fn normalize_row(
    row: &RawResponseRow,
    definition: &AssessmentDefinition,
) -> Result<RatingRecord, (RejectionReason, String)> {
    let question_id = QuestionId::new(row.question_id.trim());
    let question = definition.question(&question_id).ok_or_else(|| {
        (
            RejectionReason::UnknownQuestion,
            format!("question '{}' is not part of {}", row.question_id, definition.id()),
        )
    })?;

    let relationship_type = RelationshipType::parse(&row.relationship_type).ok_or_else(|| {
        (
            RejectionReason::UnknownRelationship,
            format!("relationship '{}' is not recognised", row.relationship_type),
        )
    })?;

    let respondent = row.respondent_id.trim();
    if respondent.is_empty() {
        return Err((
            RejectionReason::MissingRespondent,
            "respondent id is blank".to_string(),
        ));
    }

    let rating = parse_rating(row.rating.as_ref())?;
    let scale = definition.scale();
    if !scale.contains(rating) {
        return Err((
            RejectionReason::OutOfRange,
            format!("rating {rating} outside {}-{}", scale.min(), scale.max()),
        ));
    }

    let competency_id = match row
        .competency_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        Some(raw) => {
            let competency = CompetencyId::new(raw);
            if !question.competencies.contains(&competency) {
                return Err((
                    RejectionReason::UnknownCompetency,
                    format!("competency '{raw}' is not mapped to question {}", question.id),
                ));
            }
            Some(competency)
        }
        None => None,
    };

    let comment = row
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    Ok(RatingRecord {
        assignment_id: AssignmentId::new(row.assignment_id.trim()),
        question_id,
        competency_id,
        relationship_type,
        // `scale.contains` bounds the value to 1..=100.
        rating: rating as u8,
        respondent_id: RespondentId::new(respondent),
        comment,
    })
}

fn parse_rating(raw: Option<&RawRating>) -> Result<i64, (RejectionReason, String)> {
    let invalid = |shown: String| {
        (
            RejectionReason::InvalidRating,
            format!("rating '{shown}' is not a whole number"),
        )
    };

    match raw {
        None => Err((RejectionReason::MissingRating, "rating is empty".to_string())),
        Some(RawRating::Integer(value)) => Ok(*value),
        Some(RawRating::Decimal(value)) => whole_number(*value).ok_or_else(|| invalid(value.to_string())),
        Some(RawRating::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
                return Err((RejectionReason::MissingRating, "rating is empty".to_string()));
            }
            if let Ok(value) = trimmed.parse::<i64>() {
                return Ok(value);
            }
            trimmed
                .parse::<f64>()
                .ok()
                .and_then(whole_number)
                .ok_or_else(|| invalid(trimmed.to_string()))
        }
    }
}

fn whole_number(value: f64) -> Option<i64> {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e9 {
        Some(value as i64)
    } else {
        None
    }
}

#[cfg(test)]
pub(crate) fn parse_rating_for_tests(raw: Option<&RawRating>) -> Result<i64, RejectionReason> {
    parse_rating(raw).map_err(|(reason, _)| reason)
}
