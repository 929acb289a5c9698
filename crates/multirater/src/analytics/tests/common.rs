use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::analytics::cache::{AnalyticsScope, CachedReport};
use crate::analytics::definition::{AssessmentDefinition, Competency, Question, Section};
use crate::analytics::domain::{
    AssessmentId, Assignment, AssignmentId, AssignmentStatus, CompetencyId, OrganizationId,
    QuestionId, RelationshipType, RespondentId, SectionId, SubjectId,
};
use crate::analytics::engine::{AnalyticsEngine, EngineConfig};
use crate::analytics::normalizer::{RawRating, RawResponseRow};
use crate::analytics::store::{ResponseStore, StoreError};

pub(super) const ASSESSMENT: &str = "annual-2025";

fn question(id: &str, text: &str, section: &str, competencies: &[&str]) -> Question {
    Question {
        id: QuestionId::from(id),
        text: text.to_string(),
        section_id: SectionId::from(section),
        scale_max: 7,
        competencies: competencies
            .iter()
            .map(|competency| CompetencyId::from(*competency))
            .collect(),
    }
}

/// Two sections, three competencies, three questions on a 1-7 scale.
///
/// q1 feeds communication and vision, q2 vision only, q3 teamwork and
/// communication.
pub(super) fn definition() -> AssessmentDefinition {
    AssessmentDefinition::new(
        AssessmentId::from(ASSESSMENT),
        "Annual 360 review",
        vec![
            Section {
                id: SectionId::from("leadership"),
                title: "Leadership".to_string(),
            },
            Section {
                id: SectionId::from("collaboration"),
                title: "Collaboration".to_string(),
            },
        ],
        vec![
            Competency {
                id: CompetencyId::from("communication"),
                name: "Communication".to_string(),
            },
            Competency {
                id: CompetencyId::from("vision"),
                name: "Vision".to_string(),
            },
            Competency {
                id: CompetencyId::from("teamwork"),
                name: "Teamwork".to_string(),
            },
        ],
        vec![
            question("q1", "Communicates clearly", "leadership", &["communication", "vision"]),
            question("q2", "Sets direction", "leadership", &["vision"]),
            question("q3", "Supports teammates", "collaboration", &["teamwork", "communication"]),
        ],
    )
    .expect("fixture definition is valid")
}

pub(super) fn row(
    assignment: &str,
    question: &str,
    rating: i64,
    respondent: &str,
    relationship: &str,
) -> RawResponseRow {
    RawResponseRow {
        assignment_id: assignment.to_string(),
        question_id: question.to_string(),
        rating: Some(RawRating::Integer(rating)),
        comment: None,
        respondent_id: respondent.to_string(),
        relationship_type: relationship.to_string(),
        competency_id: None,
    }
}

pub(super) fn commented(mut raw: RawResponseRow, comment: &str) -> RawResponseRow {
    raw.comment = Some(comment.to_string());
    raw
}

/// Self rating plus one peer rating per entry of `peers`, all on `question`.
/// Each rater gets an assignment of their own.
pub(super) fn ratings_for(question: &str, own: Option<i64>, peers: &[i64]) -> Vec<RawResponseRow> {
    let mut rows = Vec::new();
    if let Some(rating) = own {
        rows.push(row("a-self", question, rating, "resp-self", "self"));
    }
    for (idx, rating) in peers.iter().enumerate() {
        rows.push(row(
            &format!("a-peer-{idx}"),
            question,
            *rating,
            &format!("resp-peer-{idx}"),
            "peer",
        ));
    }
    rows
}

pub(super) fn engine() -> AnalyticsEngine {
    AnalyticsEngine::new(EngineConfig::default()).expect("default config is valid")
}

pub(super) fn engine_with(config: EngineConfig) -> AnalyticsEngine {
    AnalyticsEngine::new(config).expect("test config is valid")
}

pub(super) fn sequential_engine() -> AnalyticsEngine {
    engine_with(EngineConfig {
        parallel: false,
        ..EngineConfig::default()
    })
}

pub(super) fn assignment(
    id: &str,
    subject: &str,
    respondent: &str,
    relationship: RelationshipType,
    status: AssignmentStatus,
) -> Assignment {
    Assignment {
        id: AssignmentId::from(id),
        subject_id: SubjectId::from(subject),
        respondent_id: RespondentId::from(respondent),
        relationship_type: relationship,
        status,
        completed_at: None,
    }
}

pub(super) fn scope() -> AnalyticsScope {
    AnalyticsScope::new(OrganizationId::from("acme"), AssessmentId::from(ASSESSMENT))
}

#[derive(Default, Clone)]
pub(super) struct InMemoryResponseStore {
    definitions: Arc<Mutex<HashMap<AssessmentId, AssessmentDefinition>>>,
    responses: Arc<Mutex<Vec<RawResponseRow>>>,
    assignments: Arc<Mutex<Vec<Assignment>>>,
    saved: Arc<Mutex<Vec<(AnalyticsScope, &'static str)>>>,
    reads: Arc<Mutex<usize>>,
}

impl InMemoryResponseStore {
    pub(super) fn seeded(rows: Vec<RawResponseRow>, assignments: Vec<Assignment>) -> Self {
        let store = Self::default();
        let definition = definition();
        store
            .definitions
            .lock()
            .expect("definition mutex poisoned")
            .insert(definition.id().clone(), definition);
        *store.responses.lock().expect("response mutex poisoned") = rows;
        *store.assignments.lock().expect("assignment mutex poisoned") = assignments;
        store
    }

    pub(super) fn push_response(&self, row: RawResponseRow) {
        self.responses
            .lock()
            .expect("response mutex poisoned")
            .push(row);
    }

    pub(super) fn saved(&self) -> Vec<(AnalyticsScope, &'static str)> {
        self.saved.lock().expect("saved mutex poisoned").clone()
    }

    pub(super) fn reads(&self) -> usize {
        *self.reads.lock().expect("read counter poisoned")
    }
}

impl ResponseStore for InMemoryResponseStore {
    fn definition(&self, assessment: &AssessmentId) -> Result<AssessmentDefinition, StoreError> {
        let guard = self.definitions.lock().expect("definition mutex poisoned");
        guard
            .get(assessment)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("assessment {assessment}")))
    }

    fn responses(&self, _scope: &AnalyticsScope) -> Result<Vec<RawResponseRow>, StoreError> {
        *self.reads.lock().expect("read counter poisoned") += 1;
        Ok(self.responses.lock().expect("response mutex poisoned").clone())
    }

    fn assignments(&self, _scope: &AnalyticsScope) -> Result<Vec<Assignment>, StoreError> {
        Ok(self
            .assignments
            .lock()
            .expect("assignment mutex poisoned")
            .clone())
    }

    fn save_report(&self, scope: &AnalyticsScope, report: &CachedReport) -> Result<(), StoreError> {
        self.saved
            .lock()
            .expect("saved mutex poisoned")
            .push((scope.clone(), report.kind_label()));
        Ok(())
    }
}
