use std::sync::Arc;

use super::common::*;
use crate::analytics::cache::ReportKind;
use crate::analytics::domain::{
    AssessmentId, AssignmentStatus, QuestionId, RelationshipType, SubjectId,
};
use crate::analytics::privacy::Disclosure;
use crate::analytics::service::{AnalyticsService, ServiceError};
use crate::analytics::store::StoreError;

fn two_subjects() -> InMemoryResponseStore {
    let assignments = vec![
        assignment("a-self", "s1", "resp-self", RelationshipType::SelfReview, AssignmentStatus::Completed),
        assignment("a-peer-0", "s1", "resp-peer-0", RelationshipType::Peer, AssignmentStatus::Completed),
        assignment("a-peer-1", "s1", "resp-peer-1", RelationshipType::Peer, AssignmentStatus::Completed),
        assignment("a-peer-2", "s1", "resp-peer-2", RelationshipType::Peer, AssignmentStatus::Completed),
        assignment("b-peer", "s2", "resp-peer-0", RelationshipType::Peer, AssignmentStatus::Completed),
    ];
    let mut rows = ratings_for("q1", Some(6), &[4, 5, 6]);
    rows.push(row("b-peer", "q1", 1, "resp-peer-0", "peer"));
    InMemoryResponseStore::seeded(rows, assignments)
}

fn service(store: &InMemoryResponseStore) -> AnalyticsService<InMemoryResponseStore> {
    AnalyticsService::new(Arc::new(store.clone()), Arc::new(engine()))
}

#[test]
fn subject_report_only_sees_that_subjects_assignments() {
    let store = two_subjects();
    let service = service(&store);

    let view = service
        .subject(&scope(), &SubjectId::from("s1"))
        .expect("subject report");
    let q1 = view.questions().next().expect("q1");
    assert_eq!(q1.summary.avg_reviewer_rating, Disclosure::Disclosed(5.0));
    assert_eq!(q1.summary.reviewer_count, 3);

    let other = service
        .subject(&scope(), &SubjectId::from("s2"))
        .expect("second subject");
    let q1 = other.questions().next().expect("q1");
    assert_eq!(q1.summary.avg_reviewer_rating, Disclosure::Suppressed);
}

#[test]
fn unknown_subject_is_an_error() {
    let store = two_subjects();
    let service = service(&store);

    match service.subject(&scope(), &SubjectId::from("s9")) {
        Err(ServiceError::UnknownSubject(subject)) => assert_eq!(subject.as_str(), "s9"),
        other => panic!("expected unknown subject, got {other:?}"),
    }
    assert!(service.cache().is_empty());
}

#[test]
fn missing_definition_surfaces_store_error() {
    let store = two_subjects();
    let service = service(&store);
    let scope = scope();
    let mut elsewhere = scope.clone();
    elsewhere.assessment_id = AssessmentId::from("annual-2024");

    match service.organization(&elsewhere) {
        Err(ServiceError::Store(StoreError::NotFound(what))) => {
            assert!(what.contains("annual-2024"))
        }
        other => panic!("expected missing definition, got {other:?}"),
    }
}

#[test]
fn reports_are_cached_until_responses_change() {
    let store = two_subjects();
    let service = service(&store);
    let scope = scope();

    let first = service.organization(&scope).expect("organization view");
    let again = service.organization(&scope).expect("cached view");
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(store.reads(), 1);
    assert_eq!(store.saved().len(), 1);
    assert_eq!(store.saved()[0].1, "organization");

    let compared = service
        .compare(&scope, &[QuestionId::from("q1")])
        .expect("comparison view");
    assert_eq!(compared.results.len(), 1);
    assert_eq!(service.cache().len(), 2);
    assert!(service
        .cache()
        .computed_at(&scope, &ReportKind::Organization)
        .is_some());

    store.push_response(row("a-peer-0", "q2", 2, "resp-peer-0", "peer"));
    assert_eq!(service.record_responses_changed(&scope), 2);
    assert!(service.cache().is_empty());

    let refreshed = service.organization(&scope).expect("recomputed view");
    assert!(!Arc::ptr_eq(&first, &refreshed));
    assert_eq!(store.reads(), 3);
    assert_eq!(
        refreshed.question_averages[1].response_count,
        first.question_averages[1].response_count + 1
    );
}

#[test]
fn filtered_scopes_are_cached_separately() {
    let store = two_subjects();
    let service = service(&store);
    let scope = scope();
    let filtered = scope.clone().with_filter("department", "sales");

    service.organization(&scope).expect("unfiltered");
    service.organization(&filtered).expect("filtered");
    assert_eq!(service.cache().len(), 2);
    assert_eq!(store.reads(), 2);

    assert_eq!(service.record_responses_changed(&filtered), 2);
}
