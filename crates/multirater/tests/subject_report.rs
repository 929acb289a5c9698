use multirater::analytics::import::{definition_from_reader, responses_from_reader};
use multirater::analytics::{
    AlignmentLabel, AnalyticsEngine, Disclosure, EngineConfig, QuestionId, RejectionReason,
};
use serde_json::{json, Value};

const DEFINITION: &str = r#"{
    "id": "annual-2025",
    "title": "Annual 360 review",
    "sections": [
        {"id": "leadership", "title": "Leadership"},
        {"id": "collaboration", "title": "Collaboration"}
    ],
    "competencies": [
        {"id": "communication", "name": "Communication"},
        {"id": "vision", "name": "Vision"}
    ],
    "questions": [
        {"id": "q1", "text": "Communicates clearly", "section_id": "leadership", "competencies": ["communication", "vision"]},
        {"id": "q2", "text": "Sets direction", "section_id": "leadership", "competencies": ["vision"]},
        {"id": "q3", "text": "Supports teammates", "section_id": "collaboration", "competencies": ["communication"]}
    ]
}"#;

const RESPONSES: &str = "assignment_id,question_id,rating,comment,respondent_id,relationship_type,competency_id\n\
a-self,q1,6,Doing my best,u-self,self,\n\
a-p1,q1,4,Runs tight meetings,u-p1,peer,\n\
a-p2,q1,5,,u-p2,Peer,\n\
a-p3,q1,6,Clear priorities,u-p3,colleague,\n\
a-self,q2,3,,u-self,self,\n\
a-p1,q2,6,,u-p1,peer,\n\
a-p2,q2,7,,u-p2,peer,\n\
a-p3,q2,,,u-p3,peer,\n\
a-p3,q9,5,,u-p3,peer,\n";

fn engine() -> AnalyticsEngine {
    AnalyticsEngine::new(EngineConfig::default()).expect("default config is valid")
}

#[test]
fn imported_files_produce_a_gated_subject_report() {
    let definition = definition_from_reader(DEFINITION.as_bytes()).expect("definition parses");
    let rows = responses_from_reader(RESPONSES.as_bytes()).expect("responses parse");
    assert_eq!(rows.len(), 9);

    let engine = engine();
    let report = engine.subject_report(&definition, &rows);
    assert_eq!(report.records_accepted, 7);
    let reasons: Vec<_> = report.diagnostics.iter().map(|d| d.reason).collect();
    assert_eq!(
        reasons,
        vec![RejectionReason::MissingRating, RejectionReason::UnknownQuestion]
    );

    let q2 = report.question(&QuestionId::from("q2")).expect("q2 result");
    assert_eq!(q2.summary.alignment, AlignmentLabel::HiddenStrength);

    let view = engine.guard().subject_view(&report, &definition);
    let q1 = view.questions().next().expect("q1 view");
    assert_eq!(q1.summary.avg_reviewer_rating, Disclosure::Disclosed(5.0));
    assert_eq!(q1.summary.alignment, AlignmentLabel::BlindSpot);
    assert_eq!(
        q1.summary.comments,
        Disclosure::Disclosed(vec![
            "Clear priorities".to_string(),
            "Runs tight meetings".to_string()
        ])
    );

    let q2 = view.questions().nth(1).expect("q2 view");
    assert_eq!(q2.summary.self_rating, Some(3.0));
    assert_eq!(q2.summary.avg_reviewer_rating, Disclosure::Suppressed);
    assert_eq!(q2.summary.alignment, AlignmentLabel::InsufficientData);
}

#[test]
fn subject_report_serializes_with_status_tags() {
    let definition = definition_from_reader(DEFINITION.as_bytes()).expect("definition parses");
    let rows = responses_from_reader(RESPONSES.as_bytes()).expect("responses parse");
    let engine = engine();
    let view = engine
        .guard()
        .subject_view(&engine.subject_report(&definition, &rows), &definition);

    let value: Value = serde_json::to_value(&view).expect("view serializes");
    assert_eq!(value["assessment_title"], "Annual 360 review");

    let leadership = &value["sections"][0];
    assert_eq!(leadership["section_title"], "Leadership");
    assert_eq!(leadership["reviewer_average"]["status"], "disclosed");

    let q1 = &leadership["questions"][0];
    assert_eq!(q1["question_id"], "q1");
    assert_eq!(
        q1["avg_reviewer_rating"],
        json!({"status": "disclosed", "value": 5.0})
    );
    assert_eq!(q1["gap"], json!({"status": "disclosed", "value": 1.0}));
    assert_eq!(q1["alignment"], "blind_spot");
    assert_eq!(q1["score_band"], "good");

    let q2 = &leadership["questions"][1];
    assert_eq!(q2["avg_reviewer_rating"], json!({"status": "suppressed"}));
    assert_eq!(q2["alignment"], "insufficient_data");
    assert_eq!(q2["self_rating"], 3.0);

    let q3 = &value["sections"][1]["questions"][0];
    assert_eq!(q3["avg_reviewer_rating"], json!({"status": "insufficient_data"}));
    assert!(q3.get("self_rating").is_none());

    assert_eq!(value["diagnostics"][0]["reason"], "missing_rating");
    assert_eq!(value["diagnostics"][1]["kind"], "configuration");
    assert!(!value.to_string().contains("u-p1"));
}

#[test]
fn five_point_scales_rescale_the_alignment_threshold() {
    let definition = definition_from_reader(
        DEFINITION
            .replace(
                "\"competencies\": [\"communication\", \"vision\"]}",
                "\"scale_max\": 5, \"competencies\": [\"communication\", \"vision\"]}",
            )
            .replace(
                "\"competencies\": [\"vision\"]}",
                "\"scale_max\": 5, \"competencies\": [\"vision\"]}",
            )
            .replace(
                "\"competencies\": [\"communication\"]}",
                "\"scale_max\": 5, \"competencies\": [\"communication\"]}",
            )
            .as_bytes(),
    )
    .expect("five point definition parses");
    assert_eq!(definition.scale().max(), 5);

    let csv = "assignment_id,question_id,rating,comment,respondent_id,relationship_type,competency_id\n\
a-self,q1,5,,u-self,self,\n\
a-p1,q1,4,,u-p1,peer,\n\
a-p2,q1,4,,u-p2,peer,\n\
a-p3,q1,4,,u-p3,peer,\n\
a-p4,q1,6,,u-p4,peer,\n\
a-p5,q1,5,,u-p5,peer,\n\
a-self,q2,3,,u-self,self,\n\
a-p1,q2,4,,u-p1,peer,\n\
a-p2,q2,4,,u-p2,peer,\n\
a-p3,q2,3,,u-p3,peer,\n\
a-self,q3,4,,u-self,self,\n\
a-p1,q3,3,,u-p1,peer,\n\
a-p2,q3,3,,u-p2,peer,\n\
a-p3,q3,4,,u-p3,peer,\n";
    let rows = responses_from_reader(csv.as_bytes()).expect("responses parse");
    let report = engine().subject_report(&definition, &rows);

    assert_eq!(report.diagnostics[0].reason, RejectionReason::OutOfRange);
    let q1 = report.question(&QuestionId::from("q1")).expect("q1");
    // 0.75 is past the rescaled 0.67 threshold; on 1-7 it would be aligned.
    assert_eq!(q1.summary.gap, Some(0.75));
    assert_eq!(q1.summary.alignment, AlignmentLabel::BlindSpot);

    // Gaps of exactly 2/3 sit on the rescaled threshold and are flagged.
    let q2 = report.question(&QuestionId::from("q2")).expect("q2");
    assert_eq!(q2.summary.alignment, AlignmentLabel::HiddenStrength);
    let q3 = report.question(&QuestionId::from("q3")).expect("q3");
    assert_eq!(q3.summary.alignment, AlignmentLabel::BlindSpot);
}
