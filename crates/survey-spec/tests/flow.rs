use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use survey_spec::{
    Advance, Answer, InputError, OptionValue, Session, Step, Toggle, catalog, is_complete,
    resolve_visibility, visible_options, visible_questions,
};

fn at(minute: u32, second: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 10, minute, second)
        .single()
        .expect("valid timestamp")
}

fn fellowship() -> Arc<survey_spec::SurveySpec> {
    Arc::new(catalog::fellowship().expect("bundled catalog loads"))
}

fn mini() -> Arc<survey_spec::SurveySpec> {
    Arc::new(
        catalog::load(include_str!("fixtures/mini_survey.json")).expect("fixture loads"),
    )
}

fn ids(questions: &[&survey_spec::QuestionSpec]) -> Vec<String> {
    questions.iter().map(|question| question.id.clone()).collect()
}

#[test]
fn hidden_option_is_removed_and_cleared() {
    let spec = fellowship();
    let mut session = Session::new(spec.clone());
    session.start(at(0, 0));

    session.choose("QA1", "cohort1".into()).expect("answer QA1");
    session
        .choose("QB4", "changemakers".into())
        .expect("changemakers visible for cohort 1");
    assert_eq!(
        session.answers().get("QB4"),
        Some(&Answer::Choice("changemakers".into()))
    );

    session.choose("QA1", "cohort2".into()).expect("switch cohort");
    assert_eq!(session.answers().get("QB4"), None);

    let qb4 = spec.question("QB4").expect("QB4 declared");
    let visible: Vec<OptionValue> = visible_options(qb4, session.answers())
        .into_iter()
        .map(|option| option.value.clone())
        .collect();
    assert_eq!(
        visible,
        vec![OptionValue::from("economic"), OptionValue::from("social")]
    );

    let err = session
        .choose("QB4", "changemakers".into())
        .expect_err("hidden option rejected");
    assert!(matches!(err, InputError::HiddenOption { .. }));
}

#[test]
fn follow_up_tracks_multi_selection() {
    let spec = fellowship();
    let mut session = Session::new(spec.clone());
    session.start(at(0, 0));

    let visible =
        |session: &Session| ids(&session.visible_questions()).contains(&"QE1_1".to_string());
    assert!(!visible(&session));

    session.toggle("QE1", "strategy".into()).expect("toggle");
    session.toggle("QE1", "team".into()).expect("toggle");
    assert_eq!(
        session.answers().selections("QE1"),
        &[OptionValue::from("strategy"), OptionValue::from("team")]
    );
    assert!(visible(&session));

    let outcome = session.toggle("QE1", "none".into()).expect("toggle");
    assert_eq!(outcome, Toggle::Changed(vec!["none".into()]));
    assert!(!visible(&session));
}

#[test]
fn visibility_is_idempotent() {
    let spec = fellowship();
    let mut session = Session::new(spec.clone());
    session.choose("QC2", OptionValue::Number(1)).expect("answer");
    session.choose("QF1", OptionValue::Number(4)).expect("answer");

    let first = ids(&visible_questions(&spec, session.answers()));
    let second = ids(&visible_questions(&spec, session.answers()));
    assert_eq!(first, second);
    assert!(first.contains(&"QC3".to_string()));
    assert!(first.contains(&"QF2".to_string()));
    assert!(!first.contains(&"INTRO".to_string()));
    assert_eq!(
        resolve_visibility(&spec, session.answers()),
        resolve_visibility(&spec, session.answers())
    );
}

#[test]
fn one_of_and_matrix_predicates() {
    let spec = fellowship();
    let mut session = Session::new(spec.clone());
    let shown =
        |session: &Session, id: &str| ids(&session.visible_questions()).contains(&id.to_string());

    session.choose("QF1", OptionValue::Number(3)).expect("answer");
    assert!(!shown(&session, "QF2"));
    session.choose("QF1", OptionValue::Number(5)).expect("answer");
    assert!(shown(&session, "QF2"));

    session
        .choose_matrix("QG1", "confidence", "no_change")
        .expect("matrix row");
    assert!(!shown(&session, "QG2"));
    session
        .choose_matrix("QG1", "agency_voice", "mentorship")
        .expect("matrix row");
    assert!(shown(&session, "QG2"));
}

#[test]
fn requires_text_gates_single_and_multi() {
    let spec = fellowship();
    let mut session = Session::new(spec.clone());
    let qb5 = spec.question("QB5").expect("QB5");
    let qc7 = spec.question("QC7").expect("QC7");

    session.choose("QB5", "other".into()).expect("answer");
    assert!(!is_complete(qb5, session.answers()));
    session
        .set_other_text("QB5", &"other".into(), "   ")
        .expect("other text");
    assert!(!is_complete(qb5, session.answers()));
    session
        .set_other_text("QB5", &"other".into(), "Academia 2")
        .expect("other text");
    assert!(is_complete(qb5, session.answers()));

    session.toggle("QC7", "mentorship".into()).expect("toggle");
    assert!(is_complete(qc7, session.answers()));
    session.toggle("QC7", "other".into()).expect("toggle");
    assert!(!is_complete(qc7, session.answers()));
    session
        .set_other_text("QC7", &"other".into(), "Coaching")
        .expect("other text");
    assert!(is_complete(qc7, session.answers()));

    let err = session
        .set_other_text("QC7", &"mentorship".into(), "x")
        .expect_err("no other text slot");
    assert!(matches!(err, InputError::NoOtherText { .. }));
}

#[test]
fn cap_holds_through_session_toggles() {
    let spec = fellowship();
    let mut session = Session::new(spec);
    for value in ["time_commitment", "scheduling", "expectations", "coordination", "mentors"] {
        session.toggle("QH4", value.into()).expect("toggle");
        assert!(session.answers().selections("QH4").len() <= 3);
    }
    assert_eq!(
        session.toggle("QH4", "digital".into()).expect("toggle"),
        Toggle::Rejected
    );
    assert_eq!(
        session.toggle("QH4", "none".into()).expect("toggle"),
        Toggle::Changed(vec!["none".into()])
    );
}

#[test]
fn free_text_strips_digits_on_entry() {
    let spec = fellowship();
    let mut session = Session::new(spec.clone());
    session.enter_text("QB2", "Delhi123").expect("text");
    assert_eq!(session.answers().get("QB2"), Some(&Answer::Text("Delhi".into())));
    assert!(is_complete(spec.question("QB2").expect("QB2"), session.answers()));

    session.enter_text("QH7", "fellow1@example.org").expect("email");
    assert_eq!(
        session.answers().get("QH7"),
        Some(&Answer::Text("fellow1@example.org".into()))
    );

    let err = session.enter_text("QA1", "cohort1").expect_err("wrong type");
    assert!(matches!(err, InputError::WrongType { .. }));
}

#[test]
fn navigation_validates_forward_only() {
    let spec = fellowship();
    let mut session = Session::new(spec);
    assert_eq!(session.step(), Step::Intro);
    assert_eq!(session.advance(at(0, 1)), Advance::Unavailable);
    assert!(session.start(at(0, 0)));
    assert!(!session.start(at(0, 5)));
    assert_eq!(session.started_at(), Some(at(0, 0)));

    assert_eq!(session.current_question().map(|q| q.id.as_str()), Some("QA1"));
    assert!(!session.retreat());
    assert_eq!(session.advance(at(0, 10)), Advance::Blocked);

    session.choose("QA1", "cohort2".into()).expect("answer");
    assert_eq!(session.advance(at(0, 20)), Advance::Moved(1));
    assert_eq!(session.current_question().map(|q| q.id.as_str()), Some("QB1"));

    assert!(session.retreat());
    assert_eq!(session.step(), Step::Question(0));
}

#[test]
fn shrinking_flow_degrades_to_no_question() {
    let spec = mini();
    let mut session = Session::new(spec);
    session.start(at(0, 0));

    session.choose("Q1", "c1".into()).expect("answer");
    assert_eq!(session.advance(at(0, 1)), Advance::Moved(1));
    session.choose("Q2", "a".into()).expect("answer");
    assert_eq!(session.advance(at(0, 2)), Advance::Moved(2));
    session.toggle("Q3", "web".into()).expect("toggle");
    assert_eq!(session.advance(at(0, 3)), Advance::Moved(3));
    session.enter_text("Q4", "Pune").expect("text");
    assert_eq!(session.advance(at(0, 4)), Advance::Moved(4));
    assert!(session.is_last());

    session.toggle("Q3", "none".into()).expect("toggle");
    assert_eq!(session.visible_questions().len(), 4);
    assert!(session.current_question().is_none());
    assert!(!session.can_advance());
    assert_eq!(session.advance(at(0, 5)), Advance::Unavailable);
    assert!(session.retreat());
    assert_eq!(session.current_question().map(|q| q.id.as_str()), Some("Q5"));
}

#[test]
fn last_question_finishes_the_session() {
    let spec = mini();
    let mut session = Session::new(spec);
    session.start(at(0, 0));

    session.choose("Q1", "c2".into()).expect("answer");
    session.advance(at(0, 1));
    session.choose("Q2", "other".into()).expect("answer");
    assert_eq!(session.advance(at(0, 2)), Advance::Blocked);
    session
        .set_other_text("Q2", &"other".into(), "Independent")
        .expect("other text");
    session.advance(at(0, 3));
    session.toggle("Q3", "none".into()).expect("toggle");
    assert_eq!(session.advance(at(0, 4)), Advance::Moved(3));
    assert_eq!(session.current_question().map(|q| q.id.as_str()), Some("Q5"));

    session.enter_text("Q5", "a@b").expect("email");
    assert_eq!(session.advance(at(0, 5)), Advance::Blocked);
    session.enter_text("Q5", "a@b.com").expect("email");
    let outcome = session.advance(at(2, 30));
    assert_eq!(
        outcome,
        Advance::Finished(survey_spec::Completion {
            started_at: Some(at(0, 0)),
            finished_at: at(2, 30),
        })
    );
    assert_eq!(session.step(), Step::Submitted);
    assert!(session.current_question().is_none());
    assert!(!session.retreat());
}
