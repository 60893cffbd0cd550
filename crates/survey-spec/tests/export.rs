use std::collections::BTreeMap;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use survey_spec::{
    Answer, AnswerStore, ExportOptions, GeoFix, OptionValue, QuestionType, SubmissionMeta,
    answer_columns, build_submission, catalog, export::META_COLUMNS, export::format_duration,
    flatten_answers, flatten_with,
};

#[test]
fn empty_store_yields_every_column() {
    let spec = catalog::fellowship().expect("catalog");
    let record = flatten_answers(&spec, &AnswerStore::new());

    assert_eq!(record.len(), answer_columns(&spec).len());
    for question in &spec.questions {
        match question.kind {
            QuestionType::Multi => {
                for option in &question.options {
                    assert_eq!(
                        record.get(&question.option_column(option)),
                        Some(&json!("No")),
                        "{} / {}",
                        question.id,
                        option.label
                    );
                }
            }
            QuestionType::Matrix => {
                for row in &question.matrix_rows {
                    assert_eq!(record.get(&question.row_column(row)), Some(&json!("")));
                }
            }
            QuestionType::Info => {}
            _ => assert_eq!(
                record.get(&question.answer_column()),
                Some(&json!("")),
                "{}",
                question.id
            ),
        }
        for option in question.options.iter().filter(|o| o.requires_text) {
            assert_eq!(record.get(&question.text_column(option)), Some(&json!("")));
        }
    }
}

#[test]
fn column_set_is_stable_across_respondents() {
    let spec = catalog::fellowship().expect("catalog");
    let mut answers = AnswerStore::new();
    answers.set("QA1", Answer::Choice("cohort1".into()));
    answers.set(
        "QE1",
        Answer::Choices(vec!["strategy".into(), "other".into()]),
    );

    let empty: Vec<String> = flatten_answers(&spec, &AnswerStore::new())
        .columns()
        .map(str::to_string)
        .collect();
    let filled: Vec<String> = flatten_answers(&spec, &answers)
        .columns()
        .map(str::to_string)
        .collect();
    assert_eq!(empty, filled);
}

#[test]
fn answers_expand_to_labels_and_flags() {
    let spec = catalog::fellowship().expect("catalog");
    let mut answers = AnswerStore::new();
    answers.set("QA1", Answer::Choice("cohort1".into()));
    answers.set("QB2", Answer::Text("Tamil Nadu".into()));
    answers.set("QD1", Answer::Choice(OptionValue::Number(99)));
    answers.set(
        "QC7",
        Answer::Choices(vec!["learning".into(), "other".into()]),
    );
    answers.set_other_text("QC7", &"other".into(), "Field visits".into());
    answers.set(
        "QG1",
        Answer::Matrix(BTreeMap::from([
            ("confidence".to_string(), "mentorship".to_string()),
            ("agency_voice".to_string(), "unlisted".to_string()),
        ])),
    );
    answers.set("QH7", Answer::Text("fellow@example.org".into()));

    let record = flatten_answers(&spec, &answers);
    let cell = |column: &str| record.get(column).cloned().unwrap_or(Value::Null);

    assert_eq!(cell("QA1. Cohort"), json!("Cohort 1 (2022-2023)"));
    assert_eq!(cell("QB2. State of Residence"), json!("Tamil Nadu"));
    assert_eq!(cell("QD1. Confidence in Influential Spaces"), json!(99));
    assert_eq!(cell("QC7. Learning modules / training sessions"), json!("Yes"));
    assert_eq!(cell("QC7. Mentorship"), json!("No"));
    assert_eq!(cell("QC7. Other (specify)"), json!("Yes"));
    assert_eq!(cell("QC7. Other (Specify)"), json!("Field visits"));
    assert_eq!(
        cell("QG1. Confidence – Component Contributed Most"),
        json!("Mentorship")
    );
    assert_eq!(
        cell("QG1. Agency & Voice – Component Contributed Most"),
        json!("unlisted")
    );
    assert_eq!(
        cell("QG1. Leadership Role – Component Contributed Most"),
        json!("")
    );
    assert_eq!(cell("QH7. Email Address"), json!("fellow@example.org"));
}

#[test]
fn hidden_answers_can_be_blanked() {
    let spec = catalog::fellowship().expect("catalog");
    let mut answers = AnswerStore::new();
    answers.set("QC2", Answer::Choice(OptionValue::Number(0)));
    answers.set("QC3", Answer::Choice("3-5".into()));

    let kept = flatten_answers(&spec, &answers);
    assert_eq!(kept.get("QC3. Mentor Interaction Count"), Some(&json!("3-5 times")));

    let blanked = flatten_with(&spec, &answers, ExportOptions { blank_hidden: true });
    assert_eq!(blanked.get("QC3. Mentor Interaction Count"), Some(&json!("")));
    assert_eq!(blanked.get("QC2. One-on-One Mentorship"), Some(&json!("No")));
}

#[test]
fn submission_carries_session_metadata_first() {
    let spec = catalog::fellowship().expect("catalog");
    let started = Utc
        .with_ymd_and_hms(2026, 3, 1, 10, 0, 0)
        .single()
        .expect("start");
    let finished = started + chrono::Duration::milliseconds(12 * 60_000 + 5_500);
    let meta = SubmissionMeta {
        started_at: Some(started),
        finished_at: finished,
        device_id: "device-1".into(),
        geo: GeoFix {
            latitude: Some(28.61),
            longitude: Some(77.2),
            altitude: None,
            accuracy: Some(12.0),
        },
    };

    let submission = build_submission(&spec, &AnswerStore::new(), &meta, ExportOptions::default());
    assert_eq!(submission.sheet_name, "data");

    let columns: Vec<&str> = submission.data.columns().take(META_COLUMNS.len()).collect();
    assert_eq!(columns, META_COLUMNS.to_vec());
    assert_eq!(submission.data.get("Submission Date"), Some(&json!("2026-03-01")));
    assert_eq!(
        submission.data.get("Submission Timestamp"),
        Some(&json!("2026-03-01T10:12:05.500Z"))
    );
    assert_eq!(
        submission.data.get("Start Time"),
        Some(&json!("2026-03-01T10:00:00.000Z"))
    );
    assert_eq!(submission.data.get("Duration (min.ss)"), Some(&json!("12.05")));
    assert_eq!(submission.data.get("Device ID"), Some(&json!("device-1")));
    assert_eq!(submission.data.get("GPS Latitude"), Some(&json!(28.61)));
    assert_eq!(submission.data.get("GPS Altitude"), Some(&json!("")));

    let encoded = serde_json::to_string(&submission).expect("serialize");
    assert!(encoded.starts_with(r#"{"sheetName":"data","data":{"Submission Date":"2026-03-01","#));
}

#[test]
fn duration_formatting() {
    assert_eq!(format_duration(0), "");
    assert_eq!(format_duration(59_999), "0.59");
    assert_eq!(format_duration(61_000), "1.01");
    assert_eq!(format_duration(10 * 60_000), "10.00");
}
