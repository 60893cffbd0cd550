use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use survey_runtime::{
    FileDeviceStore, FixedContext, JsonLinesSink, MemorySink, StaticDevice, SurveyRunner,
};
use survey_spec::{Advance, GeoFix, SurveySpec, catalog};

fn mini() -> Arc<SurveySpec> {
    Arc::new(
        catalog::load(include_str!("../../survey-spec/tests/fixtures/mini_survey.json"))
            .expect("fixture loads"),
    )
}

fn fix() -> GeoFix {
    GeoFix {
        latitude: Some(19.07),
        longitude: Some(72.87),
        altitude: None,
        accuracy: Some(30.0),
    }
}

fn answer_all(runner: &mut SurveyRunner) {
    runner.choose("Q1", "c1".into()).expect("Q1");
    assert_eq!(runner.advance(), Advance::Moved(1));
    runner.choose("Q2", "other".into()).expect("Q2");
    runner
        .set_other_text("Q2", &"other".into(), "Freelance")
        .expect("Q2 text");
    assert_eq!(runner.advance(), Advance::Moved(2));
    runner.toggle("Q3", "web".into()).expect("Q3");
    runner.toggle("Q3", "radio".into()).expect("Q3");
    assert_eq!(runner.advance(), Advance::Moved(3));
    runner.enter_text("Q4", "Pune411").expect("Q4");
    assert_eq!(runner.advance(), Advance::Moved(4));
    runner.enter_text("Q5", "fellow@example.org").expect("Q5");
}

#[tokio::test]
async fn completed_session_reaches_the_sink() {
    let sink = MemorySink::new();
    let mut runner = SurveyRunner::new(mini(), Arc::new(sink.clone()))
        .with_context(Arc::new(FixedContext::new(fix())))
        .with_device(Arc::new(StaticDevice("device-7".into())));

    assert!(runner.start());
    assert_eq!(runner.await_context().await, fix());
    answer_all(&mut runner);
    assert!(matches!(runner.advance(), Advance::Finished(_)));
    runner.flush().await;

    let submissions = sink.submissions();
    assert_eq!(submissions.len(), 1);
    let submission = &submissions[0];
    assert_eq!(submission.sheet_name, "responses");

    let data = &submission.data;
    assert_eq!(data.get("Device ID"), Some(&json!("device-7")));
    assert_eq!(data.get("GPS Latitude"), Some(&json!(19.07)));
    assert_eq!(data.get("GPS Altitude"), Some(&json!("")));
    assert_eq!(data.get("Q1. Cohort"), Some(&json!("Cohort 1")));
    assert_eq!(data.get("Q2. Track"), Some(&json!("Other")));
    assert_eq!(data.get("Q2. Other (text)"), Some(&json!("Freelance")));
    assert_eq!(data.get("Q3. Web"), Some(&json!("Yes")));
    assert_eq!(data.get("Q3. Print"), Some(&json!("No")));
    assert_eq!(data.get("Q4. City"), Some(&json!("Pune")));
    assert_eq!(data.get("Q5. Email"), Some(&json!("fellow@example.org")));
    assert_eq!(data.len(), 10 + 9);
}

#[tokio::test]
async fn missing_context_exports_blank_position() {
    let sink = MemorySink::new();
    let mut runner = SurveyRunner::new(mini(), Arc::new(sink.clone()))
        .with_context_timeout(Duration::from_millis(20));

    runner.start();
    assert_eq!(runner.await_context().await, GeoFix::default());
    answer_all(&mut runner);
    runner.advance();
    runner.flush().await;

    let submissions = sink.submissions();
    let data = &submissions[0].data;
    for column in ["GPS Latitude", "GPS Longitude", "GPS Altitude", "GPS Accuracy"] {
        assert_eq!(data.get(column), Some(&json!("")), "{column}");
    }
    assert_eq!(data.get("Device ID"), Some(&json!("")));
}

#[tokio::test]
async fn json_lines_output_uses_file_device_id() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("submissions.jsonl");
    let device = FileDeviceStore::new(dir.path().join("device_id"));

    for _ in 0..2 {
        let mut runner = SurveyRunner::new(mini(), Arc::new(JsonLinesSink::new(&output)))
            .with_device(Arc::new(device.clone()));
        runner.start();
        answer_all(&mut runner);
        runner.advance();
        runner.flush().await;
    }

    let written = std::fs::read_to_string(&output).expect("output");
    let records: Vec<Value> = written
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(records.len(), 2);
    let first_id = &records[0]["data"]["Device ID"];
    assert!(first_id.as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(first_id, &records[1]["data"]["Device ID"]);
    assert_eq!(records[0]["sheetName"], json!("responses"));
}
