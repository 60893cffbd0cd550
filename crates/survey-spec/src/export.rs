use chrono::{DateTime, SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::answers::{Answer, AnswerStore};
use crate::spec::{QuestionSpec, QuestionType, SurveySpec};
use crate::visibility::resolve_visibility;

/// Columns that precede the answer columns in every submission.
pub const META_COLUMNS: [&str; 10] = [
    "Submission Date",
    "Submission Timestamp",
    "Start Time",
    "End Time",
    "Duration (min.ss)",
    "Device ID",
    "GPS Latitude",
    "GPS Longitude",
    "GPS Altitude",
    "GPS Accuracy",
];

const YES: &str = "Yes";
const NO: &str = "No";

/// Best-effort position of the respondent. All fields are `None` when unavailable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GeoFix {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub accuracy: Option<f64>,
}

/// Session facts recorded alongside the answers.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionMeta {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
    pub device_id: String,
    pub geo: GeoFix,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Emit empty cells for questions hidden at submission time instead of their
    /// stored answers.
    pub blank_hidden: bool,
}

/// Ordered column/value pairs. Serializes as a JSON object in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatRecord {
    cells: Vec<(String, Value)>,
}

impl FlatRecord {
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.cells.push((column.into(), value.into()));
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.cells.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for FlatRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (column, value) in &self.cells {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// One completed session, ready for the export sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub sheet_name: String,
    pub data: FlatRecord,
}

/// Answer columns of `spec`, in export order.
pub fn answer_columns(spec: &SurveySpec) -> Vec<String> {
    flatten_answers(spec, &AnswerStore::new())
        .columns()
        .map(str::to_string)
        .collect()
}

pub fn flatten_answers(spec: &SurveySpec, answers: &AnswerStore) -> FlatRecord {
    flatten_with(spec, answers, ExportOptions::default())
}

/// Flattens the store into one cell per declared column. Every option, row and
/// other-text slot yields a column whether or not it was answered.
pub fn flatten_with(
    spec: &SurveySpec,
    answers: &AnswerStore,
    options: ExportOptions,
) -> FlatRecord {
    let visibility = resolve_visibility(spec, answers);
    let empty = AnswerStore::new();
    let mut record = FlatRecord::default();

    for question in &spec.questions {
        let visible = visibility.get(&question.id).copied().unwrap_or(true);
        let source = if options.blank_hidden && !visible {
            &empty
        } else {
            answers
        };
        flatten_question(question, source, &mut record);
    }

    record
}

fn flatten_question(question: &QuestionSpec, answers: &AnswerStore, record: &mut FlatRecord) {
    let answer = answers.get(&question.id);

    match question.kind {
        QuestionType::Info => return,
        QuestionType::Single => {
            let cell = match answer {
                Some(Answer::Choice(value)) => question
                    .option(value)
                    .map(|option| Value::String(option.label.clone()))
                    .unwrap_or_else(|| value.to_json()),
                _ => blank(),
            };
            record.push(question.answer_column(), cell);
        }
        QuestionType::Multi => {
            let selected = answers.selections(&question.id);
            for option in &question.options {
                let cell = if selected.contains(&option.value) { YES } else { NO };
                record.push(question.option_column(option), cell);
            }
        }
        QuestionType::Text | QuestionType::Email => {
            let cell = answer
                .and_then(Answer::as_text)
                .map(|text| Value::String(text.to_string()))
                .unwrap_or_else(blank);
            record.push(question.answer_column(), cell);
        }
        QuestionType::Matrix => {
            let rows = answer.and_then(Answer::as_matrix);
            for row in &question.matrix_rows {
                let cell = rows
                    .and_then(|rows| rows.get(&row.id))
                    .map(|value| {
                        let label = question
                            .matrix_column(value)
                            .map(|column| column.label.clone())
                            .unwrap_or_else(|| value.clone());
                        Value::String(label)
                    })
                    .unwrap_or_else(blank);
                record.push(question.row_column(row), cell);
            }
        }
    }

    for option in question.options.iter().filter(|option| option.requires_text) {
        let cell = answers
            .other_text(&question.id, &option.value)
            .map(|text| Value::String(text.to_string()))
            .unwrap_or_else(blank);
        record.push(question.text_column(option), cell);
    }
}

fn blank() -> Value {
    Value::String(String::new())
}

fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn coordinate(value: Option<f64>) -> Value {
    value.map(Value::from).unwrap_or_else(blank)
}

/// `minutes.seconds` with two-digit seconds; empty for a zero or negative span.
pub fn format_duration(millis: i64) -> String {
    if millis <= 0 {
        return String::new();
    }
    format!("{}.{:02}", millis / 60_000, (millis % 60_000) / 1_000)
}

/// Builds the record posted to the sink: session metadata followed by the answers.
pub fn build_submission(
    spec: &SurveySpec,
    answers: &AnswerStore,
    meta: &SubmissionMeta,
    options: ExportOptions,
) -> Submission {
    let finished = timestamp(&meta.finished_at);
    let duration = meta
        .started_at
        .map(|started| format_duration((meta.finished_at - started).num_milliseconds()))
        .unwrap_or_default();

    let mut data = FlatRecord::default();
    data.push(
        META_COLUMNS[0],
        meta.finished_at.format("%Y-%m-%d").to_string(),
    );
    data.push(META_COLUMNS[1], finished.clone());
    data.push(
        META_COLUMNS[2],
        meta.started_at.as_ref().map(timestamp).unwrap_or_default(),
    );
    data.push(META_COLUMNS[3], finished);
    data.push(META_COLUMNS[4], duration);
    data.push(META_COLUMNS[5], meta.device_id.clone());
    data.push(META_COLUMNS[6], coordinate(meta.geo.latitude));
    data.push(META_COLUMNS[7], coordinate(meta.geo.longitude));
    data.push(META_COLUMNS[8], coordinate(meta.geo.altitude));
    data.push(META_COLUMNS[9], coordinate(meta.geo.accuracy));

    let answers = flatten_with(spec, answers, options);
    data.cells.extend(answers.cells);

    Submission {
        sheet_name: spec.sheet_name.clone(),
        data,
    }
}
