use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::spec::{OptionValue, QuestionSpec, QuestionType, SurveySpec};

const OTHER_TEXT_SEPARATOR: &str = "__other__";

/// Composite store key for the free text attached to a `requires_text` option.
pub fn other_text_key(question_id: &str, value: &OptionValue) -> String {
    format!("{}{}{}", question_id, OTHER_TEXT_SEPARATOR, value)
}

/// A stored answer. The variant follows the question type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Answer {
    /// Single choice.
    Choice(OptionValue),
    /// Multi choice, in selection order.
    Choices(Vec<OptionValue>),
    /// Free text, email and other-text entries.
    Text(String),
    /// Matrix row id to column value.
    Matrix(BTreeMap<String, String>),
}

impl Answer {
    pub fn as_choice(&self) -> Option<&OptionValue> {
        match self {
            Answer::Choice(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_choices(&self) -> Option<&[OptionValue]> {
        match self {
            Answer::Choices(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Answer::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            Answer::Matrix(rows) => Some(rows),
            _ => None,
        }
    }

    /// Exact-value comparison used by `equals` and `one_of` conditions.
    pub fn matches(&self, expected: &OptionValue) -> bool {
        match (self, expected) {
            (Answer::Choice(value), _) => value == expected,
            (Answer::Text(text), OptionValue::Text(expected)) => text == expected,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum AnswerError {
    #[error("answers must be a JSON object")]
    NotAnObject,
    #[error("answer field '{0}' does not belong to the survey")]
    UnknownField(String),
    #[error("answer for '{question}' must be {expected}")]
    Shape {
        question: String,
        expected: &'static str,
    },
    #[error("failed to encode answers: {0}")]
    Encode(#[from] serde_cbor::Error),
}

/// Answers collected during one session, keyed by question id or other-text key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnswerStore {
    entries: BTreeMap<String, Answer>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Answer> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, answer: Answer) {
        self.entries.insert(key.into(), answer);
    }

    pub fn remove(&mut self, key: &str) -> Option<Answer> {
        self.entries.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Answer)> {
        self.entries.iter().map(|(key, answer)| (key.as_str(), answer))
    }

    /// Currently selected values of a multi choice question; empty when unanswered.
    pub fn selections(&self, question_id: &str) -> &[OptionValue] {
        self.get(question_id)
            .and_then(Answer::as_choices)
            .unwrap_or(&[])
    }

    pub fn other_text(&self, question_id: &str, value: &OptionValue) -> Option<&str> {
        self.get(&other_text_key(question_id, value))
            .and_then(Answer::as_text)
    }

    pub fn set_other_text(&mut self, question_id: &str, value: &OptionValue, text: String) {
        self.set(other_text_key(question_id, value), Answer::Text(text));
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, AnswerError> {
        Ok(serde_cbor::to_vec(self)?)
    }

    /// Decodes loosely typed answers, using the catalog to pick each entry's shape.
    /// `null` entries are treated as unanswered and selections of hidden options
    /// are dropped.
    pub fn from_json(spec: &SurveySpec, value: &Value) -> Result<Self, AnswerError> {
        let object = value.as_object().ok_or(AnswerError::NotAnObject)?;
        let mut store = AnswerStore::new();

        for (key, raw) in object {
            if raw.is_null() {
                continue;
            }
            if let Some(question) = spec.question(key) {
                store.set(key.clone(), decode_answer(question, raw)?);
                continue;
            }
            if is_other_text_key(spec, key) {
                let text = raw.as_str().ok_or_else(|| AnswerError::Shape {
                    question: key.clone(),
                    expected: "a string",
                })?;
                store.set(key.clone(), Answer::Text(text.to_string()));
                continue;
            }
            return Err(AnswerError::UnknownField(key.clone()));
        }

        crate::visibility::prune_hidden_options(spec, &mut store);
        Ok(store)
    }
}

fn is_other_text_key(spec: &SurveySpec, key: &str) -> bool {
    let Some((question_id, raw_value)) = key.split_once(OTHER_TEXT_SEPARATOR) else {
        return false;
    };
    spec.question(question_id).is_some_and(|question| {
        question
            .options
            .iter()
            .any(|option| option.requires_text && option.value.to_string() == raw_value)
    })
}

fn decode_answer(question: &QuestionSpec, raw: &Value) -> Result<Answer, AnswerError> {
    let shape = |expected| AnswerError::Shape {
        question: question.id.clone(),
        expected,
    };

    match question.kind {
        QuestionType::Single => OptionValue::from_json(raw)
            .map(Answer::Choice)
            .ok_or_else(|| shape("a string or integer option value")),
        QuestionType::Multi => raw
            .as_array()
            .and_then(|values| {
                values
                    .iter()
                    .map(OptionValue::from_json)
                    .collect::<Option<Vec<_>>>()
            })
            .map(Answer::Choices)
            .ok_or_else(|| shape("an array of option values")),
        QuestionType::Text | QuestionType::Email => raw
            .as_str()
            .map(|text| Answer::Text(text.to_string()))
            .ok_or_else(|| shape("a string")),
        QuestionType::Matrix => raw
            .as_object()
            .and_then(|rows| {
                rows.iter()
                    .map(|(row, column)| column.as_str().map(|c| (row.clone(), c.to_string())))
                    .collect::<Option<BTreeMap<_, _>>>()
            })
            .map(Answer::Matrix)
            .ok_or_else(|| shape("an object mapping rows to column values")),
        QuestionType::Info => Err(shape("absent (informational entries take no answer)")),
    }
}
