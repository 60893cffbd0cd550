use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::condition::Condition;

/// Supported question kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// Pick exactly one option.
    Single,
    /// Pick any number of options, subject to `max_select` and exclusivity.
    Multi,
    /// Free text restricted to letters and whitespace.
    Text,
    /// One column per declared row.
    Matrix,
    /// Informational entry; never part of the navigable flow.
    Info,
    /// Email address.
    Email,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Single => "single",
            QuestionType::Multi => "multi",
            QuestionType::Text => "text",
            QuestionType::Matrix => "matrix",
            QuestionType::Info => "info",
            QuestionType::Email => "email",
        }
    }

    /// Whether the type is answered by picking catalog options.
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::Single | QuestionType::Multi)
    }
}

/// Value carried by an option. Catalogs mix numeric Likert codes and string codes.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(untagged)]
pub enum OptionValue {
    Number(i64),
    Text(String),
}

impl OptionValue {
    /// Reads an option value out of loosely typed JSON.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(OptionValue::Text(text.clone())),
            Value::Number(number) => number.as_i64().map(OptionValue::Number),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            OptionValue::Number(number) => Value::from(*number),
            OptionValue::Text(text) => Value::String(text.clone()),
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Number(number) => write!(f, "{}", number),
            OptionValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Number(value)
    }
}

/// A selectable option of a single or multi choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SurveyOption {
    pub value: OptionValue,
    pub label: String,
    /// Selecting this option clears every other selection.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exclusive: bool,
    /// Selecting this option requires an accompanying free-text answer.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub requires_text: bool,
    /// Hides the option while the condition holds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_when: Option<Condition>,
    /// Export column for the free-text answer of a `requires_text` option.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_column: Option<String>,
}

impl SurveyOption {
    pub fn new(value: impl Into<OptionValue>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            exclusive: false,
            requires_text: false,
            hide_when: None,
            text_column: None,
        }
    }

    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    pub fn requires_text(mut self) -> Self {
        self.requires_text = true;
        self
    }

    pub fn hide_when(mut self, condition: Condition) -> Self {
        self.hide_when = Some(condition);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MatrixRow {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MatrixColumn {
    pub value: String,
    pub label: String,
}

/// Question definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(default)]
    pub section: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SurveyOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_select: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matrix_rows: Vec<MatrixRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matrix_columns: Vec<MatrixColumn>,
    /// Export column label; defaults to `"{id}. {title}"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl QuestionSpec {
    pub fn new(id: impl Into<String>, kind: QuestionType, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            section: String::new(),
            title: title.into(),
            description: None,
            options: Vec::new(),
            max_select: None,
            condition: None,
            matrix_rows: Vec::new(),
            matrix_columns: Vec::new(),
            column: None,
        }
    }

    pub fn option(&self, value: &OptionValue) -> Option<&SurveyOption> {
        self.options.iter().find(|option| &option.value == value)
    }

    pub fn matrix_row(&self, id: &str) -> Option<&MatrixRow> {
        self.matrix_rows.iter().find(|row| row.id == id)
    }

    pub fn matrix_column(&self, value: &str) -> Option<&MatrixColumn> {
        self.matrix_columns
            .iter()
            .find(|column| column.value == value)
    }

    /// Export column holding the main answer of single, text and email questions.
    pub fn answer_column(&self) -> String {
        self.column
            .clone()
            .unwrap_or_else(|| format!("{}. {}", self.id, self.title))
    }

    /// Export column for one option of a multi choice question.
    pub fn option_column(&self, option: &SurveyOption) -> String {
        format!("{}. {}", self.id, option.label)
    }

    /// Export column for the free text that accompanies a `requires_text` option.
    pub fn text_column(&self, option: &SurveyOption) -> String {
        option
            .text_column
            .clone()
            .unwrap_or_else(|| format!("{}. {} (text)", self.id, option.label))
    }

    pub fn row_column(&self, row: &MatrixRow) -> String {
        row.column
            .clone()
            .unwrap_or_else(|| format!("{}. {}", self.id, row.label))
    }
}
