use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::export;
use crate::spec::question::{QuestionSpec, QuestionType};

pub const DEFAULT_SHEET_NAME: &str = "data";

/// Structural problems found in a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("question id '{0}' is declared more than once")]
    DuplicateQuestion(String),
    #[error("question '{question}' references '{target}', which is not declared before it")]
    ForwardReference { question: String, target: String },
    #[error("question '{question}' declares option value '{value}' more than once")]
    DuplicateOption { question: String, value: String },
    #[error("question '{0}' needs at least one option")]
    MissingOptions(String),
    #[error("matrix question '{0}' needs rows and columns")]
    IncompleteMatrix(String),
    #[error("matrix question '{question}' declares '{entry}' more than once")]
    DuplicateMatrixEntry { question: String, entry: String },
    #[error("question '{0}' has an invalid max_select")]
    InvalidMaxSelect(String),
    #[error("export column '{0}' is produced more than once")]
    DuplicateColumn(String),
}

/// Top-level survey definition. Immutable once loaded and shared between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SurveySpec {
    pub id: String,
    pub title: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Destination tab used by the export sink.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    pub questions: Vec<QuestionSpec>,
}

fn default_sheet_name() -> String {
    DEFAULT_SHEET_NAME.to_string()
}

impl SurveySpec {
    pub fn question(&self, id: &str) -> Option<&QuestionSpec> {
        self.questions.iter().find(|question| question.id == id)
    }

    /// First informational entry, shown before the flow starts.
    pub fn intro(&self) -> Option<&QuestionSpec> {
        self.questions
            .iter()
            .find(|question| question.kind == QuestionType::Info)
    }

    /// Returns every structural violation; an empty list means the catalog is usable.
    pub fn check(&self) -> Vec<SpecError> {
        let mut errors = Vec::new();
        let mut declared = BTreeSet::new();

        for question in &self.questions {
            let references = question
                .condition
                .iter()
                .chain(question.options.iter().filter_map(|o| o.hide_when.as_ref()))
                .map(|condition| condition.question());
            for target in references {
                if !declared.contains(target) {
                    errors.push(SpecError::ForwardReference {
                        question: question.id.clone(),
                        target: target.to_string(),
                    });
                }
            }

            if !declared.insert(question.id.as_str()) {
                errors.push(SpecError::DuplicateQuestion(question.id.clone()));
            }

            check_shape(question, &mut errors);
        }

        let mut columns = BTreeSet::new();
        for column in export::META_COLUMNS
            .iter()
            .map(|column| column.to_string())
            .chain(export::answer_columns(self))
        {
            if !columns.insert(column.clone()) {
                errors.push(SpecError::DuplicateColumn(column));
            }
        }

        errors
    }

    /// Like [`SurveySpec::check`], but fails on the first violation.
    pub fn ensure_valid(&self) -> Result<(), SpecError> {
        match self.check().into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn check_shape(question: &QuestionSpec, errors: &mut Vec<SpecError>) {
    if question.kind.is_choice() {
        if question.options.is_empty() {
            errors.push(SpecError::MissingOptions(question.id.clone()));
        }
        // Compared by text form: 1 and "1" share an other-text key.
        let mut values = BTreeSet::new();
        for option in &question.options {
            let value = option.value.to_string();
            if !values.insert(value.clone()) {
                errors.push(SpecError::DuplicateOption {
                    question: question.id.clone(),
                    value,
                });
            }
        }
    }

    if question.kind == QuestionType::Matrix {
        if question.matrix_rows.is_empty() || question.matrix_columns.is_empty() {
            errors.push(SpecError::IncompleteMatrix(question.id.clone()));
        }
        let mut rows = BTreeSet::new();
        for row in &question.matrix_rows {
            if !rows.insert(row.id.as_str()) {
                errors.push(SpecError::DuplicateMatrixEntry {
                    question: question.id.clone(),
                    entry: row.id.clone(),
                });
            }
        }
        let mut columns = BTreeSet::new();
        for column in &question.matrix_columns {
            if !columns.insert(column.value.as_str()) {
                errors.push(SpecError::DuplicateMatrixEntry {
                    question: question.id.clone(),
                    entry: column.value.clone(),
                });
            }
        }
    }

    match question.max_select {
        Some(0) => errors.push(SpecError::InvalidMaxSelect(question.id.clone())),
        Some(_) if question.kind != QuestionType::Multi => {
            errors.push(SpecError::InvalidMaxSelect(question.id.clone()))
        }
        _ => {}
    }
}
