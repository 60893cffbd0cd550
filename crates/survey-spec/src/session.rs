use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::answers::{Answer, AnswerStore};
use crate::selection::{self, Toggle};
use crate::spec::{OptionValue, QuestionSpec, QuestionType, SurveySpec};
use crate::validate::{is_complete, sanitize_text};
use crate::visibility::{is_option_visible, prune_hidden_options, visible_questions};

/// Where the respondent is in the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Intro,
    /// Position in the *current* visible question list.
    Question(usize),
    Submitted,
}

/// Timing of a finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the given position.
    Moved(usize),
    /// The current answer is incomplete.
    Blocked,
    /// The last question was accepted; the session is now submitted.
    Finished(Completion),
    /// There is no current question to advance from.
    Unavailable,
}

/// Progress through the visible questions; `position` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub position: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("question '{0}' is not part of the survey")]
    UnknownQuestion(String),
    #[error("question '{question}' is not a {expected} question")]
    WrongType {
        question: String,
        expected: &'static str,
    },
    #[error("question '{question}' has no option '{value}'")]
    UnknownOption { question: String, value: String },
    #[error("option '{value}' of question '{question}' is currently hidden")]
    HiddenOption { question: String, value: String },
    #[error("option '{value}' of question '{question}' does not take free text")]
    NoOtherText { question: String, value: String },
    #[error("matrix question '{question}' has no row '{row}'")]
    UnknownRow { question: String, row: String },
    #[error("matrix question '{question}' has no column '{column}'")]
    UnknownColumn { question: String, column: String },
}

/// One respondent working through one catalog.
#[derive(Debug, Clone)]
pub struct Session {
    spec: Arc<SurveySpec>,
    answers: AnswerStore,
    step: Step,
    started_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(spec: Arc<SurveySpec>) -> Self {
        Self {
            spec,
            answers: AnswerStore::new(),
            step: Step::Intro,
            started_at: None,
        }
    }

    pub fn spec(&self) -> &SurveySpec {
        &self.spec
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Leaves the introduction. Returns `false` when the session already started.
    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        if self.step != Step::Intro {
            return false;
        }
        self.started_at = Some(now);
        self.step = Step::Question(0);
        tracing::debug!(survey = %self.spec.id, "session started");
        true
    }

    pub fn visible_questions(&self) -> Vec<&QuestionSpec> {
        visible_questions(&self.spec, &self.answers)
    }

    /// The question at the current position, or `None` when the visible list no
    /// longer reaches that far.
    pub fn current_question(&self) -> Option<&QuestionSpec> {
        match self.step {
            Step::Question(index) => self.visible_questions().get(index).copied(),
            _ => None,
        }
    }

    pub fn can_advance(&self) -> bool {
        self.current_question()
            .is_some_and(|question| is_complete(question, &self.answers))
    }

    pub fn is_last(&self) -> bool {
        match self.step {
            Step::Question(index) => index + 1 == self.visible_questions().len(),
            _ => false,
        }
    }

    pub fn progress(&self) -> Option<Progress> {
        match self.step {
            Step::Question(index) => Some(Progress {
                position: index + 1,
                total: self.visible_questions().len(),
            }),
            _ => None,
        }
    }

    pub fn advance(&mut self, now: DateTime<Utc>) -> Advance {
        let Step::Question(index) = self.step else {
            return Advance::Unavailable;
        };
        let visible = self.visible_questions();
        let Some(question) = visible.get(index) else {
            return Advance::Unavailable;
        };
        if !is_complete(question, &self.answers) {
            tracing::debug!(question = %question.id, "advance blocked by incomplete answer");
            return Advance::Blocked;
        }

        if index + 1 == visible.len() {
            self.step = Step::Submitted;
            tracing::info!(
                survey = %self.spec.id,
                answers = self.answers.len(),
                "survey completed"
            );
            return Advance::Finished(Completion {
                started_at: self.started_at,
                finished_at: now,
            });
        }

        self.step = Step::Question(index + 1);
        Advance::Moved(index + 1)
    }

    /// Goes back one question. Never validates.
    pub fn retreat(&mut self) -> bool {
        match self.step {
            Step::Question(index) if index > 0 => {
                self.step = Step::Question(index - 1);
                true
            }
            _ => false,
        }
    }

    /// Answers a single choice question.
    pub fn choose(&mut self, question_id: &str, value: OptionValue) -> Result<(), InputError> {
        let question = self.expect_question(question_id, QuestionType::Single)?;
        self.ensure_selectable(question, &value)?;
        self.answers.set(question_id, Answer::Choice(value));
        self.after_change();
        Ok(())
    }

    /// Toggles one option of a multi choice question.
    pub fn toggle(&mut self, question_id: &str, value: OptionValue) -> Result<Toggle, InputError> {
        let question = self.expect_question(question_id, QuestionType::Multi)?;
        self.ensure_selectable(question, &value)?;

        let outcome = selection::toggle(question, self.answers.selections(question_id), &value);
        match &outcome {
            Toggle::Changed(next) => {
                self.answers.set(question_id, Answer::Choices(next.clone()));
                self.after_change();
            }
            Toggle::Rejected => {
                tracing::debug!(question = question_id, %value, "selection cap reached");
            }
        }
        Ok(outcome)
    }

    /// Stores typed input. Digits are stripped from free text questions as they
    /// are entered; email input is kept verbatim.
    pub fn enter_text(&mut self, question_id: &str, raw: &str) -> Result<(), InputError> {
        let question = self
            .spec
            .question(question_id)
            .ok_or_else(|| InputError::UnknownQuestion(question_id.to_string()))?;
        let text = match question.kind {
            QuestionType::Text => sanitize_text(raw),
            QuestionType::Email => raw.to_string(),
            _ => {
                return Err(InputError::WrongType {
                    question: question_id.to_string(),
                    expected: "text or email",
                });
            }
        };
        self.answers.set(question_id, Answer::Text(text));
        self.after_change();
        Ok(())
    }

    /// Stores the free text that accompanies a `requires_text` option.
    pub fn set_other_text(
        &mut self,
        question_id: &str,
        value: &OptionValue,
        text: &str,
    ) -> Result<(), InputError> {
        let question = self
            .spec
            .question(question_id)
            .ok_or_else(|| InputError::UnknownQuestion(question_id.to_string()))?;
        let option = question
            .option(value)
            .ok_or_else(|| InputError::UnknownOption {
                question: question_id.to_string(),
                value: value.to_string(),
            })?;
        if !option.requires_text {
            return Err(InputError::NoOtherText {
                question: question_id.to_string(),
                value: value.to_string(),
            });
        }
        self.answers
            .set_other_text(question_id, value, text.to_string());
        Ok(())
    }

    /// Picks a column for one row of a matrix question.
    pub fn choose_matrix(
        &mut self,
        question_id: &str,
        row: &str,
        column: &str,
    ) -> Result<(), InputError> {
        let question = self.expect_question(question_id, QuestionType::Matrix)?;
        if question.matrix_row(row).is_none() {
            return Err(InputError::UnknownRow {
                question: question_id.to_string(),
                row: row.to_string(),
            });
        }
        if question.matrix_column(column).is_none() {
            return Err(InputError::UnknownColumn {
                question: question_id.to_string(),
                column: column.to_string(),
            });
        }

        let mut rows = self
            .answers
            .get(question_id)
            .and_then(Answer::as_matrix)
            .cloned()
            .unwrap_or_else(BTreeMap::new);
        rows.insert(row.to_string(), column.to_string());
        self.answers.set(question_id, Answer::Matrix(rows));
        self.after_change();
        Ok(())
    }

    fn expect_question(
        &self,
        question_id: &str,
        kind: QuestionType,
    ) -> Result<&QuestionSpec, InputError> {
        let question = self
            .spec
            .question(question_id)
            .ok_or_else(|| InputError::UnknownQuestion(question_id.to_string()))?;
        if question.kind != kind {
            return Err(InputError::WrongType {
                question: question_id.to_string(),
                expected: kind.as_str(),
            });
        }
        Ok(question)
    }

    fn ensure_selectable(
        &self,
        question: &QuestionSpec,
        value: &OptionValue,
    ) -> Result<(), InputError> {
        let option = question
            .option(value)
            .ok_or_else(|| InputError::UnknownOption {
                question: question.id.clone(),
                value: value.to_string(),
            })?;
        if !is_option_visible(option, &self.answers) {
            return Err(InputError::HiddenOption {
                question: question.id.clone(),
                value: value.to_string(),
            });
        }
        Ok(())
    }

    fn after_change(&mut self) {
        prune_hidden_options(&self.spec, &mut self.answers);
    }
}
