use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::{Answer, AnswerStore};
use crate::spec::OptionValue;

/// Visibility condition attached to a question or to an option's hide rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// The referenced answer equals `value`.
    Equals {
        question: String,
        value: OptionValue,
    },
    /// The referenced answer equals one of `values`.
    OneOf {
        question: String,
        values: Vec<OptionValue>,
    },
    /// A named predicate over the referenced answer and the whole store.
    Predicate {
        question: String,
        predicate: Predicate,
    },
}

/// Closed set of predicates a catalog can use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Any non-empty answer.
    Answered,
    /// A non-empty multi selection that does not contain `value`.
    SelectionExcludes { value: OptionValue },
    /// A matrix answer with at least one row set to something other than `value`.
    AnyRowOtherThan { value: String },
}

impl Condition {
    pub fn equals(question: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        Condition::Equals {
            question: question.into(),
            value: value.into(),
        }
    }

    pub fn one_of(question: impl Into<String>, values: Vec<OptionValue>) -> Self {
        Condition::OneOf {
            question: question.into(),
            values,
        }
    }

    pub fn predicate(question: impl Into<String>, predicate: Predicate) -> Self {
        Condition::Predicate {
            question: question.into(),
            predicate,
        }
    }

    /// Id of the question the condition reads.
    pub fn question(&self) -> &str {
        match self {
            Condition::Equals { question, .. }
            | Condition::OneOf { question, .. }
            | Condition::Predicate { question, .. } => question,
        }
    }

    pub fn evaluate(&self, answers: &AnswerStore) -> bool {
        let answer = answers.get(self.question());
        match self {
            Condition::Equals { value, .. } => answer.is_some_and(|answer| answer.matches(value)),
            Condition::OneOf { values, .. } => {
                answer.is_some_and(|answer| values.iter().any(|value| answer.matches(value)))
            }
            Condition::Predicate { predicate, .. } => predicate.evaluate(answer, answers),
        }
    }
}

impl Predicate {
    /// The store is passed for predicates that look beyond the referenced answer.
    pub fn evaluate(&self, answer: Option<&Answer>, _answers: &AnswerStore) -> bool {
        match self {
            Predicate::Answered => match answer {
                Some(Answer::Choice(_)) => true,
                Some(Answer::Choices(values)) => !values.is_empty(),
                Some(Answer::Text(text)) => !text.trim().is_empty(),
                Some(Answer::Matrix(rows)) => !rows.is_empty(),
                None => false,
            },
            Predicate::SelectionExcludes { value } => answer
                .and_then(Answer::as_choices)
                .is_some_and(|values| !values.is_empty() && !values.contains(value)),
            Predicate::AnyRowOtherThan { value } => answer
                .and_then(Answer::as_matrix)
                .is_some_and(|rows| rows.values().any(|column| column != value)),
        }
    }
}
