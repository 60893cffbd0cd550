use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::answers::{Answer, AnswerStore};
use crate::spec::{OptionValue, QuestionSpec, QuestionType, SurveySpec};
use crate::visibility::visible_questions;

static TEXT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z\s]+$").expect("static pattern compiles"));

// Shape check only. "a@b..com" passes: the domain needs a dot with something on
// each side of the last one.
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static pattern compiles"));

/// Outcome of checking every visible question of a catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    /// Visible questions whose answer is missing or not acceptable, in flow order.
    pub incomplete: Vec<String>,
}

pub fn validate(spec: &SurveySpec, answers: &AnswerStore) -> ValidationResult {
    let incomplete: Vec<String> = visible_questions(spec, answers)
        .into_iter()
        .filter(|question| !is_complete(question, answers))
        .map(|question| question.id.clone())
        .collect();

    ValidationResult {
        valid: incomplete.is_empty(),
        incomplete,
    }
}

/// Whether the stored answer lets the respondent move past `question`.
pub fn is_complete(question: &QuestionSpec, answers: &AnswerStore) -> bool {
    let answer = answers.get(&question.id);
    match question.kind {
        QuestionType::Info => true,
        QuestionType::Single => {
            let Some(option) = answer
                .and_then(Answer::as_choice)
                .and_then(|value| question.option(value))
            else {
                return false;
            };
            !option.requires_text || has_other_text(question, &option.value, answers)
        }
        QuestionType::Multi => {
            let selected = answer.and_then(Answer::as_choices).unwrap_or(&[]);
            !selected.is_empty()
                && question
                    .options
                    .iter()
                    .filter(|option| option.requires_text && selected.contains(&option.value))
                    .all(|option| has_other_text(question, &option.value, answers))
        }
        QuestionType::Text => answer.and_then(Answer::as_text).is_some_and(is_valid_text),
        QuestionType::Email => answer.and_then(Answer::as_text).is_some_and(is_valid_email),
        QuestionType::Matrix => answer.and_then(Answer::as_matrix).is_some_and(|rows| {
            question.matrix_rows.iter().all(|row| {
                rows.get(&row.id)
                    .is_some_and(|column| !column.trim().is_empty())
            })
        }),
    }
}

fn has_other_text(question: &QuestionSpec, value: &OptionValue, answers: &AnswerStore) -> bool {
    answers
        .other_text(&question.id, value)
        .is_some_and(|text| !text.trim().is_empty())
}

/// Letters and whitespace only, non-empty after trimming.
pub fn is_valid_text(raw: &str) -> bool {
    let value = raw.trim();
    !value.is_empty() && TEXT_PATTERN.is_match(value)
}

pub fn is_valid_email(raw: &str) -> bool {
    let value = raw.trim();
    !value.is_empty() && EMAIL_PATTERN.is_match(value)
}

/// Input-time filter for free text questions: digits never reach the store.
pub fn sanitize_text(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_ascii_digit()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_strictness() {
        assert!(is_valid_email("a@b.com"));
        assert!(is_valid_email("  a@b.com "));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("a@@b.com"));
        assert!(is_valid_email("a@b..com"));
    }

    #[test]
    fn free_text_rules() {
        assert!(is_valid_text("Delhi"));
        assert!(is_valid_text("Tamil Nadu"));
        assert!(!is_valid_text("Delhi123"));
        assert!(!is_valid_text("   "));
        assert!(!is_valid_text("Delhi!"));
    }

    #[test]
    fn sanitize_strips_digits_only() {
        assert_eq!(sanitize_text("Delhi 110001"), "Delhi ");
        assert_eq!(sanitize_text("Goa"), "Goa");
    }
}
