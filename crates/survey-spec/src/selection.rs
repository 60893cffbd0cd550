use crate::spec::{OptionValue, QuestionSpec, QuestionType};

/// Result of toggling one option of a multi choice question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    Changed(Vec<OptionValue>),
    /// The `max_select` cap is reached; the selection stays as it was.
    Rejected,
}

fn is_exclusive(question: &QuestionSpec, value: &OptionValue) -> bool {
    question.option(value).is_some_and(|option| option.exclusive)
}

/// Next selection after the respondent toggles `value`.
///
/// Rules apply in order: deselection, an exclusive pick, eviction of a selected
/// exclusive option, the `max_select` cap, then append.
pub fn toggle(question: &QuestionSpec, current: &[OptionValue], value: &OptionValue) -> Toggle {
    if current.contains(value) {
        return Toggle::Changed(current.iter().filter(|v| *v != value).cloned().collect());
    }

    if is_exclusive(question, value)
        || current.iter().any(|selected| is_exclusive(question, selected))
    {
        return Toggle::Changed(vec![value.clone()]);
    }

    if let Some(max) = question.max_select
        && current.len() >= max
    {
        return Toggle::Rejected;
    }

    let mut next = current.to_vec();
    next.push(value.clone());
    Toggle::Changed(next)
}

/// Human hint shown next to choice questions.
pub fn selection_hint(question: &QuestionSpec) -> Option<String> {
    match question.kind {
        QuestionType::Single => Some("Select one".to_string()),
        QuestionType::Multi => Some(match question.max_select {
            Some(max) => format!("Select up to {}.", max),
            None => "Select all that apply".to_string(),
        }),
        _ => None,
    }
}
