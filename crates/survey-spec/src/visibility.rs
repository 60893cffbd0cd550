use crate::answers::{Answer, AnswerStore};
use crate::spec::{OptionValue, QuestionSpec, QuestionType, SurveyOption, SurveySpec};

pub type VisibilityMap = std::collections::BTreeMap<String, bool>;

fn is_visible(question: &QuestionSpec, answers: &AnswerStore) -> bool {
    question
        .condition
        .as_ref()
        .is_none_or(|condition| condition.evaluate(answers))
}

/// Per-question visibility for the whole catalog, informational entries included.
pub fn resolve_visibility(spec: &SurveySpec, answers: &AnswerStore) -> VisibilityMap {
    spec.questions
        .iter()
        .map(|question| (question.id.clone(), is_visible(question, answers)))
        .collect()
}

/// Ordered questions the respondent walks through for the current answers.
pub fn visible_questions<'a>(spec: &'a SurveySpec, answers: &AnswerStore) -> Vec<&'a QuestionSpec> {
    spec.questions
        .iter()
        .filter(|question| question.kind != QuestionType::Info)
        .filter(|question| is_visible(question, answers))
        .collect()
}

pub fn is_option_visible(option: &SurveyOption, answers: &AnswerStore) -> bool {
    option
        .hide_when
        .as_ref()
        .is_none_or(|condition| !condition.evaluate(answers))
}

/// Options of `question` not hidden by their hide rules.
pub fn visible_options<'a>(
    question: &'a QuestionSpec,
    answers: &AnswerStore,
) -> Vec<&'a SurveyOption> {
    question
        .options
        .iter()
        .filter(|option| is_option_visible(option, answers))
        .collect()
}

fn is_hidden(question: &QuestionSpec, value: &OptionValue, answers: &AnswerStore) -> bool {
    question
        .option(value)
        .is_some_and(|option| !is_option_visible(option, answers))
}

enum Prune {
    Clear,
    Replace(Answer),
}

/// Drops selections of options whose hide rule now holds. Returns the ids of the
/// questions whose stored answer changed.
///
/// Hide rules only reference earlier questions, so a single pass in catalog order
/// reaches a fixed point.
pub fn prune_hidden_options(spec: &SurveySpec, answers: &mut AnswerStore) -> Vec<String> {
    let mut pruned = Vec::new();

    for question in spec.questions.iter().filter(|q| q.kind.is_choice()) {
        let action = match answers.get(&question.id) {
            Some(Answer::Choice(value)) if is_hidden(question, value, answers) => Prune::Clear,
            Some(Answer::Choices(values)) => {
                let kept: Vec<OptionValue> = values
                    .iter()
                    .filter(|value| !is_hidden(question, value, answers))
                    .cloned()
                    .collect();
                if kept.len() == values.len() {
                    continue;
                }
                Prune::Replace(Answer::Choices(kept))
            }
            _ => continue,
        };

        match action {
            Prune::Clear => {
                answers.remove(&question.id);
            }
            Prune::Replace(answer) => answers.set(question.id.clone(), answer),
        }
        pruned.push(question.id.clone());
    }

    if !pruned.is_empty() {
        tracing::debug!(questions = ?pruned, "pruned selections of hidden options");
    }
    pruned
}
