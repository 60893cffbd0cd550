use serde_json::{Map, Value, json};

use crate::answers::Answer;
use crate::selection::selection_hint;
use crate::session::{Session, Step};
use crate::spec::{OptionValue, QuestionType};
use crate::visibility::visible_options;

pub const COMPLETION_MESSAGE: &str = "Great! Thank you for participating in the survey.";

/// Status labels returned by the renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStatus {
    /// Waiting for the respondent to start.
    Intro,
    /// A question is on screen.
    NeedInput,
    /// The survey was submitted.
    Submitted,
    /// The position no longer maps to a visible question; nothing to show.
    Empty,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::Intro => "intro",
            RenderStatus::NeedInput => "need_input",
            RenderStatus::Submitted => "submitted",
            RenderStatus::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderProgress {
    pub position: usize,
    pub total: usize,
}

/// An option as presented to the respondent.
#[derive(Debug, Clone)]
pub struct RenderOption {
    pub value: OptionValue,
    pub label: String,
    pub selected: bool,
    pub exclusive: bool,
    pub requires_text: bool,
    pub other_text: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RenderRow {
    pub id: String,
    pub label: String,
    pub selected: Option<String>,
}

/// Describes the current question.
#[derive(Debug, Clone)]
pub struct RenderQuestion {
    pub id: String,
    pub section: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: QuestionType,
    pub hint: Option<String>,
    pub options: Vec<RenderOption>,
    pub rows: Vec<RenderRow>,
    /// Column value/label pairs of a matrix question.
    pub columns: Vec<(String, String)>,
    pub text: Option<String>,
    pub can_advance: bool,
    pub is_last: bool,
}

/// Collected payload used by both text and JSON renderers.
#[derive(Debug, Clone)]
pub struct RenderPayload {
    pub survey_id: String,
    pub survey_title: String,
    pub status: RenderStatus,
    pub intro_title: Option<String>,
    pub intro: Option<String>,
    pub progress: Option<RenderProgress>,
    pub question: Option<RenderQuestion>,
}

pub fn build_render_payload(session: &Session) -> RenderPayload {
    let spec = session.spec();
    let intro = spec.intro();
    let question = session.current_question().map(|question| {
        let answers = session.answers();
        let answer = answers.get(&question.id);
        let selected: Vec<OptionValue> = match answer {
            Some(Answer::Choice(value)) => vec![value.clone()],
            Some(Answer::Choices(values)) => values.clone(),
            _ => Vec::new(),
        };
        let options = visible_options(question, answers)
            .into_iter()
            .map(|option| RenderOption {
                value: option.value.clone(),
                label: option.label.clone(),
                selected: selected.contains(&option.value),
                exclusive: option.exclusive,
                requires_text: option.requires_text,
                other_text: answers
                    .other_text(&question.id, &option.value)
                    .map(str::to_string),
            })
            .collect();
        let matrix = answer.and_then(Answer::as_matrix);
        let rows = question
            .matrix_rows
            .iter()
            .map(|row| RenderRow {
                id: row.id.clone(),
                label: row.label.clone(),
                selected: matrix.and_then(|rows| rows.get(&row.id)).cloned(),
            })
            .collect();

        RenderQuestion {
            id: question.id.clone(),
            section: question.section.clone(),
            title: question.title.clone(),
            description: question.description.clone(),
            kind: question.kind,
            hint: selection_hint(question),
            options,
            rows,
            columns: question
                .matrix_columns
                .iter()
                .map(|column| (column.value.clone(), column.label.clone()))
                .collect(),
            text: answer.and_then(Answer::as_text).map(str::to_string),
            can_advance: session.can_advance(),
            is_last: session.is_last(),
        }
    });

    let status = match session.step() {
        Step::Intro => RenderStatus::Intro,
        Step::Submitted => RenderStatus::Submitted,
        Step::Question(_) if question.is_some() => RenderStatus::NeedInput,
        Step::Question(_) => RenderStatus::Empty,
    };

    RenderPayload {
        survey_id: spec.id.clone(),
        survey_title: spec.title.clone(),
        status,
        intro_title: intro.map(|entry| entry.title.clone()),
        intro: intro.and_then(|entry| entry.description.clone()),
        progress: session.progress().map(|progress| RenderProgress {
            position: progress.position,
            total: progress.total,
        }),
        question,
    }
}

/// Render the payload as a structured JSON-friendly value.
pub fn render_json_ui(payload: &RenderPayload) -> Value {
    let question = payload.question.as_ref().map(|question| {
        let mut map = Map::new();
        map.insert("id".into(), Value::String(question.id.clone()));
        map.insert("section".into(), Value::String(question.section.clone()));
        map.insert("title".into(), Value::String(question.title.clone()));
        map.insert(
            "description".into(),
            question
                .description
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
        );
        map.insert("type".into(), Value::String(question.kind.as_str().into()));
        if let Some(hint) = &question.hint {
            map.insert("hint".into(), Value::String(hint.clone()));
        }
        if !question.options.is_empty() {
            let options = question
                .options
                .iter()
                .map(|option| {
                    json!({
                        "value": option.value.to_json(),
                        "label": option.label,
                        "selected": option.selected,
                        "exclusive": option.exclusive,
                        "requires_text": option.requires_text,
                        "other_text": option.other_text,
                    })
                })
                .collect::<Vec<_>>();
            map.insert("options".into(), Value::Array(options));
        }
        if !question.rows.is_empty() {
            let rows = question
                .rows
                .iter()
                .map(|row| json!({ "id": row.id, "label": row.label, "selected": row.selected }))
                .collect::<Vec<_>>();
            let columns = question
                .columns
                .iter()
                .map(|(value, label)| json!({ "value": value, "label": label }))
                .collect::<Vec<_>>();
            map.insert("rows".into(), Value::Array(rows));
            map.insert("columns".into(), Value::Array(columns));
        }
        if let Some(text) = &question.text {
            map.insert("current_value".into(), Value::String(text.clone()));
        }
        map.insert("can_advance".into(), Value::Bool(question.can_advance));
        map.insert("is_last".into(), Value::Bool(question.is_last));
        Value::Object(map)
    });

    let progress = payload.progress.as_ref().map(|progress| {
        json!({
            "position": progress.position,
            "total": progress.total,
        })
    });

    json!({
        "survey_id": payload.survey_id,
        "survey_title": payload.survey_title,
        "status": payload.status.as_str(),
        "intro_title": payload.intro_title,
        "intro": payload.intro,
        "progress": progress,
        "question": question,
    })
}

/// Render the payload as human-friendly text.
pub fn render_text(payload: &RenderPayload) -> String {
    let mut lines = Vec::new();

    match payload.status {
        RenderStatus::Intro => {
            lines.push(
                payload
                    .intro_title
                    .clone()
                    .unwrap_or_else(|| payload.survey_title.clone()),
            );
            if let Some(intro) = &payload.intro {
                lines.push(String::new());
                lines.push(intro.clone());
            }
        }
        RenderStatus::Submitted => lines.push(COMPLETION_MESSAGE.to_string()),
        RenderStatus::Empty => {}
        RenderStatus::NeedInput => {
            if let Some(question) = &payload.question {
                render_question_text(question, payload.progress.as_ref(), &mut lines);
            }
        }
    }

    lines.join("\n")
}

fn render_question_text(
    question: &RenderQuestion,
    progress: Option<&RenderProgress>,
    lines: &mut Vec<String>,
) {
    if let Some(progress) = progress {
        lines.push(format!(
            "[{}/{}] {}",
            progress.position, progress.total, question.section
        ));
    }
    lines.push(question.title.clone());
    if let Some(description) = &question.description {
        lines.push(description.clone());
    }
    if let Some(hint) = &question.hint {
        lines.push(format!("({})", hint));
    }

    for (index, option) in question.options.iter().enumerate() {
        let marker = match (question.kind, option.selected) {
            (QuestionType::Single, true) => "(*)",
            (QuestionType::Single, false) => "( )",
            (_, true) => "[x]",
            (_, false) => "[ ]",
        };
        let mut entry = format!("  {} {}. {}", marker, index + 1, option.label);
        if option.requires_text
            && let Some(text) = &option.other_text
        {
            entry.push_str(&format!(" = {}", text));
        }
        lines.push(entry);
    }

    if !question.rows.is_empty() {
        let columns = question
            .columns
            .iter()
            .enumerate()
            .map(|(index, (_, label))| format!("{}={}", index + 1, label))
            .collect::<Vec<_>>();
        lines.push(format!("  Columns: {}", columns.join(", ")));
        for row in &question.rows {
            let selected = row
                .selected
                .as_ref()
                .and_then(|value| question.columns.iter().find(|(v, _)| v == value))
                .map(|(_, label)| label.as_str())
                .unwrap_or("-");
            lines.push(format!("  {}: {}", row.label, selected));
        }
    }

    if let Some(text) = &question.text {
        lines.push(format!("  Current value: {}", text));
    }
}
