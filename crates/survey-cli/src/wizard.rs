use std::io::{self, BufRead, Write};

use clap::ValueEnum;

use survey_runtime::SurveyRunner;
use survey_spec::{
    Advance, AnswerStore, OptionValue, QuestionType, RenderPayload, RenderQuestion, RenderStatus,
    Toggle, build_render_payload, render_json_ui, render_text,
};

use crate::CliResult;

const QUIT: &str = ":quit";
const BACK: &str = ":back";

/// Controls which bits of state the wizard prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: question prompts only.
    Clean,
    /// Verbose output: status and progress lines, input help.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum RenderMode {
    Text,
    Json,
}

/// Prints each step of the survey and the final answers.
pub struct WizardPresenter {
    verbosity: Verbosity,
    format: RenderMode,
    header_printed: bool,
    show_answers_json: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity, format: RenderMode, show_answers_json: bool) -> Self {
        Self {
            verbosity,
            format,
            header_printed: false,
            show_answers_json,
        }
    }

    pub fn show_header(&mut self, payload: &RenderPayload) {
        if self.header_printed {
            return;
        }
        println!("Survey: {}", payload.survey_title);
        if self.verbosity.is_verbose() {
            println!("Type {} to go back, {} to stop.", BACK, QUIT);
        }
        self.header_printed = true;
    }

    pub fn show_step(&self, payload: &RenderPayload) {
        if self.verbosity.is_verbose() {
            match &payload.progress {
                Some(progress) => println!(
                    "Status: {} ({}/{})",
                    payload.status.as_str(),
                    progress.position,
                    progress.total
                ),
                None => println!("Status: {}", payload.status.as_str()),
            }
        }
        match self.format {
            RenderMode::Text => {
                let text = render_text(payload);
                if !text.is_empty() {
                    println!("{}", text);
                }
            }
            RenderMode::Json => println!("{:#}", render_json_ui(payload)),
        }
    }

    pub fn show_input_help(&self, question: &RenderQuestion) {
        if !self.verbosity.is_verbose() {
            return;
        }
        let help = match question.kind {
            QuestionType::Single => "Enter an option number.",
            QuestionType::Multi => {
                "Enter option numbers separated by spaces; repeat a number to deselect it."
            }
            QuestionType::Matrix => "Enter one column number per row, separated by spaces.",
            QuestionType::Text | QuestionType::Email | QuestionType::Info => "Type your answer.",
        };
        println!("{}", help);
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if self.verbosity.is_verbose()
            && let Some(debug) = &error.debug_message
        {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_notice(&self, message: &str) {
        println!("{}", message);
    }

    pub fn show_completion(&self, answers: &AnswerStore) {
        if self.verbosity.is_verbose() {
            match answers.to_cbor() {
                Ok(bytes) => println!("Answers (CBOR hex): {}", encode_hex(&bytes)),
                Err(err) => eprintln!("Failed to serialize answers to CBOR: {}", err),
            }
        }
        if self.show_answers_json {
            match answers.to_json_pretty() {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => eprintln!("Failed to serialize answers to JSON: {}", err),
            }
        }
    }
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

/// Runs the survey to completion, reading one line per prompt from `input`.
pub fn drive<R: BufRead>(
    runner: &mut SurveyRunner,
    presenter: &mut WizardPresenter,
    input: &mut R,
) -> CliResult<()> {
    loop {
        let payload = build_render_payload(runner.session());
        presenter.show_header(&payload);

        match payload.status {
            RenderStatus::Intro => {
                presenter.show_step(&payload);
                let line = read_line(input, "Press Enter to start")?;
                if line == QUIT {
                    return Err("survey aborted by user".into());
                }
                runner.start();
            }
            RenderStatus::Submitted => {
                presenter.show_step(&payload);
                presenter.show_completion(runner.session().answers());
                return Ok(());
            }
            RenderStatus::Empty => {
                if !runner.retreat() {
                    return Err("no visible question is available".into());
                }
            }
            RenderStatus::NeedInput => {
                let Some(question) = &payload.question else {
                    return Err("render payload is missing its question".into());
                };
                presenter.show_step(&payload);
                presenter.show_input_help(question);

                let line = read_line(input, "")?;
                match line.as_str() {
                    QUIT => return Err("survey aborted by user".into()),
                    BACK => {
                        if !runner.retreat() {
                            presenter.show_notice("Already at the first question.");
                        }
                        continue;
                    }
                    "" => {}
                    raw => {
                        if let Err(err) = apply_answer(runner, question, raw, presenter) {
                            presenter.show_parse_error(&err);
                            continue;
                        }
                        collect_other_text(runner, question, presenter, input)?;
                    }
                }

                if runner.advance() == Advance::Blocked {
                    presenter.show_notice(blocked_message(question.kind));
                }
            }
        }
    }
}

fn read_line<R: BufRead>(input: &mut R, prompt: &str) -> CliResult<String> {
    if prompt.is_empty() {
        print!("> ");
    } else {
        print!("{}: ", prompt);
    }
    io::stdout().flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err("input ended before the survey was completed".into());
    }
    Ok(line.trim().to_string())
}

fn apply_answer(
    runner: &mut SurveyRunner,
    question: &RenderQuestion,
    raw: &str,
    presenter: &WizardPresenter,
) -> Result<(), AnswerParseError> {
    match question.kind {
        QuestionType::Single => {
            let value = pick_option(question, raw)?;
            runner
                .choose(&question.id, value)
                .map_err(|err| AnswerParseError::new(err.to_string(), None))
        }
        QuestionType::Multi => {
            let values = parse_numbers(raw, question.options.len())?
                .into_iter()
                .map(|index| question.options[index].value.clone())
                .collect::<Vec<_>>();
            for value in values {
                let outcome = runner
                    .toggle(&question.id, value.clone())
                    .map_err(|err| AnswerParseError::new(err.to_string(), None))?;
                if outcome == Toggle::Rejected {
                    let hint = question.hint.clone().unwrap_or_default();
                    presenter.show_notice(&format!("Option {} not added. {}", value, hint));
                }
            }
            Ok(())
        }
        QuestionType::Text | QuestionType::Email => runner
            .enter_text(&question.id, raw)
            .map_err(|err| AnswerParseError::new(err.to_string(), None)),
        QuestionType::Matrix => {
            let picks = parse_numbers(raw, question.columns.len())?;
            if picks.len() != question.rows.len() {
                return Err(AnswerParseError::new(
                    format!(
                        "Enter one column number for each of the {} rows.",
                        question.rows.len()
                    ),
                    Some(format!("got {} numbers", picks.len())),
                ));
            }
            for (row, column) in question.rows.iter().zip(picks) {
                let (value, _) = &question.columns[column];
                runner
                    .choose_matrix(&question.id, &row.id, value)
                    .map_err(|err| AnswerParseError::new(err.to_string(), None))?;
            }
            Ok(())
        }
        QuestionType::Info => Ok(()),
    }
}

fn pick_option(question: &RenderQuestion, raw: &str) -> Result<OptionValue, AnswerParseError> {
    let picks = parse_numbers(raw, question.options.len())?;
    match picks.as_slice() {
        [index] => Ok(question.options[*index].value.clone()),
        _ => Err(AnswerParseError::new(
            "Choose exactly one option.",
            Some(format!("option number between 1 and {}", question.options.len())),
        )),
    }
}

/// Parses 1-based numbers into 0-based indexes below `len`.
fn parse_numbers(raw: &str, len: usize) -> Result<Vec<usize>, AnswerParseError> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(|part| match part.parse::<usize>() {
            Ok(number) if (1..=len).contains(&number) => Ok(number - 1),
            _ => Err(AnswerParseError::new(
                format!("Enter numbers between 1 and {}.", len),
                Some(format!("'{}' is not a valid choice", part)),
            )),
        })
        .collect()
}

/// Prompts for the free text of every selected option that needs one.
fn collect_other_text<R: BufRead>(
    runner: &mut SurveyRunner,
    question: &RenderQuestion,
    presenter: &WizardPresenter,
    input: &mut R,
) -> CliResult<()> {
    for option in question.options.iter().filter(|option| option.requires_text) {
        let answers = runner.session().answers();
        let chosen = answers.selections(&question.id).contains(&option.value)
            || answers
                .get(&question.id)
                .is_some_and(|answer| answer.matches(&option.value));
        let missing = answers
            .other_text(&question.id, &option.value)
            .is_none_or(|text| text.trim().is_empty());
        if !chosen || !missing {
            continue;
        }

        let text = read_line(input, &format!("Please specify ({})", option.label))?;
        if let Err(err) = runner.set_other_text(&question.id, &option.value, &text) {
            presenter.show_parse_error(&AnswerParseError::new(err.to_string(), None));
        }
    }
    Ok(())
}

fn blocked_message(kind: QuestionType) -> &'static str {
    match kind {
        QuestionType::Single | QuestionType::Multi => {
            "Please select an option (and specify it when asked) before continuing."
        }
        QuestionType::Text => "Please enter your answer using letters and spaces only.",
        QuestionType::Email => "Please enter a valid email address.",
        QuestionType::Matrix => "Please answer every row before continuing.",
        QuestionType::Info => "Press Enter to continue.",
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_one_based_and_bounded() {
        assert_eq!(parse_numbers("1 3", 3).expect("valid"), vec![0, 2]);
        assert_eq!(parse_numbers("2,1", 2).expect("valid"), vec![1, 0]);
        assert!(parse_numbers("0", 3).is_err());
        assert!(parse_numbers("4", 3).is_err());
        assert!(parse_numbers("one", 3).is_err());
    }

    #[test]
    fn hex_encoding_is_lowercase() {
        assert_eq!(encode_hex(&[0x00, 0xab, 0x10]), "00ab10");
    }
}
