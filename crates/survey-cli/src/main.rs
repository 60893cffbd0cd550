mod wizard;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use survey_runtime::{
    ContextProvider, FileDeviceStore, FixedContext, JsonLinesSink, RuntimeConfig, SurveyRunner,
    UnavailableContext,
};
use survey_spec::export::META_COLUMNS;
use survey_spec::{
    AnswerStore, ExportOptions, SurveySpec, ValidationResult, answer_columns, catalog,
    flatten_with, validate,
};
use wizard::{RenderMode, Verbosity, WizardPresenter};

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const DEFAULT_LOG_FILTER: &str = "fellowship_survey=info,survey_runtime=info";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Fellowship evaluation survey",
    long_about = "Runs the fellowship evaluation survey in a terminal and provides catalog and answer tooling"
)]
struct Cli {
    /// Runtime configuration (JSON). Defaults to config.json in the platform config directory.
    #[arg(long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Take the survey interactively and append the record to the output file.
    Run {
        /// Catalog JSON to run instead of the bundled questionnaire.
        #[arg(long, value_name = "CATALOG")]
        catalog: Option<PathBuf>,
        /// JSON-lines file receiving the submission.
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// File holding the device identifier.
        #[arg(long, value_name = "FILE")]
        device_id: Option<PathBuf>,
        /// Show status lines, input help and the CBOR answer snapshot.
        #[arg(long, alias = "debug")]
        verbose: bool,
        /// Also print the answers as JSON when the survey completes.
        #[arg(long)]
        answers_json: bool,
        /// Render output mode for each step.
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Check a catalog for structural problems.
    Check {
        #[arg(long, value_name = "CATALOG")]
        catalog: Option<PathBuf>,
    },
    /// Check an answers file against the catalog's visibility and validation rules.
    Validate {
        #[arg(long, value_name = "CATALOG")]
        catalog: Option<PathBuf>,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// Flatten an answers file into the export record.
    Export {
        #[arg(long, value_name = "CATALOG")]
        catalog: Option<PathBuf>,
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
        /// Leave cells of hidden questions empty.
        #[arg(long)]
        blank_hidden: bool,
    },
    /// List the export columns in order.
    Columns {
        #[arg(long, value_name = "CATALOG")]
        catalog: Option<PathBuf>,
        /// Skip the session metadata columns.
        #[arg(long)]
        answers_only: bool,
    },
    /// Print the JSON schema of the catalog format.
    Schema,
}

#[tokio::main]
async fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = RuntimeConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Run {
            catalog,
            output,
            device_id,
            verbose,
            answers_json,
            format,
        } => {
            let options = RunOptions {
                catalog,
                output,
                device_id,
                verbose,
                answers_json,
                format,
            };
            run_survey(config, options).await
        }
        Command::Check { catalog } => run_check(resolve_catalog(catalog, &config).as_deref()),
        Command::Validate { catalog, answers } => {
            run_validate(resolve_catalog(catalog, &config).as_deref(), &answers)
        }
        Command::Export {
            catalog,
            answers,
            blank_hidden,
        } => run_export(
            resolve_catalog(catalog, &config).as_deref(),
            &answers,
            blank_hidden,
        ),
        Command::Columns {
            catalog,
            answers_only,
        } => run_columns(resolve_catalog(catalog, &config).as_deref(), answers_only),
        Command::Schema => run_schema(),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

struct RunOptions {
    catalog: Option<PathBuf>,
    output: Option<PathBuf>,
    device_id: Option<PathBuf>,
    verbose: bool,
    answers_json: bool,
    format: RenderMode,
}

async fn run_survey(config: RuntimeConfig, options: RunOptions) -> CliResult<()> {
    let catalog_path = resolve_catalog(options.catalog, &config);
    let spec = Arc::new(load_catalog(catalog_path.as_deref())?);
    let output = options.output.unwrap_or_else(|| config.output.clone());
    let device = match options.device_id.or_else(|| config.device_id_path.clone()) {
        Some(path) => FileDeviceStore::new(path),
        None => FileDeviceStore::in_data_dir(),
    };
    let context: Arc<dyn ContextProvider> = match config.position {
        Some(fix) => Arc::new(FixedContext::new(fix)),
        None => Arc::new(UnavailableContext),
    };

    let mut runner = SurveyRunner::new(spec.clone(), Arc::new(JsonLinesSink::new(&output)))
        .with_context(context)
        .with_device(Arc::new(device))
        .with_context_timeout(config.context_timeout());
    if let Some(sheet_name) = &config.sheet_name {
        runner = runner.with_sheet_name(sheet_name.clone());
    }
    tracing::info!(survey = %spec.id, output = %output.display(), "survey session opened");

    let mut presenter = WizardPresenter::new(
        Verbosity::from_verbose(options.verbose),
        options.format,
        options.answers_json,
    );
    let outcome = {
        let mut input = io::stdin().lock();
        wizard::drive(&mut runner, &mut presenter, &mut input)
    };
    runner.flush().await;
    outcome
}

fn resolve_catalog(flag: Option<PathBuf>, config: &RuntimeConfig) -> Option<PathBuf> {
    flag.or_else(|| config.catalog.clone())
}

fn load_catalog(path: Option<&Path>) -> CliResult<SurveySpec> {
    let spec = match path {
        Some(path) => catalog::load(&fs::read_to_string(path)?)?,
        None => catalog::fellowship()?,
    };
    Ok(spec)
}

fn load_answers(spec: &SurveySpec, path: &Path) -> CliResult<AnswerStore> {
    let raw: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    Ok(AnswerStore::from_json(spec, &raw)?)
}

fn run_check(path: Option<&Path>) -> CliResult<()> {
    let spec: SurveySpec = match path {
        Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
        None => catalog::fellowship()?,
    };
    let errors = spec.check();
    if !errors.is_empty() {
        println!("Catalog '{}' has {} problem(s):", spec.id, errors.len());
        for error in &errors {
            println!("  - {}", error);
        }
        return Err("catalog check failed".into());
    }

    println!(
        "Catalog '{}' ({}) v{} is valid: {} entries, {} answer columns.",
        spec.id,
        spec.title,
        spec.version,
        spec.questions.len(),
        answer_columns(&spec).len()
    );
    Ok(())
}

fn run_validate(catalog_path: Option<&Path>, answers_path: &Path) -> CliResult<()> {
    let spec = load_catalog(catalog_path)?;
    let answers = load_answers(&spec, answers_path)?;

    let result = validate(&spec, &answers);
    println!(
        "Validation result: {}",
        if result.valid { "valid" } else { "invalid" }
    );
    describe_validation(&result);

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    if !result.incomplete.is_empty() {
        println!("Incomplete questions: {}", result.incomplete.join(", "));
    }
}

fn run_export(
    catalog_path: Option<&Path>,
    answers_path: &Path,
    blank_hidden: bool,
) -> CliResult<()> {
    let spec = load_catalog(catalog_path)?;
    let answers = load_answers(&spec, answers_path)?;
    let record = flatten_with(&spec, &answers, ExportOptions { blank_hidden });
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn run_columns(catalog_path: Option<&Path>, answers_only: bool) -> CliResult<()> {
    let spec = load_catalog(catalog_path)?;
    if !answers_only {
        for column in META_COLUMNS {
            println!("{}", column);
        }
    }
    for column in answer_columns(&spec) {
        println!("{}", column);
    }
    Ok(())
}

fn run_schema() -> CliResult<()> {
    let schema = schemars::schema_for!(SurveySpec);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flag_catalog_wins_over_config() {
        let config = RuntimeConfig {
            catalog: Some(PathBuf::from("from-config.json")),
            ..RuntimeConfig::default()
        };
        assert_eq!(
            resolve_catalog(Some(PathBuf::from("flag.json")), &config),
            Some(PathBuf::from("flag.json"))
        );
        assert_eq!(
            resolve_catalog(None, &config),
            Some(PathBuf::from("from-config.json"))
        );
    }
}
