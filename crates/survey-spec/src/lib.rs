#![allow(missing_docs)]

pub mod answers;
pub mod catalog;
pub mod condition;
pub mod export;
pub mod render;
pub mod selection;
pub mod session;
pub mod spec;
pub mod validate;
pub mod visibility;

pub use answers::{Answer, AnswerError, AnswerStore, other_text_key};
pub use catalog::CatalogError;
pub use condition::{Condition, Predicate};
pub use export::{
    ExportOptions, FlatRecord, GeoFix, Submission, SubmissionMeta, answer_columns,
    build_submission, flatten_answers, flatten_with,
};
pub use render::{
    RenderPayload, RenderQuestion, RenderStatus, build_render_payload, render_json_ui,
    render_text,
};
pub use selection::{Toggle, toggle};
pub use session::{Advance, Completion, InputError, Progress, Session, Step};
pub use spec::{
    MatrixColumn, MatrixRow, OptionValue, QuestionSpec, QuestionType, SpecError, SurveyOption,
    SurveySpec,
};
pub use validate::{ValidationResult, is_complete, validate};
pub use visibility::{
    VisibilityMap, prune_hidden_options, resolve_visibility, visible_options, visible_questions,
};
