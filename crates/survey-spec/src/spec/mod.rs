pub mod form;
pub mod question;

pub use form::{DEFAULT_SHEET_NAME, SpecError, SurveySpec};
pub use question::{MatrixColumn, MatrixRow, OptionValue, QuestionSpec, QuestionType, SurveyOption};
