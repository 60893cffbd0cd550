//! Catalog loading and the bundled fellowship questionnaire.

use thiserror::Error;

use crate::spec::{SpecError, SurveySpec};

const FELLOWSHIP_JSON: &str = include_str!("../catalogs/wli_fellowship.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog '{id}' is invalid: {}", describe(.errors))]
    Invalid { id: String, errors: Vec<SpecError> },
}

fn describe(errors: &[SpecError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Parses a catalog and rejects it when any structural check fails.
pub fn load(json: &str) -> Result<SurveySpec, CatalogError> {
    let spec: SurveySpec = serde_json::from_str(json)?;
    let errors = spec.check();
    if errors.is_empty() {
        Ok(spec)
    } else {
        Err(CatalogError::Invalid {
            id: spec.id,
            errors,
        })
    }
}

/// The Women Leaders India fellowship evaluation questionnaire.
pub fn fellowship() -> Result<SurveySpec, CatalogError> {
    load(FELLOWSHIP_JSON)
}
