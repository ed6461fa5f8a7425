mod llm;
mod prompt;
mod rules;

pub use llm::{LlmExtractorSettings, LlmPreferenceExtractor};
pub use rules::RuleBasedExtractor;

use async_trait::async_trait;

use super::domain::{CriteriaViolation, SelectionCriteria};
use super::questionnaire::QuestionnaireAnswers;

/// Name of the tool the language model must call with the structured criteria.
pub const SELECTION_TOOL_NAME: &str = "get_wines";

/// Turns raw questionnaire answers into filters, color weights and taste preferences.
///
/// Implementations make a single attempt per call; callers decide whether to retry.
#[async_trait]
pub trait PreferenceExtractor: Send + Sync {
    async fn extract(
        &self,
        answers: &QuestionnaireAnswers,
    ) -> Result<SelectionCriteria, ExtractionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("extractor transport failed: {0}")]
    Transport(String),
    #[error("extractor service returned an error: {0}")]
    Api(String),
    #[error("no `get_wines` call found in extractor response")]
    NoToolCall,
    #[error("malformed selection criteria: {0}")]
    Malformed(String),
}

impl From<CriteriaViolation> for ExtractionError {
    fn from(value: CriteriaViolation) -> Self {
        Self::Malformed(value.to_string())
    }
}

/// Parses the tool arguments JSON and checks value ranges.
pub fn parse_criteria(arguments: &str) -> Result<SelectionCriteria, ExtractionError> {
    let criteria: SelectionCriteria = serde_json::from_str(arguments.trim())
        .map_err(|err| ExtractionError::Malformed(err.to_string()))?;
    criteria.validate()?;
    Ok(criteria)
}
