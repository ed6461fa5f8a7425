use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{parse_criteria, prompt, ExtractionError, PreferenceExtractor, SELECTION_TOOL_NAME};
use crate::selection::domain::SelectionCriteria;
use crate::selection::questionnaire::QuestionnaireAnswers;

const INLINE_CALL_OPEN: &str = "<function=get_wines>";
const INLINE_CALL_CLOSE: &str = "</function>";

/// Connection settings for an OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmExtractorSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
}

/// Extractor backed by a language model forced to call the selection tool.
#[derive(Clone)]
pub struct LlmPreferenceExtractor {
    http_client: Client,
    settings: LlmExtractorSettings,
}

impl LlmPreferenceExtractor {
    pub fn new(settings: LlmExtractorSettings) -> Self {
        Self::with_client(Client::new(), settings)
    }

    pub fn with_client(http_client: Client, settings: LlmExtractorSettings) -> Self {
        Self {
            http_client,
            settings,
        }
    }

    pub fn settings(&self) -> &LlmExtractorSettings {
        &self.settings
    }

    fn request_body(&self, answers: &QuestionnaireAnswers) -> Result<Value, ExtractionError> {
        let user_prompt = prompt::user_prompt(answers)
            .map_err(|err| ExtractionError::Transport(format!("cannot encode answers: {err}")))?;

        Ok(json!({
            "model": self.settings.model,
            "temperature": self.settings.temperature,
            "stream": false,
            "messages": [
                { "role": "system", "content": prompt::SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt }
            ],
            "tools": [prompt::selection_tool()],
            "tool_choice": { "type": "function", "function": { "name": SELECTION_TOOL_NAME } }
        }))
    }
}

impl std::fmt::Debug for LlmPreferenceExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmPreferenceExtractor")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PreferenceExtractor for LlmPreferenceExtractor {
    async fn extract(
        &self,
        answers: &QuestionnaireAnswers,
    ) -> Result<SelectionCriteria, ExtractionError> {
        let start = std::time::Instant::now();
        let body = self.request_body(answers)?;

        let response = self
            .http_client
            .post(format!(
                "{}/chat/completions",
                self.settings.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.settings.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                warn!(error = %err, "extractor request failed");
                ExtractionError::Transport(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(status = %status, error = %error_text, "extractor API error");
            return Err(ExtractionError::Api(format!("{status}: {error_text}")));
        }

        let completion: ChatCompletion = response
            .json()
            .await
            .map_err(|err| ExtractionError::Malformed(err.to_string()))?;

        debug!(
            model = %self.settings.model,
            duration_ms = start.elapsed().as_millis(),
            "extractor completion received"
        );

        let message = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(ExtractionError::NoToolCall)?;

        criteria_from_message(&message)
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChatMessage {
    #[serde(default)]
    pub(crate) content: Option<String>,
    #[serde(default)]
    pub(crate) tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToolCall {
    pub(crate) function: FunctionCall,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FunctionCall {
    pub(crate) name: String,
    /// Usually a JSON string; some providers send the object itself.
    pub(crate) arguments: Value,
}

/// Reads the criteria from the first tool call, or from an inline
/// `<function=get_wines>…</function>` block some models emit in plain content.
pub(crate) fn criteria_from_message(
    message: &ChatMessage,
) -> Result<SelectionCriteria, ExtractionError> {
    if let Some(call) = message.tool_calls.as_ref().and_then(|calls| calls.first()) {
        if call.function.name == SELECTION_TOOL_NAME {
            return match &call.function.arguments {
                Value::String(arguments) => parse_criteria(arguments),
                other => parse_criteria(&other.to_string()),
            };
        }
    }

    if let Some(arguments) = message.content.as_deref().and_then(inline_arguments) {
        return parse_criteria(arguments);
    }

    Err(ExtractionError::NoToolCall)
}

fn inline_arguments(content: &str) -> Option<&str> {
    let start = content.find(INLINE_CALL_OPEN)? + INLINE_CALL_OPEN.len();
    let rest = &content[start..];
    let end = rest.find(INLINE_CALL_CLOSE)?;
    Some(&rest[..end])
}
