use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{validate_prompt, ChatError, ChatPart, ChatRelay, ChatTurn};
use crate::config::ChatConfig;

/// Returned instead of an error when the provider blocks a reply on safety grounds.
pub const SAFETY_REFUSAL: &str =
    "I'm sorry, I can't help with that request. Could you ask something else?";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_INSTRUCTION: &str = "You are the BotPsych assistant. BotPsych offers early autism \
screening questionnaires for children and adults, a dashboard that tracks screening results \
over time, and this chat. Be warm and encouraging. Explain that screening results indicate a \
risk level and are not a diagnosis, and recommend a qualified healthcare professional for any \
diagnostic or treatment question. When a question relates to a feature, point the user to \
/assessment or /dashboard.";

/// Relay backed by the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiRelay {
    client: reqwest::Client,
    api_key: String,
    url: String,
}

impl GeminiRelay {
    pub fn new(config: &ChatConfig, api_key: impl Into<String>) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| ChatError::Upstream(error.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            url: format!(
                "{}/models/{}:generateContent",
                config.endpoint.trim_end_matches('/'),
                config.model
            ),
        })
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &ChatConfig) -> Result<Option<Self>, ChatError> {
        match config.api_key.as_deref() {
            Some(key) => Self::new(config, key).map(Some),
            None => Ok(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl ChatRelay for GeminiRelay {
    async fn reply(&self, prompt: &str, history: &[ChatTurn]) -> Result<String, ChatError> {
        let request = GenerateContentRequest::new(validate_prompt(prompt)?, history);

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|error| ChatError::Upstream(error.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "chat provider rejected request");
            return Err(ChatError::Upstream(format!(
                "request failed with status {status}"
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|error| ChatError::Upstream(error.without_url().to_string()))?;
        debug!(candidates = body.candidates.len(), "chat provider replied");
        extract_reply(body)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GenerateContentRequest {
    contents: Vec<ChatTurn>,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<ChatPart>,
}

impl GenerateContentRequest {
    /// Prior turns followed by the new user prompt.
    pub(crate) fn new(prompt: &str, history: &[ChatTurn]) -> Self {
        let mut contents = history.to_vec();
        contents.push(ChatTurn::user(prompt));
        Self {
            contents,
            system_instruction: SystemInstruction {
                parts: vec![ChatPart {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// First candidate's first text part. A safety block yields [`SAFETY_REFUSAL`].
pub fn extract_reply(response: GenerateContentResponse) -> Result<String, ChatError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(ChatError::Upstream(
            "no valid content found in the response".to_string(),
        ));
    };

    let text = candidate
        .content
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text);

    match (text, candidate.finish_reason.as_deref()) {
        (Some(text), _) => Ok(text),
        (None, Some("SAFETY")) => Ok(SAFETY_REFUSAL.to_string()),
        (None, _) => Err(ChatError::Upstream(
            "no valid content found in the response".to_string(),
        )),
    }
}
