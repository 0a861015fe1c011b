//! The external language-model collaborator.
//!
//! [`TextService`] is the seam the dispatcher talks to; [`LlmService`] is the
//! HTTP implementation over an OpenAI-compatible chat-completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{
    provider::Provider,
    settings::Level,
    types::Cue,
    vocabulary::{MAX_VOCABULARY_TERMS, VocabularyTerm, parse_vocabulary},
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid API credential")]
    InvalidCredential,

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub provider: Provider,
    pub api_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationRequest {
    pub text: String,
    pub target_language: String,
    pub level: Level,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyRequest {
    pub text: String,
    pub target_language: String,
    pub level: Level,
}

#[async_trait]
pub trait TextService: Send + Sync {
    async fn generate_subtitles(
        &self,
        credential: &Credential,
        video_url: &str,
    ) -> Result<Vec<Cue>, ServiceError>;

    async fn translate(
        &self,
        credential: &Credential,
        request: &TranslationRequest,
    ) -> Result<String, ServiceError>;

    /// At most [`MAX_VOCABULARY_TERMS`] terms.
    async fn extract_vocabulary(
        &self,
        credential: &Credential,
        request: &VocabularyRequest,
    ) -> Result<Vec<VocabularyTerm>, ServiceError>;

    async fn generate_example_sentence(
        &self,
        credential: &Credential,
        word: &str,
        level: Level,
    ) -> Result<String, ServiceError>;
}

pub struct LlmService {
    client: reqwest::Client,
    api_url_override: Option<String>,
}

impl LlmService {
    pub fn new() -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ServiceError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            api_url_override: None,
        })
    }

    /// Send every request to `api_url` instead of the provider's endpoint.
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url_override = Some(api_url.into());
        self
    }

    async fn complete(
        &self,
        credential: &Credential,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
    ) -> Result<String, ServiceError> {
        let config = credential.provider.config();
        let api_url = self.api_url_override.as_deref().unwrap_or(config.api_url);

        tracing::debug!(provider = credential.provider.name(), api_url, "sending completion request");

        let response = self
            .client
            .post(api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", credential.api_key))
            .json(&serde_json::json!({
                "model": config.model,
                "messages": [
                    {
                        "role": "system",
                        "content": system_prompt,
                    },
                    {
                        "role": "user",
                        "content": user_prompt,
                    },
                ],
                "temperature": temperature,
            }))
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %truncate(&body, 200), "completion request rejected");
            return Err(classify_status(status, &body));
        }

        let response = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ServiceError::InvalidResponse(e.to_string()))?;

        extract_content(&response)
    }
}

#[async_trait]
impl TextService for LlmService {
    async fn generate_subtitles(
        &self,
        credential: &Credential,
        video_url: &str,
    ) -> Result<Vec<Cue>, ServiceError> {
        let user_prompt = format!("Transcribe the speech of this video: {video_url}");
        let content = self
            .complete(credential, SUBTITLES_PROMPT, &user_prompt, 0.0)
            .await?;
        parse_cues(&content)
    }

    async fn translate(
        &self,
        credential: &Credential,
        request: &TranslationRequest,
    ) -> Result<String, ServiceError> {
        let system_prompt = format!(
            "Translate the user's subtitle line into {lang}. The learner's level is {level}; \
             keep the wording natural for that level. Output only the translation.",
            lang = request.target_language,
            level = request.level,
        );
        let content = self
            .complete(credential, &system_prompt, &request.text, 0.3)
            .await?;
        let translation = content.trim();
        if translation.is_empty() {
            return Err(ServiceError::InvalidResponse("empty translation".into()));
        }
        Ok(translation.to_string())
    }

    async fn extract_vocabulary(
        &self,
        credential: &Credential,
        request: &VocabularyRequest,
    ) -> Result<Vec<VocabularyTerm>, ServiceError> {
        let system_prompt = format!(
            "Pick the {max} words or phrases from the user's sentence that a {level} learner \
             is least likely to know. Output one per line as `word - translation`, with the \
             translation in {lang}. Copy each word exactly as it appears. No other text.",
            max = MAX_VOCABULARY_TERMS,
            level = request.level,
            lang = request.target_language,
        );
        let content = self
            .complete(credential, &system_prompt, &request.text, 0.2)
            .await?;
        Ok(parse_vocabulary(&content))
    }

    async fn generate_example_sentence(
        &self,
        credential: &Credential,
        word: &str,
        level: Level,
    ) -> Result<String, ServiceError> {
        let system_prompt = format!(
            "Write one short example sentence using the user's word, suitable for a {level} \
             learner. Output only the sentence."
        );
        let content = self.complete(credential, &system_prompt, word, 0.7).await?;
        Ok(content.trim().to_string())
    }
}

static SUBTITLES_PROMPT: &str = r#"You generate subtitles for videos.

Output ONLY a JSON array (no markdown, no explanation) of sentence-level cues:
[
  {"startTime": 0, "endTime": 2400, "text": "First sentence."}
]

Rules:
- startTime and endTime are integer milliseconds from the start of the video
- Cues are sorted by startTime and do not overlap
- One sentence per cue, in the spoken language"#;

fn classify_transport_error(e: reqwest::Error) -> ServiceError {
    if e.is_connect() || e.is_timeout() {
        ServiceError::Unavailable(e.to_string())
    } else {
        ServiceError::RequestFailed(e.to_string())
    }
}

pub(crate) fn classify_status(status: StatusCode, body: &str) -> ServiceError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ServiceError::InvalidCredential,
        StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT
        | StatusCode::NOT_FOUND => ServiceError::Unavailable(format!("HTTP {status}")),
        _ => ServiceError::RequestFailed(format!("HTTP {status}: {}", truncate(body, 200))),
    }
}

pub(crate) fn extract_content(response: &serde_json::Value) -> Result<String, ServiceError> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| {
            ServiceError::InvalidResponse(format!(
                "missing choices[0].message.content: {}",
                truncate(&response.to_string(), 200)
            ))
        })
}

/// Models like to wrap JSON in ``` fences even when told not to.
pub(crate) fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub(crate) fn parse_cues(content: &str) -> Result<Vec<Cue>, ServiceError> {
    serde_json::from_str(strip_code_fences(content))
        .map_err(|e| ServiceError::InvalidResponse(format!("subtitle JSON: {e}")))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
