use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::llm::{BackendError, CompletionBackend, ContentPart, GenerationProfile};
use crate::utils::http::get_http_client;
use crate::utils::timing::log_llm_timing;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    #[allow(dead_code)]
    Other(Value),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct SamplingConfig {
    temperature: f32,
    top_k: i32,
    top_p: f32,
    max_output_tokens: i32,
}

const COOK_SAMPLING: SamplingConfig = SamplingConfig {
    temperature: 0.35,
    top_k: 40,
    top_p: 0.95,
    max_output_tokens: 1024,
};

/// Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    sampling: SamplingConfig,
    safety_profile: String,
    timeout: Duration,
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

fn build_safety_settings(profile: &str) -> Vec<Value> {
    let threshold = match profile {
        "standard" => "BLOCK_MEDIUM_AND_ABOVE",
        "permissive" => "OFF",
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}', using permissive defaults.",
                profile
            );
            "OFF"
        }
    };

    vec![
        json!({ "category": "HARM_CATEGORY_HARASSMENT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_HATE_SPEECH", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_SEXUALLY_EXPLICIT", "threshold": threshold }),
        json!({ "category": "HARM_CATEGORY_DANGEROUS_CONTENT", "threshold": threshold }),
    ]
}

fn build_parts(parts: &[ContentPart]) -> Vec<Value> {
    parts
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => json!({ "text": text }),
            ContentPart::Image(image) => json!({
                "inlineData": {
                    "mimeType": image.mime_type,
                    "data": general_purpose::STANDARD.encode(&image.bytes),
                }
            }),
        })
        .collect()
}

fn summarize_parts(parts: &[ContentPart]) -> Value {
    Value::Array(
        parts
            .iter()
            .map(|part| match part {
                ContentPart::Text(text) => json!({ "text": truncate_for_log(text, 200) }),
                ContentPart::Image(image) => json!({
                    "inlineData": { "mimeType": image.mime_type, "dataLen": image.bytes.len() }
                }),
            })
            .collect(),
    )
}

fn summarize_error_body(body: &str) -> (Option<String>, String) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return (None, "empty response body".to_string());
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let message = value
            .pointer("/error/message")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .or_else(|| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(|v| v.to_string())
            });
        return (message, truncate_for_log(&value.to_string(), 2000));
    }

    (None, truncate_for_log(trimmed, 2000))
}

fn extract_text_from_response(response: GeminiResponse) -> Result<String, BackendError> {
    if let Some(reason) = response
        .prompt_feedback
        .and_then(|feedback| feedback.block_reason)
    {
        return Err(BackendError::Blocked(reason));
    }

    let mut text_parts = Vec::new();
    let mut finish_reasons = Vec::new();
    for candidate in response.candidates.unwrap_or_default() {
        if let Some(reason) = candidate.finish_reason {
            finish_reasons.push(reason);
        }
        let parts = candidate
            .content
            .and_then(|content| content.parts)
            .unwrap_or_default();
        for part in parts {
            if let GeminiPart::Text { text } = part {
                if !text.trim().is_empty() {
                    text_parts.push(text);
                }
            }
        }
    }

    if !text_parts.is_empty() {
        return Ok(text_parts.join("\n"));
    }
    if let Some(reason) = finish_reasons
        .into_iter()
        .find(|reason| matches!(reason.as_str(), "SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST"))
    {
        return Err(BackendError::Blocked(reason));
    }
    Err(BackendError::EmptyResponse)
}

impl GeminiClient {
    pub fn from_config(config: &Config) -> Self {
        GeminiClient {
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: config.gemini_base_url.clone(),
            sampling: SamplingConfig {
                temperature: config.gemini_temperature,
                top_k: config.gemini_top_k,
                top_p: config.gemini_top_p,
                max_output_tokens: config.gemini_max_output_tokens,
            },
            safety_profile: config.gemini_safety_settings.clone(),
            timeout: Duration::from_secs(config.gemini_timeout_seconds),
        }
    }

    fn sampling_for(&self, profile: GenerationProfile) -> SamplingConfig {
        match profile {
            GenerationProfile::Default => self.sampling,
            GenerationProfile::Cook => COOK_SAMPLING,
        }
    }

    fn build_payload(&self, parts: &[ContentPart], profile: GenerationProfile) -> Value {
        let sampling = self.sampling_for(profile);
        let mut generation_config = Map::new();
        generation_config.insert("temperature".to_string(), json!(sampling.temperature));
        generation_config.insert("topK".to_string(), json!(sampling.top_k));
        generation_config.insert("topP".to_string(), json!(sampling.top_p));
        generation_config.insert(
            "maxOutputTokens".to_string(),
            json!(sampling.max_output_tokens),
        );

        json!({
            "contents": [{ "role": "user", "parts": build_parts(parts) }],
            "generationConfig": Value::Object(generation_config),
            "safetySettings": build_safety_settings(&self.safety_profile),
        })
    }

    async fn call_api(&self, payload: Value) -> Result<GeminiResponse, BackendError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let response = get_http_client()
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                warn!(
                    "Gemini request failed to send: {} (timeout={}, connect={})",
                    err,
                    err.is_timeout(),
                    err.is_connect()
                );
                BackendError::Transport(err.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (message, body_summary) = summarize_error_body(&body);
            warn!("Gemini API error: status={}, body={}", status, body_summary);
            let detail = message.unwrap_or(body_summary);
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(BackendError::Quota(detail));
            }
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: detail,
            });
        }

        response
            .json::<GeminiResponse>()
            .await
            .map_err(|err| BackendError::Decode(err.to_string()))
    }
}

#[async_trait]
impl CompletionBackend for GeminiClient {
    async fn chat(&self, prompt: &str) -> Result<String, BackendError> {
        self.generate(vec![ContentPart::text(prompt)], GenerationProfile::Default)
            .await
    }

    async fn generate(
        &self,
        parts: Vec<ContentPart>,
        profile: GenerationProfile,
    ) -> Result<String, BackendError> {
        if self.api_key.trim().is_empty() {
            return Err(BackendError::MissingApiKey);
        }

        if tracing::enabled!(tracing::Level::DEBUG) {
            debug!(
                target: "llm.gemini",
                model = %self.model,
                profile = ?profile,
                parts = %summarize_parts(&parts)
            );
        }

        let payload = self.build_payload(&parts, profile);
        let operation = match profile {
            GenerationProfile::Default => "generate_content",
            GenerationProfile::Cook => "generate_content_cook",
        };
        let metadata = json!({ "parts": parts.len(), "profile": format!("{profile:?}") });
        log_llm_timing("gemini", &self.model, operation, Some(metadata), || async {
            let response = self.call_api(payload).await?;
            extract_text_from_response(response)
        })
        .await
    }
}
