use crate::traits::{LlmClient, LlmResponse};
use async_trait::async_trait;
use parley_common::{ParleyError, Result};
use parley_http::{Auth, HttpClient, HttpError, RequestOpts};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Finish reasons for which the candidate text must not be shown.
const BLOCKED_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: &'static str,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    prompt_feedback: Option<GeminiPromptFeedback>,
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    total_token_count: Option<u32>,
}

/// Google Gemini `generateContent` client.
///
/// Requires a valid API key and internet access. The key travels in the
/// `x-goog-api-key` header and is redacted from logs.
pub struct GeminiClient {
    http: HttpClient,
    auth: Auth,
    model: String,
}

impl GeminiClient {
    /// Create a client against the public endpoint.
    pub fn new(api_key: &str, model: impl Into<String>) -> Result<Self> {
        Self::with_endpoint(api_key, model, GEMINI_BASE_URL)
    }

    /// Create a client against a custom endpoint (proxies, tests).
    pub fn with_endpoint(
        api_key: &str,
        model: impl Into<String>,
        endpoint: &str,
    ) -> Result<Self> {
        let http = HttpClient::new(endpoint).map_err(|e| {
            ParleyError::Config(format!("Failed to create HTTP client: {}", e))
        })?;
        let auth = Auth::api_key_header(API_KEY_HEADER, api_key)
            .map_err(|e| ParleyError::Config(format!("Invalid Gemini API key: {}", e)))?;

        Ok(Self {
            http,
            auth,
            model: model.into(),
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.http = self.http.with_retries(retries);
        self
    }
}

fn map_http_error(err: HttpError) -> ParleyError {
    match err {
        HttpError::Api { status, message, .. } => match status.as_u16() {
            429 => ParleyError::Llm("Rate limit exceeded".to_string()),
            401 => ParleyError::Llm("Invalid API key".to_string()),
            403 => ParleyError::Llm("API access forbidden".to_string()),
            _ => ParleyError::Llm(format!("Gemini API error ({}): {}", status, message)),
        },
        HttpError::Decode(e, _) => {
            ParleyError::Llm(format!("Failed to parse Gemini response: {}", e))
        }
        other => ParleyError::Llm(format!("Gemini request failed: {}", other)),
    }
}

fn extract_reply(response: GeminiResponse, model: &str) -> Result<LlmResponse> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(ParleyError::Llm(format!("Prompt blocked by Gemini: {}", reason)));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| ParleyError::Llm("No candidates returned from Gemini".to_string()))?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if BLOCKED_FINISH_REASONS.contains(&reason) {
            return Err(ParleyError::Llm(format!(
                "Content blocked by Gemini ({})",
                reason
            )));
        }
    }

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.text)
        .collect();

    if text.is_empty() {
        return Err(ParleyError::Llm(
            "No text content in Gemini response".to_string(),
        ));
    }

    Ok(LlmResponse {
        text,
        model: Some(model.to_string()),
        tokens_used: response.usage_metadata.and_then(|u| u.total_token_count),
        finish_reason: candidate.finish_reason,
    })
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<LlmResponse> {
        let path = format!("models/{}:generateContent", self.model);
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "gemini.generate");

        let opts = RequestOpts {
            auth: Some(self.auth.clone()),
            ..Default::default()
        };
        let response: GeminiResponse = self
            .http
            .post_json_opts(&path, &request, opts)
            .await
            .map_err(map_http_error)?;

        let reply = extract_reply(response, &self.model)?;
        tracing::debug!(
            model = %self.model,
            tokens_used = ?reply.tokens_used,
            reply_len = reply.text.len(),
            "gemini.reply"
        );
        Ok(reply)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
