use async_trait::async_trait;
use parley_common::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
    pub finish_reason: Option<String>,
}

impl LlmResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            model: None,
            tokens_used: None,
            finish_reason: None,
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for a single prompt.
    ///
    /// Calls are stateless: no history, system prompt, or generation
    /// parameters are attached.
    async fn generate(&self, prompt: &str) -> Result<LlmResponse>;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}
