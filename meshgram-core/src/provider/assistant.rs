use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{Assistant, PROVIDER_TIMEOUT, ProviderResult};
use crate::error::ProviderError;

const ENDPOINT: &str = "https://models.inference.ai.azure.com/chat/completions";
const MODEL: &str = "gpt-4o-mini";
const SYSTEM_PROMPT: &str =
    "Ты ассистент в Mesh сети. Отвечай максимум 1 предложение, 5-10 слов.";
/// Keeps answers within a single radio frame
const MAX_TOKENS: u32 = 30;

/// Chat completions through GitHub Models
#[derive(Debug, Clone)]
pub struct GithubModels {
    client: reqwest::Client,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl GithubModels {
    pub fn new(token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.filter(|t| !t.trim().is_empty()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.token.is_some()
    }
}

#[async_trait]
impl Assistant for GithubModels {
    async fn complete(&self, prompt: &str) -> ProviderResult<String> {
        let token = self.token.as_deref().ok_or(ProviderError::NotConfigured {
            key: "GITHUB_TOKEN",
        })?;

        let completion: Completion = self
            .client
            .post(ENDPOINT)
            .bearer_auth(token)
            .json(&json!({
                "model": MODEL,
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": prompt},
                ],
                "temperature": 0.7,
                "max_tokens": MAX_TOKENS,
            }))
            .timeout(PROVIDER_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::Malformed("no choices in completion".to_string()))
    }
}
