use async_trait::async_trait;

use super::{Direction, PROVIDER_TIMEOUT, ProviderResult, Translator};
use crate::error::ProviderError;

const ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Keyless Google Translate endpoint used by browser extensions
#[derive(Debug, Clone, Default)]
pub struct GoogleTranslate {
    client: reqwest::Client,
}

impl GoogleTranslate {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The reply is a nested array; `[0][i][0]` holds translated sentence `i`
fn extract_translation(body: &serde_json::Value) -> Option<String> {
    let sentences = body.get(0)?.as_array()?;
    let translated: String = sentences
        .iter()
        .filter_map(|s| s.get(0).and_then(|t| t.as_str()))
        .collect();
    (!translated.is_empty()).then_some(translated)
}

#[async_trait]
impl Translator for GoogleTranslate {
    async fn translate(&self, text: &str, direction: Direction) -> ProviderResult<String> {
        let (source, target) = direction.languages();

        let body: serde_json::Value = self
            .client
            .get(ENDPOINT)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .timeout(PROVIDER_TIMEOUT)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        extract_translation(&body)
            .ok_or_else(|| ProviderError::Malformed("no translated text".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_joins_sentences() {
        let body = json!([[["Привет. ", "Hello. ", null], ["Мир", "World", null]], null, "en"]);
        assert_eq!(extract_translation(&body).as_deref(), Some("Привет. Мир"));
        assert_eq!(extract_translation(&json!([])), None);
    }
}
