//! Category, tag and summary suggestions from a chat model.

use super::client::OpenAIClient;
use super::types::{CompletionRequest, CompletionResponse, EnhancementJson, Message, ResponseFormat};
use crate::AiEnhancer;
use async_trait::async_trait;
use linkdeck_core::{EnrichmentError, PageMetadata};

const MAX_TAGS: usize = 5;

/// [`AiEnhancer`] backed by the OpenAI chat completions API.
#[derive(Debug)]
pub struct OpenAIEnhancer {
    client: OpenAIClient,
    model: String,
}

impl OpenAIEnhancer {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: OpenAIClient::new(api_key, 60),
            model: model.into(),
        }
    }

    pub fn with_default_model(api_key: impl Into<String>) -> Self {
        Self::new(api_key, "gpt-4o-mini")
    }

    fn prompt(url: &str, page: &PageMetadata) -> String {
        format!(
            "URL: {}\nTitle: {}\nDescription: {}\n\n\
             Respond with a JSON object with keys \"category\" (one or two words), \
             \"tags\" (at most {} short lowercase tags) and \"summary\" (one sentence).",
            url,
            page.title.as_deref().unwrap_or(""),
            page.description.as_deref().unwrap_or(""),
            MAX_TAGS
        )
    }
}

/// Turn the model's JSON answer into enhancement-only metadata.
pub(crate) fn parse_enhancement(url: &str, content: &str) -> Result<PageMetadata, EnrichmentError> {
    let parsed: EnhancementJson =
        serde_json::from_str(content.trim()).map_err(|e| EnrichmentError::FetchFailed {
            url: url.to_string(),
            reason: format!("unparseable enhancement: {}", e),
        })?;
    let mut tags: Vec<String> = parsed
        .tags
        .into_iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    tags.dedup();
    tags.truncate(MAX_TAGS);
    Ok(PageMetadata {
        category: parsed.category.filter(|c| !c.trim().is_empty()),
        tags,
        summary: parsed.summary.filter(|s| !s.trim().is_empty()),
        ..Default::default()
    })
}

#[async_trait]
impl AiEnhancer for OpenAIEnhancer {
    async fn enhance(&self, url: &str, page: &PageMetadata) -> Result<PageMetadata, EnrichmentError> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: "You categorize bookmarked web pages.".to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: Self::prompt(url, page),
                },
            ],
            max_tokens: Some(200),
            temperature: Some(0.2),
            response_format: Some(ResponseFormat::json_object()),
        };

        let response: CompletionResponse = self.client.request("chat/completions", request).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| EnrichmentError::FetchFailed {
                url: url.to_string(),
                reason: "no completion in response".to_string(),
            })?;
        parse_enhancement(url, &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_enhancement() {
        let meta = parse_enhancement(
            "https://a.example",
            r#"{"category": "programming", "tags": ["Rust", "rust", " async ", ""], "summary": "About Rust."}"#,
        )
        .unwrap();
        assert_eq!(meta.category.as_deref(), Some("programming"));
        assert_eq!(meta.tags, vec!["rust".to_string(), "async".to_string()]);
        assert_eq!(meta.summary.as_deref(), Some("About Rust."));
        assert!(meta.title.is_none());
    }

    #[test]
    fn test_parse_enhancement_rejects_prose() {
        assert!(parse_enhancement("https://a.example", "Sure! Here you go").is_err());
    }
}
