//! HTML page metadata fetcher over reqwest.

use crate::html::parse_html_metadata;
use crate::url::parse_http_url;
use crate::MetadataFetcher;
use async_trait::async_trait;
use linkdeck_core::{EnrichmentError, PageMetadata};
use reqwest::{header, Client};
use std::time::Duration;
use tracing::debug;

const DEFAULT_USER_AGENT: &str = concat!("linkdeck-enrich/", env!("CARGO_PKG_VERSION"));

/// Only the head of a document is needed; larger bodies are cut here.
const MAX_BODY_BYTES: usize = 512 * 1024;

/// Fetches a page and reads its `<title>` and `<meta>` tags.
#[derive(Debug, Clone)]
pub struct HtmlMetadataFetcher {
    client: Client,
}

impl HtmlMetadataFetcher {
    /// Create a fetcher. `timeout` is a transport-level guard; the pipeline
    /// applies its own hard timeout on top.
    pub fn new(timeout: Duration) -> Result<Self, EnrichmentError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(DEFAULT_USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| EnrichmentError::FetchFailed {
                url: String::new(),
                reason: format!("client construction failed: {}", e),
            })?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetadataFetcher for HtmlMetadataFetcher {
    async fn fetch(&self, url: &str) -> Result<PageMetadata, EnrichmentError> {
        let parsed = parse_http_url(url)?;
        let response = self
            .client
            .get(parsed)
            .header(header::ACCEPT, "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(|e| EnrichmentError::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::FetchFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", status.as_u16()),
            });
        }

        let is_html = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("html"))
            .unwrap_or(true);
        if !is_html {
            return Err(EnrichmentError::FetchFailed {
                url: url.to_string(),
                reason: "response is not HTML".to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| EnrichmentError::FetchFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        let head = &body[..body.len().min(MAX_BODY_BYTES)];
        let html = String::from_utf8_lossy(head);
        let metadata = parse_html_metadata(&html);
        debug!(
            url,
            status = status.as_u16(),
            has_title = metadata.title.is_some(),
            "Fetched page metadata"
        );
        Ok(metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_invalid_url_fails_before_network() {
        let fetcher = HtmlMetadataFetcher::new(Duration::from_secs(1)).unwrap();
        let err = fetcher.fetch("ftp://example.com").await.unwrap_err();
        assert!(matches!(err, EnrichmentError::InvalidUrl { .. }));
    }
}
