//! Linkdeck Enrich - URL Metadata Enrichment
//!
//! Resolves page metadata (title, description, image, site name) for URLs,
//! optionally extended by an AI enhancer (category, tags, summary).
//!
//! The [`EnrichmentPipeline`] never fails: every URL comes back with either
//! fetched metadata or a hostname fallback. Fetchers and enhancers are
//! pluggable behind [`MetadataFetcher`] and [`AiEnhancer`]; the shipped
//! implementations are [`HtmlMetadataFetcher`] and [`OpenAIEnhancer`].

use async_trait::async_trait;
use linkdeck_core::{EnrichmentError, PageMetadata};

pub mod html;
pub mod pipeline;
pub mod providers;
pub mod url;

pub use pipeline::{CeilingOutcome, EnrichmentPipeline};
pub use providers::{HtmlMetadataFetcher, OpenAIClient, OpenAIEnhancer};
pub use url::{hostname, normalize_url, parse_http_url};

// ============================================================================
// FETCHER TRAITS
// ============================================================================

/// URL → page metadata.
///
/// Implementations may take arbitrarily long; the pipeline applies its own
/// hard timeout.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<PageMetadata, EnrichmentError>;
}

/// URL plus page metadata → category, tags and summary.
///
/// Only `category`, `tags` and `summary` of the result are used.
#[async_trait]
pub trait AiEnhancer: Send + Sync {
    async fn enhance(&self, url: &str, page: &PageMetadata)
        -> Result<PageMetadata, EnrichmentError>;
}
