//! Page metadata produced by the enrichment pipeline.

use serde::{Deserialize, Serialize};

/// Metadata resolved for a single URL.
///
/// Real fetches fill whatever the page exposes. Fallback records are
/// synthesized from the hostname when a fetch fails or times out; they are
/// usable for display but must never be written to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub site_name: Option<String>,
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub summary: Option<String>,
    /// True when this record was synthesized rather than fetched.
    #[serde(default)]
    pub is_fallback: bool,
}

impl PageMetadata {
    /// Synthesize the fallback record for a host: `{title: host, site_name: host}`.
    pub fn fallback(hostname: &str) -> Self {
        Self {
            title: Some(hostname.to_string()),
            site_name: Some(hostname.to_string()),
            is_fallback: true,
            ..Default::default()
        }
    }

    /// Whether this record carries information a fallback would not have:
    /// a title, description or category present where `previous` lacked it.
    ///
    /// A fallback's title is the hostname, so a fetched title only counts
    /// when it differs from what the fallback already showed.
    pub fn differs_meaningfully_from(&self, previous: &PageMetadata) -> bool {
        if self.is_fallback {
            return false;
        }
        let new_title = match (&self.title, &previous.title) {
            (Some(_), None) => true,
            (Some(ours), Some(theirs)) => previous.is_fallback && ours != theirs,
            _ => false,
        };
        let new_description = self.description.is_some() && previous.description.is_none();
        let new_category = self.category.is_some() && previous.category.is_none();
        new_title || new_description || new_category
    }

    /// Merge AI enhancement fields into page metadata without overwriting
    /// anything the page already supplied.
    pub fn absorb_enhancement(&mut self, other: PageMetadata) {
        if self.description.is_none() {
            self.description = other.summary_or_description();
        }
        if self.category.is_none() {
            self.category = other.category;
        }
        if self.summary.is_none() {
            self.summary = other.summary;
        }
        for tag in other.tags {
            if !self.tags.iter().any(|t| t.eq_ignore_ascii_case(&tag)) {
                self.tags.push(tag);
            }
        }
    }

    fn summary_or_description(&self) -> Option<String> {
        self.description.clone().or_else(|| self.summary.clone())
    }
}
