//! Metadata extraction from HTML documents.

use linkdeck_core::PageMetadata;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("valid title regex"));
static META_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<meta\s[^>]*>").expect("valid meta regex"));
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)([a-z_:-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid attr regex")
});
static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Extract title, description, image and site name from a page.
///
/// `og:*` properties win over their plain counterparts. Empty values are
/// treated as absent.
pub fn parse_html_metadata(html: &str) -> PageMetadata {
    let mut meta: HashMap<String, String> = HashMap::new();
    for tag in META_RE.find_iter(html) {
        let mut key = None;
        let mut content = None;
        for cap in ATTR_RE.captures_iter(tag.as_str()) {
            let name = cap[1].to_ascii_lowercase();
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .map(|m| m.as_str())
                .unwrap_or_default();
            match name.as_str() {
                "property" | "name" => key = Some(value.to_ascii_lowercase()),
                "content" => content = Some(value.to_string()),
                _ => {}
            }
        }
        if let (Some(key), Some(content)) = (key, content) {
            meta.entry(key).or_insert(content);
        }
    }

    let pick = |keys: &[&str]| {
        keys.iter()
            .filter_map(|k| meta.get(*k))
            .map(|v| clean_text(v))
            .find(|v| !v.is_empty())
    };

    let title = pick(&["og:title", "twitter:title"]).or_else(|| {
        TITLE_RE
            .captures(html)
            .map(|c| clean_text(&c[1]))
            .filter(|t| !t.is_empty())
    });

    PageMetadata {
        title,
        description: pick(&["og:description", "description", "twitter:description"]),
        image: pick(&["og:image", "twitter:image"]),
        site_name: pick(&["og:site_name"]),
        ..Default::default()
    }
}

fn clean_text(raw: &str) -> String {
    let decoded = raw
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ");
    WHITESPACE_RE.replace_all(decoded.trim(), " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_graph_wins() {
        let html = r#"<html><head>
            <title>Plain Title</title>
            <meta property="og:title" content="OG Title">
            <meta name="description" content="Plain description">
            <meta content="OG description" property="og:description" />
            <meta property='og:image' content='https://img.example/a.png'>
            <meta property="og:site_name" content="Example">
        </head></html>"#;
        let meta = parse_html_metadata(html);
        assert_eq!(meta.title.as_deref(), Some("OG Title"));
        assert_eq!(meta.description.as_deref(), Some("OG description"));
        assert_eq!(meta.image.as_deref(), Some("https://img.example/a.png"));
        assert_eq!(meta.site_name.as_deref(), Some("Example"));
        assert!(!meta.is_fallback);
    }

    #[test]
    fn test_title_tag_and_entities() {
        let html = "<TITLE>\n  Rust &amp; Friends  \n</TITLE><meta name=\"description\" content=\"\">";
        let meta = parse_html_metadata(html);
        assert_eq!(meta.title.as_deref(), Some("Rust & Friends"));
        assert!(meta.description.is_none());
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(parse_html_metadata(""), PageMetadata::default());
    }
}
