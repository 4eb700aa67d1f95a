//! URL validation and normalization.
//!
//! Normalized URLs key the `url-metadata:` cache family, so two spellings of
//! the same page share one entry.

use linkdeck_core::EnrichmentError;
use reqwest::Url;

/// Parse `raw` as an absolute http(s) URL.
pub fn parse_http_url(raw: &str) -> Result<Url, EnrichmentError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|e| EnrichmentError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(EnrichmentError::InvalidUrl {
                url: raw.to_string(),
                reason: format!("unsupported scheme '{}'", other),
            })
        }
    }
    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(EnrichmentError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

/// Lowercase scheme and host, drop the fragment and a trailing slash.
///
/// Input that does not parse is returned trimmed but otherwise untouched.
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut url) = parse_http_url(raw) else {
        return raw.trim().to_string();
    };
    url.set_fragment(None);
    let mut rendered = url.to_string();
    if url.query().is_none() && rendered.ends_with('/') {
        rendered.pop();
    }
    rendered
}

/// Host of `raw`, used as the fallback title. Falls back to the trimmed
/// input when it does not parse.
pub fn hostname(raw: &str) -> String {
    parse_http_url(raw)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| raw.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("HTTPS://Example.COM/"), "https://example.com");
        assert_eq!(
            normalize_url("https://example.com/docs/#intro"),
            "https://example.com/docs"
        );
        assert_eq!(
            normalize_url("https://example.com/a?b=1"),
            "https://example.com/a?b=1"
        );
        assert_eq!(normalize_url("  not a url "), "not a url");
    }

    #[test]
    fn test_parse_rejects_non_http() {
        assert!(parse_http_url("ftp://example.com").is_err());
        assert!(parse_http_url("mailto:a@example.com").is_err());
        assert!(parse_http_url("").is_err());
        assert!(parse_http_url("https://example.com/x").is_ok());
    }

    #[test]
    fn test_hostname() {
        assert_eq!(hostname("http://x"), "x");
        assert_eq!(hostname("https://www.rust-lang.org/learn"), "www.rust-lang.org");
        assert_eq!(hostname("garbage"), "garbage");
    }
}
