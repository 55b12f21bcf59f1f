//! Page fetching and text extraction.
//!
//! The extractor is deliberately naive: it downloads the page with a single
//! GET and keeps only the text of `<p>`, `<span>` and `<li>` elements, in
//! document order. No readability heuristics, no boilerplate stripping, no
//! JavaScript. Headings, table cells and bare `<div>` text are dropped.
//!
//! Matching is flat, like a `find_all` over the tag set: a `<span>` nested in
//! a `<p>` is collected on its own *and* as part of the paragraph, so its
//! text appears twice in the output.

use crate::error::FetchError;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info};

/// Tags whose text makes up the page text.
pub const TEXT_TAGS: [&str; 3] = ["p", "span", "li"];

static TEXT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(&TEXT_TAGS.join(", ")).expect("static selector is valid"));

/// Download `url` and reduce it to plain text.
///
/// Any transport failure or non-2xx status is returned as a [`FetchError`];
/// nothing is retried. `timeout_secs = None` keeps the HTTP client default.
pub async fn fetch_text(url: &str, timeout_secs: Option<u64>) -> Result<String, FetchError> {
    let html = fetch_html(url, timeout_secs).await?;
    let text = extract_text(&html);
    debug!("Extracted {} bytes of text from {}", text.len(), url);
    Ok(text)
}

/// Issue the GET request and return the body as text.
pub async fn fetch_html(url: &str, timeout_secs: Option<u64>) -> Result<String, FetchError> {
    info!("Fetching page: {}", url);

    let mut builder = reqwest::Client::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    let client = builder.build().map_err(|e| FetchError::Transport {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url, &e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    // No content-type check: whatever came back is parsed as HTML.
    response.text().await.map_err(|e| FetchError::Body {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Reduce HTML markup to the space-joined, trimmed text of every
/// `p`/`span`/`li` element in document order.
///
/// Returns an empty string when no such element exists.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    document
        .select(&TEXT_SELECTOR)
        .map(|el| el.text().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_matching_tags_yields_empty() {
        let html = "<html><head><title>T</title></head><body><h1>Head</h1><div>loose</div></body></html>";
        assert_eq!(extract_text(html), "");
    }

    #[test]
    fn empty_document_yields_empty() {
        assert_eq!(extract_text(""), "");
    }

    #[test]
    fn joins_in_document_order() {
        let html = "<body><p>First</p><ul><li>Second</li><li>Third</li></ul><span>Fourth</span></body>";
        assert_eq!(extract_text(html), "First Second Third Fourth");
    }

    #[test]
    fn document_of_only_text_tags_round_trips() {
        let parts = ["alpha beta", "gamma", "delta, epsilon."];
        let html = format!(
            "<p>{}</p><span>{}</span><li>{}</li>",
            parts[0], parts[1], parts[2]
        );
        assert_eq!(extract_text(&html), parts.join(" "));
    }

    #[test]
    fn nested_matches_repeat_text() {
        let html = "<p>Hello <span>world</span></p>";
        assert_eq!(extract_text(html), "Hello world world");
    }

    #[test]
    fn result_is_trimmed_but_inner_whitespace_kept() {
        let html = "<p>  padded  </p><p>\n next\n</p>";
        assert_eq!(extract_text(html), "padded   \n next");
    }

    #[test]
    fn empty_elements_contribute_separators() {
        let html = "<p>a</p><p></p><p>b</p>";
        assert_eq!(extract_text(html), "a  b");
    }

    #[test]
    fn non_html_is_parsed_permissively() {
        assert_eq!(extract_text(r#"{"p": "not html"}"#), "");
        assert_eq!(extract_text("plain text with <p>one tag"), "one tag");
    }
}
