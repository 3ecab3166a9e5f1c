use std::sync::LazyLock;

use log::debug;
use regex::Regex;

static HTML_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<html[^>]*>.*?</html>").expect("valid html span pattern"));

static BODY_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<body[^>]*>.*?</body>").expect("valid body span pattern"));

// Anchors pointing at a web URL, link text included
static LINK_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*href\s*=\s*["']?https?://[^>]*>.*?</a\s*>"#)
        .expect("valid anchor pattern")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

static URL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"https?://\S*").expect("valid url pattern"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid whitespace pattern"));

/// Extract readable text from a full HTML document
///
/// Only the first `<body>` of the first `<html>` element is considered; a
/// document without either yields an empty string. Links to web pages are
/// dropped together with their text, tags are stripped (entities are kept
/// as-is) and the result goes through [`normalize_text`].
pub fn extract_plain_text(html: &str) -> String {
    let document = HTML_SPAN.find(html).map(|m| m.as_str()).unwrap_or("");
    let body = BODY_SPAN.find(document).map(|m| m.as_str()).unwrap_or("");

    if body.is_empty() {
        debug!("Aucun bloc <html>/<body> dans {} octets de HTML", html.len());
        return String::new();
    }

    let without_links = LINK_ANCHOR.replace_all(body, " ");
    let text = TAG.replace_all(&without_links, "");

    normalize_text(&text)
}

/// Remove URLs, turn newlines into spaces, collapse whitespace runs and trim
///
/// Idempotent: `normalize_text(&normalize_text(x)) == normalize_text(x)`.
pub fn normalize_text(text: &str) -> String {
    let text = URL.replace_all(text, "");
    let text = text.replace('\n', " ");
    let text = WHITESPACE_RUN.replace_all(&text, " ");
    text.trim().to_string()
}
