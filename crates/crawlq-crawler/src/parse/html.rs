//! Minimal markup helpers shared by the built-in parsers.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*["']([^"']+)["']"#).expect("anchor pattern")
});
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").expect("title pattern"));
static SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script>").expect("script pattern"));
static STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b.*?</style>").expect("style pattern"));
static NOSCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<noscript\b.*?</noscript>").expect("noscript pattern"));
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern"));
static CDATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("cdata pattern"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern"));
static SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("space pattern"));

/// Absolute http(s) links of `page`, resolved against `base`, in document
/// order, without fragments or duplicates.
pub fn links(page: &str, base: &Url) -> Vec<Url> {
    let mut seen = HashSet::new();
    ANCHOR
        .captures_iter(page)
        .filter_map(|cap| resolve(base, &cap[1]))
        .filter(|url| seen.insert(url.as_str().to_string()))
        .collect()
}

/// Resolve `href` against `base`, keeping only http(s) targets.
pub fn resolve(base: &Url, href: &str) -> Option<Url> {
    let href = decode_entities(href.trim());
    let mut url = base.join(&href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Content of the first `<title>`.
pub fn title(page: &str) -> String {
    TITLE
        .captures(page)
        .map(|cap| to_text(&cap[1]))
        .unwrap_or_default()
}

/// Visible text of a markup fragment, whitespace collapsed.
pub fn to_text(markup: &str) -> String {
    let text = CDATA.replace_all(markup, "$1");
    let text = COMMENT.replace_all(&text, " ");
    let text = SCRIPT.replace_all(&text, " ");
    let text = STYLE.replace_all(&text, " ");
    let text = NOSCRIPT.replace_all(&text, " ");
    let text = TAG.replace_all(&text, " ");
    let text = decode_entities(&text);
    SPACE.replace_all(&text, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
