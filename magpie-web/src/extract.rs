//! DOM-based page extraction.
//!
//! Pulls the title, meta description, canonical link, readable text, and
//! same-host links out of raw HTML. Extraction never fails: malformed markup
//! simply yields less.

use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Subtrees that carry chrome, not content.
const SKIP_ELEMENTS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "aside", "svg", "form",
];

/// What [`extract_page`] pulls from one document.
#[derive(Debug, Clone, Default)]
pub struct PageExtract {
    pub title: Option<String>,
    pub description: Option<String>,
    pub canonical_url: Option<Url>,
    pub text: String,
    /// Absolute same-host links, fragment-stripped, deduplicated, in
    /// document order.
    pub links: Vec<Url>,
}

pub fn extract_page(base: &Url, html: &str) -> PageExtract {
    let doc = Html::parse_document(html);

    let title = select_first_text(&doc, "title");
    let description = select_first_attr(&doc, r#"meta[name="description"]"#, "content")
        .or_else(|| select_first_attr(&doc, r#"meta[property="og:description"]"#, "content"));
    let canonical_url = select_first_attr(&doc, r#"link[rel="canonical"]"#, "href")
        .and_then(|href| base.join(&href).ok());

    let text = readable_text(&doc);
    let links = same_host_links(&doc, base);

    PageExtract {
        title,
        description,
        canonical_url,
        text,
        links,
    }
}

fn select_first_text(doc: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let el = doc.select(&sel).next()?;
    let joined = el.text().collect::<String>();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn select_first_attr(doc: &Html, selector: &str, attr: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    let value = doc.select(&sel).next()?.value().attr(attr)?.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Collect text nodes under `<body>` (or the whole document when there is
/// none), skipping chrome subtrees, with whitespace collapsed.
fn readable_text(doc: &Html) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|sel| doc.select(&sel).next())
        .unwrap_or_else(|| doc.root_element());

    let mut out = String::new();
    collect_text(root, &mut out);
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(el: ElementRef<'_>, out: &mut String) {
    if SKIP_ELEMENTS.contains(&el.value().name()) {
        return;
    }
    for node in el.children() {
        if let Some(text) = node.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child) = ElementRef::wrap(node) {
            collect_text(child, out);
        }
    }
}

fn same_host_links(doc: &Html, base: &Url) -> Vec<Url> {
    let sel = match Selector::parse("a[href]") {
        Ok(sel) => sel,
        Err(_) => return Vec::new(),
    };

    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();
    for el in doc.select(&sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Ok(mut resolved) = base.join(href) else {
            continue;
        };
        if resolved.scheme() != "http" && resolved.scheme() != "https" {
            continue;
        }
        if resolved.host_str() != base.host_str() {
            continue;
        }
        resolved.set_fragment(None);
        if seen.insert(resolved.to_string()) {
            links.push(resolved);
        }
    }
    links
}
