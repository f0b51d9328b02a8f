//! HTML extraction into page records
//!
//! This module turns a fetched [`Document`] into a [`PageRecord`]:
//! - Title (`<title>`, else the first non-empty heading, else "Untitled")
//! - Visible body text, whitespace collapsed
//! - Links from `<a href>` and images from `<img src>`, absolutized
//! - Well-known `<meta>` values
//!
//! Extraction never fails: unresolvable links and images are skipped with a
//! debug log, missing pieces become empty strings.

use crate::crawler::record::{ImageRecord, LinkRecord, PageRecord, METADATA_KEYS};
use crate::fetch::Document;
use crate::url::absolutize;
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use url::Url;

/// Title used when a page has neither `<title>` nor a heading
pub const UNTITLED: &str = "Untitled";

/// Elements whose text is never visible content
const HIDDEN_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracts a page record, stamped with the current time
///
/// # Arguments
///
/// * `document` - The fetched document
/// * `url` - The URL the document was requested as
pub fn extract(document: &Document, url: &Url) -> PageRecord {
    extract_at(document, url, Utc::now())
}

/// Extracts a page record with an explicit timestamp
///
/// Relative references resolve against `<base href>` when present, otherwise
/// against the document's final URL (after redirects).
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use page_harvest::crawler::extract_at;
/// use page_harvest::fetch::Document;
/// use url::Url;
///
/// let url = Url::parse("https://example.com/docs/").unwrap();
/// let doc = Document::html(url.clone(), r#"<title>Docs</title><a href="intro">Intro</a>"#);
/// let record = extract_at(&doc, &url, Utc::now());
/// assert_eq!(record.title, "Docs");
/// assert_eq!(record.links[0].absolute_url, "https://example.com/docs/intro");
/// ```
pub fn extract_at(document: &Document, url: &Url, timestamp: DateTime<Utc>) -> PageRecord {
    let html = Html::parse_document(&document.body);
    let base = resolve_base(&html, &document.final_url);

    PageRecord {
        title: extract_title(&html),
        url: url.to_string(),
        timestamp,
        text: extract_text(&html),
        raw_html: Some(document.body.clone()),
        links: extract_links(&html, &base),
        images: extract_images(&html, &base),
        metadata: extract_metadata(&html, document.content_type()),
        status_code: document.status_code,
        content_type: document.content_type().to_string(),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

fn attr(element: &ElementRef, name: &str) -> String {
    element.value().attr(name).unwrap_or("").trim().to_string()
}

fn resolve_base(html: &Html, fallback: &Url) -> Url {
    selector("base[href]")
        .and_then(|sel| html.select(&sel).next())
        .and_then(|base| base.value().attr("href"))
        .and_then(|href| absolutize(href, fallback).ok())
        .unwrap_or_else(|| fallback.clone())
}

/// `<title>`, then the first non-empty `h1`..`h6`, then [`UNTITLED`]
fn extract_title(html: &Html) -> String {
    for css in ["title", "h1, h2, h3, h4, h5, h6"] {
        let Some(sel) = selector(css) else {
            continue;
        };
        if let Some(title) = html
            .select(&sel)
            .map(|el| element_text(&el))
            .find(|text| !text.is_empty())
        {
            return title;
        }
    }
    UNTITLED.to_string()
}

/// Body text outside script/style/noscript/template
fn extract_text(html: &Html) -> String {
    let body = selector("body").and_then(|sel| html.select(&sel).next());
    let root = body.unwrap_or_else(|| html.root_element());

    let mut parts: Vec<&str> = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_TEXT_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            parts.push(&**text);
        }
    }

    collapse_whitespace(&parts.join(" "))
}

/// One record per resolvable anchor, in document order, duplicates kept
fn extract_links(html: &Html, base: &Url) -> Vec<LinkRecord> {
    let Some(sel) = selector("a[href]") else {
        return Vec::new();
    };

    html.select(&sel)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            match absolutize(href, base) {
                Ok(resolved) => Some(LinkRecord {
                    text: element_text(&anchor),
                    absolute_url: resolved.to_string(),
                    title: attr(&anchor, "title"),
                    target: attr(&anchor, "target"),
                }),
                Err(e) => {
                    tracing::debug!("Skipping link '{}' on {}: {}", href, base, e);
                    None
                }
            }
        })
        .collect()
}

fn extract_images(html: &Html, base: &Url) -> Vec<ImageRecord> {
    let Some(sel) = selector("img[src]") else {
        return Vec::new();
    };

    html.select(&sel)
        .filter_map(|img| {
            let src = img.value().attr("src")?;
            match absolutize(src, base) {
                Ok(resolved) => Some(ImageRecord {
                    absolute_src: resolved.to_string(),
                    alt: attr(&img, "alt"),
                    title: attr(&img, "title"),
                    width: attr(&img, "width"),
                    height: attr(&img, "height"),
                }),
                Err(e) => {
                    tracing::debug!("Skipping image '{}' on {}: {}", src, base, e);
                    None
                }
            }
        })
        .collect()
}

/// Well-known metadata; every key of [`METADATA_KEYS`] is present
///
/// `charset` comes from `<meta charset>`, then the `http-equiv` content type,
/// then the response's `Content-Type` header.
fn extract_metadata(html: &Html, header_content_type: &str) -> BTreeMap<String, String> {
    let mut metadata: BTreeMap<String, String> = METADATA_KEYS
        .iter()
        .map(|key| (key.to_string(), String::new()))
        .collect();

    if let Some(sel) = selector("meta[name][content]") {
        for meta in html.select(&sel) {
            let name = attr(&meta, "name").to_ascii_lowercase();
            if name == "charset" {
                continue;
            }
            if let Some(slot) = metadata.get_mut(&name) {
                if slot.is_empty() {
                    *slot = attr(&meta, "content");
                }
            }
        }
    }

    let charset = selector("meta[charset]")
        .and_then(|sel| html.select(&sel).next())
        .map(|meta| attr(&meta, "charset"))
        .filter(|c| !c.is_empty())
        .or_else(|| {
            selector("meta[http-equiv][content]").and_then(|sel| {
                html.select(&sel)
                    .filter(|meta| attr(meta, "http-equiv").eq_ignore_ascii_case("content-type"))
                    .find_map(|meta| charset_from_content_type(&attr(&meta, "content")))
            })
        })
        .or_else(|| charset_from_content_type(header_content_type))
        .unwrap_or_default();
    metadata.insert("charset".to_string(), charset);

    metadata
}

/// Pulls `charset=` out of a content type such as `text/html; charset=UTF-8`
fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|param| {
        let (key, value) = param.trim().split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            let value = value.trim().trim_matches('"');
            (!value.is_empty()).then(|| value.to_string())
        } else {
            None
        }
    })
}
