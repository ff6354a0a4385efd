use crate::normalize::resolve_and_normalize;
use crate::types::{CrawlTask, FetchOutcome, Page};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

/// Text truncation limit for [`Page::text`] — about 1 MB of chars.
const MAX_CONTENT_LENGTH: usize = 1_000_000;

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn title_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("title").unwrap())
}

fn anchor_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("a[href]").unwrap())
}

fn skip_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("script, style, noscript, template").unwrap())
}

/// Turns a successful [`FetchOutcome`] into a [`Page`]. Never panics on
/// malformed markup — `html5ever` (via `scraper`) is permissive by design.
pub struct Extractor;

impl Extractor {
    /// Returns `None` (extraction-failed) for an empty body or a document
    /// with no visible text at all.
    pub fn extract(outcome: &FetchOutcome, task: &CrawlTask) -> Option<Page> {
        if outcome.body.is_empty() {
            return None;
        }
        let base_url = Url::parse(&outcome.url).ok()?;

        let html_str = String::from_utf8_lossy(&outcome.body);
        let document = Html::parse_document(&html_str);

        let title = extract_title(&document);
        let text = extract_visible_text(&document);
        if text.trim().is_empty() && title.is_empty() {
            return None;
        }
        let text = collapse_whitespace(&text);
        let text: String = text.chars().take(MAX_CONTENT_LENGTH).collect();

        let outlinks = extract_outlinks(&document, &base_url);

        Some(Page {
            url: outcome.url.clone(),
            level: task.level,
            parent_url: task.parent_url.clone(),
            origin_rank: task.origin_rank,
            title,
            text,
            outlinks,
            fetch_elapsed_ms: outcome.elapsed_ms,
        })
    }
}

fn extract_title(document: &Html) -> String {
    let raw = document
        .select(title_selector())
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    collapse_whitespace(&raw)
}

fn collapse_whitespace(s: &str) -> String {
    whitespace_re().replace_all(s.trim(), " ").to_string()
}

/// Walks every descendant of `<html>`, skipping the subtree rooted at any
/// `SKIPPED_TAGS` element, and concatenates the remaining text nodes.
/// Comments are excluded for free: only `Node::Text` nodes are collected.
fn extract_visible_text(document: &Html) -> String {
    let mut skip_ids = HashSet::new();
    for el in document.select(skip_selector()) {
        for descendant in el.descendants() {
            skip_ids.insert(descendant.id());
        }
    }

    let mut out = String::new();
    for node in document.root_element().descendants() {
        if skip_ids.contains(&node.id()) {
            continue;
        }
        if let Some(text) = node.value().as_text() {
            out.push_str(text);
            out.push(' ');
        }
    }
    out
}

fn extract_outlinks(document: &Html, base_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for el in document.select(anchor_selector()) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let Some(resolved) = resolve_and_normalize(base_url, href) else {
            continue;
        };
        if seen.insert(resolved.clone()) {
            out.push(resolved);
        }
    }
    out
}
