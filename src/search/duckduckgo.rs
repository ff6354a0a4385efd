use super::{detect_block_reason, SearchProvider};
use crate::error::SearchError;
use crate::types::SearchHit;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::OnceLock;
use url::Url;

/// Default [`SearchProvider`]: scrapes DuckDuckGo's no-JS HTML endpoint.
pub struct DuckDuckGoProvider {
    client: reqwest::Client,
}

impl DuckDuckGoProvider {
    pub fn new(user_agent: &str) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| SearchError::Fatal(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        let mut url = Url::parse("https://duckduckgo.com/html/")
            .map_err(|e| SearchError::Fatal(e.to_string()))?;
        url.query_pairs_mut().append_pair("q", query);

        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await
            .map_err(|e| SearchError::Transient(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SearchError::Transient(e.to_string()))?;

        if let Some(reason) = detect_block_reason(status, &body) {
            return Err(SearchError::Blocked(reason));
        }
        if !status.is_success() {
            return Err(SearchError::Transient(format!("http status {status}")));
        }

        Ok(parse_results(&body, limit))
    }
}

fn item_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("div.results_links").unwrap())
}

fn link_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("a.result__a").unwrap())
}

fn snippet_selector() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("a.result__snippet, div.result__snippet").unwrap())
}

fn normalize_ddg_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let candidate = if let Some(rest) = href.strip_prefix("//") {
        format!("https://{rest}")
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{href}")
    } else {
        href.to_string()
    };

    if let Ok(url) = Url::parse(&candidate) {
        if matches!(url.host_str(), Some("duckduckgo.com")) && url.path().starts_with("/l/") {
            for (k, v) in url.query_pairs() {
                if k == "uddg" && !v.trim().is_empty() {
                    return Some(v.to_string());
                }
            }
        }
    }

    if candidate.starts_with("http://") || candidate.starts_with("https://") {
        return Some(candidate);
    }
    None
}

pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let doc = Html::parse_document(html);

    let mut out = Vec::new();
    for item in doc.select(item_selector()) {
        if out.len() >= max_results {
            break;
        }

        let Some(link) = item.select(link_selector()).next() else {
            continue;
        };
        let href_raw = link.value().attr("href").unwrap_or("");
        let Some(href) = normalize_ddg_href(href_raw) else {
            continue;
        };
        let title = link.text().collect::<Vec<_>>().join(" ");
        let title = title.split_whitespace().collect::<Vec<_>>().join(" ");

        let snippet = item
            .select(snippet_selector())
            .next()
            .map(|n| n.text().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        let snippet = snippet.split_whitespace().collect::<Vec<_>>().join(" ");

        out.push(SearchHit {
            url: href,
            title,
            snippet,
            rank: out.len(),
        });
    }

    out
}
