use crate::error::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A search-result hit as returned by a [`crate::search::SearchProvider`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
    /// Origin order from the provider (0-based).
    pub rank: usize,
}

/// BFS depth. Level-1 pages come straight from search hits; Level-2 pages
/// are discovered via Level-1 outlinks. No Level-3 expansion ever occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Level {
    One = 1,
    Two = 2,
}

/// A unit of work handed from the Planner to the Fetcher.
#[derive(Debug, Clone)]
pub struct CrawlTask {
    pub url: String,
    pub level: Level,
    pub parent_url: Option<String>,
    pub origin_snippet: Option<String>,
    /// Rank of the Level-1 search hit this task traces back to — carried
    /// through to Level-2 children for the scorer's tie-breaking rule.
    pub origin_rank: usize,
}

/// Terminal status of a single fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchStatus {
    Ok,
    HttpError,
    NetworkError,
    Timeout,
    Skipped,
}

impl FetchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchStatus::Ok => "ok",
            FetchStatus::HttpError => "http-error",
            FetchStatus::NetworkError => "network-error",
            FetchStatus::Timeout => "timeout",
            FetchStatus::Skipped => "skipped",
        }
    }
}

/// Raw result of a fetch attempt — never propagated as an `Err`.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub url: String,
    pub status: FetchStatus,
    pub http_code: Option<u16>,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub elapsed_ms: u64,
    pub error_kind: Option<ErrorKind>,
}

/// A page successfully extracted from a [`FetchOutcome`].
#[derive(Debug, Clone)]
pub struct Page {
    pub url: String,
    pub level: Level,
    pub parent_url: Option<String>,
    pub origin_rank: usize,
    pub title: String,
    pub text: String,
    pub outlinks: Vec<String>,
    pub fetch_elapsed_ms: u64,
}

/// A [`Page`] annotated with a relevance score.
#[derive(Debug, Clone)]
pub struct ScoredPage {
    pub page: Page,
    pub relevance: f64,
    pub term_hit_counts: std::collections::BTreeMap<String, usize>,
}

/// A single failed URL, recorded for the final report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Failure {
    pub url: String,
    pub level: u8,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_code: Option<u16>,
    pub error_kind: String,
}

/// Wire-level projection of a [`SearchHit`] for the `ResearchResult` schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub rank: usize,
}

/// Wire-level projection of a Level-1 [`ScoredPage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level1PageView {
    pub url: String,
    pub title: String,
    pub text_excerpt: String,
    pub outlinks_count: usize,
    pub relevance: f64,
    pub fetch_elapsed_ms: u64,
}

/// Wire-level projection of a Level-2 [`ScoredPage`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Level2PageView {
    pub url: String,
    pub parent_url: String,
    pub title: String,
    pub text_excerpt: String,
    pub relevance: f64,
    pub fetch_elapsed_ms: u64,
}

/// Final output of a research run, as handed to the downstream PDF/JSON emitters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResult {
    pub query: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub initial_hits: Vec<InitialHit>,
    pub level1_pages: Vec<Level1PageView>,
    pub level2_pages: Vec<Level2PageView>,
    pub summary: String,
    pub key_findings: Vec<String>,
    pub total_pages_crawled: usize,
    pub total_links_discovered: usize,
    pub failures: Vec<Failure>,
}

/// First ~500 characters of `text`, used for `text_excerpt` fields.
pub fn text_excerpt(text: &str) -> String {
    const EXCERPT_CHARS: usize = 500;
    text.chars().take(EXCERPT_CHARS).collect()
}
