use crate::domain::registrable_domain_for_url;
use crate::scorer::cmp_scored_pages;
use crate::types::{
    text_excerpt, Failure, InitialHit, Level1PageView, Level2PageView, ResearchResult, ScoredPage,
    SearchHit,
};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use url::Url;

const SUMMARY_TOP_K: usize = 5;
const SUMMARY_SENTENCES_PER_PAGE: usize = 3;
const SUMMARY_MAX_CHARS: usize = 1_500;
const KEY_FINDINGS_TOP_M: usize = 10;

/// Turns scored pages into the bounded `summary` paragraph and the ranked
/// `key_findings` list, then assembles the final [`ResearchResult`].
pub struct Synthesizer;

impl Synthesizer {
    #[allow(clippy::too_many_arguments)]
    pub fn synthesize(
        query: &str,
        hits: Vec<SearchHit>,
        mut level1_pages: Vec<ScoredPage>,
        mut level2_pages: Vec<ScoredPage>,
        failures: Vec<Failure>,
        total_pages_crawled: usize,
        total_links_discovered: usize,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        elapsed_seconds: f64,
    ) -> ResearchResult {
        level1_pages.sort_by(cmp_scored_pages);
        level2_pages.sort_by(cmp_scored_pages);

        let mut all_pages: Vec<&ScoredPage> = level1_pages.iter().chain(level2_pages.iter()).collect();
        all_pages.sort_by(|a, b| cmp_scored_pages(a, b));

        let domains: HashSet<String> = all_pages
            .iter()
            .filter_map(|p| Url::parse(&p.page.url).ok())
            .filter_map(|u| registrable_domain_for_url(&u))
            .collect();

        let summary = build_summary(query, &all_pages, total_pages_crawled, domains.len());
        let key_findings = build_key_findings(query, &all_pages);

        let initial_hits = hits
            .into_iter()
            .map(|h| InitialHit {
                url: h.url,
                title: h.title,
                snippet: h.snippet,
                rank: h.rank,
            })
            .collect();

        let level1_views = level1_pages.iter().map(to_level1_view).collect();
        let level2_views = level2_pages.iter().map(to_level2_view).collect();

        ResearchResult {
            query: query.to_string(),
            started_at,
            finished_at,
            elapsed_seconds,
            initial_hits,
            level1_pages: level1_views,
            level2_pages: level2_views,
            summary,
            key_findings,
            total_pages_crawled,
            total_links_discovered,
            failures,
        }
    }
}

fn to_level1_view(p: &ScoredPage) -> Level1PageView {
    Level1PageView {
        url: p.page.url.clone(),
        title: p.page.title.clone(),
        text_excerpt: text_excerpt(&p.page.text),
        outlinks_count: p.page.outlinks.len(),
        relevance: p.relevance,
        fetch_elapsed_ms: p.page.fetch_elapsed_ms,
    }
}

fn to_level2_view(p: &ScoredPage) -> Level2PageView {
    Level2PageView {
        url: p.page.url.clone(),
        parent_url: p.page.parent_url.clone().unwrap_or_default(),
        title: p.page.title.clone(),
        text_excerpt: text_excerpt(&p.page.text),
        relevance: p.relevance,
        fetch_elapsed_ms: p.page.fetch_elapsed_ms,
    }
}

/// Splits on sentence-ending punctuation followed by whitespace. Good enough
/// for prose extracted from arbitrary web pages — this is not a full
/// sentence-boundary detector.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    for (i, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            let next_is_boundary = bytes
                .get(i + c.len_utf8())
                .map(|b| b.is_ascii_whitespace())
                .unwrap_or(true);
            if next_is_boundary {
                let sentence = text[start..i + c.len_utf8()].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = i + c.len_utf8();
            }
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

fn sentence_contains_term(sentence: &str, query_terms: &[&str]) -> bool {
    let lower = sentence.to_lowercase();
    query_terms.iter().any(|t| lower.contains(t))
}

fn query_terms_lower(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split_whitespace()
        .map(|s| s.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn build_summary(
    query: &str,
    ranked_pages: &[&ScoredPage],
    total_pages_crawled: usize,
    n_domains: usize,
) -> String {
    if ranked_pages.is_empty() {
        return String::new();
    }
    let terms = query_terms_lower(query);
    let term_refs: Vec<&str> = terms.iter().map(|s| s.as_str()).collect();

    let lead = format!(
        "Research on '{query}' surveyed {total_pages_crawled} pages across {n_domains} domains."
    );

    let mut seen_sentences: HashSet<String> = HashSet::new();
    let mut body = String::new();

    for page in ranked_pages.iter().take(SUMMARY_TOP_K) {
        let mut taken = 0;
        for sentence in split_sentences(&page.page.text) {
            if taken >= SUMMARY_SENTENCES_PER_PAGE {
                break;
            }
            if !term_refs.is_empty() && !sentence_contains_term(sentence, &term_refs) {
                continue;
            }
            let key = sentence.to_lowercase();
            if !seen_sentences.insert(key) {
                continue;
            }
            if !body.is_empty() {
                body.push(' ');
            }
            body.push_str(sentence);
            taken += 1;
        }
    }

    let mut summary = lead;
    if !body.is_empty() {
        summary.push(' ');
        summary.push_str(&body);
    }
    summary.chars().take(SUMMARY_MAX_CHARS).collect()
}

fn build_key_findings(query: &str, ranked_pages: &[&ScoredPage]) -> Vec<String> {
    let terms = query_terms_lower(query);
    let term_refs: Vec<&str> = terms.iter().map(|s| s.as_str()).collect();

    let mut seen_hosts: HashSet<String> = HashSet::new();
    let mut findings = Vec::new();

    for page in ranked_pages {
        if findings.len() >= KEY_FINDINGS_TOP_M {
            break;
        }
        if page.page.text.trim().is_empty() {
            continue;
        }
        let host = Url::parse(&page.page.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| page.page.url.clone());
        if !seen_hosts.insert(host.clone()) {
            continue;
        }

        let label = if page.page.title.trim().is_empty() {
            host.clone()
        } else {
            page.page.title.clone()
        };

        let excerpt = split_sentences(&page.page.text)
            .into_iter()
            .find(|s| term_refs.is_empty() || sentence_contains_term(s, &term_refs))
            .map(|s| s.to_string())
            .unwrap_or_else(|| text_excerpt(&page.page.text));

        findings.push(format!("{label} — {excerpt} ({})", page.page.url));
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Level, Page};

    fn scored(url: &str, title: &str, text: &str, relevance: f64, level: Level) -> ScoredPage {
        ScoredPage {
            page: Page {
                url: url.to_string(),
                level,
                parent_url: None,
                origin_rank: 0,
                title: title.to_string(),
                text: text.to_string(),
                outlinks: Vec::new(),
                fetch_elapsed_ms: 5,
            },
            relevance,
            term_hit_counts: Default::default(),
        }
    }

    #[test]
    fn summary_includes_lead_sentence_and_term_sentences() {
        let pages = vec![scored(
            "http://a.example/p",
            "A",
            "Rust is great for systems work. Unrelated sentence here. Rust is fast too.",
            0.9,
            Level::One,
        )];
        let refs: Vec<&ScoredPage> = pages.iter().collect();
        let summary = build_summary("rust", &refs, 1, 1);
        assert!(summary.starts_with("Research on 'rust' surveyed 1 pages across 1 domains."));
        assert!(summary.contains("Rust is great for systems work."));
        assert!(!summary.contains("Unrelated sentence here."));
    }

    #[test]
    fn key_findings_dedupe_by_host_and_skip_empty() {
        let pages = vec![
            scored("http://a.example/p1", "A1", "rust content here.", 0.9, Level::One),
            scored("http://a.example/p2", "A2", "rust again.", 0.8, Level::One),
            scored("http://b.example/p1", "", "", 0.1, Level::One),
        ];
        let refs: Vec<&ScoredPage> = pages.iter().collect();
        let findings = build_key_findings("rust", &refs);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].starts_with("A1"));
    }

    #[test]
    fn sentence_split_handles_basic_punctuation() {
        let sentences = split_sentences("One. Two! Three? Four");
        assert_eq!(sentences, vec!["One.", "Two!", "Three?", "Four"]);
    }
}
