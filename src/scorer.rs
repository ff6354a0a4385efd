use crate::types::{Page, ScoredPage};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Words common enough that matching them carries no relevance signal.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is",
    "it", "its", "of", "on", "that", "the", "to", "was", "were", "will", "with", "or", "this",
    "but", "not", "what", "all", "can", "do", "does", "how",
];

/// Computes deterministic lexical relevance of a [`Page`] against a query.
pub struct Scorer {
    query_terms: Vec<String>,
}

impl Scorer {
    pub fn new(query: &str) -> Self {
        Self {
            query_terms: tokenize(query),
        }
    }

    /// The lowercased, stop-word-filtered query terms used for scoring.
    pub fn terms(&self) -> &[String] {
        &self.query_terms
    }

    /// Scores `page`, producing a [`ScoredPage`] with `relevance` in `[0, 1]`.
    pub fn score(&self, page: Page) -> ScoredPage {
        let body_l = page.text.to_lowercase();
        let title_l = page.title.to_lowercase();
        let term_count = self.query_terms.len().max(1);

        let mut term_hit_counts = BTreeMap::new();
        let mut covered = 0usize;
        let mut body_hits_total = 0usize;
        let mut title_hits_total = 0usize;

        for term in &self.query_terms {
            let n_body = count_occurrences(&body_l, term);
            let n_title = count_occurrences(&title_l, term);
            term_hit_counts.insert(term.clone(), n_body + n_title);
            if n_body + n_title > 0 {
                covered += 1;
            }
            body_hits_total += n_body;
            title_hits_total += n_title;
        }

        let coverage = covered as f64 / term_count as f64;
        let density_denominator = (body_l.chars().count() as f64 / 500.0).max(1.0);
        let density = (body_hits_total as f64 / density_denominator).min(1.0);
        let title_boost = (title_hits_total as f64 / term_count as f64).min(1.0);

        let relevance = (0.5 * coverage + 0.3 * density + 0.2 * title_boost).clamp(0.0, 1.0);

        ScoredPage {
            page,
            relevance,
            term_hit_counts,
        }
    }
}

/// Lowercases and strips punctuation, dropping empty tokens and stop words.
/// Mirrors the query side of [`Scorer::score`] — tokenization must agree on
/// both sides for coverage/density to be comparable.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty() && !STOP_WORDS.contains(s))
        .map(|s| s.to_string())
        .collect()
}

fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// Total order used for `key_findings` and for deciding Level-2 admission
/// order: relevance descending, then level ascending, then origin rank
/// ascending, then URL lexicographic ascending.
pub fn cmp_scored_pages(a: &ScoredPage, b: &ScoredPage) -> Ordering {
    b.relevance
        .partial_cmp(&a.relevance)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.page.level.cmp(&b.page.level))
        .then_with(|| a.page.origin_rank.cmp(&b.page.origin_rank))
        .then_with(|| a.page.url.cmp(&b.page.url))
}
