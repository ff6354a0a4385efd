use super::SearchProvider;
use crate::error::SearchError;
use crate::types::SearchHit;
use async_trait::async_trait;

/// Deterministic in-memory [`SearchProvider`] for tests: always returns the
/// same fixed hit list, ignoring `query`.
pub struct StaticProvider {
    hits: Vec<SearchHit>,
}

impl StaticProvider {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self { hits }
    }
}

#[async_trait]
impl SearchProvider for StaticProvider {
    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError> {
        Ok(self.hits.iter().take(limit).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_fixed_hits_capped_at_limit() {
        let provider = StaticProvider::new(vec![
            SearchHit {
                url: "http://a.example".to_string(),
                title: "A".to_string(),
                snippet: "a".to_string(),
                rank: 0,
            },
            SearchHit {
                url: "http://b.example".to_string(),
                title: "B".to_string(),
                snippet: "b".to_string(),
                rank: 1,
            },
        ]);
        let hits = provider.search("anything", 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].url, "http://a.example");
    }
}
