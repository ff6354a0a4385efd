pub mod duckduckgo;
pub mod static_provider;

pub use duckduckgo::DuckDuckGoProvider;
pub use static_provider::StaticProvider;

use crate::error::SearchError;
use crate::types::SearchHit;
use async_trait::async_trait;

/// Pluggable source of initial search results. The core ships a DuckDuckGo
/// HTML scraper as the default and an in-memory double for tests; any
/// implementation backed by a public search endpoint is acceptable.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>, SearchError>;
}

/// Known block signatures in SERP HTML — shared across provider implementations.
pub(crate) fn detect_block_reason(status: reqwest::StatusCode, body: &str) -> Option<String> {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Some("http_429".to_string());
    }
    if status == reqwest::StatusCode::FORBIDDEN {
        return Some("http_403".to_string());
    }
    if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
        return Some("http_503".to_string());
    }

    let lower = body.to_lowercase();
    let needles = [
        ("unusual traffic", "unusual_traffic"),
        ("captcha", "captcha"),
        ("recaptcha", "captcha"),
        ("verify you are human", "captcha"),
        ("enable javascript", "js_required"),
        ("access denied", "access_denied"),
    ];
    for (needle, label) in needles {
        if lower.contains(needle) {
            return Some(label.to_string());
        }
    }

    if body.len() < 3500 && lower.contains("blocked") {
        return Some("block_page".to_string());
    }

    None
}
