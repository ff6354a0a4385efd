use thiserror::Error;

/// Errors raised by a [`crate::search::SearchProvider`].
///
/// Mirrors the Blocked/Transient/Fatal shape search-engine adapters use
/// elsewhere in this crate family: the Planner only needs to know whether
/// retrying the provider is worthwhile, not the exact transport failure.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search provider blocked: {0}")]
    Blocked(String),
    #[error("search provider transient failure: {0}")]
    Transient(String),
    #[error("search provider fatal failure: {0}")]
    Fatal(String),
}

/// Per-task fetch failure kind, surfaced in [`crate::types::Failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    Timeout,
    Network,
    Http4xx,
    Http5xx,
    UnsupportedType,
    TooLarge,
    Extract,
    Deadline,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::Network => "network",
            ErrorKind::Http4xx => "http-4xx",
            ErrorKind::Http5xx => "http-5xx",
            ErrorKind::UnsupportedType => "unsupported-type",
            ErrorKind::TooLarge => "too-large",
            ErrorKind::Extract => "extract",
            ErrorKind::Deadline => "deadline",
        };
        write!(f, "{s}")
    }
}

/// The only condition the core raises outward (see `ResearchConfig` validation).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}
