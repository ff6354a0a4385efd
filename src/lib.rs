pub mod config;
pub mod domain;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod normalize;
pub mod planner;
pub mod scorer;
pub mod search;
pub mod synthesizer;
pub mod types;

pub use config::{load_research_config, ResearchConfig};
pub use error::{ConfigError, ErrorKind, SearchError};
pub use extractor::Extractor;
pub use fetcher::Fetcher;
pub use planner::Planner;
pub use scorer::Scorer;
pub use search::{DuckDuckGoProvider, SearchProvider, StaticProvider};
pub use synthesizer::Synthesizer;
pub use types::ResearchResult;

/// Initializes `tracing` from `RUST_LOG` (defaulting to `info`). Call once
/// at process startup from a CLI or service front end; the core never
/// initializes logging itself.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
