use crate::error::ConfigError;
use serde::Deserialize;

/// Options recognized by the research core. All fields have defaults; a CLI
/// front end (out of scope here) maps flags onto this struct.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub max_initial_results: usize,
    pub max_level2_per_page: usize,
    /// `None` means unlimited.
    pub max_total_pages: Option<usize>,
    pub request_timeout_sec: u64,
    pub overall_deadline_sec: u64,
    pub max_concurrency: usize,
    pub per_host_min_interval_ms: u64,
    pub max_retries: u32,
    pub max_bytes_per_page: usize,
    pub user_agent: String,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_initial_results: 20,
            max_level2_per_page: 10,
            max_total_pages: None,
            request_timeout_sec: 30,
            overall_deadline_sec: 120,
            max_concurrency: 10,
            per_host_min_interval_ms: 500,
            max_retries: 2,
            max_bytes_per_page: 1_000_000,
            user_agent: "farreach-research-bot/0.1 (+https://github.com/farreach-rs/farreach)"
                .to_string(),
        }
    }
}

impl ResearchConfig {
    /// Validate invariants that must hold before any network activity starts.
    /// This is the one condition the core raises outward to callers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrency must be >= 1".to_string(),
            ));
        }
        if self.request_timeout_sec == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_sec must be >= 1".to_string(),
            ));
        }
        if self.max_bytes_per_page == 0 {
            return Err(ConfigError::Invalid(
                "max_bytes_per_page must be >= 1".to_string(),
            ));
        }
        if let Some(0) = self.max_total_pages {
            return Err(ConfigError::Invalid(
                "max_total_pages must be >= 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load `research.json` from standard locations, falling back to env vars
/// field-by-field and finally to [`ResearchConfig::default`].
///
/// Search order (first found wins):
/// 1. `./research.json`
/// 2. `../research.json`
/// 3. `RESEARCH_CONFIG` env var path
///
/// Missing file -> defaults (silent, all env-var fallbacks apply).
/// Parse error -> log a warning, return defaults.
pub fn load_research_config() -> ResearchConfig {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("research.json"),
            std::path::PathBuf::from("../research.json"),
        ];
        if let Ok(env_path) = std::env::var("RESEARCH_CONFIG") {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                return match serde_json::from_str::<ResearchConfig>(&contents) {
                    Ok(cfg) => {
                        tracing::info!("research.json loaded from {}", path.display());
                        apply_env_overrides(cfg)
                    }
                    Err(e) => {
                        tracing::warn!(
                            "research.json parse error at {}: {} — using defaults",
                            path.display(),
                            e
                        );
                        apply_env_overrides(ResearchConfig::default())
                    }
                };
            }
            Err(_) => continue,
        }
    }

    apply_env_overrides(ResearchConfig::default())
}

/// Env vars are applied after the JSON config (or its absence, i.e. the
/// struct default), so they act as a final per-field override layer.
fn apply_env_overrides(mut cfg: ResearchConfig) -> ResearchConfig {
    if let Some(v) = env_usize("RESEARCH_MAX_INITIAL_RESULTS") {
        cfg.max_initial_results = v;
    }
    if let Some(v) = env_usize("RESEARCH_MAX_LEVEL2_PER_PAGE") {
        cfg.max_level2_per_page = v;
    }
    if let Some(v) = env_usize("RESEARCH_MAX_TOTAL_PAGES") {
        cfg.max_total_pages = Some(v);
    }
    if let Some(v) = env_u64("RESEARCH_REQUEST_TIMEOUT_SEC") {
        cfg.request_timeout_sec = v;
    }
    if let Some(v) = env_u64("RESEARCH_OVERALL_DEADLINE_SEC") {
        cfg.overall_deadline_sec = v;
    }
    if let Some(v) = env_usize("RESEARCH_MAX_CONCURRENCY") {
        cfg.max_concurrency = v;
    }
    if let Some(v) = env_u64("RESEARCH_PER_HOST_MIN_INTERVAL_MS") {
        cfg.per_host_min_interval_ms = v;
    }
    if let Some(v) = std::env::var("RESEARCH_USER_AGENT")
        .ok()
        .filter(|v| !v.trim().is_empty())
    {
        cfg.user_agent = v;
    }
    cfg
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(ResearchConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_concurrency_is_invalid() {
        let mut cfg = ResearchConfig::default();
        cfg.max_concurrency = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_max_total_pages_is_invalid() {
        let mut cfg = ResearchConfig::default();
        cfg.max_total_pages = Some(0);
        assert!(cfg.validate().is_err());
    }
}
