use crate::config::ResearchConfig;
use crate::error::{ConfigError, ErrorKind};
use crate::types::{CrawlTask, FetchOutcome, FetchStatus};
use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, warn};
use url::Url;

/// Retrieves URLs under a global concurrency cap and per-host politeness,
/// retrying transient failures with exponential backoff. Never returns an
/// `Err` — every outcome, including exhausted retries, becomes a terminal
/// [`FetchOutcome`].
pub struct Fetcher {
    client: reqwest::Client,
    config: ResearchConfig,
    concurrency: Arc<Semaphore>,
    host_locks: Mutex<HashMap<String, Arc<Mutex<Instant>>>>,
}

impl Fetcher {
    pub fn new(config: ResearchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_sec))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ConfigError::Invalid(format!("failed to build http client: {e}")))?;

        Ok(Self {
            concurrency: Arc::new(Semaphore::new(config.max_concurrency)),
            host_locks: Mutex::new(HashMap::new()),
            client,
            config,
        })
    }

    /// Fetch a single task, honoring the global concurrency cap and per-host
    /// spacing. Retries `timeout`/`network-error` up to `max_retries`; a
    /// single 5xx retry; 4xx is never retried.
    pub async fn fetch(&self, task: &CrawlTask) -> FetchOutcome {
        let permit = match self.concurrency.acquire().await {
            Ok(p) => p,
            Err(_) => return self.terminal_skip(&task.url, "semaphore closed"),
        };

        let Ok(url) = Url::parse(&task.url) else {
            return self.terminal_skip(&task.url, "unparsable url");
        };
        let host = url.host_str().unwrap_or("").to_ascii_lowercase();

        // Hold the per-host slot for the entire attempt (including retries):
        // this gives us both "one in-flight per host" and "min spacing
        // between the *start* of consecutive requests to the same host".
        let host_lock = self.host_lock_for(&host).await;
        let mut last_start = host_lock.lock().await;
        let now = Instant::now();
        let min_interval = Duration::from_millis(self.config.per_host_min_interval_ms);
        let earliest = *last_start + min_interval;
        if now < earliest {
            tokio::time::sleep(earliest - now).await;
        }
        *last_start = Instant::now();

        let outcome = self.fetch_with_retries(&task.url).await;
        drop(last_start);
        drop(permit);
        outcome
    }

    async fn host_lock_for(&self, host: &str) -> Arc<Mutex<Instant>> {
        let mut locks = self.host_locks.lock().await;
        locks
            .entry(host.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Instant::now() - Duration::from_secs(3600))))
            .clone()
    }

    async fn fetch_with_retries(&self, url: &str) -> FetchOutcome {
        let mut backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_multiplier(2.0)
            .with_max_elapsed_time(None)
            .build();

        let mut attempt: u32 = 0;
        loop {
            let outcome = self.fetch_once(url).await;

            let retryable = match outcome.error_kind {
                Some(ErrorKind::Timeout) | Some(ErrorKind::Network) => attempt < self.config.max_retries,
                Some(ErrorKind::Http5xx) => attempt < 1,
                _ => false,
            };

            if !retryable {
                return outcome;
            }

            let delay = backoff.next_backoff().unwrap_or(Duration::from_secs(2));
            warn!(
                "fetch retry {}/{} for {} after {:?}: {:?}",
                attempt + 1,
                self.config.max_retries,
                url,
                delay,
                outcome.error_kind
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn fetch_once(&self, url: &str) -> FetchOutcome {
        let start = Instant::now();

        let response = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                let kind = if e.is_timeout() {
                    ErrorKind::Timeout
                } else {
                    ErrorKind::Network
                };
                return FetchOutcome {
                    url: url.to_string(),
                    status: if kind == ErrorKind::Timeout {
                        FetchStatus::Timeout
                    } else {
                        FetchStatus::NetworkError
                    },
                    http_code: None,
                    body: Vec::new(),
                    content_type: None,
                    elapsed_ms: start.elapsed().as_millis() as u64,
                    error_kind: Some(kind),
                };
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if !status.is_success() {
            let kind = if status.is_server_error() {
                ErrorKind::Http5xx
            } else {
                ErrorKind::Http4xx
            };
            return FetchOutcome {
                url: url.to_string(),
                status: FetchStatus::HttpError,
                http_code: Some(status.as_u16()),
                body: Vec::new(),
                content_type,
                elapsed_ms: start.elapsed().as_millis() as u64,
                error_kind: Some(kind),
            };
        }

        let is_html = content_type
            .as_deref()
            .map(is_supported_content_type)
            .unwrap_or(false);
        if !is_html {
            return FetchOutcome {
                url: url.to_string(),
                status: FetchStatus::Skipped,
                http_code: Some(status.as_u16()),
                body: Vec::new(),
                content_type,
                elapsed_ms: start.elapsed().as_millis() as u64,
                error_kind: Some(ErrorKind::UnsupportedType),
            };
        }

        let max_bytes = self.config.max_bytes_per_page;
        let mut body = Vec::with_capacity(max_bytes.min(64 * 1024));
        let mut stream = response.bytes_stream();
        let mut too_large = false;
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    let kind = if e.is_timeout() {
                        ErrorKind::Timeout
                    } else {
                        ErrorKind::Network
                    };
                    return FetchOutcome {
                        url: url.to_string(),
                        status: if kind == ErrorKind::Timeout {
                            FetchStatus::Timeout
                        } else {
                            FetchStatus::NetworkError
                        },
                        http_code: Some(status.as_u16()),
                        body,
                        content_type,
                        elapsed_ms: start.elapsed().as_millis() as u64,
                        error_kind: Some(kind),
                    };
                }
            };
            if body.len() + chunk.len() > max_bytes {
                let remaining = max_bytes.saturating_sub(body.len());
                body.extend_from_slice(&chunk[..remaining.min(chunk.len())]);
                too_large = true;
                break;
            }
            body.extend_from_slice(&chunk);
        }

        if too_large {
            return FetchOutcome {
                url: url.to_string(),
                status: FetchStatus::Skipped,
                http_code: Some(status.as_u16()),
                body,
                content_type,
                elapsed_ms: start.elapsed().as_millis() as u64,
                error_kind: Some(ErrorKind::TooLarge),
            };
        }

        info!(
            "fetched {} ({} bytes, {}ms)",
            url,
            body.len(),
            start.elapsed().as_millis()
        );

        FetchOutcome {
            url: url.to_string(),
            status: FetchStatus::Ok,
            http_code: Some(status.as_u16()),
            body,
            content_type,
            elapsed_ms: start.elapsed().as_millis() as u64,
            error_kind: None,
        }
    }

    fn terminal_skip(&self, url: &str, reason: &str) -> FetchOutcome {
        warn!("skipping {}: {}", url, reason);
        FetchOutcome {
            url: url.to_string(),
            status: FetchStatus::Skipped,
            http_code: None,
            body: Vec::new(),
            content_type: None,
            elapsed_ms: 0,
            error_kind: Some(ErrorKind::Network),
        }
    }
}

fn is_supported_content_type(content_type: &str) -> bool {
    let base = content_type.split(';').next().unwrap_or("").trim();
    base.eq_ignore_ascii_case("text/html") || base.eq_ignore_ascii_case("application/xhtml+xml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_accepts_html_variants() {
        assert!(is_supported_content_type("text/html"));
        assert!(is_supported_content_type("text/html; charset=utf-8"));
        assert!(is_supported_content_type("application/xhtml+xml"));
        assert!(!is_supported_content_type("application/json"));
        assert!(!is_supported_content_type("image/png"));
    }
}
