use crate::config::ResearchConfig;
use crate::domain::registrable_domain_for_url;
use crate::error::{ConfigError, ErrorKind};
use crate::extractor::Extractor;
use crate::fetcher::Fetcher;
use crate::normalize::normalize_url;
use crate::scorer::Scorer;
use crate::search::SearchProvider;
use crate::synthesizer::Synthesizer;
use crate::types::{CrawlTask, Failure, FetchStatus, Level, ResearchResult, ScoredPage};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant as TokioInstant;
use tracing::{info, warn};
use url::Url;

/// Result of driving a single task (either level) through fetch + extract + score.
enum TaskOutcome {
    Scored(ScoredPage),
    Failed(Failure),
}

/// Everything discovered under one Level-1 task: its own outcome, the raw
/// outlink count (for `total_links_discovered`), and every Level-2 outcome
/// reached from it.
struct Branch {
    level1: TaskOutcome,
    level1_outlinks: usize,
    level2: Vec<TaskOutcome>,
}

/// Drives the two-level BFS: search, admit Level-1, fetch/extract/score,
/// expand into Level-2, fetch/extract/score again, then synthesize.
pub struct Planner {
    config: ResearchConfig,
    fetcher: Fetcher,
    search_provider: Arc<dyn SearchProvider>,
}

impl Planner {
    pub fn new(
        config: ResearchConfig,
        search_provider: Arc<dyn SearchProvider>,
    ) -> Result<Self, ConfigError> {
        let fetcher = Fetcher::new(config.clone())?;
        Ok(Self {
            config,
            fetcher,
            search_provider,
        })
    }

    pub async fn run(&self, query: &str) -> ResearchResult {
        let started_at = Utc::now();
        let run_start = TokioInstant::now();
        let deadline = run_start + Duration::from_secs(self.config.overall_deadline_sec);

        let hits = match self
            .search_provider
            .search(query, self.config.max_initial_results)
            .await
        {
            Ok(hits) if !hits.is_empty() => hits,
            Ok(_) => {
                warn!("search returned zero hits for query {:?}", query);
                return empty_result(query, started_at, run_start, "no search results found");
            }
            Err(e) => {
                warn!("search provider failed: {}", e);
                return empty_result(
                    query,
                    started_at,
                    run_start,
                    &format!("search provider failed: {e}"),
                );
            }
        };
        info!("search returned {} hits for {:?}", hits.len(), query);

        let visited: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
        {
            let mut v = visited.lock().await;
            for hit in &hits {
                if let Ok(u) = Url::parse(&hit.url) {
                    v.insert(normalize_url(&u));
                }
            }
        }

        let mut level1_tasks: Vec<CrawlTask> = hits
            .iter()
            .filter_map(|h| {
                let url = Url::parse(&h.url).ok()?;
                if url.scheme() != "http" && url.scheme() != "https" {
                    return None;
                }
                Some(CrawlTask {
                    url: normalize_url(&url),
                    level: Level::One,
                    parent_url: None,
                    origin_snippet: Some(h.snippet.clone()),
                    origin_rank: h.rank,
                })
            })
            .collect();
        if let Some(cap) = self.config.max_total_pages {
            level1_tasks.truncate(cap);
        }

        let admitted = Arc::new(Mutex::new(level1_tasks.len()));
        let scorer = Scorer::new(query);

        let branches: Vec<Branch> = stream::iter(level1_tasks)
            .map(|task| self.process_level1(task, &scorer, &visited, &admitted, deadline))
            .buffer_unordered(self.config.max_concurrency)
            .collect()
            .await;

        let mut level1_pages = Vec::new();
        let mut level2_pages = Vec::new();
        let mut failures = Vec::new();
        let mut total_links_discovered = 0usize;

        for branch in branches {
            total_links_discovered += branch.level1_outlinks;
            match branch.level1 {
                TaskOutcome::Scored(p) => level1_pages.push(p),
                TaskOutcome::Failed(f) => failures.push(f),
            }
            for outcome in branch.level2 {
                match outcome {
                    TaskOutcome::Scored(p) => level2_pages.push(p),
                    TaskOutcome::Failed(f) => failures.push(f),
                }
            }
        }

        let finished_at = Utc::now();
        let elapsed_seconds = run_start.elapsed().as_secs_f64();
        let total_pages_crawled = level1_pages.len() + level2_pages.len();

        Synthesizer::synthesize(
            query,
            hits,
            level1_pages,
            level2_pages,
            failures,
            total_pages_crawled,
            total_links_discovered,
            started_at,
            finished_at,
            elapsed_seconds,
        )
    }

    async fn process_level1(
        &self,
        task: CrawlTask,
        scorer: &Scorer,
        visited: &Arc<Mutex<HashSet<String>>>,
        admitted: &Arc<Mutex<usize>>,
        deadline: TokioInstant,
    ) -> Branch {
        let outcome = self.run_task_with_deadline(&task, scorer, deadline).await;
        let (scored_l1, outlinks_count, page_for_level2) = match outcome {
            TaskOutcome::Scored(scored) => {
                let count = scored.page.outlinks.len();
                (TaskOutcome::Scored(scored.clone()), count, Some(scored))
            }
            TaskOutcome::Failed(f) => (TaskOutcome::Failed(f), 0, None),
        };

        let level2 = match page_for_level2 {
            Some(parent) => {
                let level2_tasks = self
                    .select_level2_tasks(&parent, scorer.terms(), visited, admitted)
                    .await;
                stream::iter(level2_tasks)
                    .map(|t| async move { self.run_task_with_deadline(&t, scorer, deadline).await })
                    .buffer_unordered(self.config.max_level2_per_page.max(1))
                    .collect::<Vec<_>>()
                    .await
            }
            None => Vec::new(),
        };

        Branch {
            level1: scored_l1,
            level1_outlinks: outlinks_count,
            level2,
        }
    }

    /// Races [`Self::run_task`] against the overall deadline. When the
    /// deadline wins, the in-flight fetch is dropped (cancelled at its next
    /// await point inside `reqwest`) and the task is recorded as a deadline
    /// failure instead.
    async fn run_task_with_deadline(
        &self,
        task: &CrawlTask,
        scorer: &Scorer,
        deadline: TokioInstant,
    ) -> TaskOutcome {
        tokio::select! {
            outcome = self.run_task(task, scorer) => outcome,
            _ = tokio::time::sleep_until(deadline) => {
                TaskOutcome::Failed(deadline_failure(&task.url, level_as_u8(task.level)))
            }
        }
    }

    /// Fetch, extract, and score a single task against the shared `scorer`.
    async fn run_task(&self, task: &CrawlTask, scorer: &Scorer) -> TaskOutcome {
        let outcome = self.fetcher.fetch(task).await;
        if outcome.status != FetchStatus::Ok {
            return TaskOutcome::Failed(failure_from_outcome(&outcome, task.level));
        }
        match Extractor::extract(&outcome, task) {
            Some(page) => TaskOutcome::Scored(scorer.score(page)),
            None => TaskOutcome::Failed(Failure {
                url: task.url.clone(),
                level: level_as_u8(task.level),
                status: "extract-failed".to_string(),
                http_code: outcome.http_code,
                error_kind: ErrorKind::Extract.to_string(),
            }),
        }
    }

    async fn select_level2_tasks(
        &self,
        parent: &ScoredPage,
        query_terms: &[String],
        visited: &Arc<Mutex<HashSet<String>>>,
        admitted: &Arc<Mutex<usize>>,
    ) -> Vec<CrawlTask> {
        let parent_domain = Url::parse(&parent.page.url)
            .ok()
            .as_ref()
            .and_then(registrable_domain_for_url);

        let mut cross_host = Vec::new();
        let mut term_match = Vec::new();
        let mut rest = Vec::new();

        for (idx, link) in parent.page.outlinks.iter().enumerate() {
            if *link == parent.page.url {
                continue;
            }
            let link_domain = Url::parse(link)
                .ok()
                .as_ref()
                .and_then(registrable_domain_for_url);
            let is_cross_host = match (&parent_domain, &link_domain) {
                (Some(p), Some(l)) => p != l,
                _ => false,
            };
            let link_lower = link.to_lowercase();
            let has_term = query_terms.iter().any(|t| link_lower.contains(t.as_str()));

            if is_cross_host {
                cross_host.push((idx, link.clone()));
            } else if has_term {
                term_match.push((idx, link.clone()));
            } else {
                rest.push((idx, link.clone()));
            }
        }
        cross_host.sort_by_key(|(idx, _)| *idx);
        term_match.sort_by_key(|(idx, _)| *idx);
        rest.sort_by_key(|(idx, _)| *idx);

        let ordered = cross_host.into_iter().chain(term_match).chain(rest);

        let mut tasks = Vec::new();
        let mut visited_guard = visited.lock().await;
        let mut admitted_guard = admitted.lock().await;
        for (_, link) in ordered {
            if tasks.len() >= self.config.max_level2_per_page {
                break;
            }
            if visited_guard.contains(&link) {
                continue;
            }
            if let Some(cap) = self.config.max_total_pages {
                if *admitted_guard >= cap {
                    break;
                }
            }
            visited_guard.insert(link.clone());
            *admitted_guard += 1;
            tasks.push(CrawlTask {
                url: link,
                level: Level::Two,
                parent_url: Some(parent.page.url.clone()),
                origin_snippet: None,
                origin_rank: parent.page.origin_rank,
            });
        }
        tasks
    }
}

fn level_as_u8(level: Level) -> u8 {
    level as u8
}

fn failure_from_outcome(outcome: &crate::types::FetchOutcome, level: Level) -> Failure {
    Failure {
        url: outcome.url.clone(),
        level: level_as_u8(level),
        status: outcome.status.as_str().to_string(),
        http_code: outcome.http_code,
        error_kind: outcome
            .error_kind
            .map(|k| k.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
    }
}

fn deadline_failure(url: &str, level: u8) -> Failure {
    Failure {
        url: url.to_string(),
        level,
        status: FetchStatus::Skipped.as_str().to_string(),
        http_code: None,
        error_kind: ErrorKind::Deadline.to_string(),
    }
}

fn empty_result(
    query: &str,
    started_at: chrono::DateTime<Utc>,
    run_start: TokioInstant,
    reason: &str,
) -> ResearchResult {
    let finished_at = Utc::now();
    ResearchResult {
        query: query.to_string(),
        started_at,
        finished_at,
        elapsed_seconds: run_start.elapsed().as_secs_f64(),
        initial_hits: Vec::new(),
        level1_pages: Vec::new(),
        level2_pages: Vec::new(),
        summary: String::new(),
        key_findings: vec![format!("research failed: {reason}")],
        total_pages_crawled: 0,
        total_links_discovered: 0,
        failures: Vec::new(),
    }
}
