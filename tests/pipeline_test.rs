use farreach::config::ResearchConfig;
use farreach::planner::Planner;
use farreach::search::StaticProvider;
use farreach::types::SearchHit;
use std::sync::Arc;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config() -> ResearchConfig {
    ResearchConfig {
        max_initial_results: 20,
        max_level2_per_page: 10,
        max_total_pages: None,
        request_timeout_sec: 10,
        overall_deadline_sec: 30,
        max_concurrency: 10,
        per_host_min_interval_ms: 0,
        max_retries: 0,
        max_bytes_per_page: 1_000_000,
        user_agent: "farreach-test/0.1".to_string(),
    }
}

fn page_html(title: &str, body: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!(r#"<a href="{l}">link</a>"#))
        .collect();
    format!("<html><head><title>{title}</title></head><body>{body}{anchors}</body></html>")
}

fn html_response(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

// S1 — empty search never reaches the network and still produces a well-formed result.
#[tokio::test]
async fn empty_search_results_in_degraded_but_complete_output() {
    let provider = Arc::new(StaticProvider::new(vec![]));
    let planner = Planner::new(config(), provider).unwrap();

    let result = planner.run("zxcvbnm_nonsense_42").await;

    assert!(result.initial_hits.is_empty());
    assert!(result.level1_pages.is_empty());
    assert!(result.level2_pages.is_empty());
    assert_eq!(result.summary, "");
    assert_eq!(result.total_pages_crawled, 0);
    assert_eq!(result.key_findings.len(), 1);
}

// S2 — single Level-1 hit with two outlinks, all fetchable.
#[tokio::test]
async fn single_hit_happy_path_expands_to_level2() {
    let server = MockServer::start().await;

    let p1 = page_html(
        "Alpha",
        "Rust is great. Rust is fast. Rust is safe.",
        &[
            &format!("{}/x", server.uri()),
            &format!("{}/y", server.uri()),
        ],
    );
    let x = page_html("X", "Rust appears once here.", &[]);
    let y = page_html("Y", "Rust appears once here too.", &[]);

    Mock::given(method("GET"))
        .and(wiremock::matchers::path("/p1"))
        .respond_with(html_response(p1))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path("/x"))
        .respond_with(html_response(x))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path("/y"))
        .respond_with(html_response(y))
        .mount(&server)
        .await;

    let p1_url = format!("{}/p1", server.uri());
    let provider = Arc::new(StaticProvider::new(vec![SearchHit {
        url: p1_url.clone(),
        title: "Alpha".to_string(),
        snippet: "".to_string(),
        rank: 0,
    }]));
    let planner = Planner::new(config(), provider).unwrap();

    let result = planner.run("rust").await;

    assert_eq!(result.total_pages_crawled, 3);
    assert_eq!(result.level1_pages.len(), 1);
    assert_eq!(result.level2_pages.len(), 2);
    assert!(result
        .level2_pages
        .iter()
        .all(|p| p.parent_url == p1_url));
    assert!(result.level1_pages[0].relevance > result.level2_pages[0].relevance);
    assert!(result.key_findings[0].starts_with("Alpha"));
}

// S3 — a Level-2 cap is enforced even with many candidate outlinks.
#[tokio::test]
async fn level2_cap_is_enforced() {
    let server = MockServer::start().await;

    let links: Vec<String> = (0..50).map(|i| format!("{}/l{i}", server.uri())).collect();
    let link_refs: Vec<&str> = links.iter().map(|s| s.as_str()).collect();
    let p1 = page_html("Hub", "rust content here.", &link_refs);

    Mock::given(method("GET"))
        .and(wiremock::matchers::path("/p1"))
        .respond_with(html_response(p1))
        .mount(&server)
        .await;
    // Catch-all for the 50 outlink targets.
    Mock::given(method("GET"))
        .respond_with(html_response(page_html("Leaf", "rust leaf content.", &[])))
        .mount(&server)
        .await;

    let p1_url = format!("{}/p1", server.uri());
    let mut cfg = config();
    cfg.max_level2_per_page = 10;
    let provider = Arc::new(StaticProvider::new(vec![SearchHit {
        url: p1_url,
        title: "Hub".to_string(),
        snippet: "".to_string(),
        rank: 0,
    }]));
    let planner = Planner::new(cfg, provider).unwrap();

    let result = planner.run("rust").await;

    assert_eq!(result.level2_pages.len(), 10);
}

// S4 — per-host politeness spaces out fetches to the same host.
#[tokio::test]
async fn per_host_politeness_spaces_out_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html_response(page_html("P", "rust content.", &[])))
        .mount(&server)
        .await;

    let hits: Vec<SearchHit> = (0..5)
        .map(|i| SearchHit {
            url: format!("{}/p{i}", server.uri()),
            title: format!("P{i}"),
            snippet: "".to_string(),
            rank: i,
        })
        .collect();

    let mut cfg = config();
    cfg.per_host_min_interval_ms = 1000;
    cfg.max_concurrency = 5;
    let provider = Arc::new(StaticProvider::new(hits));
    let planner = Planner::new(cfg, provider).unwrap();

    let result = planner.run("rust").await;

    assert_eq!(result.level1_pages.len(), 5);
    // 5 requests to the same host at >=1s spacing: at least 4s from 1st to 5th.
    assert!(result.elapsed_seconds >= 3.9);
}

// S5 — the overall deadline cuts the run short and accounts for the rest as failures.
#[tokio::test]
async fn deadline_cuts_run_short() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            html_response(page_html("Slow", "rust content.", &[]))
                .set_delay(std::time::Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let hits: Vec<SearchHit> = (0..20)
        .map(|i| SearchHit {
            url: format!("{}/p{i}", server.uri()),
            title: format!("P{i}"),
            snippet: "".to_string(),
            rank: i,
        })
        .collect();

    let mut cfg = config();
    cfg.overall_deadline_sec = 2;
    cfg.max_concurrency = 4;
    cfg.request_timeout_sec = 20;
    let provider = Arc::new(StaticProvider::new(hits));
    let planner = Planner::new(cfg, provider).unwrap();

    let result = planner.run("rust").await;

    assert!(result.level1_pages.len() <= 4);
    assert_eq!(result.level1_pages.len() + result.failures.len(), 20);
    assert!(result
        .failures
        .iter()
        .filter(|f| f.error_kind == "deadline")
        .count()
        >= 16);
}

// S6 — relevance ordering is reflected in key_findings order.
#[tokio::test]
async fn relevance_ordering_drives_key_findings_order() {
    let server = MockServer::start().await;
    let a = page_html(
        "Page A",
        "rust rust rust rust rust rust rust rust rust rust filler text to match length.",
        &[],
    );
    let b = page_html(
        "Page B",
        "rust filler filler filler filler filler filler filler filler filler filler text.",
        &[],
    );

    Mock::given(method("GET"))
        .and(wiremock::matchers::path("/a"))
        .respond_with(html_response(a))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(wiremock::matchers::path("/b"))
        .respond_with(html_response(b))
        .mount(&server)
        .await;

    let hits = vec![
        SearchHit {
            url: format!("{}/a", server.uri()),
            title: "Page A".to_string(),
            snippet: "".to_string(),
            rank: 0,
        },
        SearchHit {
            url: format!("{}/b", server.uri()),
            title: "Page B".to_string(),
            snippet: "".to_string(),
            rank: 1,
        },
    ];

    let provider = Arc::new(StaticProvider::new(hits));
    let planner = Planner::new(config(), provider).unwrap();

    let result = planner.run("rust").await;

    assert_eq!(result.level1_pages.len(), 2);
    let relevance_a = result
        .level1_pages
        .iter()
        .find(|p| p.title == "Page A")
        .unwrap()
        .relevance;
    let relevance_b = result
        .level1_pages
        .iter()
        .find(|p| p.title == "Page B")
        .unwrap()
        .relevance;
    assert!(relevance_a > relevance_b);
    assert!(relevance_a > 0.0 && relevance_a <= 1.0);
    assert!(relevance_b > 0.0 && relevance_b <= 1.0);

    let pos_a = result.key_findings.iter().position(|s| s.starts_with("Page A")).unwrap();
    let pos_b = result.key_findings.iter().position(|s| s.starts_with("Page B")).unwrap();
    assert!(pos_a < pos_b);
}
