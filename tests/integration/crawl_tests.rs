//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small documentation site and run the
//! full crawl cycle end-to-end against a temporary output directory.

use doc_mirror::checkpoint::{
    open_store, Checkpoint, CheckpointStore, JsonCheckpointStore, SqliteCheckpointStore,
};
use doc_mirror::config::{parse_config, Config};
use doc_mirror::crawler::{
    crawl, ContentError, ContentExtractor, CrawlOutcome, Driver, DriverState, Extracted, Frontier,
    ResumeMode, SelectorExtractor,
};
use doc_mirror::output::{CrawlStats, MarkdownRenderer};
use doc_mirror::{ErrorKind, UrlState};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HASH: &str = "test-config-hash";

/// Creates a test configuration for the docs under `<server>/docs/`
fn create_test_config(server: &MockServer, dir: &Path) -> Config {
    let toml = format!(
        r#"
[target-site]
start-url = "{uri}/docs/index.html"
allowed-domain = "{uri}/docs/"

[output]
base-dir = "{out}"
download-images = false

[execution]
request-delay = 0.0

[retry]
max-retries = 2
initial-delay = 0.01
max-delay = 0.05

[recovery]
recovery-file = "{state}"
"#,
        uri = server.uri(),
        out = dir.join("out").display(),
        state = dir.join("recovery_state.json").display(),
    );
    parse_config(&toml).expect("test config should be valid")
}

fn page(title: &str, nav: &[&str], body: &str) -> String {
    let links: String = nav
        .iter()
        .map(|href| format!(r#"<li><a href="{href}">{href}</a></li>"#))
        .collect();
    format!(
        "<html><head><title>{title}</title></head><body>\
         <nav><ul>{links}</ul></nav>\
         <main><h1>{title}</h1><p>{body}</p></main>\
         </body></html>"
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html; charset=utf-8")
        .set_body_string(body)
}

async fn mount_page(server: &MockServer, route: &str, body: String, hits: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .expect(hits)
        .mount(server)
        .await;
}

/// Selector extractor that calls `hook` with the 1-based call number first
struct HookExtractor<F> {
    inner: SelectorExtractor,
    calls: AtomicUsize,
    hook: F,
}

impl<F: Fn(usize) + Send + Sync> HookExtractor<F> {
    fn new(config: &Config, hook: F) -> Self {
        Self {
            inner: SelectorExtractor::new(
                &config.extractor.content_selector,
                &config.crawler.navigation_selector,
            )
            .unwrap(),
            calls: AtomicUsize::new(0),
            hook,
        }
    }
}

impl<F: Fn(usize) + Send + Sync> ContentExtractor for HookExtractor<F> {
    fn extract(&self, html: &str, page_url: &url::Url) -> Result<Extracted, ContentError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        (self.hook)(call);
        self.inner.extract(html, page_url)
    }
}

struct FailingRenderer;

impl MarkdownRenderer for FailingRenderer {
    fn render(&self, _main_html: &str) -> Result<String, ContentError> {
        Err(ContentError::EmptyMarkdown)
    }
}

fn visited_in_checkpoint(path: &Path) -> Option<usize> {
    JsonCheckpointStore::new(path, HASH)
        .try_load()
        .unwrap()
        .map(|checkpoint| checkpoint.frontier.visited_set.len())
}

async fn run(config: Config, mode: ResumeMode) -> (Driver, CrawlOutcome) {
    let mut driver = Driver::new(config, HASH, CancellationToken::new())
        .expect("driver should build")
        .with_resume_mode(mode);
    let outcome = driver.run().await.expect("crawl should not abort");
    (driver, outcome)
}

#[tokio::test]
async fn test_full_crawl_mirrors_site() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let nav = ["guide.html", "api/", "https://elsewhere.test/docs/x.html", "#top"];

    mount_page(&server, "/docs/index.html", page("Home", &nav, "Welcome home"), 1).await;
    mount_page(&server, "/docs/guide.html", page("Guide", &["index.html"], "Read the guide"), 1).await;
    mount_page(&server, "/docs/api", page("API", &["../guide.html"], "Reference"), 1).await;

    let config = create_test_config(&server, dir.path());
    let (driver, outcome) = run(config, ResumeMode::Fresh).await;

    assert!(outcome.is_completed());
    assert_eq!(driver.state(), DriverState::Completed);

    let stats = outcome.stats();
    assert_eq!(stats.pages_processed, 3);
    assert_eq!(stats.pages_succeeded, 3);
    assert_eq!(stats.pages_failed, 0);

    let out = dir.path().join("out");
    let index = std::fs::read_to_string(out.join("index.md")).unwrap();
    assert!(index.contains("Welcome home"));
    assert!(std::fs::read_to_string(out.join("guide.md"))
        .unwrap()
        .contains("Read the guide"));
    assert!(out.join("api").join("_index.md").exists());

    // Completed crawls remove the checkpoint
    assert!(!dir.path().join("recovery_state.json").exists());
}

#[tokio::test]
async fn test_each_url_fetched_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    // Every page links to every other page, with equivalent spellings
    let nav = ["index.html", "a.html", "./a.html", "b.html", "b.html?", "a.html#part"];
    mount_page(&server, "/docs/index.html", page("Home", &nav, "home"), 1).await;
    mount_page(&server, "/docs/a.html", page("A", &nav, "a"), 1).await;
    mount_page(&server, "/docs/b.html", page("B", &nav, "b"), 1).await;

    let config = create_test_config(&server, dir.path());
    let (driver, outcome) = run(config, ResumeMode::Fresh).await;

    assert!(outcome.is_completed());
    assert_eq!(driver.frontier().len(), 3);
    assert_eq!(driver.frontier().visited_len(), 3);
}

#[tokio::test]
async fn test_retryable_status_then_success() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/docs/index.html"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/docs/index.html", page("Home", &[], "after retry"), 1).await;

    let config = create_test_config(&server, dir.path());
    let (driver, outcome) = run(config, ResumeMode::Fresh).await;

    assert!(outcome.is_completed());
    assert_eq!(outcome.stats().pages_succeeded, 1);
    let record = driver
        .frontier()
        .get(&format!("{}/docs/index.html", server.uri()))
        .unwrap();
    assert_eq!(record.state, UrlState::Visited);
    assert_eq!(record.consecutive_failures, 0);
}

#[tokio::test]
async fn test_not_found_is_not_retried_within_a_fetch() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/docs/index.html", page("Home", &["missing.html"], "home"), 1).await;
    // One attempt per pass through the frontier, no retries inside a fetch
    Mock::given(method("GET"))
        .and(path("/docs/missing.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, dir.path());
    config.retry.max_retries = 3;
    config.retry.skip_after_failures = 2;
    let (driver, outcome) = run(config, ResumeMode::Fresh).await;

    assert!(outcome.is_completed());
    let missing = format!("{}/docs/missing.html", server.uri());
    assert_eq!(driver.frontier().get(&missing).unwrap().state, UrlState::Skipped);
    assert_eq!(outcome.stats().errors_of(ErrorKind::Client), 2);
}

#[tokio::test]
async fn test_repeated_failures_auto_skip() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(
        &server,
        "/docs/index.html",
        page("Home", &["flaky.html", "ok.html"], "home"),
        1,
    )
    .await;
    mount_page(&server, "/docs/ok.html", page("Ok", &[], "ok"), 1).await;
    Mock::given(method("GET"))
        .and(path("/docs/flaky.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, dir.path());
    config.retry.max_retries = 0;
    config.retry.skip_after_failures = 3;
    let (driver, outcome) = run(config, ResumeMode::Fresh).await;

    assert!(outcome.is_completed());
    let flaky = format!("{}/docs/flaky.html", server.uri());
    let record = driver.frontier().get(&flaky).unwrap();
    assert_eq!(record.state, UrlState::Skipped);
    assert_eq!(record.consecutive_failures, 3);
    assert_eq!(record.last_error, Some(ErrorKind::Network));

    let report = driver.report();
    assert_eq!(report.skipped_urls, vec![flaky]);
    assert_eq!(outcome.stats().pages_succeeded, 2);
    assert_eq!(outcome.stats().pages_failed, 1);
}

#[tokio::test]
async fn test_missing_content_marks_page_visited_with_error() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/docs/index.html", page("Home", &["bare.html"], "home"), 1).await;
    Mock::given(method("GET"))
        .and(path("/docs/bare.html"))
        .respond_with(html("<html><body><div>no main here</div></body></html>".to_string()))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path());
    let (driver, outcome) = run(config, ResumeMode::Fresh).await;

    assert!(outcome.is_completed());
    let bare = format!("{}/docs/bare.html", server.uri());
    let record = driver.frontier().get(&bare).unwrap();
    assert_eq!(record.state, UrlState::Visited);
    assert_eq!(record.last_error, Some(ErrorKind::Content));
    assert_eq!(outcome.stats().errors_of(ErrorKind::Content), 1);
    assert!(!dir.path().join("out").join("bare.md").exists());
}

#[tokio::test]
async fn test_cancelled_crawl_checkpoints_and_resumes() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/docs/index.html", page("Home", &["next.html"], "home"), 1).await;
    mount_page(&server, "/docs/next.html", page("Next", &[], "next"), 1).await;

    // First run is cancelled before it fetches anything
    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut first = Driver::new(create_test_config(&server, dir.path()), HASH, cancel)
        .unwrap()
        .with_resume_mode(ResumeMode::Fresh);
    let outcome = first.run().await.unwrap();
    assert!(!outcome.is_completed());
    assert_eq!(first.state(), DriverState::Interrupted);

    let state_file = dir.path().join("recovery_state.json");
    let saved = JsonCheckpointStore::new(&state_file, HASH)
        .try_load()
        .unwrap()
        .expect("checkpoint should exist");
    assert_eq!(saved.frontier.pending_order.len(), 1);

    let (second, outcome) = run(create_test_config(&server, dir.path()), ResumeMode::Resume).await;
    assert!(outcome.is_completed());
    assert_eq!(second.frontier().visited_len(), 2);
    assert!(!state_file.exists());
}

#[tokio::test]
async fn test_resume_skips_visited_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let root = format!("{}/docs/index.html", server.uri());
    let guide = format!("{}/docs/guide.html", server.uri());

    mount_page(&server, "/docs/index.html", page("Home", &["guide.html"], "home"), 0).await;
    mount_page(&server, "/docs/guide.html", page("Guide", &["index.html"], "guide"), 1).await;

    // Checkpoint of a run that visited the root and discovered the guide
    let mut frontier = Frontier::new(5);
    frontier.enqueue(&root);
    frontier.enqueue(&guide);
    let popped = frontier.next_pending().unwrap();
    frontier.mark_visited(&popped).unwrap();
    let mut stats = CrawlStats::new();
    stats.record_success();

    let state_file = dir.path().join("recovery_state.json");
    let mut store = JsonCheckpointStore::new(&state_file, HASH);
    store
        .save(&Checkpoint::new(&root, HASH, frontier.snapshot(), stats))
        .unwrap();

    let (driver, outcome) = run(create_test_config(&server, dir.path()), ResumeMode::Resume).await;

    assert!(outcome.is_completed());
    assert_eq!(driver.frontier().visited_len(), 2);
    // Totals carry over from the checkpoint
    assert_eq!(outcome.stats().pages_processed, 2);
    assert_eq!(outcome.stats().pages_succeeded, 2);
}

#[tokio::test]
async fn test_checkpoint_from_other_config_is_not_resumed_explicitly() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let root = format!("{}/docs/index.html", server.uri());

    let mut frontier = Frontier::new(5);
    frontier.enqueue(&root);
    let mut store = JsonCheckpointStore::new(&dir.path().join("recovery_state.json"), "other-hash");
    store
        .save(&Checkpoint::new(&root, "other-hash", frontier.snapshot(), CrawlStats::new()))
        .unwrap();

    let mut driver = Driver::new(create_test_config(&server, dir.path()), HASH, CancellationToken::new())
        .unwrap()
        .with_resume_mode(ResumeMode::Resume);

    assert!(matches!(
        driver.run().await.unwrap_err(),
        doc_mirror::MirrorError::Startup(_)
    ));
}

#[tokio::test]
async fn test_sqlite_checkpoint_backend() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let db = dir.path().join("recovery_state.db");

    mount_page(&server, "/docs/index.html", page("Home", &[], "home"), 1).await;

    let mut config = create_test_config(&server, dir.path());
    config.recovery.recovery_file = db.clone();
    config.recovery.keep_completed = true;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut first = Driver::new(config.clone(), HASH, cancel).unwrap();
    first.run().await.unwrap();

    let saved = open_store(&db, HASH).try_load().unwrap().unwrap();
    assert_eq!(saved.frontier.records.len(), 1);

    let (_, outcome) = run(config, ResumeMode::Resume).await;
    assert!(outcome.is_completed());
    assert!(!db.exists());
    assert!(dir.path().join("recovery_state.db.completed").exists());
}

#[tokio::test]
async fn test_images_are_downloaded() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let body = r#"<html><body><nav></nav><main><h1>Home</h1>
        <p>Logo below</p><img src="img/logo.png" alt="Logo"></main></body></html>"#;
    mount_page(&server, "/docs/index.html", body.to_string(), 1).await;
    Mock::given(method("GET"))
        .and(path("/docs/img/logo.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "image/png")
                .set_body_bytes(vec![0x89, b'P', b'N', b'G']),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, dir.path());
    config.output.download_images = true;
    let (_, outcome) = run(config, ResumeMode::Fresh).await;

    assert_eq!(outcome.stats().images_downloaded, 1);
    let images: Vec<_> = std::fs::read_dir(dir.path().join("out").join("images"))
        .unwrap()
        .collect();
    assert_eq!(images.len(), 1);

    let index = std::fs::read_to_string(dir.path().join("out").join("index.md")).unwrap();
    assert!(index.contains("images/"));
}

#[tokio::test]
async fn test_report_written_when_configured() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/docs/index.html", page("Home", &[], "home"), 1).await;

    let mut config = create_test_config(&server, dir.path());
    let report_path = dir.path().join("report.md");
    config.output.report_path = Some(report_path.clone());
    let outcome = crawl(config, HASH, ResumeMode::Fresh, CancellationToken::new())
        .await
        .unwrap();
    assert!(outcome.is_completed());

    let report = std::fs::read_to_string(report_path).unwrap();
    assert!(report.contains("# doc-mirror Crawl Report"));
}

#[tokio::test]
async fn test_periodic_checkpoint_written_mid_run() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let nav = ["a.html", "b.html", "c.html"];
    mount_page(&server, "/docs/index.html", page("Home", &nav, "home"), 1).await;
    for name in ["a", "b", "c"] {
        mount_page(&server, &format!("/docs/{}.html", name), page(name, &[], name), 1).await;
    }

    let mut config = create_test_config(&server, dir.path());
    config.recovery.save_interval = 2;
    let state_file = dir.path().join("recovery_state.json");

    // Checkpoint contents seen as each page is extracted
    let seen: Arc<Mutex<Vec<Option<usize>>>> = Arc::default();
    let extractor = {
        let seen = Arc::clone(&seen);
        let state_file = state_file.clone();
        HookExtractor::new(&config, move |_| {
            seen.lock().unwrap().push(visited_in_checkpoint(&state_file));
        })
    };

    let mut driver = Driver::new(config, HASH, CancellationToken::new())
        .unwrap()
        .with_resume_mode(ResumeMode::Fresh)
        .with_extractor(Box::new(extractor));
    let outcome = driver.run().await.unwrap();

    assert!(outcome.is_completed());
    assert_eq!(*seen.lock().unwrap(), vec![None, None, Some(2), Some(2)]);
}

#[tokio::test]
async fn test_crash_after_periodic_save_loses_no_links() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let nav = ["a.html", "b.html", "c.html", "d.html"];
    mount_page(&server, "/docs/index.html", page("Home", &nav, "home"), 1).await;
    mount_page(&server, "/docs/a.html", page("A", &[], "a"), 1).await;
    // Processed after the last periodic save, so fetched again on resume
    mount_page(&server, "/docs/b.html", page("B", &[], "b"), 2).await;
    mount_page(&server, "/docs/c.html", page("C", &[], "c"), 2).await;
    mount_page(&server, "/docs/d.html", page("D", &[], "d"), 1).await;

    let mut config = create_test_config(&server, dir.path());
    config.recovery.save_interval = 2;
    let state_file = dir.path().join("recovery_state.json");
    let crash_copy: PathBuf = dir.path().join("crash_copy.json");

    // On the fourth page, keep the checkpoint as a crash would leave it and stop
    let cancel = CancellationToken::new();
    let extractor = {
        let cancel = cancel.clone();
        let state_file = state_file.clone();
        let crash_copy = crash_copy.clone();
        HookExtractor::new(&config, move |call| {
            if call == 4 {
                std::fs::copy(&state_file, &crash_copy).unwrap();
                cancel.cancel();
            }
        })
    };

    let mut first = Driver::new(config.clone(), HASH, cancel)
        .unwrap()
        .with_resume_mode(ResumeMode::Fresh)
        .with_extractor(Box::new(extractor));
    assert!(!first.run().await.unwrap().is_completed());

    std::fs::copy(&crash_copy, &state_file).unwrap();
    assert_eq!(visited_in_checkpoint(&state_file), Some(2));

    let (second, outcome) = run(config, ResumeMode::Resume).await;
    assert!(outcome.is_completed());
    assert_eq!(second.frontier().len(), 5);
    assert_eq!(second.frontier().visited_len(), 5);
    assert_eq!(outcome.stats().pages_succeeded, 5);
    for name in ["index", "a", "b", "c", "d"] {
        assert!(dir.path().join("out").join(format!("{}.md", name)).exists());
    }
}

#[tokio::test]
async fn test_persistent_server_error_uses_every_retry() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/docs/index.html", page("Home", &["down.html"], "home"), 1).await;
    // max-retries = 2 means three attempts
    Mock::given(method("GET"))
        .and(path("/docs/down.html"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, dir.path());
    config.retry.skip_after_failures = 1;
    let (driver, outcome) = run(config, ResumeMode::Fresh).await;

    assert!(outcome.is_completed());
    let down = format!("{}/docs/down.html", server.uri());
    let record = driver.frontier().get(&down).unwrap();
    assert_eq!(record.state, UrlState::Skipped);
    assert_eq!(record.last_error, Some(ErrorKind::Network));
    assert_eq!(outcome.stats().errors_of(ErrorKind::Network), 1);
}

#[tokio::test]
async fn test_politeness_delay_applies_to_retries() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/docs/index.html"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, dir.path());
    config.execution.request_delay = 0.2;
    config.retry.initial_delay = 0.0;
    config.retry.max_delay = 0.0;
    config.retry.skip_after_failures = 1;

    let started = Instant::now();
    let (_, outcome) = run(config, ResumeMode::Fresh).await;

    assert!(outcome.is_completed());
    // No backoff, so the wait comes from the delay before each of 3 attempts
    assert!(started.elapsed() >= Duration::from_millis(600));
}

#[tokio::test]
async fn test_render_failure_does_not_follow_links() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/docs/index.html", page("Home", &["next.html"], "home"), 1).await;
    mount_page(&server, "/docs/next.html", page("Next", &[], "next"), 0).await;

    let config = create_test_config(&server, dir.path());
    let mut driver = Driver::new(config, HASH, CancellationToken::new())
        .unwrap()
        .with_resume_mode(ResumeMode::Fresh)
        .with_renderer(Box::new(FailingRenderer));
    let outcome = driver.run().await.unwrap();

    assert!(outcome.is_completed());
    assert_eq!(driver.frontier().len(), 1);
    let root = format!("{}/docs/index.html", server.uri());
    let record = driver.frontier().get(&root).unwrap();
    assert_eq!(record.state, UrlState::Visited);
    assert_eq!(record.last_error, Some(ErrorKind::Content));
}

#[tokio::test]
async fn test_allowed_domain_case_is_canonicalized() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/docs/index.html", page("Home", &["guide.html"], "home"), 1).await;
    mount_page(&server, "/docs/guide.html", page("Guide", &[], "guide"), 1).await;

    let toml = format!(
        r#"
[target-site]
start-url = "{uri}/docs/index.html"
allowed-domain = "{upper}/docs/"

[output]
base-dir = "{out}"

[execution]
request-delay = 0.0

[recovery]
enable-recovery = false
"#,
        uri = server.uri(),
        upper = server.uri().replacen("http://", "HTTP://", 1),
        out = dir.path().join("out").display(),
    );
    let config = parse_config(&toml).expect("mixed-case prefix should validate");
    let (driver, outcome) = run(config, ResumeMode::Fresh).await;

    assert!(outcome.is_completed());
    assert_eq!(driver.frontier().visited_len(), 2);
    assert!(dir.path().join("out").join("guide.md").exists());
}

#[tokio::test]
async fn test_corrupt_sqlite_checkpoint_is_replaced() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/docs/index.html", page("Home", &[], "home"), 1).await;

    let db = dir.path().join("recovery_state.db");
    std::fs::write(&db, b"not a database").unwrap();
    let mut config = create_test_config(&server, dir.path());
    config.recovery.recovery_file = db.clone();
    config.recovery.keep_completed = true;
    let (_, outcome) = run(config, ResumeMode::Ask).await;

    assert!(outcome.is_completed());
    let archived = SqliteCheckpointStore::new(&dir.path().join("recovery_state.db.completed"), HASH)
        .try_load()
        .unwrap()
        .expect("archived checkpoint should be readable");
    assert_eq!(archived.frontier.visited_set.len(), 1);
}
