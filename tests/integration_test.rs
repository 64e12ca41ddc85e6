use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sync_checker::config::Config;
use sync_checker::infrastructure::{Fetch, ProbeOutcome, ProbeResponse, TransportFailure};
use sync_checker::models::{
    parse_checks, AttachableState, DocumentCheck, Expectation, Unpublishing, UnpublishingReason,
};
use sync_checker::orchestrator::{SyncCheck, SyncCheckOptions};
use sync_checker::services::{FailureCollector, FailureReport};
use tokio_test::{assert_err, assert_ok};

const STORE: &str = "http://content-store.test";

/// 按地址返回预设响应的假 content store，未登记的地址返回 404
#[derive(Default)]
struct StubStore {
    responses: Mutex<HashMap<String, ProbeOutcome>>,
    requested: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl StubStore {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn serve(self: &Arc<Self>, path: &str, status: u16, body: &str) -> Arc<Self> {
        self.responses
            .lock()
            .unwrap()
            .insert(format!("{}{}", STORE, path), Ok(ProbeResponse::new(status, body)));
        self.clone()
    }

    fn fail(self: &Arc<Self>, path: &str, failure: TransportFailure) -> Arc<Self> {
        self.responses
            .lock()
            .unwrap()
            .insert(format!("{}{}", STORE, path), Err(failure));
        self.clone()
    }

    fn requested(&self) -> Vec<String> {
        let mut urls = self.requested.lock().unwrap().clone();
        urls.sort();
        urls
    }
}

struct StubFetcher(Arc<StubStore>);

impl Fetch for StubFetcher {
    fn fetch(&self, url: String) -> BoxFuture<'static, ProbeOutcome> {
        let store = self.0.clone();
        async move {
            store.requested.lock().unwrap().push(url.clone());
            let now = store.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            store.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            store.in_flight.fetch_sub(1, Ordering::SeqCst);

            let response = store.responses.lock().unwrap().get(&url).cloned();
            response.unwrap_or_else(|| Ok(ProbeResponse::new(404, "")))
        }
        .boxed()
    }
}

fn config() -> Config {
    Config {
        content_store_url: STORE.to_string(),
        ..Config::default()
    }
}

async fn run(checks: Vec<DocumentCheck>, config: Config, store: &Arc<StubStore>) -> FailureReport {
    let options = SyncCheckOptions::default().with_fetcher(Arc::new(StubFetcher(store.clone())));
    assert_ok!(SyncCheck::new(checks, config, options).run().await)
}

fn withdrawn(explanation: &str) -> Expectation {
    Expectation::Unpublished(AttachableState {
        draft: false,
        withdrawn: true,
        unpublishing: Some(Unpublishing {
            reason: UnpublishingReason::Withdrawn,
            explanation: explanation.to_string(),
            alternative_url: None,
            redirect: false,
        }),
    })
}

fn unpublished_to_draft(redirect: bool) -> Expectation {
    Expectation::Unpublished(AttachableState {
        draft: true,
        withdrawn: false,
        unpublishing: Some(Unpublishing {
            reason: UnpublishingReason::Consolidated,
            explanation: String::new(),
            alternative_url: Some("/government/publications/parent".to_string()),
            redirect,
        }),
    })
}

fn messages(report: &FailureReport) -> Vec<String> {
    report.sorted().iter().map(|f| f.message.clone()).collect()
}

// ========== 附件的撤回/下架场景 ==========

#[tokio::test]
async fn test_attachment_without_unpublishing_is_not_checked_further() {
    let store = StubStore::new().serve("/attachment", 200, r#"{"schema_name": "html_publication"}"#);
    let check = DocumentCheck::new(
        1,
        "/attachment",
        Expectation::Unpublished(AttachableState::default()),
    );

    let report = run(vec![check], config(), &store).await;
    assert!(report.is_empty());
    assert_eq!(store.requested(), vec![format!("{}/attachment", STORE)]);
}

#[tokio::test]
async fn test_withdrawn_attachment_with_matching_notice_passes() {
    let store = StubStore::new().serve(
        "/attachment",
        200,
        r#"{
            "schema_name": "html_publication",
            "withdrawn_notice": {
                "explanation": "<p>This guidance was   <em>withdrawn</em>.</p>\n<p>See <a href=\"/new\">the new guidance</a> &mdash; it&rsquo;s current.</p>",
                "withdrawn_at": "2026-10-01T09:00:00Z"
            }
        }"#,
    );
    let check = DocumentCheck::new(
        2,
        "/attachment",
        withdrawn("This guidance was *withdrawn*.\n\nSee [the new guidance](/new) \u{2014} it\u{2019}s current."),
    );

    let report = run(vec![check], config(), &store).await;
    assert!(report.is_empty(), "unexpected failures: {:?}", report);
}

#[tokio::test]
async fn test_withdrawn_attachment_with_wrong_notice_is_reported() {
    let store = StubStore::new().serve(
        "/attachment",
        200,
        r#"{"schema_name": "html_publication", "withdrawn_notice": {"explanation": "<p>Old text</p>"}}"#,
    );
    let check = DocumentCheck::new(3, "/attachment", withdrawn("New text"));

    let report = run(vec![check], config(), &store).await;
    assert_eq!(
        messages(&report),
        vec!["expected withdrawn notice: '<p>New text</p>' but got '<p>Old text</p>'".to_string()]
    );
    assert_eq!(report.failures()[0].url, format!("{}/attachment", STORE));
}

#[tokio::test]
async fn test_unpublished_attachment_must_redirect_to_parent() {
    let store = StubStore::new()
        .serve("/redirected", 200, r#"{"schema_name": "redirect"}"#)
        .serve("/still-live", 200, r#"{"schema_name": "html_publication"}"#);
    let checks = vec![
        DocumentCheck::new(4, "/redirected", unpublished_to_draft(true)),
        DocumentCheck::new(5, "/still-live", unpublished_to_draft(true)),
    ];

    let report = run(checks, config(), &store).await;
    assert_eq!(report.document_ids(), vec![5]);
    assert_eq!(messages(&report), vec!["attachment should redirect to parent".to_string()]);
}

#[tokio::test]
async fn test_unpublished_attachment_without_redirect_policy_passes() {
    let store = StubStore::new().serve("/attachment", 200, r#"{"schema_name": "html_publication"}"#);
    let check = DocumentCheck::new(6, "/attachment", unpublished_to_draft(false));

    let report = run(vec![check], config(), &store).await;
    assert!(report.is_empty());
}

// ========== 其他期望 ==========

#[tokio::test]
async fn test_published_gone_and_redirect_expectations() {
    let store = StubStore::new()
        .serve("/live", 200, r#"{"schema_name": "guide"}"#)
        .serve("/moved", 200, r#"{"schema_name": "redirect", "redirects": [{"path": "/moved", "destination": "/elsewhere"}]}"#)
        .serve("/deleted", 410, "");
    let checks = vec![
        DocumentCheck::new(10, "/live", Expectation::Published { schema_name: Some("guide".into()) }),
        DocumentCheck::new(11, "/moved", Expectation::Redirected { destination: "/target".into() }),
        DocumentCheck::new(12, "/deleted", Expectation::Gone),
        DocumentCheck::new(13, "/missing", Expectation::Published { schema_name: None }),
    ];

    let report = run(checks, config(), &store).await;
    assert_eq!(report.document_ids(), vec![11, 13]);
    assert_eq!(
        messages(&report),
        vec![
            "expected redirect to '/target' but redirects to '/elsewhere'".to_string(),
            format!("request to {}/missing returned HTTP 404 with no usable body", STORE),
        ]
    );
}

#[tokio::test]
async fn test_each_locale_is_probed_separately() {
    let store = StubStore::new()
        .serve("/guide", 200, r#"{"schema_name": "guide"}"#)
        .serve("/guide.cy", 200, r#"{"schema_name": "gone"}"#);
    let check = DocumentCheck::new(20, "/guide", Expectation::Published { schema_name: None })
        .with_locales(["en", "cy"]);

    let report = run(vec![check], config(), &store).await;
    assert_eq!(
        store.requested(),
        vec![format!("{}/guide", STORE), format!("{}/guide.cy", STORE)]
    );
    assert_eq!(report.len(), 1);
    assert_eq!(report.failures()[0].url, format!("{}/guide.cy", STORE));
    assert_eq!(
        report.failures()[0].message,
        "expected a live content item but found a 'gone' item"
    );
}

// ========== 失败处理 ==========

#[tokio::test]
async fn test_transport_failures_become_mismatches() {
    let store = StubStore::new()
        .fail("/slow", TransportFailure::Timeout { after: Duration::from_secs(10) })
        .fail("/down", TransportFailure::Connect("connection refused".into()))
        .serve("/garbage", 200, "<html>maintenance</html>");
    let checks = vec![
        DocumentCheck::new(30, "/slow", Expectation::Gone),
        DocumentCheck::new(31, "/down", Expectation::Gone),
        DocumentCheck::new(32, "/garbage", Expectation::Published { schema_name: None }),
    ];

    let report = run(checks, config(), &store).await;
    let messages = messages(&report);
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[0], format!("request to {}/slow timed out after 10s", STORE));
    assert_eq!(
        messages[1],
        format!("request to {}/down failed: connection failed: connection refused", STORE)
    );
    assert!(messages[2].starts_with("unrecognised content item: body is not JSON"));
}

#[tokio::test]
async fn test_run_completes_when_every_request_fails() {
    let store = StubStore::new();
    let checks: Vec<_> = (1..=25)
        .map(|id| DocumentCheck::new(id, format!("/doc/{}", id), Expectation::Published { schema_name: None }))
        .collect();

    let report = run(checks, config(), &store).await;
    assert_eq!(report.len(), 25);
    assert_eq!(report.document_ids(), (1..=25).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_failing_renderer_still_reports_the_document() {
    let store = StubStore::new()
        .serve("/attachment", 200, r#"{"schema_name": "html_publication", "withdrawn_notice": {"explanation": "<p>x</p>"}}"#)
        .serve("/live", 200, r#"{"schema_name": "guide"}"#);
    let checks = vec![
        DocumentCheck::new(40, "/attachment", withdrawn("Withdrawn")),
        DocumentCheck::new(41, "/live", Expectation::Published { schema_name: None }),
    ];
    let options = SyncCheckOptions::default()
        .with_fetcher(Arc::new(StubFetcher(store.clone())))
        .with_renderer(Arc::new(|_: &str| -> String { panic!("renderer unavailable") }));

    let report = assert_ok!(SyncCheck::new(checks, config(), options).run().await);
    assert_eq!(report.document_ids(), vec![40]);
    assert_eq!(
        messages(&report),
        vec![format!(
            "completion handler for {}/attachment panicked: renderer unavailable",
            STORE
        )]
    );
}

#[tokio::test]
async fn test_invalid_check_aborts_before_any_request() {
    let store = StubStore::new();
    let checks = vec![
        DocumentCheck::new(1, "/fine", Expectation::Gone),
        DocumentCheck::new(2, "/bad", Expectation::Redirected { destination: "elsewhere".into() }),
    ];
    let options = SyncCheckOptions::default().with_fetcher(Arc::new(StubFetcher(store.clone())));

    let err = assert_err!(SyncCheck::new(checks, config(), options).run().await);
    assert!(err.to_string().contains('2'));
    assert!(store.requested().is_empty());
}

// ========== 并发与重复运行 ==========

fn mixed_workload() -> (Arc<StubStore>, Vec<DocumentCheck>) {
    let store = StubStore::new();
    let mut checks = Vec::new();
    for id in 1..=40u64 {
        let path = format!("/doc/{}", id);
        match id % 4 {
            0 => {
                store.serve(&path, 200, r#"{"schema_name": "guide"}"#);
                checks.push(DocumentCheck::new(id, path, Expectation::Published { schema_name: None }));
            }
            1 => {
                store.serve(&path, 200, r#"{"schema_name": "guide"}"#);
                checks.push(DocumentCheck::new(id, path, Expectation::Gone));
            }
            2 => {
                store.serve(&path, 200, r#"{"schema_name": "html_publication", "withdrawn_notice": {"explanation": "<p>Wrong</p>"}}"#);
                checks.push(DocumentCheck::new(id, path, withdrawn("Right")).with_locales(["en", "fr"]));
            }
            _ => checks.push(DocumentCheck::new(id, path, Expectation::Redirected { destination: "/x".into() })),
        }
    }
    (store, checks)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_report_does_not_depend_on_concurrency() {
    let (store, checks) = mixed_workload();

    let serial = run(checks.clone(), Config { max_concurrency: 1, ..config() }, &store).await;
    assert_eq!(store.peak.load(Ordering::SeqCst), 1);

    let parallel = run(checks.clone(), Config { max_concurrency: 64, ..config() }, &store).await;

    assert!(!serial.is_empty());
    assert_eq!(serial.sorted(), parallel.sorted());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrency_ceiling_is_respected() {
    let (store, checks) = mixed_workload();
    run(checks, Config { max_concurrency: 5, ..config() }, &store).await;

    let peak = store.peak.load(Ordering::SeqCst);
    assert!(peak <= 5, "peak in-flight requests was {}", peak);
}

#[tokio::test]
async fn test_repeated_runs_produce_the_same_report() {
    let (store, checks) = mixed_workload();
    let first = run(checks.clone(), config(), &store).await;
    let second = run(checks, config(), &store).await;
    assert_eq!(first.sorted(), second.sorted());
}

#[tokio::test]
async fn test_shared_collector_accumulates_across_runs() {
    let store = StubStore::new();
    let collector = FailureCollector::new();

    for _ in 0..2 {
        let options = SyncCheckOptions::default()
            .with_failures(collector.clone())
            .with_fetcher(Arc::new(StubFetcher(store.clone())));
        let checks = vec![DocumentCheck::new(1, "/missing", Expectation::Published { schema_name: None })];
        assert_ok!(SyncCheck::new(checks, config(), options).run().await);
    }

    assert_eq!(collector.len(), 2);
}

// ========== 追加探测 ==========

#[tokio::test]
async fn test_redirect_destination_is_followed_when_enabled() {
    let store = StubStore::new()
        .serve("/old", 200, r#"{"schema_name": "redirect", "redirects": [{"path": "/old", "destination": "/new"}]}"#)
        .serve("/retired", 200, r#"{"schema_name": "redirect", "redirects": [{"path": "/retired", "destination": "https://www.example.test/nowhere?x=1"}]}"#)
        .serve("/new", 200, r#"{"schema_name": "guide"}"#);
    let checks = vec![
        DocumentCheck::new(1, "/old", Expectation::Redirected { destination: "/new".into() }),
        DocumentCheck::new(2, "/retired", Expectation::Redirected { destination: "/nowhere".into() }),
    ];
    let config = Config {
        follow_redirects: true,
        ..config()
    };

    let report = run(checks, config, &store).await;

    assert_eq!(store.requested().len(), 4);
    assert_eq!(report.document_ids(), vec![2]);
    assert_eq!(
        messages(&report),
        vec![format!(
            "redirect destination /nowhere: request to {}/nowhere returned HTTP 404 with no usable body",
            STORE
        )]
    );
}

#[tokio::test]
async fn test_redirect_destination_is_not_followed_by_default() {
    let store = StubStore::new()
        .serve("/old", 200, r#"{"schema_name": "redirect", "redirects": [{"path": "/old", "destination": "/new"}]}"#);
    let checks = vec![DocumentCheck::new(1, "/old", Expectation::Redirected { destination: "/new".into() })];

    let report = run(checks, config(), &store).await;
    assert!(report.is_empty());
    assert_eq!(store.requested().len(), 1);
}

// ========== 从 TOML 加载 ==========

#[tokio::test]
async fn test_checks_loaded_from_toml_run_end_to_end() {
    let checks = assert_ok!(parse_checks(
        r#"
        [[checks]]
        id = 7
        base_path = "/government/publications/report/annex"
        expectation = { kind = "unpublished", withdrawn = true, unpublishing = { reason = "withdrawn", explanation = "No longer current." } }

        [[checks]]
        id = 8
        base_path = "/government/news/story"
        locales = ["en", "de"]
        expectation = { kind = "gone" }
        "#
    ));
    let store = StubStore::new().serve(
        "/government/publications/report/annex",
        200,
        r#"{"schema_name": "html_publication", "withdrawn_notice": {"explanation": "<p>No longer current.</p>"}}"#,
    );

    let report = run(checks, config(), &store).await;
    assert!(report.is_empty(), "unexpected failures: {:?}", report);
    assert_eq!(store.requested().len(), 3);
}
