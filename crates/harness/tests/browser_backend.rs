//! Browser backend tests against an in-process fake WebDriver endpoint
//!
//! The fake answers the handful of W3C commands the backend issues, fetches
//! navigated pages from the static server to prove it is up, and records
//! what it was asked to do so teardown can be checked afterwards.

use std::net::TcpListener as StdListener;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::TempDir;

use gramtest_common::{BackendKind, BrowserConfig, Error, StagingArea};
use gramtest_harness::backend::{BrowserBackend, ExecutionBackend};
use gramtest_harness::driver::{self, DriverSpec};
use gramtest_harness::webdriver::ELEMENT_KEY;

#[derive(Default)]
struct Recorded {
    pages: Vec<(String, u16)>,
    keys: Vec<String>,
    clicks: usize,
    deleted: Vec<String>,
}

#[derive(Clone)]
struct FakeDriver {
    recorded: Arc<Mutex<Recorded>>,
    missing: Option<&'static str>,
    fail_delete: bool,
    output: &'static str,
    errors: &'static str,
}

impl FakeDriver {
    fn new(output: &'static str, errors: &'static str) -> Self {
        Self {
            recorded: Arc::new(Mutex::new(Recorded::default())),
            missing: None,
            fail_delete: false,
            output,
            errors,
        }
    }

    fn missing(mut self, id: &'static str) -> Self {
        self.missing = Some(id);
        self
    }

    /// Answer session deletion with a server error
    fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    async fn serve(self) -> String {
        let app = Router::new()
            .route("/session", post(new_session))
            .route("/session/:id", delete(delete_session))
            .route("/session/:id/url", post(navigate))
            .route("/session/:id/element", post(find_element))
            .route("/session/:id/element/:el/value", post(send_keys))
            .route("/session/:id/element/:el/click", post(click))
            .route("/session/:id/element/:el/property/:name", get(property))
            .with_state(self);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        url
    }
}

async fn new_session() -> Json<Value> {
    Json(json!({ "value": { "sessionId": "s-1", "capabilities": {} } }))
}

async fn delete_session(
    State(driver): State<FakeDriver>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    driver.recorded.lock().unwrap().deleted.push(id);
    if driver.fail_delete {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "value": {
                "error": "unknown error",
                "message": "session teardown failed",
                "stacktrace": ""
            } })),
        );
    }
    (StatusCode::OK, Json(json!({ "value": null })))
}

async fn navigate(
    State(driver): State<FakeDriver>,
    Path(_id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let url = body["url"].as_str().unwrap_or_default().to_string();
    let status = match reqwest::get(&url).await {
        Ok(response) => response.status().as_u16(),
        Err(_) => 0,
    };
    driver.recorded.lock().unwrap().pages.push((url, status));
    Json(json!({ "value": null }))
}

async fn find_element(
    State(driver): State<FakeDriver>,
    Path(_id): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let id = body["value"].as_str().unwrap_or_default().trim_start_matches('#').to_string();
    if driver.missing == Some(id.as_str()) {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "value": {
                "error": "no such element",
                "message": format!("Unable to locate element #{}", id),
                "stacktrace": ""
            } })),
        );
    }
    (StatusCode::OK, Json(json!({ "value": { ELEMENT_KEY: id } })))
}

async fn send_keys(
    State(driver): State<FakeDriver>,
    Path((_id, _el)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let text = body["text"].as_str().unwrap_or_default().to_string();
    driver.recorded.lock().unwrap().keys.push(text);
    Json(json!({ "value": null }))
}

async fn click(State(driver): State<FakeDriver>, Path((_id, _el)): Path<(String, String)>) -> Json<Value> {
    driver.recorded.lock().unwrap().clicks += 1;
    Json(json!({ "value": null }))
}

async fn property(
    State(driver): State<FakeDriver>,
    Path((_id, el, _name)): Path<(String, String, String)>,
) -> Json<Value> {
    let value = match el.as_str() {
        "output" => driver.output,
        "errors" => driver.errors,
        _ => "",
    };
    Json(json!({ "value": value }))
}

fn free_port() -> u16 {
    StdListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn port_is_free(port: u16) -> bool {
    StdListener::bind(("127.0.0.1", port)).is_ok()
}

struct Fixture {
    _root: TempDir,
    _runtime: TempDir,
    staging: StagingArea,
    backend: BrowserBackend,
    port: u16,
}

fn fixture(webdriver_url: String, required_os: Option<&str>) -> Fixture {
    let root = TempDir::new().unwrap();
    let runtime = TempDir::new().unwrap();
    std::fs::create_dir_all(runtime.path().join("lib")).unwrap();
    std::fs::write(runtime.path().join("lib/require.js"), "// require shim").unwrap();

    let staging = StagingArea::create_in(root.path(), false).unwrap();
    let port = free_port();
    let backend = BrowserBackend::new(
        BrowserConfig {
            port,
            webdriver_url,
            browser_name: "safari".to_string(),
            required_os: required_os.map(String::from),
        },
        runtime.path(),
    );

    Fixture {
        _root: root,
        _runtime: runtime,
        staging,
        backend,
        port,
    }
}

fn page(fixture: &Fixture) -> std::path::PathBuf {
    driver::write_driver(&fixture.staging, &DriverSpec::lexer("L"), BackendKind::Browser).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn runs_page_and_extracts_output() {
    let fake = FakeDriver::new("[@0,0:2='abc',<1>,1:0]\n[@1,3:2='<EOF>',<-1>,1:3]\n", "");
    let recorded = fake.recorded.clone();
    let fixture = fixture(fake.serve().await, None);
    let entry = page(&fixture);

    let result = fixture.backend.execute(&fixture.staging, &entry, "abc").await.unwrap();

    assert_eq!(result.stdout, "[@0,0:2='abc',<1>,1:0]\n[@1,3:2='<EOF>',<-1>,1:3]\n");
    assert_eq!(result.stderr, None);

    let recorded = recorded.lock().unwrap();
    assert_eq!(recorded.pages.len(), 1);
    let (url, status) = &recorded.pages[0];
    assert_eq!(url, &format!("http://127.0.0.1:{}/Test.html", fixture.port));
    assert_eq!(*status, 200, "page must be served while the session runs");
    assert_eq!(recorded.keys, ["abc"]);
    assert_eq!(recorded.clicks, 1);
    assert_eq!(recorded.deleted, ["s-1"]);
    assert!(port_is_free(fixture.port));
}

#[tokio::test(flavor = "multi_thread")]
async fn errors_area_becomes_stderr() {
    let fake = FakeDriver::new("", "Invalid parse tree shape detected.");
    let fixture = fixture(fake.serve().await, None);
    let entry = page(&fixture);

    let result = fixture.backend.execute(&fixture.staging, &entry, "x").await.unwrap();
    assert_eq!(result.stdout, "");
    assert_eq!(result.stderr.as_deref(), Some("Invalid parse tree shape detected."));
}

#[tokio::test(flavor = "multi_thread")]
async fn extraction_failure_still_tears_down() {
    let fake = FakeDriver::new("unused", "").missing("output");
    let recorded = fake.recorded.clone();
    let fixture = fixture(fake.serve().await, None);
    let entry = page(&fixture);

    let err = fixture.backend.execute(&fixture.staging, &entry, "abc").await.unwrap_err();

    match &err {
        Error::WebDriver { command, message } => {
            assert_eq!(command, "find element #output");
            assert!(message.contains("no such element"), "message: {}", message);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(recorded.lock().unwrap().deleted, ["s-1"], "session must be closed");
    assert!(port_is_free(fixture.port), "server must be stopped");
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_session_close_does_not_fail_the_run() {
    let fake = FakeDriver::new("[@0,0:2='abc',<1>,1:0]\n", "").failing_delete();
    let recorded = fake.recorded.clone();
    let fixture = fixture(fake.serve().await, None);
    let entry = page(&fixture);

    let result = fixture.backend.execute(&fixture.staging, &entry, "abc").await.unwrap();

    assert_eq!(result.stdout, "[@0,0:2='abc',<1>,1:0]\n");
    assert_eq!(result.stderr, None);
    assert_eq!(recorded.lock().unwrap().deleted, ["s-1"]);
    assert!(port_is_free(fixture.port), "server must be stopped");
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_session_close_keeps_the_extraction_error() {
    let fake = FakeDriver::new("unused", "").missing("output").failing_delete();
    let recorded = fake.recorded.clone();
    let fixture = fixture(fake.serve().await, None);
    let entry = page(&fixture);

    let err = fixture.backend.execute(&fixture.staging, &entry, "abc").await.unwrap_err();

    match &err {
        Error::WebDriver { command, message } => {
            assert_eq!(command, "find element #output");
            assert!(message.contains("no such element"), "message: {}", message);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(recorded.lock().unwrap().deleted, ["s-1"], "close must still be attempted");
    assert!(port_is_free(fixture.port), "server must be stopped");
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_webdriver_is_a_fault_and_server_is_stopped() {
    let dead = format!("http://127.0.0.1:{}", free_port());
    let fixture = fixture(dead, None);
    let entry = page(&fixture);

    let err = fixture.backend.execute(&fixture.staging, &entry, "abc").await.unwrap_err();
    assert!(matches!(err, Error::WebDriver { .. }), "unexpected error: {}", err);
    assert!(!err.is_skip());
    assert!(port_is_free(fixture.port));
}

#[tokio::test]
async fn unsupported_platform_is_skipped() {
    let fake = FakeDriver::new("", "");
    let recorded = fake.recorded.clone();
    let fixture = fixture(fake.serve().await, Some("plan9"));
    let entry = page(&fixture);

    let err = fixture.backend.execute(&fixture.staging, &entry, "abc").await.unwrap_err();
    assert!(err.is_skip(), "unexpected error: {}", err);

    let recorded = recorded.lock().unwrap();
    assert!(recorded.pages.is_empty());
    assert!(recorded.deleted.is_empty());
}
