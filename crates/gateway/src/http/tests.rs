use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::extract::ConnectInfo;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use pretty_assertions::assert_eq;
use scangate_common::{Language, MessageKey};
use scangate_report::{LogQuery, MemoryLogStore, Snapshot};
use scangate_scan_config::{ConfigAssembler, ScanDefaults, ScanRequestConfig};
use scangate_supervisor::{
    JobContext, JobOutcome, JobState, JobSupervisor, ScanEngine, SupervisorOptions,
};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use super::*;
use crate::config::GatewaySettings;

const KEY: &str = "test-key";

struct HoldEngine;

#[async_trait]
impl ScanEngine for HoldEngine {
    async fn run(
        &self,
        job: &JobContext,
        _config: &ScanRequestConfig,
        cancel: CancellationToken,
    ) -> Result<JobOutcome> {
        job.mark_running(None);
        cancel.cancelled().await;
        Ok(JobOutcome::Terminated)
    }

    fn name(&self) -> &str {
        "hold"
    }
}

fn snapshot() -> Snapshot {
    serde_json::from_value(json!({
        "reports": [
            {"id": 1, "date": "2024-03-01 10:00:00", "scan_id": "scan-a", "report_filename": "results/a.html"},
            {"id": 2, "date": "2024-03-02 11:30:15", "scan_id": "scan-b", "report_filename": "results/missing.html"}
        ],
        "logs": [
            {"host": "10.0.0.1", "date": "2024-03-01 10:00:01", "port": 22, "type": "port_scan", "description": "ssh open", "scan_id": "scan-a"},
            {"host": "10.0.0.1", "date": "2024-03-01 10:00:02", "port": 80, "type": "port_scan", "description": "<b>http</b> open", "scan_id": "scan-a", "extra": "x"},
            {"host": "owasp.org", "date": "2024-03-02 11:30:20", "port": 443, "type": "dir_scan", "description": "/admin found", "scan_id": "scan-b"}
        ]
    }))
    .unwrap()
}

struct Harness {
    app: Router,
    supervisor: JobSupervisor,
}

fn harness(configure: impl FnOnce(&mut GatewaySettings)) -> Harness {
    let mut settings = GatewaySettings::new(KEY);
    configure(&mut settings);
    let config = GatewayConfig::from_settings(settings).unwrap();

    let supervisor = JobSupervisor::start(
        Arc::new(HoldEngine),
        SupervisorOptions {
            reap_interval: Duration::from_millis(20),
            shutdown_polls: 5,
            history_limit: 16,
        },
    );
    let state = AppState::new(
        config,
        ConfigAssembler::new(Arc::new(ScanDefaults::default())),
        supervisor.clone(),
        LogQuery::new(Arc::new(MemoryLogStore::new(snapshot()))),
    )
    .unwrap();

    Harness {
        app: router(state),
        supervisor,
    }
}

fn request(method: Method, uri: &str, from: [u8; 4]) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .extension(ConnectInfo(SocketAddr::from((from, 40000))))
}

fn get(uri: &str) -> Request<Body> {
    request(Method::GET, uri, [127, 0, 0, 1])
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

async fn body_bytes(resp: Response) -> Vec<u8> {
    to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_json(resp: Response) -> Value {
    serde_json::from_slice(&body_bytes(resp).await).unwrap()
}

fn header<'a>(resp: &'a Response, name: axum::http::HeaderName) -> &'a str {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_non_listed_address_rejected_before_handlers() {
    let h = harness(|s| {
        s.allow_list_enabled = true;
        s.allowed_ips = vec!["10.9.9.9".to_string()];
    });

    let uri = format!("/new/scan?key={}&targets=owasp.org&scan_method=port_scan", KEY);
    let resp = send(&h.app, get(&uri)).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["msg"], MessageKey::UnauthorizedIp.text(Language::En));
    assert_eq!(h.supervisor.active_count(), 0);

    let resp = send(&h.app, get("/no/such/file.css")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let allowed = request(Method::GET, &format!("/session/check?key={}", KEY), [10, 9, 9, 9])
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&h.app, allowed).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_target_rejected_without_spawning() {
    let h = harness(|_| {});
    let uri = format!("/new/scan?key={}&targets=not%20a%20target&scan_method=port_scan", KEY);

    let resp = send(&h.app, get(&uri)).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["msg"],
        MessageKey::InvalidTarget.text(Language::En)
    );
    assert_eq!(h.supervisor.active_count(), 0);
}

#[tokio::test]
async fn test_scan_submission_echoes_redacted_config() {
    let h = harness(|_| {});
    let req = request(Method::POST, "/new/scan", [127, 0, 0, 1])
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!(
            "key={}&targets=owasp.org&scan_method=port_scan&methods_args=user%3Droot&socks_proxy=socks5%3A%2F%2Fu%3Ap%40proxy%3A1080",
            KEY
        )))
        .unwrap();

    let resp = send(&h.app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let job_id = header(&resp, axum::http::HeaderName::from_static(JOB_ID_HEADER)).to_string();
    assert!(!job_id.is_empty());

    let body = body_json(resp).await;
    assert_eq!(body["targets"], "owasp.org");
    assert_eq!(body["methods_args"], json!({"as_user_set": "set_successfully"}));
    assert_eq!(body["socks_proxy"], "socks5://[REDACTED]@proxy:1080");
    assert!(body.get("home_path").is_none());
    assert!(body.get("key").is_none());

    assert_eq!(h.supervisor.active_count(), 1);
    for _ in 0..100 {
        if h.supervisor.active_jobs()[0].state == JobState::Running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(h.supervisor.active_jobs()[0].state, JobState::Running);
    assert_eq!(h.supervisor.active_jobs()[0].id.to_string(), job_id);

    let report = h.supervisor.shutdown().await;
    assert_eq!(report.signalled, 1);
}

#[tokio::test]
async fn test_scan_rejected_after_shutdown() {
    let h = harness(|_| {});
    h.supervisor.shutdown().await;

    let uri = format!("/new/scan?key={}&targets=owasp.org&scan_method=port_scan", KEY);
    let resp = send(&h.app, get(&uri)).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_missing_key_is_unauthorized() {
    let h = harness(|_| {});
    for uri in [
        "/new/scan?targets=owasp.org",
        "/session/check",
        "/session/set?key=wrong",
        "/results/get_list",
        "/results/get_json?id=1",
        "/logs/get_list",
        "/logs/search?q=x",
        "/logs/get_csv?host=owasp.org",
    ] {
        let resp = send(&h.app, get(uri)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        assert_eq!(
            body_json(resp).await["msg"],
            MessageKey::ApiInvalid.text(Language::En)
        );
    }
}

#[tokio::test]
async fn test_session_round_trip() {
    let h = harness(|_| {});

    let resp = send(&h.app, get(&format!("/session/set?key={}", KEY))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let issued = header(&resp, SET_COOKIE).split(';').next().unwrap().to_string();
    assert_eq!(issued, format!("key={}", KEY));

    let check = request(Method::GET, "/session/check", [127, 0, 0, 1])
        .header(COOKIE, issued.as_str())
        .body(Body::empty())
        .unwrap();
    let resp = send(&h.app, check).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await["msg"],
        MessageKey::BrowserSessionValid.text(Language::En)
    );

    let resp = send(&h.app, get("/session/kill")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let killed = header(&resp, SET_COOKIE).split(';').next().unwrap().to_string();
    assert_eq!(killed, "key=");

    let check = request(Method::GET, "/session/check", [127, 0, 0, 1])
        .header(COOKIE, killed.as_str())
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&h.app, check).await.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bad_page_defaults_to_first() {
    let h = harness(|_| {});
    for path in ["/results/get_list", "/logs/get_list", "/logs/search"] {
        let first = body_json(send(&h.app, get(&format!("{}?key={}", path, KEY))).await).await;
        let abc = body_json(send(&h.app, get(&format!("{}?key={}&page=abc", path, KEY))).await).await;
        assert_eq!(first, abc, "{}", path);
        assert!(!first.as_array().unwrap().is_empty(), "{}", path);
    }
}

#[tokio::test]
async fn test_results_list_and_search() {
    let h = harness(|_| {});
    let results = body_json(send(&h.app, get(&format!("/results/get_list?key={}", KEY))).await).await;
    assert_eq!(results[0]["id"], 2);

    let hits = body_json(send(&h.app, get(&format!("/logs/search?key={}&q=ADMIN", KEY))).await).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
    assert_eq!(hits[0]["host"], "owasp.org");
}

#[tokio::test]
async fn test_result_json_for_unknown_id_is_empty_array() {
    let h = harness(|_| {});

    let resp = send(&h.app, get(&format!("/results/get_json?key={}&id=999", KEY))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, CONTENT_TYPE), "application/json");
    assert!(header(&resp, CONTENT_DISPOSITION).starts_with("attachment;filename=report-"));
    assert_eq!(body_bytes(resp).await, b"[]".to_vec());

    let resp = send(&h.app, get(&format!("/results/get_csv?key={}&id=999", KEY))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_bytes(resp).await.is_empty());

    let resp = send(&h.app, get(&format!("/results/get_json?key={}&id=abc", KEY))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await["msg"],
        MessageKey::InvalidId.text(Language::En)
    );
}

#[tokio::test]
async fn test_result_csv_export() {
    let h = harness(|_| {});

    let resp = send(&h.app, get(&format!("/results/get_csv?key={}&id=1", KEY))).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, CONTENT_TYPE), "text/csv");
    let disposition = header(&resp, CONTENT_DISPOSITION).to_string();
    let filename = disposition.trim_start_matches("attachment;filename=");
    assert!(filename.starts_with("report-2024_03_01_10_00_00"));
    assert!(filename.ends_with(".csv"));
    assert_eq!(filename.len(), "report-2024_03_01_10_00_00".len() + 10 + ".csv".len());

    let csv = String::from_utf8(body_bytes(resp).await).unwrap();
    let lines: Vec<&str> = csv.split("\r\n").filter(|l| !l.is_empty()).collect();
    assert_eq!(
        lines[0],
        r#""host","date","port","type","description","scan_id""#
    );
    assert_eq!(lines.len(), 3);
    assert!(!csv.contains("\"x\""));
}

#[tokio::test]
async fn test_host_exports() {
    let h = harness(|_| {});

    let resp = send(&h.app, get(&format!("/logs/get_json?key={}&host=10.0.0.1", KEY))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(header(&resp, CONTENT_DISPOSITION).ends_with(".json"));
    assert_eq!(body_json(resp).await.as_array().unwrap().len(), 2);

    let resp = send(&h.app, get(&format!("/logs/get_html?key={}&host=10.0.0.1", KEY))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, CONTENT_TYPE), "text/html");
    assert!(resp.headers().get(CONTENT_DISPOSITION).is_none());
    let html = String::from_utf8(body_bytes(resp).await).unwrap();
    assert!(html.contains("&lt;b&gt;http&lt;/b&gt; open"));

    let resp = send(&h.app, get(&format!("/logs/get_json?key={}", KEY))).await;
    assert_eq!(body_bytes(resp).await, b"[]".to_vec());
}

fn write_file(path: &Path, content: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

#[tokio::test]
async fn test_result_content() {
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir.path().join("results/a.html"), "<h1>report a</h1>");
    let root = dir.path().to_path_buf();
    let h = harness(move |s| s.results_root = root);

    let resp = send(&h.app, get(&format!("/results/get?key={}&id=1", KEY))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, CONTENT_TYPE), "text/html");
    assert_eq!(body_bytes(resp).await, b"<h1>report a</h1>".to_vec());

    let resp = send(&h.app, get(&format!("/results/get?key={}&id=2", KEY))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&h.app, get(&format!("/results/get?key={}&id=77", KEY))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&h.app, get(&format!("/results/get?key={}&id=x", KEY))).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_index_and_static_files() {
    let dir = tempfile::tempdir().unwrap();
    write_file(&dir.path().join("css/main.css"), "body {}");
    let root = dir.path().to_path_buf();
    let h = harness(move |s| s.web_root = Some(root));

    let resp = send(&h.app, get("/")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(String::from_utf8(body_bytes(resp).await).unwrap().contains("port_scan"));

    let resp = send(&h.app, get("/css/main.css")).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(header(&resp, CONTENT_TYPE), "text/css");

    let resp = send(&h.app, get("/css/../../etc/passwd")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send(&h.app, get("/nothing/here.js")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "error");
    assert_eq!(body["msg"], MessageKey::NotFound.text(Language::En));
}

#[tokio::test]
async fn test_access_log_records_requests() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("access.log");
    let configured = log_path.clone();
    let h = harness(move |s| {
        s.access_log_enabled = true;
        s.access_log_file = configured;
    });

    let req = request(Method::GET, "/session/check", [127, 0, 0, 1])
        .header("host", "gateway.local")
        .header("user-agent", "probe/1.0")
        .body(Body::empty())
        .unwrap();
    send(&h.app, req).await;

    let content = std::fs::read_to_string(&log_path).unwrap();
    assert!(content.starts_with("127.0.0.1 ["));
    assert!(content.ends_with("gateway.local \"GET /session/check\" probe/1.0 401\r\n"));
}

#[tokio::test]
async fn test_localized_messages() {
    let h = harness(|s| s.language = Language::De);
    let resp = send(&h.app, get("/session/check")).await;
    assert_eq!(
        body_json(resp).await["msg"],
        MessageKey::ApiInvalid.text(Language::De)
    );
}
