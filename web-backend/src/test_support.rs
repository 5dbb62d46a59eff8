// 测试辅助：内存数据库 + 内存引擎的 AppState，以及模拟的 ZAP 控制接口

use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use zapscan_core::engine::memory::MemoryEngine;
use zapscan_core::{ReportSink, RunnerOptions, ScanRunner};

use crate::state::AppState;
use crate::store;

pub const MOCK_API_KEY: &str = "test-api-key";

pub struct TestContext {
    pub state: AppState,
    pub engine: Arc<MemoryEngine>,
    _dir: TempDir,
}

pub fn fast_options() -> RunnerOptions {
    RunnerOptions {
        scan_timeout: Duration::from_millis(200),
        poll_interval: Duration::from_millis(1),
    }
}

pub async fn test_app(engine: MemoryEngine) -> TestContext {
    let dir = tempfile::tempdir().unwrap();
    let reports = ReportSink::new(dir.path().join("reports")).unwrap();
    let db = store::init_db("sqlite::memory:").await.unwrap();

    let engine = Arc::new(engine);
    let runner = ScanRunner::new(engine.clone(), fast_options());

    TestContext {
        state: AppState::from_parts(db, runner, reports),
        engine,
        _dir: dir,
    }
}

/// 报告目录中的文件名（已排序）
pub fn report_files(state: &AppState) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(state.reports.dir())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[derive(Default)]
struct MockZapState {
    accessed: Vec<String>,
    sessions: u64,
    pending_polls: u64,
}

type Shared = web::Data<Mutex<MockZapState>>;

pub struct MockZap {
    pub base_url: String,
    state: Shared,
}

impl MockZap {
    pub fn sessions(&self) -> u64 {
        self.state.lock().unwrap().sessions
    }

    pub fn accessed(&self) -> Vec<String> {
        self.state.lock().unwrap().accessed.clone()
    }
}

fn authorized(req: &HttpRequest) -> Result<(), HttpResponse> {
    let key = req
        .headers()
        .get("X-ZAP-API-Key")
        .and_then(|v| v.to_str().ok());
    if key == Some(MOCK_API_KEY) {
        Ok(())
    } else {
        Err(HttpResponse::BadRequest().json(serde_json::json!({
            "code": "bad_api_key",
            "message": "Provided API key is invalid"
        })))
    }
}

#[derive(Deserialize)]
struct AccessUrl {
    url: String,
}

async fn version(req: HttpRequest) -> HttpResponse {
    if let Err(resp) = authorized(&req) {
        return resp;
    }
    HttpResponse::Ok().json(serde_json::json!({ "version": "2.15.0" }))
}

async fn new_session(req: HttpRequest, state: Shared) -> HttpResponse {
    if let Err(resp) = authorized(&req) {
        return resp;
    }
    let mut state = state.lock().unwrap();
    state.accessed.clear();
    state.sessions += 1;
    HttpResponse::Ok().json(serde_json::json!({ "Result": "OK" }))
}

async fn access_url(req: HttpRequest, state: Shared, query: web::Query<AccessUrl>) -> HttpResponse {
    if let Err(resp) = authorized(&req) {
        return resp;
    }
    let mut state = state.lock().unwrap();
    state.accessed.push(query.into_inner().url);
    state.pending_polls = 2;
    HttpResponse::Ok().json(serde_json::json!({ "Result": "OK" }))
}

async fn records_to_scan(req: HttpRequest, state: Shared) -> HttpResponse {
    if let Err(resp) = authorized(&req) {
        return resp;
    }
    let mut state = state.lock().unwrap();
    let pending = state.pending_polls;
    state.pending_polls = pending.saturating_sub(1);
    HttpResponse::Ok().json(serde_json::json!({ "recordsToScan": pending.to_string() }))
}

async fn html_report(req: HttpRequest, state: Shared) -> HttpResponse {
    if let Err(resp) = authorized(&req) {
        return resp;
    }
    let state = state.lock().unwrap();
    let sites: String = state
        .accessed
        .iter()
        .map(|url| format!("<h3>Site: {}</h3>", url))
        .collect();
    HttpResponse::Ok()
        .content_type("text/html; charset=UTF-8")
        .body(format!(
            "<html><head><title>ZAP Scanning Report</title></head><body>{}</body></html>",
            sites
        ))
}

async fn alerts(
    req: HttpRequest,
    state: Shared,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    if let Err(resp) = authorized(&req) {
        return resp;
    }
    let base = query.get("baseurl").cloned().unwrap_or_default();
    let state = state.lock().unwrap();
    let alerts: Vec<_> = state
        .accessed
        .iter()
        .filter(|url| url.starts_with(&base))
        .map(|url| {
            serde_json::json!({
                "pluginId": "10038",
                "alert": "Content Security Policy (CSP) Header Not Set",
                "risk": "Medium",
                "confidence": "High",
                "url": url,
                "description": "CSP header is missing.",
                "solution": "Set the Content-Security-Policy header.",
            })
        })
        .collect();
    HttpResponse::Ok().json(serde_json::json!({ "alerts": alerts }))
}

/// 在随机端口上启动模拟的 ZAP 控制接口
pub async fn start_mock_zap() -> MockZap {
    let state: Shared = web::Data::new(Mutex::new(MockZapState::default()));
    let app_state = state.clone();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .route("/JSON/core/view/version/", web::get().to(version))
            .route("/JSON/core/action/newSession/", web::get().to(new_session))
            .route("/JSON/core/action/accessUrl/", web::get().to(access_url))
            .route("/JSON/pscan/view/recordsToScan/", web::get().to(records_to_scan))
            .route("/OTHER/core/other/htmlreport/", web::get().to(html_report))
            .route("/JSON/core/view/alerts/", web::get().to(alerts))
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();

    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());

    MockZap {
        base_url: format!("http://{}", addr),
        state,
    }
}
