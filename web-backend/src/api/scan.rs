use actix_web::http::header::{self, ContentType};
use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use url::form_urlencoded;
use uuid::Uuid;
use zapscan_core::report_file_name;

use crate::error::AppError;
use crate::pages::{self, ResultView};
use crate::state::AppState;
use crate::store::{self, NewScan};

const HISTORY_LIMIT: i64 = 100;

#[derive(Deserialize)]
pub struct SubmitForm {
    pub url: String,
}

#[derive(Deserialize)]
pub struct ScanQuery {
    #[serde(default)]
    pub target_url: Option<String>,
}

/// 一次完成的扫描
#[derive(Debug)]
pub struct CompletedScan {
    pub id: i64,
    pub target_url: String,
    pub report_name: String,
    pub alert_count: usize,
}

pub fn configure_scan_routes(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/", web::get().to(index))       // 提交表单
        .route("/", web::post().to(submit))     // 表单提交后跳转到 /scan
        .route("/scan", web::get().to(scan))    // 执行扫描并渲染结果
        .route("/scans", web::get().to(history));
}

async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(pages::index_page())
}

async fn submit(form: web::Form<SubmitForm>) -> HttpResponse {
    let location = scan_location(&form.url);
    tracing::debug!("Redirecting to {}", location);

    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// `/scan?target_url=...`，URL 按 form-urlencoded 编码
pub fn scan_location(target_url: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("target_url", target_url)
        .finish();
    format!("/scan?{}", query)
}

async fn scan(
    state: web::Data<AppState>,
    query: web::Query<ScanQuery>,
) -> Result<HttpResponse, AppError> {
    let target_url = query.into_inner().target_url.unwrap_or_default();
    if target_url.trim().is_empty() {
        return Err(AppError::BadRequest("target_url is required".to_string()));
    }

    let completed = run_scan(&state, &target_url).await?;
    let times_scanned = scan_count(&state, &target_url).await;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(pages::result_page(&ResultView {
            scan_id: completed.id,
            target_url: &completed.target_url,
            report_name: &completed.report_name,
            alert_count: completed.alert_count,
            times_scanned,
        })))
}

/// 引擎扫描 -> 保存报告 -> 写入数据库
///
/// 引擎失败时不写文件也不写库；数据库写入失败时删除已保存的报告。
pub async fn run_scan(state: &AppState, target_url: &str) -> Result<CompletedScan, AppError> {
    tracing::info!("Starting scan for {}", target_url);

    let outcome = state.runner.run(target_url).await?;

    let scan_uuid = Uuid::new_v4().to_string();
    let report_name = report_file_name(target_url, &scan_uuid);
    state
        .reports
        .save(&report_name, outcome.report_html.as_bytes())?;

    let new_scan = NewScan {
        target_url,
        report_name: &report_name,
        scanned_at: Utc::now(),
        alerts: &outcome.alerts,
    };

    let id = match store::insert_scan(&state.db, &new_scan).await {
        Ok(id) => id,
        Err(e) => {
            tracing::error!("Failed to store scan of {}: {}", target_url, e);
            state.reports.remove(&report_name);
            return Err(e.into());
        }
    };

    tracing::info!(
        "Scan {} of {} stored with {} alerts, report {}",
        id,
        target_url,
        outcome.alerts.len(),
        report_name
    );

    Ok(CompletedScan {
        id,
        target_url: target_url.to_string(),
        report_name,
        alert_count: outcome.alerts.len(),
    })
}

/// 扫描已经落库，统计失败时只省略次数，不影响结果页
async fn scan_count(state: &AppState, target_url: &str) -> Option<i64> {
    match store::count_scans_for(&state.db, target_url).await {
        Ok(count) => Some(count),
        Err(e) => {
            tracing::warn!("Failed to count scans of {}: {}", target_url, e);
            None
        }
    }
}

async fn history(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let scans = store::list_scans(&state.db, HISTORY_LIMIT).await?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(pages::history_page(&scans)))
}
