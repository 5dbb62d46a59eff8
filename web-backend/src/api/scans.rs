use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use crate::store::{self, AlertRecord, ScanRecord};

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 500;

#[derive(Deserialize)]
pub struct ListScansQuery {
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct ScanDetail {
    #[serde(flatten)]
    pub scan: ScanRecord,
    pub alerts: Vec<AlertRecord>,
}

pub fn configure_scans_api_routes(cfg: &mut web::ServiceConfig) {
    cfg
        .route("", web::get().to(list_scans))         // GET /api/scans
        .route("/{id}", web::get().to(get_scan));     // GET /api/scans/{id}
}

/// 获取扫描历史
pub async fn list_scans(
    state: web::Data<AppState>,
    query: web::Query<ListScansQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    match store::list_scans(&state.db, limit).await {
        Ok(scans) => HttpResponse::Ok().json(scans),
        Err(e) => {
            tracing::error!("Failed to list scans: {}", e);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Failed to list scans: {}", e)
            }))
        }
    }
}

/// 获取单次扫描及其告警
pub async fn get_scan(
    state: web::Data<AppState>,
    path: web::Path<i64>,
) -> impl Responder {
    let id = path.into_inner();

    let scan = match store::get_scan(&state.db, id).await {
        Ok(Some(scan)) => scan,
        Ok(None) => {
            return HttpResponse::NotFound().json(serde_json::json!({
                "error": format!("Scan {} not found", id)
            }));
        }
        Err(e) => {
            tracing::error!("Failed to fetch scan {}: {}", id, e);
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Failed to fetch scan: {}", e)
            }));
        }
    };

    let alerts = match store::list_alerts(&state.db, id).await {
        Ok(alerts) => alerts,
        Err(e) => {
            tracing::error!("Failed to fetch alerts for scan {}: {}", id, e);
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("Failed to fetch alerts: {}", e)
            }));
        }
    };

    HttpResponse::Ok().json(ScanDetail { scan, alerts })
}
