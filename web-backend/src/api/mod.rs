use actix_web::{web, Scope};

pub mod download;
pub mod scan;
pub mod scans;

/// 页面路由和 JSON API
pub fn configure_app(cfg: &mut web::ServiceConfig) {
    cfg.service(create_api_router())
        .configure(scan::configure_scan_routes)
        .configure(download::configure_download_routes);
}

pub fn create_api_router() -> Scope {
    web::scope("/api").service(scan_routes())
}

fn scan_routes() -> Scope {
    web::scope("/scans")
        .configure(scans::configure_scans_api_routes)
}
