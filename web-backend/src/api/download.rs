use actix_files::NamedFile;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::web;

use crate::error::AppError;
use crate::state::AppState;

pub fn configure_download_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/download/{report_name}", web::get().to(download));
}

/// 以附件形式返回报告目录中的文件
async fn download(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<NamedFile, AppError> {
    let report_name = path.into_inner();
    let file_path = state.reports.resolve(&report_name)?;

    let file = NamedFile::open_async(&file_path).await.map_err(|e| {
        AppError::Internal(format!("Failed to open report {}: {}", report_name, e))
    })?;

    tracing::info!("Serving report {}", report_name);

    Ok(file
        .set_content_type(mime::TEXT_HTML_UTF_8)
        .set_content_disposition(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(report_name)],
        }))
}
