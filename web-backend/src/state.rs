use sqlx::AnyPool;
use std::sync::Arc;
use zapscan_core::{ReportSink, RunnerOptions, ScanRunner, ZapClient};

use crate::config::Config;
use crate::store;

#[derive(Clone)]
pub struct AppState {
    pub db: AnyPool,
    pub runner: ScanRunner,
    pub reports: ReportSink,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        // 初始化报告目录
        let reports = ReportSink::new(&config.report_dir)?;
        tracing::info!("Report directory: {}", reports.dir().display());

        // 初始化 ZAP 客户端
        let engine = ZapClient::new(&config.zap)?;
        let zap_url = engine.base_url().to_string();
        let runner = ScanRunner::new(
            Arc::new(engine),
            RunnerOptions {
                scan_timeout: config.scan_timeout,
                poll_interval: config.poll_interval,
            },
        );
        tracing::info!("Scanner engine {} at {}", runner.engine_name(), zap_url);

        // 初始化数据库
        let db = store::init_db(&config.database_url).await?;

        Ok(Self::from_parts(db, runner, reports))
    }

    pub fn from_parts(db: AnyPool, runner: ScanRunner, reports: ReportSink) -> Self {
        Self {
            db,
            runner,
            reports,
        }
    }
}
