// Runner module - 扫描调度
// 串行化对单个引擎的使用，每次扫描使用独立会话，并轮询被动扫描进度

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::engine::{Alert, ScanEngine};
use crate::error::{CoreError, Result};

#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// 单次扫描（拿到引擎锁之后）的总时长上限
    pub scan_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            scan_timeout: Duration::from_secs(120),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// 一次引擎扫描的产出
#[derive(Debug, Clone)]
pub struct EngineOutcome {
    pub report_html: String,
    pub alerts: Vec<Alert>,
}

#[derive(Clone)]
pub struct ScanRunner {
    engine: Arc<dyn ScanEngine>,
    lock: Arc<Mutex<()>>,
    options: RunnerOptions,
}

impl ScanRunner {
    pub fn new(engine: Arc<dyn ScanEngine>, options: RunnerOptions) -> Self {
        Self {
            engine,
            lock: Arc::new(Mutex::new(())),
            options,
        }
    }

    pub fn engine_name(&self) -> String {
        self.engine.name()
    }

    /// 对 `target_url` 执行一次完整扫描
    ///
    /// 整个过程持有引擎锁：引擎只有一个会话，报告和告警只包含本次目标。
    /// `scan_timeout` 从拿到锁开始计时，覆盖所有引擎调用。
    pub async fn run(&self, target_url: &str) -> Result<EngineOutcome> {
        let _guard = self.lock.lock().await;

        let limit = self.options.scan_timeout;
        match tokio::time::timeout(limit, self.run_locked(target_url)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!("Scan of {} did not finish within {:?}", target_url, limit);
                Err(CoreError::Timeout(limit))
            }
        }
    }

    async fn run_locked(&self, target_url: &str) -> Result<EngineOutcome> {
        let version = self.engine.version().await?;
        tracing::info!(
            "Scanning {} with {} {}",
            target_url,
            self.engine.name(),
            version
        );

        self.engine.new_session().await?;
        self.engine.open(target_url).await?;
        self.wait_for_passive_scan().await?;

        let report_html = self.engine.fetch_report().await?;
        let alerts = self.engine.alerts(target_url).await?;

        tracing::info!(
            "Engine finished {}: {} alerts, report {} bytes",
            target_url,
            alerts.len(),
            report_html.len()
        );

        Ok(EngineOutcome {
            report_html,
            alerts,
        })
    }

    // 由 run 中的超时兜底
    async fn wait_for_passive_scan(&self) -> Result<()> {
        loop {
            let pending = self.engine.records_to_scan().await?;
            if pending == 0 {
                return Ok(());
            }

            tracing::debug!("Waiting for passive scan, {} records left", pending);
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }
}
