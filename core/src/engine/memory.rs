//! 测试用的进程内引擎
//!
//! 模拟调度依赖的 ZAP 会话行为：访问过的 URL 一直累积到 `new_session`，
//! HTML 报告覆盖整个会话，告警可以按 base URL 过滤。

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::{Alert, RiskLevel, ScanEngine};
use crate::error::{CoreError, Result};

/// 模拟失败的调用阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailAt {
    Version,
    NewSession,
    Open,
    RecordsToScan,
    Report,
    Alerts,
}

#[derive(Default)]
struct MemoryState {
    observed: Vec<String>,
    sessions: u64,
    calls: Vec<&'static str>,
    pending: VecDeque<u64>,
}

#[derive(Default)]
pub struct MemoryEngine {
    state: Mutex<MemoryState>,
    fail_at: Option<FailAt>,
    stuck: bool,
    open_delay: Duration,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_at(mut self, phase: FailAt) -> Self {
        self.fail_at = Some(phase);
        self
    }

    /// `records_to_scan` 依次返回这些值，用完后返回 0
    pub fn with_pending(self, pending: impl IntoIterator<Item = u64>) -> Self {
        self.lock().pending = pending.into_iter().collect();
        self
    }

    /// 被动扫描永远不结束
    pub fn stuck(mut self) -> Self {
        self.stuck = true;
        self
    }

    /// `open` 在记录 URL 之后等待，给并发扫描交错的机会
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.lock().calls.clone()
    }

    pub fn sessions(&self) -> u64 {
        self.lock().sessions
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn enter(&self, call: &'static str, phase: FailAt) -> Result<()> {
        self.lock().calls.push(call);
        if self.fail_at == Some(phase) {
            return Err(CoreError::Engine {
                status: 500,
                message: format!("{} failed", call),
            });
        }
        Ok(())
    }
}

pub fn alert_for(url: &str) -> Alert {
    Alert {
        plugin_id: "10020".to_string(),
        alert: "Missing Anti-clickjacking Header".to_string(),
        risk: RiskLevel::Medium,
        confidence: "Medium".to_string(),
        url: url.to_string(),
        description: format!("{} does not set X-Frame-Options", url),
        solution: "Set Content-Security-Policy frame-ancestors.".to_string(),
    }
}

#[async_trait]
impl ScanEngine for MemoryEngine {
    fn name(&self) -> String {
        "memory".to_string()
    }

    async fn version(&self) -> Result<String> {
        self.enter("version", FailAt::Version)?;
        Ok("0.0.0-memory".to_string())
    }

    async fn new_session(&self) -> Result<()> {
        self.enter("new_session", FailAt::NewSession)?;
        let mut state = self.lock();
        state.observed.clear();
        state.sessions += 1;
        Ok(())
    }

    async fn open(&self, url: &str) -> Result<()> {
        self.enter("open", FailAt::Open)?;
        self.lock().observed.push(url.to_string());
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }
        Ok(())
    }

    async fn records_to_scan(&self) -> Result<u64> {
        self.enter("records_to_scan", FailAt::RecordsToScan)?;
        if self.stuck {
            return Ok(1);
        }
        Ok(self.lock().pending.pop_front().unwrap_or(0))
    }

    async fn fetch_report(&self) -> Result<String> {
        self.enter("fetch_report", FailAt::Report)?;
        let state = self.lock();
        let items: String = state
            .observed
            .iter()
            .map(|url| format!("<li>{}</li>", url))
            .collect();
        Ok(format!(
            "<html><body><h1>ZAP Scanning Report</h1><ul>{}</ul></body></html>",
            items
        ))
    }

    async fn alerts(&self, base_url: &str) -> Result<Vec<Alert>> {
        self.enter("alerts", FailAt::Alerts)?;
        Ok(self
            .lock()
            .observed
            .iter()
            .filter(|url| url.starts_with(base_url))
            .map(|url| alert_for(url))
            .collect())
    }
}
