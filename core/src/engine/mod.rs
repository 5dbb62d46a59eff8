// Engine module - 扫描引擎模块
// 定义外部扫描引擎的控制接口和告警类型

pub mod zap;

#[cfg(any(test, feature = "test-util"))]
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// 告警风险等级，按严重程度排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Informational,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// ZAP 返回的风险字符串，无法识别时视为 Informational
    pub fn from_zap(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => RiskLevel::High,
            "medium" => RiskLevel::Medium,
            "low" => RiskLevel::Low,
            _ => RiskLevel::Informational,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Informational => "Informational",
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

/// 引擎报告的单条告警
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub plugin_id: String,
    pub alert: String,
    pub risk: RiskLevel,
    pub confidence: String,
    pub url: String,
    pub description: String,
    pub solution: String,
}

/// 扫描引擎 trait - 外部引擎的控制接口
///
/// 引擎是有状态的：`open` 观察到的流量和产生的告警会累积在当前会话中，
/// 直到 `new_session` 清空。
#[async_trait]
pub trait ScanEngine: Send + Sync {
    /// 返回引擎名称
    fn name(&self) -> String;

    /// 引擎版本，同时用作可达性检查
    async fn version(&self) -> Result<String>;

    /// 开启新会话，丢弃之前累积的流量和告警
    async fn new_session(&self) -> Result<()>;

    /// 让引擎访问目标 URL，被动扫描规则会观察这次流量
    async fn open(&self, url: &str) -> Result<()>;

    /// 尚未完成被动扫描的记录数
    async fn records_to_scan(&self) -> Result<u64>;

    /// 当前会话的完整 HTML 报告
    async fn fetch_report(&self) -> Result<String>;

    /// 以 `base_url` 为前缀的告警
    async fn alerts(&self, base_url: &str) -> Result<Vec<Alert>>;
}
