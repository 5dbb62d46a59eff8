//! OWASP ZAP 控制接口客户端
//!
//! 通过 HTTP API（`/JSON/...` 和 `/OTHER/...`）访问运行中的 ZAP 守护进程，
//! API key 放在 `X-ZAP-API-Key` 请求头中。

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use super::{Alert, RiskLevel, ScanEngine};
use crate::error::{CoreError, Result};

const API_KEY_HEADER: &str = "X-ZAP-API-Key";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// ZAP 连接配置
#[derive(Debug, Clone)]
pub struct ZapConfig {
    pub host: String,
    pub port: u16,
    pub api_key: String,
}

impl ZapConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

pub struct ZapClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl ZapClient {
    pub fn new(config: &ZapConfig) -> Result<Self> {
        Self::with_base_url(config.base_url(), &config.api_key)
    }

    pub fn with_base_url(base_url: impl Into<String>, api_key: &str) -> Result<Self> {
        let client = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_text(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        let endpoint = format!("{}{}", self.base_url, path);
        tracing::debug!("ZAP request: {}", path);

        let response = self
            .client
            .get(&endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!("ZAP rejected {} with status {}", path, status);
            return Err(CoreError::Engine {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(body)
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let body = self.get_text(path, query).await?;
        serde_json::from_str(&body)
            .map_err(|e| CoreError::Parse(format!("Invalid JSON from {}: {}", path, e)))
    }

    async fn action(&self, path: &str, query: &[(&str, &str)]) -> Result<()> {
        let value = self.get_json(path, query).await?;
        check_action_result(&value)
    }
}

#[async_trait]
impl ScanEngine for ZapClient {
    fn name(&self) -> String {
        "OWASP ZAP".to_string()
    }

    async fn version(&self) -> Result<String> {
        let value = self.get_json("/JSON/core/view/version/", &[]).await?;
        parse_version(&value)
    }

    async fn new_session(&self) -> Result<()> {
        self.action("/JSON/core/action/newSession/", &[("name", ""), ("overwrite", "true")])
            .await
    }

    async fn open(&self, url: &str) -> Result<()> {
        self.action(
            "/JSON/core/action/accessUrl/",
            &[("url", url), ("followRedirects", "true")],
        )
        .await
    }

    async fn records_to_scan(&self) -> Result<u64> {
        let value = self.get_json("/JSON/pscan/view/recordsToScan/", &[]).await?;
        parse_records_to_scan(&value)
    }

    async fn fetch_report(&self) -> Result<String> {
        self.get_text("/OTHER/core/other/htmlreport/", &[]).await
    }

    async fn alerts(&self, base_url: &str) -> Result<Vec<Alert>> {
        let value = self
            .get_json("/JSON/core/view/alerts/", &[("baseurl", base_url)])
            .await?;
        parse_alerts(&value)
    }
}

/// ZAP 的告警 JSON 结构（字段名为驼峰）
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZapAlert {
    #[serde(default)]
    plugin_id: String,
    #[serde(default)]
    alert: String,
    #[serde(default)]
    risk: String,
    #[serde(default)]
    confidence: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    solution: String,
}

impl From<ZapAlert> for Alert {
    fn from(raw: ZapAlert) -> Self {
        Alert {
            plugin_id: raw.plugin_id,
            alert: raw.alert,
            risk: RiskLevel::from_zap(&raw.risk),
            confidence: raw.confidence,
            url: raw.url,
            description: raw.description,
            solution: raw.solution,
        }
    }
}

pub(crate) fn parse_version(value: &Value) -> Result<String> {
    value
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CoreError::Parse("missing `version` in ZAP response".to_string()))
}

pub(crate) fn parse_records_to_scan(value: &Value) -> Result<u64> {
    // ZAP 把数字编码成字符串
    match value.get("recordsToScan") {
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|e| CoreError::Parse(format!("recordsToScan `{}`: {}", s, e))),
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| CoreError::Parse(format!("recordsToScan `{}`", n))),
        _ => Err(CoreError::Parse(
            "missing `recordsToScan` in ZAP response".to_string(),
        )),
    }
}

pub(crate) fn parse_alerts(value: &Value) -> Result<Vec<Alert>> {
    let alerts = value
        .get("alerts")
        .cloned()
        .ok_or_else(|| CoreError::Parse("missing `alerts` in ZAP response".to_string()))?;

    let raw: Vec<ZapAlert> = serde_json::from_value(alerts)
        .map_err(|e| CoreError::Parse(format!("Invalid alerts payload: {}", e)))?;

    Ok(raw.into_iter().map(Alert::from).collect())
}

pub(crate) fn check_action_result(value: &Value) -> Result<()> {
    match value.get("Result").and_then(Value::as_str) {
        Some("OK") => Ok(()),
        other => Err(CoreError::Engine {
            status: 200,
            message: format!("unexpected action result: {}", other.unwrap_or("<none>")),
        }),
    }
}

/// 从 ZAP 的错误响应中提取可读信息
pub(crate) fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let code = value.get("code").and_then(Value::as_str);
        let message = value.get("message").and_then(Value::as_str);
        match (code, message) {
            (Some(code), Some(message)) => return format!("{}: {}", code, message),
            (None, Some(message)) => return message.to_string(),
            (Some(code), None) => return code.to_string(),
            (None, None) => {}
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response".to_string();
    }
    trimmed.chars().take(200).collect()
}
