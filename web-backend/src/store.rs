use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, FromRow};
use zapscan_core::Alert;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    fn from_url(database_url: &str) -> Self {
        if database_url.starts_with("sqlite:") {
            Dialect::Sqlite
        } else {
            Dialect::MySql
        }
    }

    fn schema(&self) -> [&'static str; 2] {
        match self {
            Dialect::MySql => [
                r#"
                CREATE TABLE IF NOT EXISTS zap_scan (
                    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
                    target_url TEXT NOT NULL,
                    risk VARCHAR(50),
                    alert VARCHAR(255),
                    description TEXT,
                    solution TEXT,
                    scanned_at DATETIME,
                    report_name VARCHAR(255),
                    alert_count BIGINT NOT NULL DEFAULT 0
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS zap_alert (
                    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
                    scan_id BIGINT NOT NULL,
                    plugin_id VARCHAR(50) NOT NULL,
                    risk VARCHAR(50) NOT NULL,
                    confidence VARCHAR(50) NOT NULL,
                    alert VARCHAR(255) NOT NULL,
                    url TEXT NOT NULL,
                    description TEXT NOT NULL,
                    solution TEXT NOT NULL,
                    FOREIGN KEY (scan_id) REFERENCES zap_scan(id)
                )
                "#,
            ],
            Dialect::Sqlite => [
                r#"
                CREATE TABLE IF NOT EXISTS zap_scan (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    target_url TEXT NOT NULL,
                    risk TEXT,
                    alert TEXT,
                    description TEXT,
                    solution TEXT,
                    scanned_at DATETIME,
                    report_name TEXT,
                    alert_count INTEGER NOT NULL DEFAULT 0
                )
                "#,
                r#"
                CREATE TABLE IF NOT EXISTS zap_alert (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    scan_id INTEGER NOT NULL,
                    plugin_id TEXT NOT NULL,
                    risk TEXT NOT NULL,
                    confidence TEXT NOT NULL,
                    alert TEXT NOT NULL,
                    url TEXT NOT NULL,
                    description TEXT NOT NULL,
                    solution TEXT NOT NULL,
                    FOREIGN KEY (scan_id) REFERENCES zap_scan(id)
                )
                "#,
            ],
        }
    }
}

/// `zap_scan` 表中的一行
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ScanRecord {
    pub id: i64,
    pub target_url: String,
    pub risk: Option<String>,
    pub alert: Option<String>,
    pub description: Option<String>,
    pub solution: Option<String>,
    pub scanned_at: Option<String>,
    pub report_name: Option<String>,
    pub alert_count: i64,
}

/// `zap_alert` 表中的一行
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AlertRecord {
    pub id: i64,
    pub scan_id: i64,
    pub plugin_id: String,
    pub risk: String,
    pub confidence: String,
    pub alert: String,
    pub url: String,
    pub description: String,
    pub solution: String,
}

pub struct NewScan<'a> {
    pub target_url: &'a str,
    pub report_name: &'a str,
    pub scanned_at: DateTime<Utc>,
    pub alerts: &'a [Alert],
}

const SCAN_COLUMNS: &str = "id, target_url, risk, alert, description, solution, \
     CAST(scanned_at AS CHAR) AS scanned_at, report_name, alert_count";

pub async fn init_db(database_url: &str) -> anyhow::Result<AnyPool> {
    sqlx::any::install_default_drivers();

    let dialect = Dialect::from_url(database_url);
    // 内存 SQLite 每个连接都是独立的库，只能保留一个长期连接
    let in_memory = dialect == Dialect::Sqlite && database_url.contains(":memory:");
    let options = if in_memory {
        AnyPoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        AnyPoolOptions::new().max_connections(5)
    };

    let pool = options
        .connect(database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

    // 创建表
    for statement in dialect.schema() {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create tables: {}", e))?;
    }

    tracing::info!("Database initialized ({:?})", dialect);

    Ok(pool)
}

/// 在同一个事务中写入扫描记录和全部告警
pub async fn insert_scan(pool: &AnyPool, scan: &NewScan<'_>) -> Result<i64, sqlx::Error> {
    // 扫描行记录风险最高的告警
    let top = scan.alerts.iter().max_by_key(|a| a.risk);

    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO zap_scan (target_url, risk, alert, description, solution, scanned_at, report_name, alert_count)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(scan.target_url.to_string())
    .bind(top.map(|a| a.risk.as_str().to_string()))
    .bind(top.map(|a| a.alert.clone()))
    .bind(top.map(|a| a.description.clone()))
    .bind(top.map(|a| a.solution.clone()))
    .bind(scan.scanned_at.format(TIMESTAMP_FORMAT).to_string())
    .bind(scan.report_name.to_string())
    .bind(scan.alerts.len() as i64)
    .execute(&mut *tx)
    .await?;

    // MySQL 驱动会返回自增 id；SQLite 经 Any 驱动转换后为空，需在同一连接上查询
    let scan_id = match result.last_insert_id() {
        Some(id) => id,
        None => {
            sqlx::query_scalar::<_, i64>("SELECT last_insert_rowid()")
                .fetch_one(&mut *tx)
                .await?
        }
    };

    for alert in scan.alerts {
        sqlx::query(
            "INSERT INTO zap_alert (scan_id, plugin_id, risk, confidence, alert, url, description, solution)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(scan_id)
        .bind(alert.plugin_id.clone())
        .bind(alert.risk.as_str().to_string())
        .bind(alert.confidence.clone())
        .bind(alert.alert.clone())
        .bind(alert.url.clone())
        .bind(alert.description.clone())
        .bind(alert.solution.clone())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(scan_id)
}

pub async fn list_scans(pool: &AnyPool, limit: i64) -> Result<Vec<ScanRecord>, sqlx::Error> {
    sqlx::query_as::<_, ScanRecord>(&format!(
        "SELECT {} FROM zap_scan ORDER BY id DESC LIMIT ?",
        SCAN_COLUMNS
    ))
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn get_scan(pool: &AnyPool, id: i64) -> Result<Option<ScanRecord>, sqlx::Error> {
    sqlx::query_as::<_, ScanRecord>(&format!(
        "SELECT {} FROM zap_scan WHERE id = ?",
        SCAN_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn list_alerts(pool: &AnyPool, scan_id: i64) -> Result<Vec<AlertRecord>, sqlx::Error> {
    sqlx::query_as::<_, AlertRecord>(
        "SELECT id, scan_id, plugin_id, risk, confidence, alert, url, description, solution
         FROM zap_alert
         WHERE scan_id = ?
         ORDER BY id",
    )
    .bind(scan_id)
    .fetch_all(pool)
    .await
}

pub async fn count_scans_for(pool: &AnyPool, target_url: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM zap_scan WHERE target_url = ?")
        .bind(target_url.to_string())
        .fetch_one(pool)
        .await
}
