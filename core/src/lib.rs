// ZapScan Core Library
// 核心功能库，包含扫描引擎接口、ZAP 客户端、扫描调度和报告存储

pub mod engine;
pub mod report;
pub mod runner;

// 重新导出常用类型
pub use engine::zap::{ZapClient, ZapConfig};
pub use engine::{Alert, RiskLevel, ScanEngine};
pub use report::{legacy_report_name, report_file_name, ReportSink};
pub use runner::{EngineOutcome, RunnerOptions, ScanRunner};

pub mod error {
    use std::time::Duration;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum CoreError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("HTTP error: {0}")]
        Http(#[from] reqwest::Error),

        #[error("Engine error ({status}): {message}")]
        Engine { status: u16, message: String },

        #[error("Timed out after {0:?} waiting for the engine")]
        Timeout(Duration),

        #[error("Invalid report name: {0}")]
        InvalidReportName(String),

        #[error("Report not found: {0}")]
        NotFound(String),

        #[error("Parse error: {0}")]
        Parse(String),
    }

    pub type Result<T> = std::result::Result<T, CoreError>;
}
