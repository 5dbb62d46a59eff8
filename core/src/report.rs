// Report module - 报告存储
// 报告文件名推导、原子写入和受限于报告目录的读取

use sha1::Digest;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

pub const REPORT_SUFFIX: &str = "_report.html";
const STEM_MAX_CHARS: usize = 64;
const HASH_CHARS: usize = 16;

/// 旧式报告名：去掉协议，`/` 替换为 `_`
///
/// `http://` 和 `https://` 会得到同一个名字，只用作 [`report_file_name`] 的可读前缀。
pub fn legacy_report_name(target_url: &str) -> String {
    let stripped = target_url
        .replace("http://", "")
        .replace("https://", "")
        .replace('/', "_");
    format!("{}{}", stripped, REPORT_SUFFIX)
}

/// 单次扫描的报告文件名
///
/// 格式为 `<stem>-<hash>.html`：stem 是清洗后的旧式报告名，hash 同时覆盖 URL 和扫描 id。
pub fn report_file_name(target_url: &str, scan_id: &str) -> String {
    let legacy = legacy_report_name(target_url);
    let readable = legacy.strip_suffix(REPORT_SUFFIX).unwrap_or(&legacy);

    let mut stem: String = readable
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .take(STEM_MAX_CHARS)
        .collect();
    stem = stem.trim_start_matches('.').replace("..", "_");
    if stem.is_empty() {
        stem = "report".to_string();
    }

    let mut hasher = sha1::Sha1::new();
    hasher.update(target_url.as_bytes());
    hasher.update(b"\n");
    hasher.update(scan_id.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    let digest: String = digest.chars().take(HASH_CHARS).collect();

    format!("{}-{}.html", stem, digest)
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains("..")
        || name.contains(&['/', '\\', '\0'][..]);

    if invalid {
        return Err(CoreError::InvalidReportName(name.to_string()));
    }
    Ok(())
}

/// 报告目录下文件的唯一写入者
#[derive(Debug, Clone)]
pub struct ReportSink {
    dir: PathBuf,
}

impl ReportSink {
    /// 目录不存在时创建
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 先写临时文件再重命名，崩溃时不会留下截断的报告
    pub fn save(&self, name: &str, contents: &[u8]) -> Result<PathBuf> {
        validate_name(name)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".tmp-")
            .suffix(".part")
            .tempfile_in(&self.dir)?;
        tmp.write_all(contents)?;
        tmp.as_file().sync_all()?;

        let path = self.dir.join(name);
        tmp.persist(&path).map_err(|e| CoreError::Io(e.error))?;

        tracing::info!("Saved report {} ({} bytes)", path.display(), contents.len());
        Ok(path)
    }

    /// 回滚 `save`，文件不存在时忽略
    pub fn remove(&self, name: &str) {
        if validate_name(name).is_err() {
            return;
        }

        match fs::remove_file(self.dir.join(name)) {
            Ok(()) => tracing::info!("Removed report {}", name),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove report {}: {}", name, e),
        }
    }

    /// 解析下载请求中的文件名，只允许报告目录内已存在的文件
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;

        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(CoreError::NotFound(name.to_string()));
        }

        let root = fs::canonicalize(&self.dir)?;
        let canonical = fs::canonicalize(&path)?;
        if !canonical.starts_with(&root) {
            tracing::warn!("Report {} resolves outside {}", name, root.display());
            return Err(CoreError::InvalidReportName(name.to_string()));
        }

        Ok(canonical)
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(name)?;
        Ok(fs::read(path)?)
    }
}
