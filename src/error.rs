//! 对账流程的错误类型

use std::path::PathBuf;
use thiserror::Error;

use crate::ingest::Layout;

#[derive(Debug, Error)]
pub enum CheckError {
    /// 单行栏位数不足, 调用方跳过该行
    #[error("malformed {layout:?} record: {found} fields, at least {required} required")]
    MalformedRecord {
        layout: Layout,
        found: usize,
        required: usize,
    },

    /// 文件无法读取或解码, 调用方跳过该文件
    #[error("failed to ingest {}: {source}", .path.display())]
    IngestFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 暂存写入或交易端查询失败, 中止当前日期
    #[error("persistence failure: {0}")]
    PersistenceFailure(#[from] sqlx::Error),

    /// 启动时配置缺失或非法
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// 报表或运行日志写入失败
    #[error("failed to write {}: {source}", .path.display())]
    ReportFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CheckError {
    pub fn ingest(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CheckError::IngestFailure {
            path: path.into(),
            source,
        }
    }

    pub fn report(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CheckError::ReportFailure {
            path: path.into(),
            source,
        }
    }
}

impl From<config::ConfigError> for CheckError {
    fn from(e: config::ConfigError) -> Self {
        CheckError::ConfigurationError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CheckError>;
