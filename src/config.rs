use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CheckError, Result};
use crate::ingest::TextEncoding;

/// 未指定 --config 时尝试读取的配置文件 (可不存在)
pub const DEFAULT_CONFIG_FILE: &str = "invoice-check";

/// 回溯天数上限
pub const MAX_LOOKBACK_DAYS: i64 = 366;

/// 环境变量前缀, 例: `INVOICE_CHECK__CHECK__LOOKBACK_DAYS=3`
pub const ENV_PREFIX: &str = "INVOICE_CHECK";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub check: CheckConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// ACK 根目录, 其下为 yyyyMMdd 日期目录
    pub root_dir: PathBuf,
    pub encoding: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub report_dir: PathBuf,
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckConfig {
    /// 回溯天数, 1..=366
    pub lookback_days: i64,
    /// 交易端门店群组 (SpGpNo)
    pub shop_group: String,
    pub strategy: DiffStrategy,
}

/// 比对方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStrategy {
    /// 读出开立发票后在内存比对
    Memory,
    /// 由数据库直接查出缺漏
    Store,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input: InputConfig {
                root_dir: PathBuf::from("data/deq"),
                encoding: "utf-8".to_string(),
            },
            output: OutputConfig {
                report_dir: PathBuf::from("reports"),
                log_dir: PathBuf::from("logs"),
            },
            check: CheckConfig {
                lookback_days: 1,
                shop_group: "6000".to_string(),
                strategy: DiffStrategy::Memory,
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 2,
            },
        }
    }
}

impl AppConfig {
    /// 依序叠加: 默认值 -> 配置文件 -> 环境变量, 最后校验
    ///
    /// `database.url` 为空时退回读取 `DATABASE_URL`。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let mut config: AppConfig = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if config.database.url.trim().is_empty() {
            config.database.url = std::env::var("DATABASE_URL").unwrap_or_default();
        }

        config.validate()
    }

    /// 回溯天数下限为 1, 超过上限报错; 缺少连接字串或编码不支持时报错
    pub fn validate(mut self) -> Result<Self> {
        self.check.lookback_days = self.check.lookback_days.max(1);
        if self.check.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(CheckError::ConfigurationError(format!(
                "check.lookback_days {} exceeds {}",
                self.check.lookback_days, MAX_LOOKBACK_DAYS
            )));
        }

        if self.database.url.trim().is_empty() {
            return Err(CheckError::ConfigurationError(
                "database.url (or DATABASE_URL) is not set".to_string(),
            ));
        }
        if self.check.shop_group.trim().is_empty() {
            return Err(CheckError::ConfigurationError(
                "check.shop_group must not be empty".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            self.database.max_connections = 1;
        }
        self.encoding()?;

        Ok(self)
    }

    pub fn encoding(&self) -> Result<TextEncoding> {
        TextEncoding::from_label(&self.input.encoding).ok_or_else(|| {
            CheckError::ConfigurationError(format!(
                "unsupported input.encoding '{}'",
                self.input.encoding
            ))
        })
    }
}
