use chrono::{NaiveDate, NaiveDateTime};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{CheckError, Result};
use crate::service::checker::{DateOutcome, DateResult, RunSummary};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 运行日志: 每个执行日一个文件, 只追加
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// `<dir>/InvoiceCheck_<yyyyMMdd>.log`
    pub fn for_day(dir: &Path, day: NaiveDate) -> Self {
        Self {
            path: dir.join(format!("InvoiceCheck_{}.log", day.format("%Y%m%d"))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, line: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CheckError::report(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CheckError::report(&self.path, e))?;
        writeln!(file, "{}", line).map_err(|e| CheckError::report(&self.path, e))
    }

    pub fn started(&self, at: NaiveDateTime, dates: &[NaiveDate]) -> Result<()> {
        let window = match (dates.first(), dates.last()) {
            (Some(first), Some(last)) => format!("{} ~ {}", first, last),
            _ => "-".to_string(),
        };
        self.append(&format!("{} 开始执行, 检查区间 {}", at.format(TIME_FORMAT), window))
    }

    pub fn date_done(&self, result: &DateResult) -> Result<()> {
        let line = match &result.outcome {
            DateOutcome::Checked { missing, staged, .. } => {
                format!("{} 缺漏发票 {} 笔 (ACK {} 笔)", result.date, missing, staged)
            }
            DateOutcome::NoData => format!("{} 无 ACK 资料, 跳过", result.date),
            DateOutcome::Failed(reason) => format!("{} 处理失败: {}", result.date, reason),
        };
        self.append(&line)
    }

    pub fn finished(&self, at: NaiveDateTime, summary: &RunSummary) -> Result<()> {
        self.append(&format!("缺漏发票合计 {} 笔", summary.total_missing()))?;
        self.append(&format!("耗时 {:.3} 秒", summary.elapsed.as_secs_f64()))?;
        self.append(&format!("{} 执行结束", at.format(TIME_FORMAT)))
    }
}
