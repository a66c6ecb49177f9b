use chrono::{Days, Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::config::{AppConfig, DiffStrategy, MAX_LOOKBACK_DAYS};
use crate::db::InvoiceStore;
use crate::error::{CheckError, Result};
use crate::ingest::{self, TextEncoding};
use crate::service::reconcile::find_missing;
use crate::service::report::write_report;
use crate::service::run_log::RunLog;
use crate::service::staging::StagingAccumulator;

/// 对账参数
#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub input_root: PathBuf,
    pub report_dir: PathBuf,
    pub lookback_days: i64,
    pub encoding: TextEncoding,
    pub strategy: DiffStrategy,
}

impl CheckOptions {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            input_root: config.input.root_dir.clone(),
            report_dir: config.output.report_dir.clone(),
            lookback_days: config.check.lookback_days.clamp(1, MAX_LOOKBACK_DAYS),
            encoding: config.encoding()?,
            strategy: config.check.strategy,
        })
    }
}

/// 单日处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DateOutcome {
    Checked {
        missing: usize,
        staged: usize,
        report: Option<PathBuf>,
    },
    /// 日期目录不存在或没有可识别的 ACK 文件
    NoData,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateResult {
    pub date: NaiveDate,
    pub outcome: DateOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub dates: Vec<DateResult>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn total_missing(&self) -> usize {
        self.dates
            .iter()
            .map(|d| match d.outcome {
                DateOutcome::Checked { missing, .. } => missing,
                _ => 0,
            })
            .sum()
    }

    pub fn has_failures(&self) -> bool {
        self.dates
            .iter()
            .any(|d| matches!(d.outcome, DateOutcome::Failed(_)))
    }
}

/// 单日 ACK 读取统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestStats {
    pub files_read: usize,
    pub files_skipped: usize,
    /// 读取或解码失败的文件数
    pub files_unreadable: usize,
    pub malformed_lines: usize,
}

/// 对账服务: 逐日 读取 ACK -> 暂存 -> 比对 -> 输出缺漏清单
pub struct InvoiceChecker<S> {
    store: S,
    options: CheckOptions,
    run_log: Option<RunLog>,
}

impl<S: InvoiceStore> InvoiceChecker<S> {
    pub fn new(store: S, options: CheckOptions) -> Self {
        Self {
            store,
            options,
            run_log: None,
        }
    }

    pub fn with_run_log(mut self, run_log: RunLog) -> Self {
        self.run_log = Some(run_log);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 回溯区间, 由旧到新: today-N .. today-1, N 限制在 1..=MAX_LOOKBACK_DAYS
    pub fn window(&self, today: NaiveDate) -> Vec<NaiveDate> {
        let days = self.options.lookback_days.clamp(1, MAX_LOOKBACK_DAYS) as u64;
        (1..=days)
            .rev()
            .filter_map(|back| today.checked_sub_days(Days::new(back)))
            .collect()
    }

    /// 检查 `today` 之前的回溯区间
    pub async fn run(&self, today: NaiveDate, started_at: NaiveDateTime) -> RunSummary {
        let dates = self.window(today);
        self.run_dates(&dates, started_at).await
    }

    /// 逐日顺序处理; 某日持久化失败只中止该日, 其余日期照常处理
    pub async fn run_dates(&self, dates: &[NaiveDate], started_at: NaiveDateTime) -> RunSummary {
        let start = Instant::now();
        self.log_line(|log| log.started(started_at, dates));

        let mut results = Vec::with_capacity(dates.len());
        for &date in dates {
            let outcome = match self.check_date(date, started_at).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("{} 处理失败: {}", date, e);
                    DateOutcome::Failed(e.to_string())
                }
            };
            let result = DateResult { date, outcome };
            self.log_line(|log| log.date_done(&result));
            results.push(result);
        }

        let summary = RunSummary {
            dates: results,
            elapsed: start.elapsed(),
        };
        let finished_at = started_at
            + ChronoDuration::from_std(summary.elapsed).unwrap_or_else(|_| ChronoDuration::zero());
        self.log_line(|log| log.finished(finished_at, &summary));

        tracing::info!(
            "检查完成: {} 天, 缺漏合计 {} 笔, 耗时 {:?}",
            summary.dates.len(),
            summary.total_missing(),
            summary.elapsed
        );
        summary
    }

    /// 处理单一日期
    pub async fn check_date(&self, date: NaiveDate, captured_at: NaiveDateTime) -> Result<DateOutcome> {
        let Some((staging, stats)) = self.gather(date, captured_at)? else {
            tracing::info!("{} 无 ACK 资料, 跳过", date);
            return Ok(DateOutcome::NoData);
        };

        // 有文件但全部无法读取, 不能当作没有资料
        if stats.files_read == 0 {
            tracing::error!("{}: {} 个 ACK 文件全部无法读取", date, stats.files_unreadable);
            return Ok(DateOutcome::Failed(format!(
                "all {} ACK file(s) unreadable",
                stats.files_unreadable
            )));
        }

        tracing::info!(
            "{}: 读取 {} 个文件 (跳过 {}, 无法读取 {}), 格式错误 {} 行, 暂存 {} 笔",
            date,
            stats.files_read,
            stats.files_skipped,
            stats.files_unreadable,
            stats.malformed_lines,
            staging.len()
        );

        let staged = staging.into_records();
        self.store.replace_staged(date, &staged).await?;

        let missing = match self.options.strategy {
            DiffStrategy::Memory => {
                let issued = self.store.query_issued(date).await?;
                tracing::debug!("{}: 交易端开立 {} 笔", date, issued.len());
                find_missing(&issued, &staged)
            }
            DiffStrategy::Store => self.store.query_missing(date).await?,
        };

        let report = write_report(&self.options.report_dir, date, &missing)?;
        tracing::info!("{}: 缺漏发票 {} 笔", date, missing.len());

        Ok(DateOutcome::Checked {
            missing: missing.len(),
            staged: staged.len(),
            report,
        })
    }

    /// 收集某日所有 ACK 文件
    ///
    /// 日期目录不存在、或没有可识别的 ACK 文件时返回 None;
    /// 有文件但全部读取失败时返回 `files_read == 0` 的统计。
    fn gather(
        &self,
        date: NaiveDate,
        captured_at: NaiveDateTime,
    ) -> Result<Option<(StagingAccumulator, IngestStats)>> {
        let Some(files) = ingest::list_ack_files(&self.options.input_root, date)? else {
            return Ok(None);
        };

        let mut staging = StagingAccumulator::new();
        let mut stats = IngestStats::default();

        for path in &files {
            match ingest::read_ack_file(path, self.options.encoding, captured_at) {
                Ok(Some(decoded)) => {
                    stats.files_read += 1;
                    stats.malformed_lines += decoded.malformed;
                    staging.merge(decoded.records);
                }
                Ok(None) => stats.files_skipped += 1,
                Err(e @ CheckError::IngestFailure { .. }) => {
                    tracing::warn!("跳过文件: {}", e);
                    stats.files_unreadable += 1;
                }
                Err(e) => return Err(e),
            }
        }

        if stats.files_read == 0 && stats.files_unreadable == 0 {
            return Ok(None);
        }
        Ok(Some((staging, stats)))
    }

    fn log_line<F>(&self, write: F)
    where
        F: FnOnce(&RunLog) -> Result<()>,
    {
        if let Some(log) = &self.run_log {
            if let Err(e) = write(log) {
                tracing::warn!("运行日志写入失败: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn options(lookback_days: i64) -> CheckOptions {
        CheckOptions {
            input_root: PathBuf::from("unused"),
            report_dir: PathBuf::from("unused"),
            lookback_days,
            encoding: TextEncoding::utf8(),
            strategy: DiffStrategy::Memory,
        }
    }

    #[test]
    fn window_is_oldest_first_and_excludes_today() {
        let checker = InvoiceChecker::new(MemoryStore::new(), options(3));
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(
            checker.window(today),
            vec![
                NaiveDate::from_ymd_opt(2026, 2, 26).unwrap(),
                NaiveDate::from_ymd_opt(2026, 2, 27).unwrap(),
                NaiveDate::from_ymd_opt(2026, 2, 28).unwrap(),
            ]
        );
    }

    #[test]
    fn non_positive_lookback_checks_yesterday() {
        let checker = InvoiceChecker::new(MemoryStore::new(), options(0));
        let today = NaiveDate::from_ymd_opt(2026, 1, 9).unwrap();
        assert_eq!(checker.window(today), vec![NaiveDate::from_ymd_opt(2026, 1, 8).unwrap()]);
    }

    #[test]
    fn oversized_lookback_is_capped() {
        let checker = InvoiceChecker::new(MemoryStore::new(), options(200_000_000_000_000));
        let today = NaiveDate::from_ymd_opt(2026, 1, 10).unwrap();
        let window = checker.window(today);
        assert_eq!(window.len(), MAX_LOOKBACK_DAYS as usize);
        assert_eq!(window.last(), NaiveDate::from_ymd_opt(2026, 1, 9).as_ref());
    }

    #[test]
    fn summary_totals_only_checked_dates() {
        let d = NaiveDate::from_ymd_opt(2026, 1, 8).unwrap();
        let summary = RunSummary {
            dates: vec![
                DateResult { date: d, outcome: DateOutcome::Checked { missing: 2, staged: 5, report: None } },
                DateResult { date: d, outcome: DateOutcome::NoData },
                DateResult { date: d, outcome: DateOutcome::Failed("x".to_string()) },
                DateResult { date: d, outcome: DateOutcome::Checked { missing: 1, staged: 1, report: None } },
            ],
            elapsed: Duration::ZERO,
        };
        assert_eq!(summary.total_missing(), 3);
        assert!(summary.has_failures());
    }
}
