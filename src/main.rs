use chrono::{Local, NaiveDate};
use clap::Parser;
use invoice_ack_check::{
    create_pool, AppConfig, CheckOptions, InvoiceChecker, PgInvoiceStore, RunLog,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "invoice-ack-check")]
#[command(about = "比对交易端开立发票与加值中心 ACK, 输出缺漏清单", long_about = None)]
struct Cli {
    /// 配置文件 (默认读取 ./invoice-check.toml, 可不存在)
    #[arg(long)]
    config: Option<PathBuf>,

    /// 只检查指定日期 (yyyyMMdd)
    #[arg(long, value_parser = parse_date)]
    date: Option<NaiveDate>,

    /// 覆盖 check.lookback_days
    #[arg(long)]
    lookback_days: Option<i64>,

    /// 结束时以 JSON 输出结果摘要
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y%m%d").map_err(|e| format!("expected yyyyMMdd: {}", e))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 本地时间格式日志, RUST_LOG 可调整级别
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    // 加载配置
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(days) = cli.lookback_days {
        config.check.lookback_days = days;
        config = config.validate()?;
    }
    info!(
        "Starting check: root={}, lookback={} days, shop_group={}, strategy={:?}",
        config.input.root_dir.display(),
        config.check.lookback_days,
        config.check.shop_group,
        config.check.strategy
    );

    // 创建数据库连接池
    let pool = create_pool(&config.database).await?;
    info!("Database pool created");

    let started_at = Local::now().naive_local();
    let store = PgInvoiceStore::new(pool, config.check.shop_group.clone());
    let checker = InvoiceChecker::new(store, CheckOptions::from_config(&config)?)
        .with_run_log(RunLog::for_day(&config.output.log_dir, started_at.date()));

    let summary = match cli.date {
        Some(date) => checker.run_dates(&[date], started_at).await,
        None => checker.run(started_at.date(), started_at).await,
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }

    if summary.has_failures() {
        return Err(format!(
            "{} date(s) failed, see log",
            summary
                .dates
                .iter()
                .filter(|d| matches!(d.outcome, invoice_ack_check::DateOutcome::Failed(_)))
                .count()
        )
        .into());
    }

    Ok(())
}
