use crate::models::{InvoiceAcknowledgment, IssuedInvoice, MissingInvoiceRecord};
use chrono::NaiveDate;
use sqlx::PgPool;
use std::time::{Duration, Instant};

/// 每条 INSERT 的最大行数
const INSERT_CHUNK: usize = 1000;

/// 暂存写入超时
const STAGING_TIMEOUT: Duration = Duration::from_secs(30);

/// 查询交易端某日开立的发票 (限定门店群组)
pub async fn query_issued(
    pool: &PgPool,
    date: NaiveDate,
    shop_group: &str,
) -> Result<Vec<IssuedInvoice>, sqlx::Error> {
    sqlx::query_as::<_, IssuedInvoice>(
        r#"
        SELECT tk.shop_no AS shop_code,
               COALESCE(tk.ecr_hd_key, '') AS full_record_id,
               COALESCE(tk.htk_no, '') AS invoice_number,
               tk.htk_date AS issue_date
        FROM ecr_tk_hs tk
        INNER JOIN shop s ON tk.shop_no = s.shop_no AND s.sp_gp_no = $2
        WHERE tk.htk_date = $1
        "#
    )
    .bind(date)
    .bind(shop_group)
    .fetch_all(pool)
    .await
}

/// 交易端有开立、但暂存区 (ACK 导入) 没有覆盖的发票
pub async fn query_missing(
    pool: &PgPool,
    date: NaiveDate,
    shop_group: &str,
) -> Result<Vec<MissingInvoiceRecord>, sqlx::Error> {
    sqlx::query_as::<_, MissingInvoiceRecord>(
        r#"
        SELECT tk.shop_no AS shop_code,
               tk.ecr_hd_key AS full_record_id,
               tk.htk_no AS invoice_number
        FROM ecr_tk_hs tk
        INNER JOIN shop s ON tk.shop_no = s.shop_no AND s.sp_gp_no = $2
        WHERE tk.htk_date = $1
          AND COALESCE(TRIM(tk.htk_no), '') <> ''
          AND COALESCE(TRIM(tk.ecr_hd_key), '') <> ''
          AND NOT EXISTS (
              SELECT 1
              FROM trade_van_invoice t
              WHERE t.window_date = $1
                AND LOWER(t.ecr_hd_key) = LOWER(tk.ecr_hd_key)
          )
        "#
    )
    .bind(date)
    .bind(shop_group)
    .fetch_all(pool)
    .await
}

/// 空白字串写入 NULL
fn non_blank(s: &str) -> Option<&str> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

/// 重写某日暂存区: 同一交易内先删后插, 中途失败整批回滚
pub async fn replace_staged(
    pool: &PgPool,
    window_date: NaiveDate,
    records: &[InvoiceAcknowledgment],
) -> Result<u64, sqlx::Error> {
    tracing::debug!("开始重写暂存区 {}, {} 条记录", window_date, records.len());
    let start_time = Instant::now();

    let work = async {
        let mut tx = pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM trade_van_invoice WHERE window_date = $1")
            .bind(window_date)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let mut inserted = 0u64;
        for chunk in records.chunks(INSERT_CHUNK) {
            let mut query_builder = sqlx::QueryBuilder::<sqlx::Postgres>::new(
                "INSERT INTO trade_van_invoice (
                    window_date, invoice_type, shop_no, ecr_hd_key,
                    invoice_date, invoice_number, process_date_time
                ) "
            );

            query_builder.push_values(chunk, |mut b, rec| {
                b.push_bind(window_date)
                    .push_bind(rec.record_type.as_tag())
                    .push_bind(non_blank(&rec.shop_code))
                    .push_bind(non_blank(&rec.full_record_id))
                    .push_bind(rec.invoice_date)
                    .push_bind(non_blank(&rec.invoice_number))
                    .push_bind(rec.captured_at);
            });

            inserted += query_builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;
        Ok::<_, sqlx::Error>((deleted, inserted))
    };

    // 超时后 future 被丢弃, 交易随之回滚
    match tokio::time::timeout(STAGING_TIMEOUT, work).await {
        Ok(Ok((deleted, inserted))) => {
            tracing::info!(
                "✓ 暂存区 {} 重写完成, 删除 {} 行, 写入 {} 行, 耗时: {:?}",
                window_date, deleted, inserted, start_time.elapsed()
            );
            Ok(inserted)
        }
        Ok(Err(e)) => {
            tracing::error!("✗ 暂存区 {} 重写失败, 耗时: {:?}, 错误: {:?}", window_date, start_time.elapsed(), e);
            Err(e)
        }
        Err(_) => {
            tracing::error!("✗ 暂存区 {} 重写超时 (>{:?})!", window_date, STAGING_TIMEOUT);
            Err(sqlx::Error::PoolTimedOut)
        }
    }
}
