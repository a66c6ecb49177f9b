use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;

use crate::db::queries;
use crate::error::Result;
use crate::models::{InvoiceAcknowledgment, IssuedInvoice, MissingInvoiceRecord};

/// 对账需要的三个持久化操作
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// 交易端某日开立的发票, 保持查询原始顺序
    async fn query_issued(&self, date: NaiveDate) -> Result<Vec<IssuedInvoice>>;

    /// 在同一交易内删除该日暂存记录并写入新记录, 返回写入笔数
    async fn replace_staged(&self, date: NaiveDate, records: &[InvoiceAcknowledgment]) -> Result<u64>;

    /// 交易端有开立但暂存区没有的发票
    async fn query_missing(&self, date: NaiveDate) -> Result<Vec<MissingInvoiceRecord>>;
}

/// Postgres 实现
pub struct PgInvoiceStore {
    pool: PgPool,
    shop_group: String,
}

impl PgInvoiceStore {
    pub fn new(pool: PgPool, shop_group: impl Into<String>) -> Self {
        Self {
            pool,
            shop_group: shop_group.into(),
        }
    }
}

#[async_trait]
impl InvoiceStore for PgInvoiceStore {
    async fn query_issued(&self, date: NaiveDate) -> Result<Vec<IssuedInvoice>> {
        Ok(queries::query_issued(&self.pool, date, &self.shop_group).await?)
    }

    async fn replace_staged(&self, date: NaiveDate, records: &[InvoiceAcknowledgment]) -> Result<u64> {
        Ok(queries::replace_staged(&self.pool, date, records).await?)
    }

    async fn query_missing(&self, date: NaiveDate) -> Result<Vec<MissingInvoiceRecord>> {
        Ok(queries::query_missing(&self.pool, date, &self.shop_group).await?)
    }
}
