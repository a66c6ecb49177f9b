use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 交易端已开立发票 (IssuedInvoice)
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct IssuedInvoice {
    pub shop_code: String,
    pub full_record_id: String,
    pub invoice_number: String,
    pub issue_date: NaiveDate,
}

/// 有开立但未收到 ACK 的发票
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct MissingInvoiceRecord {
    pub shop_code: String,
    pub full_record_id: String,
    pub invoice_number: String,
}

impl From<&IssuedInvoice> for MissingInvoiceRecord {
    fn from(inv: &IssuedInvoice) -> Self {
        Self {
            shop_code: inv.shop_code.clone(),
            full_record_id: inv.full_record_id.clone(),
            invoice_number: inv.invoice_number.clone(),
        }
    }
}
