use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// ACK 记录类型 (由文件名前缀 IG / VOID 决定)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    Issued,
    Voided,
}

impl RecordType {
    /// 写入暂存表的类型标记
    pub fn as_tag(&self) -> &'static str {
        match self {
            RecordType::Issued => "IG",
            RecordType::Voided => "VOID",
        }
    }
}

/// 加值中心回传的发票确认记录 (InvoiceAcknowledgment)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceAcknowledgment {
    pub shop_code: String,
    pub full_record_id: String,  // EcrHdKey
    pub invoice_number: String,
    pub invoice_date: Option<NaiveDate>,
    pub record_type: RecordType,
    pub captured_at: NaiveDateTime, // 解析时间, 由调用方传入
}
