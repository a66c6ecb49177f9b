use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{CheckError, Result};
use crate::ingest::Layout;
use crate::models::InvoiceAcknowledgment;

/// ACK 栏位分隔符
pub const FIELD_SEPARATOR: char = '^';

/// 门店段缺失时的占位
const UNKNOWN_SHOP: &str = "N/A";

/// 单行按版型取出的具名栏位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckFields<'a> {
    /// 形如 `60499576_PUB_20260103...` 的组合栏位
    pub packed: &'a str,
    pub full_record_id: &'a str,
    pub invoice_number: &'a str,
    pub invoice_date: Option<NaiveDate>,
}

/// 版型解码器: 栏位位置只出现在各自实现里
pub trait LineDecoder: Sync {
    fn min_fields(&self) -> usize;

    /// `columns.len() >= self.min_fields()` 由调用方保证
    fn fields<'a>(&self, columns: &[&'a str]) -> AckFields<'a>;
}

/// IG (开立) 版型
/// `[3]` 组合栏位 (门店 + 日期), `[4]` EcrHdKey, `[6]` 发票号码
pub struct IssuedLayoutDecoder;

impl IssuedLayoutDecoder {
    const PACKED: usize = 3;
    const FULL_RECORD_ID: usize = 4;
    const INVOICE_NUMBER: usize = 6;
}

impl LineDecoder for IssuedLayoutDecoder {
    fn min_fields(&self) -> usize {
        Self::INVOICE_NUMBER + 1
    }

    fn fields<'a>(&self, columns: &[&'a str]) -> AckFields<'a> {
        let packed = columns[Self::PACKED];
        // 第三段前 8 码为 yyyyMMdd
        let invoice_date = packed.split('_').nth(2).and_then(|seg| {
            let head: String = seg.chars().take(8).collect();
            parse_compact_date(&head)
        });

        AckFields {
            packed,
            full_record_id: columns[Self::FULL_RECORD_ID],
            invoice_number: columns[Self::INVOICE_NUMBER],
            invoice_date,
        }
    }
}

/// VOID (作废) 版型
/// `[4]` 组合栏位, `[5]` EcrHdKey, `[6]` 发票日期 yyyyMMdd, `[7]` 发票号码
pub struct VoidLayoutDecoder;

impl VoidLayoutDecoder {
    const PACKED: usize = 4;
    const FULL_RECORD_ID: usize = 5;
    const INVOICE_DATE: usize = 6;
    const INVOICE_NUMBER: usize = 7;
}

impl LineDecoder for VoidLayoutDecoder {
    fn min_fields(&self) -> usize {
        Self::INVOICE_NUMBER + 1
    }

    fn fields<'a>(&self, columns: &[&'a str]) -> AckFields<'a> {
        AckFields {
            packed: columns[Self::PACKED],
            full_record_id: columns[Self::FULL_RECORD_ID],
            invoice_number: columns[Self::INVOICE_NUMBER],
            invoice_date: parse_compact_date(columns[Self::INVOICE_DATE].trim()),
        }
    }
}

/// 严格解析 8 位 yyyyMMdd, 失败返回 None (不视为错误)
pub fn parse_compact_date(s: &str) -> Option<NaiveDate> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y%m%d").ok()
}

/// 组合栏位第二段为门店代码
fn shop_code_of(packed: &str) -> &str {
    packed.split('_').nth(1).unwrap_or(UNKNOWN_SHOP)
}

/// 解析单行
///
/// 空行返回 `Ok(None)`; 栏位数不足返回 `MalformedRecord`。
pub fn decode_line(
    layout: Layout,
    line: &str,
    captured_at: NaiveDateTime,
) -> Result<Option<InvoiceAcknowledgment>> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let decoder = layout.decoder();
    let columns: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
    if columns.len() < decoder.min_fields() {
        return Err(CheckError::MalformedRecord {
            layout,
            found: columns.len(),
            required: decoder.min_fields(),
        });
    }

    let fields = decoder.fields(&columns);
    Ok(Some(InvoiceAcknowledgment {
        shop_code: shop_code_of(fields.packed).to_string(),
        full_record_id: fields.full_record_id.to_string(),
        invoice_number: fields.invoice_number.to_string(),
        invoice_date: fields.invoice_date,
        record_type: layout.record_type(),
        captured_at,
    }))
}

/// 整个文件的解析结果
#[derive(Debug, Default, Clone)]
pub struct DecodedFile {
    pub records: Vec<InvoiceAcknowledgment>,
    pub malformed: usize,
}

/// 逐行解析文件内容, 坏行计数后跳过, 不中断整个文件
pub fn decode_text(layout: Layout, text: &str, captured_at: NaiveDateTime) -> DecodedFile {
    let mut out = DecodedFile::default();

    for (idx, line) in text.lines().enumerate() {
        match decode_line(layout, line, captured_at) {
            Ok(Some(rec)) => out.records.push(rec),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("line {} skipped: {}", idx + 1, e);
                out.malformed += 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordType;

    fn captured() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 9)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap()
    }

    #[test]
    fn void_line_decodes_named_fields() {
        let line = "00001^Y^^R^60499576_PUB_20260107_PUB0220260100001185^PUB0220260100001185^20260107^XL84792751";
        let rec = decode_line(Layout::Void, line, captured()).unwrap().unwrap();

        assert_eq!(rec.shop_code, "PUB");
        assert_eq!(rec.full_record_id, "PUB0220260100001185");
        assert_eq!(rec.invoice_date, NaiveDate::from_ymd_opt(2026, 1, 7));
        assert_eq!(rec.invoice_number, "XL84792751");
        assert_eq!(rec.record_type, RecordType::Voided);
        assert_eq!(rec.captured_at, captured());
    }

    #[test]
    fn void_line_with_trailing_empty_fields() {
        let line = "00001^Y^^R^60499576_PUB_20260107_PUB0220260100001185^PUB0220260100001185^20260107^XL84792751^^^^^^";
        let rec = decode_line(Layout::Void, line, captured()).unwrap().unwrap();
        assert_eq!(rec.invoice_number, "XL84792751");
    }

    #[test]
    fn issued_line_takes_shop_and_date_from_packed_field() {
        let line = "00001^Y^^60499576_PUB_20260103123000^PUB0220260100000256^X^XL84791838";
        let rec = decode_line(Layout::Issued, line, captured()).unwrap().unwrap();

        assert_eq!(rec.shop_code, "PUB");
        assert_eq!(rec.full_record_id, "PUB0220260100000256");
        assert_eq!(rec.invoice_number, "XL84791838");
        assert_eq!(rec.invoice_date, NaiveDate::from_ymd_opt(2026, 1, 3));
        assert_eq!(rec.record_type, RecordType::Issued);
    }

    #[test]
    fn issued_line_is_deterministic() {
        let line = "a^b^c^60499576_PUB_20260103^KEY^f^INV";
        let first = decode_line(Layout::Issued, line, captured()).unwrap();
        let second = decode_line(Layout::Issued, line, captured()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn bad_date_fragment_leaves_date_empty() {
        let line = "a^b^c^60499576_PUB_2026XX03^KEY^f^INV";
        let rec = decode_line(Layout::Issued, line, captured()).unwrap().unwrap();
        assert_eq!(rec.invoice_date, None);
        assert_eq!(rec.full_record_id, "KEY");

        let line = "a^b^c^60499576_PUB^KEY^f^INV";
        let rec = decode_line(Layout::Issued, line, captured()).unwrap().unwrap();
        assert_eq!(rec.invoice_date, None);

        let line = "0^Y^^R^x_PUB_y^KEY^2026-01-07^INV";
        let rec = decode_line(Layout::Void, line, captured()).unwrap().unwrap();
        assert_eq!(rec.invoice_date, None);
    }

    #[test]
    fn missing_shop_segment_is_placeholder() {
        let line = "a^b^c^60499576^KEY^f^INV";
        let rec = decode_line(Layout::Issued, line, captured()).unwrap().unwrap();
        assert_eq!(rec.shop_code, "N/A");
    }

    #[test]
    fn blank_line_is_skipped() {
        assert!(decode_line(Layout::Issued, "", captured()).unwrap().is_none());
        assert!(decode_line(Layout::Void, "   \t", captured()).unwrap().is_none());
    }

    #[test]
    fn short_line_is_malformed() {
        let err = decode_line(Layout::Issued, "a^b^c^d^e^f", captured()).unwrap_err();
        assert!(matches!(
            err,
            CheckError::MalformedRecord { found: 6, required: 7, .. }
        ));

        let err = decode_line(Layout::Void, "a^b^c^d^e^f^g", captured()).unwrap_err();
        assert!(matches!(
            err,
            CheckError::MalformedRecord { found: 7, required: 8, .. }
        ));
    }

    #[test]
    fn decode_text_skips_bad_lines_and_keeps_the_rest() {
        let text = "\
a^b^c^60499576_PUB_20260103^KEY1^f^INV1

too^short
a^b^c^60499576_ABC_20260103^KEY2^f^INV2
";
        let decoded = decode_text(Layout::Issued, text, captured());
        assert_eq!(decoded.malformed, 1);
        let keys: Vec<_> = decoded.records.iter().map(|r| r.full_record_id.as_str()).collect();
        assert_eq!(keys, vec!["KEY1", "KEY2"]);
        assert_eq!(decoded.records[1].shop_code, "ABC");
    }

    #[test]
    fn compact_date_rejects_non_digits_and_bad_length() {
        assert_eq!(parse_compact_date("20260107"), NaiveDate::from_ymd_opt(2026, 1, 7));
        assert_eq!(parse_compact_date("20261307"), None);
        assert_eq!(parse_compact_date("2026017"), None);
        assert_eq!(parse_compact_date("+2026017"), None);
        assert_eq!(parse_compact_date(""), None);
    }
}
