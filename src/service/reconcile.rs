use std::collections::HashSet;

use crate::models::{InvoiceAcknowledgment, IssuedInvoice, MissingInvoiceRecord};

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// 比对键: EcrHdKey 不分大小写
fn match_key(full_record_id: &str) -> String {
    full_record_id.to_lowercase()
}

/// 找出交易端有开立、但 ACK 中没有出现的发票
///
/// - 发票号码为空的视为尚未完成, 不列入
/// - EcrHdKey 为空的无法比对, 不列入
/// - 输出顺序与 `issued` 一致, `issued` 内重复的键各自独立处理
pub fn find_missing(
    issued: &[IssuedInvoice],
    acknowledged: &[InvoiceAcknowledgment],
) -> Vec<MissingInvoiceRecord> {
    let ack_keys: HashSet<String> = acknowledged
        .iter()
        .filter(|a| !is_blank(&a.full_record_id))
        .map(|a| match_key(&a.full_record_id))
        .collect();

    issued
        .iter()
        .filter(|inv| !is_blank(&inv.invoice_number) && !is_blank(&inv.full_record_id))
        .filter(|inv| !ack_keys.contains(&match_key(&inv.full_record_id)))
        .map(MissingInvoiceRecord::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordType;
    use chrono::NaiveDate;

    fn issued(key: &str, number: &str) -> IssuedInvoice {
        IssuedInvoice {
            shop_code: "PUB".to_string(),
            full_record_id: key.to_string(),
            invoice_number: number.to_string(),
            issue_date: NaiveDate::from_ymd_opt(2026, 1, 7).unwrap(),
        }
    }

    fn ack(key: &str) -> InvoiceAcknowledgment {
        InvoiceAcknowledgment {
            shop_code: "PUB".to_string(),
            full_record_id: key.to_string(),
            invoice_number: "X".to_string(),
            invoice_date: None,
            record_type: RecordType::Issued,
            captured_at: NaiveDate::from_ymd_opt(2026, 1, 9)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        }
    }

    fn keys(missing: &[MissingInvoiceRecord]) -> Vec<&str> {
        missing.iter().map(|m| m.full_record_id.as_str()).collect()
    }

    #[test]
    fn reports_unacknowledged_invoice() {
        let missing = find_missing(&[issued("KEY1", "INV1"), issued("KEY2", "INV2")], &[ack("KEY1")]);
        assert_eq!(
            missing,
            vec![MissingInvoiceRecord {
                shop_code: "PUB".to_string(),
                full_record_id: "KEY2".to_string(),
                invoice_number: "INV2".to_string(),
            }]
        );
    }

    #[test]
    fn empty_issued_is_empty() {
        assert!(find_missing(&[], &[ack("KEY1")]).is_empty());
    }

    #[test]
    fn no_acks_reports_every_numbered_invoice() {
        let all = vec![issued("KEY1", "INV1"), issued("KEY2", ""), issued("KEY3", "INV3")];
        let missing = find_missing(&all, &[]);
        assert_eq!(keys(&missing), vec!["KEY1", "KEY3"]);
    }

    #[test]
    fn full_coverage_is_empty() {
        let all = vec![issued("KEY1", "INV1"), issued("KEY2", "INV2")];
        assert!(find_missing(&all, &[ack("KEY2"), ack("KEY1")]).is_empty());
    }

    #[test]
    fn key_comparison_ignores_case() {
        let all = vec![issued("pub0220260100001185", "INV1")];
        assert!(find_missing(&all, &[ack("PUB0220260100001185")]).is_empty());
    }

    #[test]
    fn duplicates_in_issued_are_kept() {
        let all = vec![issued("KEY1", "INV1"), issued("KEY1", "INV1b")];
        let missing = find_missing(&all, &[]);
        assert_eq!(missing.len(), 2);
        assert_eq!(missing[1].invoice_number, "INV1b");
    }

    #[test]
    fn blank_keys_never_match_or_report() {
        let all = vec![issued("  ", "INV1"), issued("KEY2", "INV2")];
        let missing = find_missing(&all, &[ack("")]);
        assert_eq!(keys(&missing), vec!["KEY2"]);
    }

    #[test]
    fn membership_ignores_input_order() {
        let a = vec![issued("K1", "I1"), issued("K2", "I2"), issued("K3", "I3"), issued("K4", "I4")];
        let acks = vec![ack("K3"), ack("K1")];

        let mut rev_a = a.clone();
        rev_a.reverse();
        let mut rev_acks = acks.clone();
        rev_acks.reverse();

        let forward_missing = find_missing(&a, &acks);
        let backward_missing = find_missing(&rev_a, &rev_acks);
        let mut forward = keys(&forward_missing);
        let mut backward = keys(&backward_missing);
        forward.sort();
        backward.sort();
        assert_eq!(forward, backward);
        assert_eq!(forward, vec!["K2", "K4"]);
    }
}
