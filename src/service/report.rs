use chrono::NaiveDate;
use csv::{QuoteStyle, WriterBuilder};
use std::fs::{self, File};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{CheckError, Result};
use crate::models::MissingInvoiceRecord;

pub const REPORT_HEADER: [&str; 3] = ["ShopNo", "EcrHdKey", "InvoiceNumber"];

/// 报表文件名 `MissingInvoices_<yyyyMMdd>.csv`
pub fn report_file_name(date: NaiveDate) -> String {
    format!("MissingInvoices_{}.csv", date.format("%Y%m%d"))
}

/// 栏位内的逗号改为空白, 保持栏位对齐
fn clean(value: &str) -> String {
    value.replace(',', " ")
}

fn csv_to_io(e: csv::Error) -> std::io::Error {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => io,
        other => std::io::Error::new(ErrorKind::Other, format!("{:?}", other)),
    }
}

/// 导出缺漏清单, 便于人工检查
///
/// 清单为空时不产生文件, 并删除该日先前留下的清单, 返回 `Ok(None)`。
pub fn write_report(
    dir: &Path,
    date: NaiveDate,
    missing: &[MissingInvoiceRecord],
) -> Result<Option<PathBuf>> {
    let output_path = dir.join(report_file_name(date));

    if missing.is_empty() {
        match fs::remove_file(&output_path) {
            Ok(()) => tracing::info!("{} 已无缺漏, 删除旧清单 {}", date, output_path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(CheckError::report(&output_path, e)),
        }
        return Ok(None);
    }

    fs::create_dir_all(dir).map_err(|e| CheckError::report(dir, e))?;

    let file = File::create(&output_path).map_err(|e| CheckError::report(&output_path, e))?;
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .from_writer(file);

    let write_all = |writer: &mut csv::Writer<File>| -> std::result::Result<(), csv::Error> {
        writer.write_record(REPORT_HEADER)?;
        for rec in missing {
            writer.write_record([
                clean(&rec.shop_code),
                clean(&rec.full_record_id),
                clean(&rec.invoice_number),
            ])?;
        }
        Ok(())
    };

    write_all(&mut writer).map_err(|e| CheckError::report(&output_path, csv_to_io(e)))?;
    writer
        .flush()
        .map_err(|e| CheckError::report(&output_path, e))?;

    tracing::info!("缺漏清单已输出: {} ({} 笔)", output_path.display(), missing.len());
    Ok(Some(output_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn missing(shop: &str, key: &str, number: &str) -> MissingInvoiceRecord {
        MissingInvoiceRecord {
            shop_code: shop.to_string(),
            full_record_id: key.to_string(),
            invoice_number: number.to_string(),
        }
    }

    #[test]
    fn empty_set_writes_nothing() {
        let tmp = tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        assert!(write_report(tmp.path(), date, &[]).unwrap().is_none());
        assert!(!tmp.path().join(report_file_name(date)).exists());
    }

    #[test]
    fn empty_set_removes_previous_report() {
        let tmp = tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        let path = write_report(tmp.path(), date, &[missing("PUB", "KEY1", "INV1")])
            .unwrap()
            .unwrap();
        assert!(path.exists());

        assert!(write_report(tmp.path(), date, &[]).unwrap().is_none());
        assert!(!path.exists());
    }

    #[test]
    fn writes_header_and_rows_with_commas_replaced() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("reports");
        let date = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();

        let path = write_report(
            &dir,
            date,
            &[missing("PUB", "KEY1", "INV1"), missing("A,B", "KEY2", "INV\"2")],
        )
        .unwrap()
        .unwrap();

        assert_eq!(path.file_name().unwrap(), "MissingInvoices_20260107.csv");
        let body = fs::read_to_string(path).unwrap();
        assert_eq!(body, "ShopNo,EcrHdKey,InvoiceNumber\nPUB,KEY1,INV1\nA B,KEY2,INV\"2\n");
    }
}
