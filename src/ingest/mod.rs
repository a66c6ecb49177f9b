//! ACK 文件读取
//!
//! 目录结构: `<root>/<yyyyMMdd>/<批次>/*_ACK.txt`。
//! 文件名前缀决定版型 (`IG_` 开立, `VOID_` 作废)。

pub mod decoder;

use chrono::{NaiveDate, NaiveDateTime};
use encoding_rs::Encoding;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{CheckError, Result};
use crate::models::RecordType;

pub use decoder::{decode_line, decode_text, DecodedFile, LineDecoder};

/// ACK 文件名后缀
pub const ACK_FILE_SUFFIX: &str = "_ACK.txt";

/// ACK 版型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layout {
    /// IG: 开立确认
    Issued,
    /// VOID: 作废确认
    Void,
}

impl Layout {
    /// 类型标记 `IG` / `VOID`
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "IG" => Some(Layout::Issued),
            "VOID" => Some(Layout::Void),
            _ => None,
        }
    }

    /// 取文件名第一个 `_` 之前的前缀
    pub fn from_file_name(name: &str) -> Option<Self> {
        name.split('_').next().and_then(Self::from_tag)
    }

    pub fn record_type(&self) -> RecordType {
        match self {
            Layout::Issued => RecordType::Issued,
            Layout::Void => RecordType::Voided,
        }
    }

    pub fn decoder(&self) -> &'static dyn LineDecoder {
        match self {
            Layout::Issued => &decoder::IssuedLayoutDecoder,
            Layout::Void => &decoder::VoidLayoutDecoder,
        }
    }
}

/// 文件字符编码 (WHATWG 标签, 如 `utf-8`, `big5`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextEncoding(&'static Encoding);

impl Default for TextEncoding {
    fn default() -> Self {
        Self::utf8()
    }
}

impl TextEncoding {
    pub fn utf8() -> Self {
        TextEncoding(encoding_rs::UTF_8)
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Encoding::for_label_no_replacement(label.trim().as_bytes()).map(TextEncoding)
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// 去掉同编码的 BOM; 出现无法解码的字节视为整个文件失败
    fn decode(&self, bytes: &[u8]) -> io::Result<String> {
        let (text, had_errors) = self.0.decode_with_bom_removal(bytes);
        if had_errors {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid {} byte sequence", self.name()),
            ));
        }
        Ok(text.into_owned())
    }
}

/// 某日期目录
pub fn date_dir(root: &Path, date: NaiveDate) -> PathBuf {
    root.join(date.format("%Y%m%d").to_string())
}

/// 列出某日期下所有批次目录中的 ACK 文件
///
/// 日期目录不存在时返回 `Ok(None)`。批次目录与文件均按名称排序,
/// 这个顺序即暂存区覆盖的先后顺序。
pub fn list_ack_files(root: &Path, date: NaiveDate) -> Result<Option<Vec<PathBuf>>> {
    let dir = date_dir(root, date);
    if !dir.is_dir() {
        return Ok(None);
    }

    let mut batches = sorted_entries(&dir).map_err(|e| CheckError::ingest(&dir, e))?;
    batches.retain(|p| p.is_dir());

    let mut files = Vec::new();
    for batch in batches {
        let entries = match sorted_entries(&batch) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("批次目录无法读取, 跳过 {}: {}", batch.display(), e);
                continue;
            }
        };
        files.extend(entries.into_iter().filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(ACK_FILE_SUFFIX))
        }));
    }

    Ok(Some(files))
}

fn sorted_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    paths.sort();
    Ok(paths)
}

/// 读取并解析单个 ACK 文件
///
/// 无法识别版型的文件返回 `Ok(None)`; 读取或解码失败返回 `IngestFailure`。
pub fn read_ack_file(
    path: &Path,
    encoding: TextEncoding,
    captured_at: NaiveDateTime,
) -> Result<Option<DecodedFile>> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let Some(layout) = Layout::from_file_name(name) else {
        tracing::warn!("无法识别的 ACK 版型, 跳过 {}", path.display());
        return Ok(None);
    };

    let bytes = fs::read(path).map_err(|e| CheckError::ingest(path, e))?;
    let text = encoding
        .decode(&bytes)
        .map_err(|e| CheckError::ingest(path, e))?;

    let decoded = decode_text(layout, &text, captured_at);
    tracing::debug!(
        "{}: {:?} 版型, {} 笔记录, {} 行格式错误",
        path.display(),
        layout,
        decoded.records.len(),
        decoded.malformed
    );
    Ok(Some(decoded))
}
