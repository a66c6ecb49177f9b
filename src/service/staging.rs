use indexmap::IndexMap;

use crate::models::InvoiceAcknowledgment;

/// 暂存区累加器: 一个处理窗口内的 ACK 记录, 按 EcrHdKey 覆盖 (后写覆盖先写)
#[derive(Debug, Default, Clone)]
pub struct StagingAccumulator {
    records: IndexMap<String, InvoiceAcknowledgment>,
}

impl StagingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并一批记录, 相同 EcrHdKey 以本批为准
    pub fn merge<I>(&mut self, incoming: I)
    where
        I: IntoIterator<Item = InvoiceAcknowledgment>,
    {
        for rec in incoming {
            self.records.insert(rec.full_record_id.clone(), rec);
        }
    }

    /// 清空, 开始新窗口
    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, full_record_id: &str) -> Option<&InvoiceAcknowledgment> {
        self.records.get(full_record_id)
    }

    pub fn records(&self) -> impl Iterator<Item = &InvoiceAcknowledgment> {
        self.records.values()
    }

    pub fn into_records(self) -> Vec<InvoiceAcknowledgment> {
        self.records.into_values().collect()
    }
}

/// 合并两批记录
pub fn merge(
    existing: Vec<InvoiceAcknowledgment>,
    incoming: Vec<InvoiceAcknowledgment>,
) -> Vec<InvoiceAcknowledgment> {
    let mut acc = StagingAccumulator::new();
    acc.merge(existing);
    acc.merge(incoming);
    acc.into_records()
}
