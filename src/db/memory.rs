use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use crate::db::InvoiceStore;
use crate::error::{CheckError, Result};
use crate::models::{InvoiceAcknowledgment, IssuedInvoice, MissingInvoiceRecord};
use crate::service::reconcile::find_missing;

#[derive(Debug, Default)]
struct MemoryState {
    issued: BTreeMap<NaiveDate, Vec<IssuedInvoice>>,
    staged: BTreeMap<NaiveDate, Vec<InvoiceAcknowledgment>>,
    failing: HashSet<NaiveDate>,
}

/// 内存版 InvoiceStore, 用于测试与演练
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 按开立日期归档
    pub fn with_issued(self, invoices: impl IntoIterator<Item = IssuedInvoice>) -> Self {
        for inv in invoices {
            self.add_issued(inv);
        }
        self
    }

    pub fn add_issued(&self, invoice: IssuedInvoice) {
        self.lock()
            .issued
            .entry(invoice.issue_date)
            .or_default()
            .push(invoice);
    }

    /// 该日期的所有操作都返回 PersistenceFailure
    pub fn fail_on(&self, date: NaiveDate) {
        self.lock().failing.insert(date);
    }

    /// 该日期当前的暂存记录
    pub fn staged(&self, date: NaiveDate) -> Vec<InvoiceAcknowledgment> {
        self.lock().staged.get(&date).cloned().unwrap_or_default()
    }

    fn check_available(state: &MemoryState, date: NaiveDate) -> Result<()> {
        if state.failing.contains(&date) {
            return Err(CheckError::PersistenceFailure(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl InvoiceStore for MemoryStore {
    async fn query_issued(&self, date: NaiveDate) -> Result<Vec<IssuedInvoice>> {
        let state = self.lock();
        Self::check_available(&state, date)?;
        Ok(state.issued.get(&date).cloned().unwrap_or_default())
    }

    async fn replace_staged(&self, date: NaiveDate, records: &[InvoiceAcknowledgment]) -> Result<u64> {
        let mut state = self.lock();
        Self::check_available(&state, date)?;
        state.staged.insert(date, records.to_vec());
        Ok(records.len() as u64)
    }

    async fn query_missing(&self, date: NaiveDate) -> Result<Vec<MissingInvoiceRecord>> {
        let state = self.lock();
        Self::check_available(&state, date)?;
        let issued = state.issued.get(&date).map(Vec::as_slice).unwrap_or_default();
        let staged = state.staged.get(&date).map(Vec::as_slice).unwrap_or_default();
        Ok(find_missing(issued, staged))
    }
}
