pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod models;
pub mod service;

pub use config::{AppConfig, DiffStrategy};
pub use db::{create_pool, InvoiceStore, MemoryStore, PgInvoiceStore};
pub use error::{CheckError, Result};
pub use ingest::{Layout, TextEncoding};
pub use models::{InvoiceAcknowledgment, IssuedInvoice, MissingInvoiceRecord, RecordType};
pub use service::{
    find_missing, write_report, CheckOptions, DateOutcome, DateResult, InvoiceChecker, RunLog,
    RunSummary, StagingAccumulator,
};
