pub mod checker;
pub mod reconcile;
pub mod report;
pub mod run_log;
pub mod staging;

pub use checker::{CheckOptions, DateOutcome, DateResult, InvoiceChecker, IngestStats, RunSummary};
pub use reconcile::find_missing;
pub use report::write_report;
pub use run_log::RunLog;
pub use staging::StagingAccumulator;
