pub mod acknowledgment;
pub mod invoice;

pub use acknowledgment::{InvoiceAcknowledgment, RecordType};
pub use invoice::{IssuedInvoice, MissingInvoiceRecord};
