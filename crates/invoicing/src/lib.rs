//! Invoicing: billing a job.
//!
//! An invoice is created in `Draft` against a job (normally derived from the
//! accepted estimate's line items), issued with a due date, and paid. Overdue
//! is both a derived read-time condition (`is_overdue`) and a persisted
//! status reached from `Issued` by the engine's sweep operation.

pub mod invoice;

pub use invoice::{Invoice, InvoiceId, InvoiceLineItem, InvoiceStatus};
