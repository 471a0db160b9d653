//! Public operation surface, one module per entity.

pub mod estimates;
pub mod invoices;
pub mod jobs;
pub mod leads;
