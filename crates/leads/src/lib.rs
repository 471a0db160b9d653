//! Lead intake and lifecycle.
//!
//! A lead is the entry point of the workflow: intake creates it as `New`,
//! the first estimate converts it, or it is marked lost. Leads are never
//! hard-deleted; removal is a soft-delete flag.

pub mod lead;

pub use lead::{ContactInfo, Lead, LeadId, LeadStatus};
