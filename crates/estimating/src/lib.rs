//! Estimates: priced proposals against a lead.
//!
//! An estimate is created in `Draft` with an ordered line-item set and a
//! cached total computed by the shared billing calculator. Its lifecycle is
//! `Draft → Sent → Accepted` with `Sent → Rejected`; acceptance fans out into
//! a job and an invoice (orchestrated in the engine crate, not here).

pub mod estimate;

pub use estimate::{Estimate, EstimateId, EstimateLineItem, EstimateStatus};
