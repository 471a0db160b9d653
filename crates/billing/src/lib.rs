//! Line-item and tax arithmetic shared by estimates and invoices.
//!
//! Estimates and invoices own physically distinct line-item collections, but
//! both bill the same way. The calculator here is the single implementation,
//! parameterized over the [`BillableLine`] capability, so the two aggregate
//! types can never drift apart on penny-level results.

pub mod line_item;
pub mod totals;

pub use line_item::{BillableLine, LineSpec, normalized_quantity_price, validate_line_specs};
pub use totals::{Totals, round_money, totals};
