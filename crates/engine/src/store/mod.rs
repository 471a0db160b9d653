//! Transactional persistence contract.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{FailPoint, InMemoryWorkflowStore};
pub use r#trait::{StoreError, WorkflowStore, WorkflowTx};
