use chrono::{DateTime, Utc};
use thiserror::Error;

use std::sync::Arc;

use crewflow_core::TenantId;
use crewflow_estimating::{Estimate, EstimateId};
use crewflow_invoicing::{Invoice, InvoiceId};
use crewflow_jobs::{Job, JobId};
use crewflow_leads::{Lead, LeadId};

/// Store operation error.
///
/// Infrastructure failures only; business failures (validation, conflicts)
/// never originate here.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store failed (lock poisoning, connection loss, ...).
    #[error("storage backend failure: {0}")]
    Backend(String),

    /// A fault injected through the in-memory store's fail point (tests).
    #[error("injected fault at {0}")]
    Injected(&'static str),
}

/// Transactional, tenant-scoped workflow store.
///
/// One [`WorkflowTx`] spans one unit of work: every read and write issued
/// through it sees a consistent snapshot, and nothing becomes visible to
/// other transactions until [`WorkflowTx::commit`] returns `Ok`. Dropping an
/// uncommitted transaction discards it; callers must treat a failed or
/// abandoned commit as "nothing happened".
///
/// ## Implementation requirements
///
/// - Tenant isolation on every operation: a load keyed by one tenant must
///   never observe another tenant's rows.
/// - Atomic commit: all writes in the transaction are persisted or none are.
/// - Same-entity write serialization (row locking or optimistic conflicts)
///   is the implementation's concern; the engine assumes last-committer-wins
///   or conflict detection underneath and adds no locking of its own.
pub trait WorkflowStore: Send + Sync {
    type Tx: WorkflowTx;

    /// Open a unit of work.
    fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// One open unit of work against the workflow store.
pub trait WorkflowTx {
    fn get_lead(&self, tenant_id: TenantId, id: LeadId) -> Result<Option<Lead>, StoreError>;

    /// Insert or update a lead (entity graphs are written whole).
    fn put_lead(&mut self, lead: Lead) -> Result<(), StoreError>;

    fn get_estimate(
        &self,
        tenant_id: TenantId,
        id: EstimateId,
    ) -> Result<Option<Estimate>, StoreError>;

    fn put_estimate(&mut self, estimate: Estimate) -> Result<(), StoreError>;

    fn get_job(&self, tenant_id: TenantId, id: JobId) -> Result<Option<Job>, StoreError>;

    fn put_job(&mut self, job: Job) -> Result<(), StoreError>;

    fn get_invoice(
        &self,
        tenant_id: TenantId,
        id: InvoiceId,
    ) -> Result<Option<Invoice>, StoreError>;

    fn put_invoice(&mut self, invoice: Invoice) -> Result<(), StoreError>;

    /// Issued invoices with a due date strictly before `cutoff`, for the
    /// overdue sweep. Tenant-scoped like everything else.
    fn issued_invoices_due_before(
        &self,
        tenant_id: TenantId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Invoice>, StoreError>;

    /// Atomically persist every write issued through this transaction.
    fn commit(self) -> Result<(), StoreError>;
}

impl<S> WorkflowStore for Arc<S>
where
    S: WorkflowStore + ?Sized,
{
    type Tx = S::Tx;

    fn begin(&self) -> Result<Self::Tx, StoreError> {
        (**self).begin()
    }
}
