//! The workflow service: store + bus composition.
//!
//! `WorkflowEngine` is the single entry point for callers. Every operation
//! follows the same shape, in the same order:
//!
//! 1. open a transaction
//! 2. load tenant-scoped entities, mutate them through their own methods
//! 3. check the cancellation token
//! 4. commit
//! 5. publish transition events (post-commit only)
//!
//! A failure anywhere in steps 1-4 means nothing happened. A publish failure in 5
//! is logged and swallowed: observers get at-most-once delivery and the
//! committed business change stands.

use tracing::warn;

use crewflow_events::{TransitionBus, TransitionEvent};

use crate::error::{EngineError, EngineResult};
use crate::store::{WorkflowStore, WorkflowTx};

use crewflow_estimating::{Estimate, EstimateId};
use crewflow_invoicing::{Invoice, InvoiceId};
use crewflow_jobs::{Job, JobId};
use crewflow_leads::{Lead, LeadId};

use crewflow_core::TenantId;

/// Workflow operations over a transactional store and a transition bus.
#[derive(Debug)]
pub struct WorkflowEngine<S, B> {
    pub(crate) store: S,
    pub(crate) bus: B,
}

impl<S, B> WorkflowEngine<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn into_parts(self) -> (S, B) {
        (self.store, self.bus)
    }
}

impl<S, B> WorkflowEngine<S, B>
where
    S: WorkflowStore,
    B: TransitionBus<TransitionEvent>,
{
    pub(crate) fn begin(&self) -> EngineResult<S::Tx> {
        Ok(self.store.begin()?)
    }

    /// Publish a committed transition. Failures never affect business state.
    pub(crate) fn emit(&self, event: TransitionEvent) {
        if let Err(err) = self.bus.publish(event) {
            warn!(error = ?err, "transition event publication failed");
        }
    }
}

/// Load a lead, treating soft-deleted rows as absent.
pub(crate) fn require_lead<T: WorkflowTx>(
    tx: &T,
    tenant_id: TenantId,
    id: LeadId,
) -> EngineResult<Lead> {
    match tx.get_lead(tenant_id, id)? {
        Some(lead) if !lead.is_deleted() => Ok(lead),
        _ => Err(EngineError::NotFound),
    }
}

pub(crate) fn require_estimate<T: WorkflowTx>(
    tx: &T,
    tenant_id: TenantId,
    id: EstimateId,
) -> EngineResult<Estimate> {
    tx.get_estimate(tenant_id, id)?.ok_or(EngineError::NotFound)
}

pub(crate) fn require_job<T: WorkflowTx>(
    tx: &T,
    tenant_id: TenantId,
    id: JobId,
) -> EngineResult<Job> {
    tx.get_job(tenant_id, id)?.ok_or(EngineError::NotFound)
}

pub(crate) fn require_invoice<T: WorkflowTx>(
    tx: &T,
    tenant_id: TenantId,
    id: InvoiceId,
) -> EngineResult<Invoice> {
    tx.get_invoice(tenant_id, id)?.ok_or(EngineError::NotFound)
}
