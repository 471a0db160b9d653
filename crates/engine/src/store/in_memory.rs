use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};

use crewflow_core::TenantId;
use crewflow_estimating::{Estimate, EstimateId};
use crewflow_invoicing::{Invoice, InvoiceId, InvoiceStatus};
use crewflow_jobs::{Job, JobId};
use crewflow_leads::{Lead, LeadId};

use super::r#trait::{StoreError, WorkflowStore, WorkflowTx};

/// Operation the in-memory store should fail at (tests).
///
/// Armed via [`InMemoryWorkflowStore::fail_at`]; fires once on the next
/// matching operation and disarms itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FailPoint {
    PutLead,
    PutEstimate,
    PutJob,
    PutInvoice,
    Commit,
}

impl FailPoint {
    fn label(self) -> &'static str {
        match self {
            FailPoint::PutLead => "put_lead",
            FailPoint::PutEstimate => "put_estimate",
            FailPoint::PutJob => "put_job",
            FailPoint::PutInvoice => "put_invoice",
            FailPoint::Commit => "commit",
        }
    }
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    leads: HashMap<(TenantId, LeadId), Lead>,
    estimates: HashMap<(TenantId, EstimateId), Estimate>,
    jobs: HashMap<(TenantId, JobId), Job>,
    invoices: HashMap<(TenantId, InvoiceId), Invoice>,
}

/// In-memory transactional workflow store.
///
/// Intended for tests/dev. A transaction clones the whole state at begin,
/// mutates the clone, and swaps it back in at commit, so concurrent
/// transactions are last-committer-wins, which is the weakest behavior the
/// engine's contract allows.
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    state: Arc<RwLock<StoreState>>,
    fail_point: Arc<Mutex<Option<FailPoint>>>,
}

impl InMemoryWorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot fault at the given operation of the next transaction.
    pub fn fail_at(&self, point: FailPoint) {
        if let Ok(mut slot) = self.fail_point.lock() {
            *slot = Some(point);
        }
    }
}

impl WorkflowStore for InMemoryWorkflowStore {
    type Tx = InMemoryTx;

    fn begin(&self) -> Result<Self::Tx, StoreError> {
        let snapshot = self
            .state
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?
            .clone();

        Ok(InMemoryTx {
            shared: Arc::clone(&self.state),
            working: snapshot,
            fail_point: Arc::clone(&self.fail_point),
        })
    }
}

/// One open in-memory transaction.
#[derive(Debug)]
pub struct InMemoryTx {
    shared: Arc<RwLock<StoreState>>,
    working: StoreState,
    fail_point: Arc<Mutex<Option<FailPoint>>>,
}

impl InMemoryTx {
    fn trip(&self, point: FailPoint) -> Result<(), StoreError> {
        let mut slot = self
            .fail_point
            .lock()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        if *slot == Some(point) {
            *slot = None;
            return Err(StoreError::Injected(point.label()));
        }
        Ok(())
    }
}

impl WorkflowTx for InMemoryTx {
    fn get_lead(&self, tenant_id: TenantId, id: LeadId) -> Result<Option<Lead>, StoreError> {
        Ok(self.working.leads.get(&(tenant_id, id)).cloned())
    }

    fn put_lead(&mut self, lead: Lead) -> Result<(), StoreError> {
        self.trip(FailPoint::PutLead)?;
        self.working
            .leads
            .insert((lead.tenant_id(), lead.id_typed()), lead);
        Ok(())
    }

    fn get_estimate(
        &self,
        tenant_id: TenantId,
        id: EstimateId,
    ) -> Result<Option<Estimate>, StoreError> {
        Ok(self.working.estimates.get(&(tenant_id, id)).cloned())
    }

    fn put_estimate(&mut self, estimate: Estimate) -> Result<(), StoreError> {
        self.trip(FailPoint::PutEstimate)?;
        self.working
            .estimates
            .insert((estimate.tenant_id(), estimate.id_typed()), estimate);
        Ok(())
    }

    fn get_job(&self, tenant_id: TenantId, id: JobId) -> Result<Option<Job>, StoreError> {
        Ok(self.working.jobs.get(&(tenant_id, id)).cloned())
    }

    fn put_job(&mut self, job: Job) -> Result<(), StoreError> {
        self.trip(FailPoint::PutJob)?;
        self.working
            .jobs
            .insert((job.tenant_id(), job.id_typed()), job);
        Ok(())
    }

    fn get_invoice(
        &self,
        tenant_id: TenantId,
        id: InvoiceId,
    ) -> Result<Option<Invoice>, StoreError> {
        Ok(self.working.invoices.get(&(tenant_id, id)).cloned())
    }

    fn put_invoice(&mut self, invoice: Invoice) -> Result<(), StoreError> {
        self.trip(FailPoint::PutInvoice)?;
        self.working
            .invoices
            .insert((invoice.tenant_id(), invoice.id_typed()), invoice);
        Ok(())
    }

    fn issued_invoices_due_before(
        &self,
        tenant_id: TenantId,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Invoice>, StoreError> {
        let mut due: Vec<Invoice> = self
            .working
            .invoices
            .iter()
            .filter(|((tenant, _), invoice)| {
                *tenant == tenant_id
                    && invoice.status() == InvoiceStatus::Issued
                    && invoice.due_at().is_some_and(|at| at < cutoff)
            })
            .map(|(_, invoice)| invoice.clone())
            .collect();

        // Deterministic order for callers and tests.
        due.sort_by_key(|invoice| *invoice.id_typed().0.as_uuid());
        Ok(due)
    }

    fn commit(self) -> Result<(), StoreError> {
        self.trip(FailPoint::Commit)?;
        let mut shared = self
            .shared
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        *shared = self.working;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crewflow_core::EntityId;
    use crewflow_leads::ContactInfo;

    fn lead(tenant_id: TenantId) -> Lead {
        Lead::intake(
            LeadId::new(EntityId::new()),
            tenant_id,
            "Deck build - Ortiz",
            ContactInfo::default(),
        )
        .unwrap()
    }

    #[test]
    fn committed_writes_are_visible_to_later_transactions() {
        let store = InMemoryWorkflowStore::new();
        let tenant_id = TenantId::new();
        let lead = lead(tenant_id);
        let id = lead.id_typed();

        let mut tx = store.begin().unwrap();
        tx.put_lead(lead).unwrap();
        tx.commit().unwrap();

        let tx = store.begin().unwrap();
        assert!(tx.get_lead(tenant_id, id).unwrap().is_some());
    }

    #[test]
    fn dropped_transactions_leave_no_trace() {
        let store = InMemoryWorkflowStore::new();
        let tenant_id = TenantId::new();
        let lead = lead(tenant_id);
        let id = lead.id_typed();

        let mut tx = store.begin().unwrap();
        tx.put_lead(lead).unwrap();
        drop(tx);

        let tx = store.begin().unwrap();
        assert!(tx.get_lead(tenant_id, id).unwrap().is_none());
    }

    #[test]
    fn reads_are_scoped_to_the_tenant() {
        let store = InMemoryWorkflowStore::new();
        let tenant_id = TenantId::new();
        let lead = lead(tenant_id);
        let id = lead.id_typed();

        let mut tx = store.begin().unwrap();
        tx.put_lead(lead).unwrap();
        tx.commit().unwrap();

        let tx = store.begin().unwrap();
        assert!(tx.get_lead(TenantId::new(), id).unwrap().is_none());
    }

    #[test]
    fn fail_point_fires_once_and_disarms() {
        let store = InMemoryWorkflowStore::new();
        let tenant_id = TenantId::new();
        store.fail_at(FailPoint::PutLead);

        let mut tx = store.begin().unwrap();
        let err = tx.put_lead(lead(tenant_id)).unwrap_err();
        assert!(matches!(err, StoreError::Injected("put_lead")));

        // Disarmed: the retry in a fresh transaction succeeds.
        let mut tx = store.begin().unwrap();
        tx.put_lead(lead(tenant_id)).unwrap();
        tx.commit().unwrap();
    }
}
