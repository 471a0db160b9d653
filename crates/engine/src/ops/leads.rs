//! Lead operations.

use chrono::{DateTime, Utc};

use crewflow_core::{EntityId, TenantId};
use crewflow_events::{TransitionBus, TransitionEvent};
use crewflow_leads::{ContactInfo, Lead, LeadId, LeadStatus};

use crate::cancel::CancelToken;
use crate::engine::{WorkflowEngine, require_lead};
use crate::error::EngineResult;
use crate::store::{WorkflowStore, WorkflowTx};

/// Intake payload for a new lead.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub name: String,
    pub contact: ContactInfo,
}

impl<S, B> WorkflowEngine<S, B>
where
    S: WorkflowStore,
    B: TransitionBus<TransitionEvent>,
{
    /// Intake: create a lead in `New` status.
    pub fn create_lead(
        &self,
        tenant_id: TenantId,
        input: NewLead,
        cancel: &CancelToken,
    ) -> EngineResult<Lead> {
        let lead = Lead::intake(
            LeadId::new(EntityId::new()),
            tenant_id,
            input.name,
            input.contact,
        )?;

        let mut tx = self.begin()?;
        tx.put_lead(lead.clone())?;
        cancel.ensure_active()?;
        tx.commit()?;
        Ok(lead)
    }

    pub fn get_lead(&self, tenant_id: TenantId, id: LeadId) -> EngineResult<Lead> {
        let tx = self.begin()?;
        require_lead(&tx, tenant_id, id)
    }

    /// Move a lead to `target`, emitting the transition post-commit.
    ///
    /// A same-state target is a quiet no-op: nothing is persisted and no
    /// event is emitted.
    pub fn update_lead_status(
        &self,
        tenant_id: TenantId,
        id: LeadId,
        target: LeadStatus,
        occurred_at: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<Lead> {
        let mut tx = self.begin()?;
        let mut lead = require_lead(&tx, tenant_id, id)?;

        let Some(transition) = lead.transition(target, occurred_at)? else {
            return Ok(lead);
        };

        tx.put_lead(lead.clone())?;
        cancel.ensure_active()?;
        tx.commit()?;

        self.emit(TransitionEvent::for_entity(&lead, &transition));
        Ok(lead)
    }

    /// Soft-delete a lead. The row stays in storage but becomes invisible to
    /// every engine operation.
    pub fn delete_lead(
        &self,
        tenant_id: TenantId,
        id: LeadId,
        cancel: &CancelToken,
    ) -> EngineResult<()> {
        let mut tx = self.begin()?;
        let mut lead = require_lead(&tx, tenant_id, id)?;
        lead.mark_deleted();
        tx.put_lead(lead)?;
        cancel.ensure_active()?;
        tx.commit()?;
        Ok(())
    }
}
