//! Estimate operations, including the acceptance fan-out.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crewflow_billing::LineSpec;
use crewflow_core::{EntityId, TenantId};
use crewflow_estimating::{Estimate, EstimateId, EstimateStatus};
use crewflow_events::{TransitionBus, TransitionEvent};
use crewflow_invoicing::{Invoice, InvoiceId};
use crewflow_jobs::{Job, JobId, Milestone};
use crewflow_leads::{LeadId, LeadStatus};

use crate::cancel::CancelToken;
use crate::engine::{WorkflowEngine, require_estimate, require_lead};
use crate::error::{EngineError, EngineResult};
use crate::store::{WorkflowStore, WorkflowTx};

/// Payload for creating a draft estimate against a lead.
#[derive(Debug, Clone)]
pub struct NewEstimate {
    pub lead_id: LeadId,
    pub description: String,
    pub lines: Vec<LineSpec>,
}

/// Schedule for the job created by estimate acceptance.
#[derive(Debug, Clone)]
pub struct JobSchedule {
    pub start_at: DateTime<Utc>,
    pub estimated_end_at: DateTime<Utc>,
    /// Milestone titles in order. When absent, one milestone is derived per
    /// non-tax estimate line.
    pub milestone_titles: Option<Vec<String>>,
}

/// Everything created/changed by one acceptance.
#[derive(Debug, Clone)]
pub struct AcceptedEstimate {
    pub estimate: Estimate,
    pub job: Job,
    pub invoice: Invoice,
}

impl<S, B> WorkflowEngine<S, B>
where
    S: WorkflowStore,
    B: TransitionBus<TransitionEvent>,
{
    /// Create a draft estimate.
    ///
    /// The first estimate for a `New` lead converts the lead inside the same
    /// transaction; the lead's transition event is emitted only after that
    /// transaction commits. A `Lost` lead rejects new estimates outright.
    pub fn create_estimate(
        &self,
        tenant_id: TenantId,
        input: NewEstimate,
        occurred_at: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<Estimate> {
        let mut tx = self.begin()?;
        let mut lead = require_lead(&tx, tenant_id, input.lead_id)?;

        if lead.status() == LeadStatus::Lost {
            return Err(EngineError::Conflict(
                "cannot create an estimate for a lost lead".to_string(),
            ));
        }

        let estimate = Estimate::draft(
            EstimateId::new(EntityId::new()),
            tenant_id,
            input.lead_id,
            input.description,
            &input.lines,
        )?;
        tx.put_estimate(estimate.clone())?;

        let lead_transition = if lead.status() == LeadStatus::New {
            let transition = lead.transition(LeadStatus::Converted, occurred_at)?;
            tx.put_lead(lead.clone())?;
            transition
        } else {
            None
        };

        cancel.ensure_active()?;
        tx.commit()?;

        if let Some(transition) = lead_transition {
            self.emit(TransitionEvent::for_entity(&lead, &transition));
        }
        Ok(estimate)
    }

    pub fn get_estimate(&self, tenant_id: TenantId, id: EstimateId) -> EngineResult<Estimate> {
        let tx = self.begin()?;
        require_estimate(&tx, tenant_id, id)
    }

    /// Replace a draft estimate's line items; the cached amount is recomputed.
    pub fn replace_estimate_lines(
        &self,
        tenant_id: TenantId,
        id: EstimateId,
        lines: &[LineSpec],
        cancel: &CancelToken,
    ) -> EngineResult<Estimate> {
        let mut tx = self.begin()?;
        let mut estimate = require_estimate(&tx, tenant_id, id)?;
        estimate.replace_line_items(lines)?;
        tx.put_estimate(estimate.clone())?;
        cancel.ensure_active()?;
        tx.commit()?;
        Ok(estimate)
    }

    pub fn send_estimate(
        &self,
        tenant_id: TenantId,
        id: EstimateId,
        occurred_at: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<Estimate> {
        self.transition_estimate(tenant_id, id, EstimateStatus::Sent, occurred_at, cancel)
    }

    pub fn reject_estimate(
        &self,
        tenant_id: TenantId,
        id: EstimateId,
        occurred_at: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<Estimate> {
        self.transition_estimate(tenant_id, id, EstimateStatus::Rejected, occurred_at, cancel)
    }

    /// Accept an estimate and fan out its dependent aggregates.
    ///
    /// Inside one transaction: the estimate moves to `Accepted`, a job is
    /// scheduled, invoice lines are derived from the estimate lines, the
    /// invoice is drafted against the job, and milestones are attached
    /// (caller-supplied titles or one per non-tax estimate line). Any
    /// failure rolls the whole thing back. Only the estimate's transition is
    /// emitted; the job and invoice are creations, not transitions.
    pub fn accept_estimate(
        &self,
        tenant_id: TenantId,
        estimate_id: EstimateId,
        schedule: JobSchedule,
        occurred_at: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<AcceptedEstimate> {
        let mut tx = self.begin()?;
        let mut estimate = require_estimate(&tx, tenant_id, estimate_id)?;
        let lead = tx
            .get_lead(tenant_id, estimate.lead_id())?
            .ok_or(EngineError::NotFound)?;

        if lead.is_deleted() || lead.status() == LeadStatus::Lost {
            return Err(EngineError::Conflict(
                "cannot accept an estimate for a deleted or lost lead".to_string(),
            ));
        }

        // Schedule sanity comes before the state machine so a bad window on
        // an unsendable estimate still reads as a validation problem.
        if schedule.estimated_end_at <= schedule.start_at {
            return Err(EngineError::Validation(
                "estimated end must be after the start".to_string(),
            ));
        }

        // State-machine failures propagate untouched (a conflict here means
        // the caller's view is stale, not that the input was malformed).
        let Some(transition) = estimate.transition(EstimateStatus::Accepted, occurred_at)? else {
            return Err(EngineError::Conflict(
                "estimate is already accepted".to_string(),
            ));
        };

        let mut job = Job::schedule(
            JobId::new(EntityId::new()),
            tenant_id,
            estimate.lead_id(),
            Some(estimate_id),
            estimate.description(),
            schedule.start_at,
            schedule.estimated_end_at,
        )?;

        let invoice_lines = derive_invoice_lines(&estimate);
        let invoice = Invoice::draft(
            InvoiceId::new(EntityId::new()),
            tenant_id,
            job.id_typed(),
            &invoice_lines,
        )?;

        job.set_milestones(build_milestones(&estimate, &schedule, job.start_at()));

        tx.put_estimate(estimate.clone())?;
        tx.put_job(job.clone())?;
        tx.put_invoice(invoice.clone())?;
        cancel.ensure_active()?;
        tx.commit()?;

        self.emit(TransitionEvent::for_entity(&estimate, &transition));

        Ok(AcceptedEstimate {
            estimate,
            job,
            invoice,
        })
    }

    fn transition_estimate(
        &self,
        tenant_id: TenantId,
        id: EstimateId,
        to: EstimateStatus,
        occurred_at: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<Estimate> {
        let mut tx = self.begin()?;
        let mut estimate = require_estimate(&tx, tenant_id, id)?;

        let Some(transition) = estimate.transition(to, occurred_at)? else {
            return Ok(estimate);
        };

        tx.put_estimate(estimate.clone())?;
        cancel.ensure_active()?;
        tx.commit()?;

        self.emit(TransitionEvent::for_entity(&estimate, &transition));
        Ok(estimate)
    }
}

/// Copy estimate lines into invoice specs.
///
/// Tax lines keep their rate and are re-normalized to (1, 0) on the way into
/// the invoice. An estimate with no lines at all (legacy data) is billed as
/// a single line carrying the estimate's description and cached amount.
fn derive_invoice_lines(estimate: &Estimate) -> Vec<LineSpec> {
    if estimate.line_items().is_empty() {
        return vec![LineSpec::billable(
            estimate.description(),
            Decimal::ONE,
            estimate.amount(),
        )];
    }

    estimate
        .line_items()
        .iter()
        .map(|item| LineSpec {
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            is_tax_line: item.is_tax_line,
            tax_rate: item.tax_rate,
        })
        .collect()
}

/// Milestones for the new job, all dated at job start.
///
/// Caller-supplied titles win (trimmed, blanks dropped, input order);
/// otherwise one pending milestone per non-tax estimate line, in line order.
fn build_milestones(
    estimate: &Estimate,
    schedule: &JobSchedule,
    start_at: DateTime<Utc>,
) -> Vec<Milestone> {
    match &schedule.milestone_titles {
        Some(titles) => titles
            .iter()
            .map(|title| title.trim())
            .filter(|title| !title.is_empty())
            .enumerate()
            .map(|(idx, title)| Milestone::pending(title, start_at, idx as u32))
            .collect(),
        None => estimate
            .line_items()
            .iter()
            .filter(|item| !item.is_tax_line)
            .enumerate()
            .map(|(idx, item)| Milestone::pending(item.description.clone(), start_at, idx as u32))
            .collect(),
    }
}
