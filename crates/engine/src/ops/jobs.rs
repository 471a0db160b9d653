//! Job operations: lifecycle, milestones, expenses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crewflow_core::TenantId;
use crewflow_events::{TransitionBus, TransitionEvent};
use crewflow_jobs::{Job, JobId, JobStatus, MilestoneId};

use crate::cancel::CancelToken;
use crate::engine::{WorkflowEngine, require_job};
use crate::error::EngineResult;
use crate::store::{WorkflowStore, WorkflowTx};

impl<S, B> WorkflowEngine<S, B>
where
    S: WorkflowStore,
    B: TransitionBus<TransitionEvent>,
{
    pub fn get_job(&self, tenant_id: TenantId, id: JobId) -> EngineResult<Job> {
        let tx = self.begin()?;
        require_job(&tx, tenant_id, id)
    }

    pub fn start_job(
        &self,
        tenant_id: TenantId,
        id: JobId,
        occurred_at: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<Job> {
        self.transition_job(tenant_id, id, JobStatus::InProgress, occurred_at, cancel)
    }

    pub fn complete_job(
        &self,
        tenant_id: TenantId,
        id: JobId,
        occurred_at: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<Job> {
        self.transition_job(tenant_id, id, JobStatus::Completed, occurred_at, cancel)
    }

    pub fn cancel_job(
        &self,
        tenant_id: TenantId,
        id: JobId,
        occurred_at: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<Job> {
        self.transition_job(tenant_id, id, JobStatus::Cancelled, occurred_at, cancel)
    }

    /// Append a milestone to an open job's checklist.
    pub fn add_milestone(
        &self,
        tenant_id: TenantId,
        id: JobId,
        title: impl Into<String>,
        occurs_at: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<Job> {
        let mut tx = self.begin()?;
        let mut job = require_job(&tx, tenant_id, id)?;
        job.add_milestone(title, occurs_at)?;
        tx.put_job(job.clone())?;
        cancel.ensure_active()?;
        tx.commit()?;
        Ok(job)
    }

    pub fn complete_milestone(
        &self,
        tenant_id: TenantId,
        id: JobId,
        milestone_id: MilestoneId,
        occurred_at: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<Job> {
        let mut tx = self.begin()?;
        let mut job = require_job(&tx, tenant_id, id)?;
        job.complete_milestone(milestone_id, occurred_at)?;
        tx.put_job(job.clone())?;
        cancel.ensure_active()?;
        tx.commit()?;
        Ok(job)
    }

    /// Reorder a job's milestones; sort keys are re-sequenced from 0.
    pub fn reorder_milestones(
        &self,
        tenant_id: TenantId,
        id: JobId,
        order: &[MilestoneId],
        cancel: &CancelToken,
    ) -> EngineResult<Job> {
        let mut tx = self.begin()?;
        let mut job = require_job(&tx, tenant_id, id)?;
        job.reorder_milestones(order)?;
        tx.put_job(job.clone())?;
        cancel.ensure_active()?;
        tx.commit()?;
        Ok(job)
    }

    pub fn record_expense(
        &self,
        tenant_id: TenantId,
        id: JobId,
        amount: Decimal,
        vendor: impl Into<String>,
        incurred_at: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<Job> {
        let mut tx = self.begin()?;
        let mut job = require_job(&tx, tenant_id, id)?;
        job.record_expense(amount, vendor, incurred_at)?;
        tx.put_job(job.clone())?;
        cancel.ensure_active()?;
        tx.commit()?;
        Ok(job)
    }

    fn transition_job(
        &self,
        tenant_id: TenantId,
        id: JobId,
        to: JobStatus,
        occurred_at: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<Job> {
        let mut tx = self.begin()?;
        let mut job = require_job(&tx, tenant_id, id)?;

        let Some(transition) = job.transition(to, occurred_at)? else {
            return Ok(job);
        };

        tx.put_job(job.clone())?;
        cancel.ensure_active()?;
        tx.commit()?;

        self.emit(TransitionEvent::for_entity(&job, &transition));
        Ok(job)
    }
}
