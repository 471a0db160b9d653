use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crewflow_core::{
    DomainError, DomainResult, Entity, EntityId, StateTransition, TenantId, WorkflowState,
    apply_transition,
};
use crewflow_estimating::EstimateId;
use crewflow_leads::LeadId;

/// Job identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub EntityId);

impl JobId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for JobId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Milestone identifier (child of a job).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MilestoneId(pub EntityId);

impl MilestoneId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for MilestoneId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Job status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl WorkflowState for JobStatus {
    fn name(self) -> &'static str {
        match self {
            JobStatus::Scheduled => "scheduled",
            JobStatus::InProgress => "inprogress",
            JobStatus::Completed => "completed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    fn can_transition_to(self, to: Self) -> bool {
        matches!(
            (self, to),
            (JobStatus::Scheduled, JobStatus::InProgress)
                | (JobStatus::InProgress, JobStatus::Completed)
                | (JobStatus::Scheduled, JobStatus::Cancelled)
                | (JobStatus::InProgress, JobStatus::Cancelled)
        )
    }
}

/// Milestone completion state. Two states, no graph needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneStatus {
    Pending,
    Completed,
}

/// One milestone in a job's ordered checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: MilestoneId,
    pub title: String,
    pub status: MilestoneStatus,
    /// Explicit position; re-sequenced densely from 0 on reorder.
    pub sort_order: u32,
    pub occurs_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Milestone {
    pub fn pending(title: impl Into<String>, occurs_at: DateTime<Utc>, sort_order: u32) -> Self {
        Self {
            id: MilestoneId::new(EntityId::new()),
            title: title.into(),
            status: MilestoneStatus::Pending,
            sort_order,
            occurs_at,
            completed_at: None,
        }
    }
}

/// A recorded cost against a job. Not part of the state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub amount: Decimal,
    pub vendor: String,
    pub incurred_at: DateTime<Utc>,
}

/// Scheduled work for a lead, optionally originating from an estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    id: JobId,
    tenant_id: TenantId,
    lead_id: LeadId,
    estimate_id: Option<EstimateId>,
    title: String,
    status: JobStatus,
    start_at: DateTime<Utc>,
    estimated_end_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    milestones: Vec<Milestone>,
    expenses: Vec<Expense>,
}

impl Job {
    /// Create a job in `Scheduled` state.
    ///
    /// The schedule window is validated here: `estimated_end_at` must be
    /// strictly after `start_at`.
    pub fn schedule(
        id: JobId,
        tenant_id: TenantId,
        lead_id: LeadId,
        estimate_id: Option<EstimateId>,
        title: impl Into<String>,
        start_at: DateTime<Utc>,
        estimated_end_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::validation("job title must not be blank"));
        }
        if estimated_end_at <= start_at {
            return Err(DomainError::validation(
                "estimated end must be after the start",
            ));
        }

        Ok(Self {
            id,
            tenant_id,
            lead_id,
            estimate_id,
            title,
            status: JobStatus::Scheduled,
            start_at,
            estimated_end_at,
            started_at: None,
            completed_at: None,
            cancelled_at: None,
            milestones: Vec::new(),
            expenses: Vec::new(),
        })
    }

    pub fn id_typed(&self) -> JobId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn lead_id(&self) -> LeadId {
        self.lead_id
    }

    pub fn estimate_id(&self) -> Option<EstimateId> {
        self.estimate_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn start_at(&self) -> DateTime<Utc> {
        self.start_at
    }

    pub fn estimated_end_at(&self) -> DateTime<Utc> {
        self.estimated_end_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn cancelled_at(&self) -> Option<DateTime<Utc>> {
        self.cancelled_at
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    /// Whether the job is still open for work (milestones, expenses).
    pub fn is_open(&self) -> bool {
        matches!(self.status, JobStatus::Scheduled | JobStatus::InProgress)
    }

    /// Move the job through its lifecycle graph.
    ///
    /// Reached-at timestamps are stamped on first arrival only.
    pub fn transition(
        &mut self,
        to: JobStatus,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Option<StateTransition<JobStatus>>> {
        let transition = apply_transition(&mut self.status, to, occurred_at)?;
        if let Some(t) = &transition {
            match t.to {
                JobStatus::InProgress => {
                    if self.started_at.is_none() {
                        self.started_at = Some(occurred_at);
                    }
                }
                JobStatus::Completed => {
                    if self.completed_at.is_none() {
                        self.completed_at = Some(occurred_at);
                    }
                }
                JobStatus::Cancelled => {
                    if self.cancelled_at.is_none() {
                        self.cancelled_at = Some(occurred_at);
                    }
                }
                JobStatus::Scheduled => {}
            }
        }
        Ok(transition)
    }

    /// Replace the milestone collection wholesale (used at creation time).
    ///
    /// Sort keys are re-sequenced from 0 in the given order.
    pub fn set_milestones(&mut self, milestones: Vec<Milestone>) {
        self.milestones = milestones;
        self.resequence_milestones();
    }

    /// Append a milestone at the end of the checklist.
    pub fn add_milestone(
        &mut self,
        title: impl Into<String>,
        occurs_at: DateTime<Utc>,
    ) -> DomainResult<MilestoneId> {
        if !self.is_open() {
            return Err(DomainError::conflict(
                "cannot add milestones to a completed or cancelled job",
            ));
        }
        let title = title.into();
        if title.trim().is_empty() {
            return Err(DomainError::validation("milestone title must not be blank"));
        }

        let sort_order = self.milestones.len() as u32;
        let milestone = Milestone::pending(title, occurs_at, sort_order);
        let id = milestone.id;
        self.milestones.push(milestone);
        Ok(id)
    }

    /// Mark a milestone completed. Completing twice is a conflict.
    pub fn complete_milestone(
        &mut self,
        milestone_id: MilestoneId,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let milestone = self
            .milestones
            .iter_mut()
            .find(|m| m.id == milestone_id)
            .ok_or(DomainError::NotFound)?;

        if milestone.status == MilestoneStatus::Completed {
            return Err(DomainError::conflict("milestone is already completed"));
        }

        milestone.status = MilestoneStatus::Completed;
        milestone.completed_at = Some(occurred_at);
        Ok(())
    }

    /// Reorder milestones to the given id sequence.
    ///
    /// The sequence must mention every milestone exactly once; sort keys are
    /// re-sequenced densely from 0 rather than trusting any storage order.
    pub fn reorder_milestones(&mut self, order: &[MilestoneId]) -> DomainResult<()> {
        if order.len() != self.milestones.len() {
            return Err(DomainError::validation(
                "milestone order must mention every milestone exactly once",
            ));
        }

        let mut reordered = Vec::with_capacity(self.milestones.len());
        for id in order {
            let pos = self
                .milestones
                .iter()
                .position(|m| m.id == *id)
                .ok_or_else(|| {
                    DomainError::validation(format!("unknown milestone in order: {id}"))
                })?;
            reordered.push(self.milestones.remove(pos));
        }

        self.milestones = reordered;
        self.resequence_milestones();
        Ok(())
    }

    /// Record a cost against the job.
    pub fn record_expense(
        &mut self,
        amount: Decimal,
        vendor: impl Into<String>,
        incurred_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        if amount <= Decimal::ZERO {
            return Err(DomainError::validation("expense amount must be positive"));
        }
        let vendor = vendor.into();
        if vendor.trim().is_empty() {
            return Err(DomainError::validation("expense vendor must not be blank"));
        }

        self.expenses.push(Expense {
            amount,
            vendor,
            incurred_at,
        });
        Ok(())
    }

    fn resequence_milestones(&mut self) {
        for (idx, milestone) in self.milestones.iter_mut().enumerate() {
            milestone.sort_order = idx as u32;
        }
    }
}

impl Entity for Job {
    type Id = JobId;

    const ENTITY_TYPE: &'static str = "ops.job";

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn entity_id(&self) -> EntityId {
        self.id.0
    }

    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}
