use chrono::{DateTime, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crewflow_core::{
    DomainError, DomainResult, Entity, EntityId, StateTransition, TenantId, WorkflowState,
    apply_transition,
};

/// Lead identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub EntityId);

impl LeadId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for LeadId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Lead status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Converted,
    Lost,
}

impl WorkflowState for LeadStatus {
    fn name(self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Converted => "converted",
            LeadStatus::Lost => "lost",
        }
    }

    fn can_transition_to(self, to: Self) -> bool {
        // Converted and Lost are terminal.
        matches!(
            (self, to),
            (LeadStatus::New, LeadStatus::Converted) | (LeadStatus::New, LeadStatus::Lost)
        )
    }
}

impl FromStr for LeadStatus {
    type Err = DomainError;

    /// Statuses arrive from callers as names; anything outside the closed
    /// enumeration is a validation failure, never a parse fallback.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(LeadStatus::New),
            "converted" => Ok(LeadStatus::Converted),
            "lost" => Ok(LeadStatus::Lost),
            other => Err(DomainError::validation(format!(
                "unknown lead status: {other}"
            ))),
        }
    }
}

/// Contact information captured at intake.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// A sales lead, owned by one tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lead {
    id: LeadId,
    tenant_id: TenantId,
    name: String,
    contact: ContactInfo,
    status: LeadStatus,
    lost_at: Option<DateTime<Utc>>,
    deleted: bool,
}

impl Lead {
    /// Intake: create a new lead in `New` status.
    pub fn intake(
        id: LeadId,
        tenant_id: TenantId,
        name: impl Into<String>,
        contact: ContactInfo,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("lead name must not be blank"));
        }

        Ok(Self {
            id,
            tenant_id,
            name,
            contact,
            status: LeadStatus::New,
            lost_at: None,
            deleted: false,
        })
    }

    pub fn id_typed(&self) -> LeadId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn status(&self) -> LeadStatus {
        self.status
    }

    pub fn lost_at(&self) -> Option<DateTime<Utc>> {
        self.lost_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Whether estimates may still be created against this lead.
    pub fn accepts_estimates(&self) -> bool {
        !self.deleted && self.status != LeadStatus::Lost
    }

    /// Move the lead through its lifecycle graph.
    ///
    /// `lost_at` is stamped on first arrival into `Lost` only.
    pub fn transition(
        &mut self,
        to: LeadStatus,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Option<StateTransition<LeadStatus>>> {
        let transition = apply_transition(&mut self.status, to, occurred_at)?;
        if let Some(t) = &transition {
            if t.to == LeadStatus::Lost && self.lost_at.is_none() {
                self.lost_at = Some(occurred_at);
            }
        }
        Ok(transition)
    }

    /// Soft-delete. Leads are never removed from storage.
    pub fn mark_deleted(&mut self) {
        self.deleted = true;
    }
}

impl Entity for Lead {
    type Id = LeadId;

    const ENTITY_TYPE: &'static str = "crm.lead";

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
