use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crewflow_core::{Entity, EntityId, StateTransition, TenantId, WorkflowState};

/// A committed status transition, ready for observers.
///
/// The shape is uniform across entity types: states travel as their stable
/// lowercase names so consumers (logging, webhooks, projections) need no
/// knowledge of the per-entity status enums. Job/invoice *creations* during
/// estimate acceptance are not transitions and never appear here; only status
/// changes do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    event_id: Uuid,
    tenant_id: TenantId,

    /// Dotted entity type name (e.g. "crm.lead", "billing.invoice").
    entity_type: String,
    entity_id: EntityId,

    from: String,
    to: String,
    occurred_at: DateTime<Utc>,
}

impl TransitionEvent {
    pub fn new(
        tenant_id: TenantId,
        entity_type: impl Into<String>,
        entity_id: EntityId,
        from: impl Into<String>,
        to: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            tenant_id,
            entity_type: entity_type.into(),
            entity_id,
            from: from.into(),
            to: to.into(),
            occurred_at,
        }
    }

    /// Build an event from an entity and its typed transition record.
    pub fn for_entity<E, S>(entity: &E, transition: &StateTransition<S>) -> Self
    where
        E: Entity,
        S: WorkflowState,
    {
        Self::new(
            entity.tenant_id(),
            E::ENTITY_TYPE,
            entity.entity_id(),
            transition.from.name(),
            transition.to.name(),
            transition.occurred_at,
        )
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn from_state(&self) -> &str {
        &self.from
    }

    pub fn to_state(&self) -> &str {
        &self.to
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}
