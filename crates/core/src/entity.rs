//! Entity trait: identity + tenant ownership across state changes.

use crate::id::{EntityId, TenantId};

/// Workflow entity interface.
///
/// Every entity belongs to exactly one tenant and carries a stable dotted
/// type name; transition events are built from these three facts.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Stable dotted type name (e.g. "crm.lead") used in transition events.
    const ENTITY_TYPE: &'static str;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// The identifier with its type erased, for uniform event payloads.
    fn entity_id(&self) -> EntityId;

    /// The owning tenant.
    fn tenant_id(&self) -> TenantId;
}
