use crewflow_core::TenantId;

use crate::TransitionEvent;

/// Helper trait for tenant-scoped messages.
///
/// Marks types that carry a tenant ID, so subscription loops and observers
/// can filter messages per tenant without knowing the concrete message type.
pub trait TenantScoped {
    fn tenant_id(&self) -> TenantId;
}

impl TenantScoped for TransitionEvent {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id()
    }
}
