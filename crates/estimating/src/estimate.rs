use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crewflow_billing::{BillableLine, LineSpec, normalized_quantity_price, totals,
    validate_line_specs};
use crewflow_core::{
    DomainError, DomainResult, Entity, EntityId, StateTransition, TenantId, WorkflowState,
    apply_transition,
};
use crewflow_leads::LeadId;

/// Estimate identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EstimateId(pub EntityId);

impl EstimateId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for EstimateId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Estimate status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
}

impl WorkflowState for EstimateStatus {
    fn name(self) -> &'static str {
        match self {
            EstimateStatus::Draft => "draft",
            EstimateStatus::Sent => "sent",
            EstimateStatus::Accepted => "accepted",
            EstimateStatus::Rejected => "rejected",
        }
    }

    fn can_transition_to(self, to: Self) -> bool {
        // A draft must be sent before it can be accepted or rejected.
        matches!(
            (self, to),
            (EstimateStatus::Draft, EstimateStatus::Sent)
                | (EstimateStatus::Sent, EstimateStatus::Accepted)
                | (EstimateStatus::Sent, EstimateStatus::Rejected)
        )
    }
}

/// One estimate line, billable or tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimateLineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub is_tax_line: bool,
    pub tax_rate: Option<Decimal>,
    pub sort_order: u32,
}

impl EstimateLineItem {
    /// Build the persisted ordered line set from caller specs.
    ///
    /// Validates the set, normalizes tax lines to (1, 0) and assigns sort
    /// order from input order.
    pub fn from_specs(specs: &[LineSpec]) -> DomainResult<Vec<Self>> {
        validate_line_specs(specs)?;
        Ok(specs
            .iter()
            .enumerate()
            .map(|(idx, spec)| {
                let (quantity, unit_price) =
                    normalized_quantity_price(spec.is_tax_line, spec.quantity, spec.unit_price);
                Self {
                    description: spec.description.clone(),
                    quantity,
                    unit_price,
                    is_tax_line: spec.is_tax_line,
                    tax_rate: spec.tax_rate,
                    sort_order: idx as u32,
                }
            })
            .collect())
    }
}

impl BillableLine for EstimateLineItem {
    fn quantity(&self) -> Decimal {
        self.quantity
    }

    fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    fn is_tax_line(&self) -> bool {
        self.is_tax_line
    }

    fn tax_rate(&self) -> Option<Decimal> {
        self.tax_rate
    }
}

/// A priced proposal against a lead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Estimate {
    id: EstimateId,
    tenant_id: TenantId,
    lead_id: LeadId,
    description: String,
    status: EstimateStatus,
    line_items: Vec<EstimateLineItem>,
    /// Cached calculator total, kept in sync with `line_items`.
    amount: Decimal,
    sent_at: Option<DateTime<Utc>>,
    accepted_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
}

impl Estimate {
    /// Create a draft estimate with its line items.
    pub fn draft(
        id: EstimateId,
        tenant_id: TenantId,
        lead_id: LeadId,
        description: impl Into<String>,
        lines: &[LineSpec],
    ) -> DomainResult<Self> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(DomainError::validation(
                "estimate description must not be blank",
            ));
        }

        let line_items = EstimateLineItem::from_specs(lines)?;
        let amount = totals(&line_items).total;

        Ok(Self {
            id,
            tenant_id,
            lead_id,
            description,
            status: EstimateStatus::Draft,
            line_items,
            amount,
            sent_at: None,
            accepted_at: None,
            rejected_at: None,
        })
    }

    pub fn id_typed(&self) -> EstimateId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn lead_id(&self) -> LeadId {
        self.lead_id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> EstimateStatus {
        self.status
    }

    pub fn line_items(&self) -> &[EstimateLineItem] {
        &self.line_items
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }

    pub fn accepted_at(&self) -> Option<DateTime<Utc>> {
        self.accepted_at
    }

    pub fn rejected_at(&self) -> Option<DateTime<Utc>> {
        self.rejected_at
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, EstimateStatus::Draft)
    }

    /// Replace the line-item set. Draft only; the cached amount is recomputed.
    pub fn replace_line_items(&mut self, lines: &[LineSpec]) -> DomainResult<()> {
        if !self.is_modifiable() {
            return Err(DomainError::conflict(
                "estimate line items can only be changed while draft",
            ));
        }

        let line_items = EstimateLineItem::from_specs(lines)?;
        self.amount = totals(&line_items).total;
        self.line_items = line_items;
        Ok(())
    }

    /// Move the estimate through its lifecycle graph.
    ///
    /// Reached-at timestamps are stamped on first arrival only.
    pub fn transition(
        &mut self,
        to: EstimateStatus,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Option<StateTransition<EstimateStatus>>> {
        let transition = apply_transition(&mut self.status, to, occurred_at)?;
        if let Some(t) = &transition {
            match t.to {
                EstimateStatus::Sent => {
                    if self.sent_at.is_none() {
                        self.sent_at = Some(occurred_at);
                    }
                }
                EstimateStatus::Accepted => {
                    if self.accepted_at.is_none() {
                        self.accepted_at = Some(occurred_at);
                    }
                }
                EstimateStatus::Rejected => {
                    if self.rejected_at.is_none() {
                        self.rejected_at = Some(occurred_at);
                    }
                }
                EstimateStatus::Draft => {}
            }
        }
        Ok(transition)
    }
}

impl Entity for Estimate {
    type Id = EstimateId;

    const ENTITY_TYPE: &'static str = "estimating.estimate";

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
