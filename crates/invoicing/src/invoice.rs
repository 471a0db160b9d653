use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crewflow_billing::{BillableLine, LineSpec, normalized_quantity_price, totals,
    validate_line_specs};
use crewflow_core::{
    DomainError, DomainResult, Entity, EntityId, StateTransition, TenantId, WorkflowState,
    apply_transition,
};
use crewflow_jobs::JobId;

/// Invoice identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvoiceId(pub EntityId);

impl InvoiceId {
    pub fn new(id: EntityId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for InvoiceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Invoice status lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Overdue,
    Paid,
}

impl WorkflowState for InvoiceStatus {
    fn name(self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Issued => "issued",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Paid => "paid",
        }
    }

    fn can_transition_to(self, to: Self) -> bool {
        // Overdue is reached from Issued by the sweep; an overdue invoice
        // remains payable.
        matches!(
            (self, to),
            (InvoiceStatus::Draft, InvoiceStatus::Issued)
                | (InvoiceStatus::Issued, InvoiceStatus::Paid)
                | (InvoiceStatus::Issued, InvoiceStatus::Overdue)
                | (InvoiceStatus::Overdue, InvoiceStatus::Paid)
        )
    }
}

/// One invoice line, billable or tax.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub is_tax_line: bool,
    pub tax_rate: Option<Decimal>,
    pub sort_order: u32,
}

impl InvoiceLineItem {
    /// Build the persisted ordered line set from caller specs.
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

impl BillableLine for InvoiceLineItem {
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

/// A bill against a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invoice {
    id: InvoiceId,
    tenant_id: TenantId,
    job_id: JobId,
    status: InvoiceStatus,
    line_items: Vec<InvoiceLineItem>,
    /// Cached calculator total, kept in sync with `line_items`.
    amount: Decimal,
    due_at: Option<DateTime<Utc>>,
    issued_at: Option<DateTime<Utc>>,
    paid_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Create a draft invoice with its line items.
    pub fn draft(
        id: InvoiceId,
        tenant_id: TenantId,
        job_id: JobId,
        lines: &[LineSpec],
    ) -> DomainResult<Self> {
        let line_items = InvoiceLineItem::from_specs(lines)?;
        let amount = totals(&line_items).total;

        Ok(Self {
            id,
            tenant_id,
            job_id,
            status: InvoiceStatus::Draft,
            line_items,
            amount,
            due_at: None,
            issued_at: None,
            paid_at: None,
        })
    }

    pub fn id_typed(&self) -> InvoiceId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn status(&self) -> InvoiceStatus {
        self.status
    }

    pub fn line_items(&self) -> &[InvoiceLineItem] {
        &self.line_items
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn due_at(&self) -> Option<DateTime<Utc>> {
        self.due_at
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    pub fn paid_at(&self) -> Option<DateTime<Utc>> {
        self.paid_at
    }

    pub fn is_modifiable(&self) -> bool {
        matches!(self.status, InvoiceStatus::Draft)
    }

    /// Derived read-time condition: issued and past due (or already swept).
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            InvoiceStatus::Overdue => true,
            InvoiceStatus::Issued => self.due_at.is_some_and(|due| due < now),
            _ => false,
        }
    }

    /// Set the due date. Allowed while draft only; issuing fixes it.
    pub fn set_due_date(&mut self, due_at: DateTime<Utc>) -> DomainResult<()> {
        if !self.is_modifiable() {
            return Err(DomainError::conflict(
                "due date can only be changed while draft",
            ));
        }
        self.due_at = Some(due_at);
        Ok(())
    }

    /// Replace the line-item set. Draft only; the cached amount is recomputed.
    pub fn replace_line_items(&mut self, lines: &[LineSpec]) -> DomainResult<()> {
        if !self.is_modifiable() {
            return Err(DomainError::conflict(
                "invoice line items can only be changed while draft",
            ));
        }

        let line_items = InvoiceLineItem::from_specs(lines)?;
        self.amount = totals(&line_items).total;
        self.line_items = line_items;
        Ok(())
    }

    /// Move the invoice through its lifecycle graph.
    ///
    /// Issuing requires a due date (set while draft or at issue time via the
    /// engine); reached-at timestamps are stamped on first arrival only.
    pub fn transition(
        &mut self,
        to: InvoiceStatus,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Option<StateTransition<InvoiceStatus>>> {
        if to == InvoiceStatus::Issued
            && self.status == InvoiceStatus::Draft
            && self.due_at.is_none()
        {
            return Err(DomainError::validation(
                "invoice needs a due date before it can be issued",
            ));
        }

        let transition = apply_transition(&mut self.status, to, occurred_at)?;
        if let Some(t) = &transition {
            match t.to {
                InvoiceStatus::Issued => {
                    if self.issued_at.is_none() {
                        self.issued_at = Some(occurred_at);
                    }
                }
                InvoiceStatus::Paid => {
                    if self.paid_at.is_none() {
                        self.paid_at = Some(occurred_at);
                    }
                }
                InvoiceStatus::Draft | InvoiceStatus::Overdue => {}
            }
        }
        Ok(transition)
    }
}

impl Entity for Invoice {
    type Id = InvoiceId;

    const ENTITY_TYPE: &'static str = "billing.invoice";

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
