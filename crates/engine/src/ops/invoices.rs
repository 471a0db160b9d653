//! Invoice operations, including the overdue sweep.

use chrono::{DateTime, Utc};
use tracing::debug;

use crewflow_billing::LineSpec;
use crewflow_core::TenantId;
use crewflow_events::{TransitionBus, TransitionEvent};
use crewflow_invoicing::{Invoice, InvoiceId, InvoiceStatus};

use crate::cancel::CancelToken;
use crate::engine::{WorkflowEngine, require_invoice};
use crate::error::EngineResult;
use crate::store::{WorkflowStore, WorkflowTx};

impl<S, B> WorkflowEngine<S, B>
where
    S: WorkflowStore,
    B: TransitionBus<TransitionEvent>,
{
    pub fn get_invoice(&self, tenant_id: TenantId, id: InvoiceId) -> EngineResult<Invoice> {
        let tx = self.begin()?;
        require_invoice(&tx, tenant_id, id)
    }

    /// Set a draft invoice's due date.
    pub fn set_invoice_due_date(
        &self,
        tenant_id: TenantId,
        id: InvoiceId,
        due_at: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<Invoice> {
        let mut tx = self.begin()?;
        let mut invoice = require_invoice(&tx, tenant_id, id)?;
        invoice.set_due_date(due_at)?;
        tx.put_invoice(invoice.clone())?;
        cancel.ensure_active()?;
        tx.commit()?;
        Ok(invoice)
    }

    /// Replace a draft invoice's line items; the cached amount is recomputed.
    pub fn replace_invoice_lines(
        &self,
        tenant_id: TenantId,
        id: InvoiceId,
        lines: &[LineSpec],
        cancel: &CancelToken,
    ) -> EngineResult<Invoice> {
        let mut tx = self.begin()?;
        let mut invoice = require_invoice(&tx, tenant_id, id)?;
        invoice.replace_line_items(lines)?;
        tx.put_invoice(invoice.clone())?;
        cancel.ensure_active()?;
        tx.commit()?;
        Ok(invoice)
    }

    /// Issue a draft invoice.
    ///
    /// A due date must be in place: either set while draft or supplied here.
    pub fn issue_invoice(
        &self,
        tenant_id: TenantId,
        id: InvoiceId,
        due_at: Option<DateTime<Utc>>,
        occurred_at: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<Invoice> {
        let mut tx = self.begin()?;
        let mut invoice = require_invoice(&tx, tenant_id, id)?;

        if let Some(due_at) = due_at {
            invoice.set_due_date(due_at)?;
        }

        let Some(transition) = invoice.transition(InvoiceStatus::Issued, occurred_at)? else {
            return Ok(invoice);
        };

        tx.put_invoice(invoice.clone())?;
        cancel.ensure_active()?;
        tx.commit()?;

        self.emit(TransitionEvent::for_entity(&invoice, &transition));
        Ok(invoice)
    }

    /// Record payment of an issued (possibly overdue) invoice.
    pub fn mark_invoice_paid(
        &self,
        tenant_id: TenantId,
        id: InvoiceId,
        occurred_at: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<Invoice> {
        let mut tx = self.begin()?;
        let mut invoice = require_invoice(&tx, tenant_id, id)?;

        let Some(transition) = invoice.transition(InvoiceStatus::Paid, occurred_at)? else {
            return Ok(invoice);
        };

        tx.put_invoice(invoice.clone())?;
        cancel.ensure_active()?;
        tx.commit()?;

        self.emit(TransitionEvent::for_entity(&invoice, &transition));
        Ok(invoice)
    }

    /// Persist the overdue condition for one tenant.
    ///
    /// Every `Issued` invoice whose due date is strictly before `now` flips
    /// to `Overdue` in one transaction; one event per flipped invoice is
    /// emitted post-commit. The caller owns the cadence; the engine runs no
    /// scheduler of its own, and the derived `is_overdue` reading stays
    /// correct between sweeps.
    pub fn sweep_overdue(
        &self,
        tenant_id: TenantId,
        now: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> EngineResult<Vec<Invoice>> {
        let mut tx = self.begin()?;
        let candidates = tx.issued_invoices_due_before(tenant_id, now)?;

        let mut flipped = Vec::new();
        for mut invoice in candidates {
            if let Some(transition) = invoice.transition(InvoiceStatus::Overdue, now)? {
                tx.put_invoice(invoice.clone())?;
                flipped.push((invoice, transition));
            }
        }

        if flipped.is_empty() {
            return Ok(Vec::new());
        }

        cancel.ensure_active()?;
        tx.commit()?;

        debug!(%tenant_id, count = flipped.len(), "overdue sweep flipped invoices");
        let mut swept = Vec::with_capacity(flipped.len());
        for (invoice, transition) in flipped {
            self.emit(TransitionEvent::for_entity(&invoice, &transition));
            swept.push(invoice);
        }
        Ok(swept)
    }
}
