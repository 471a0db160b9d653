//! End-to-end workflow tests over the in-memory store and bus.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crewflow_billing::LineSpec;
use crewflow_core::TenantId;
use crewflow_engine::{
    CancelToken, EngineError, FailPoint, InMemoryWorkflowStore, JobSchedule, NewEstimate, NewLead,
    WorkflowEngine,
};
use crewflow_estimating::{Estimate, EstimateStatus};
use crewflow_events::{InMemoryTransitionBus, Subscription, TransitionBus, TransitionEvent};
use crewflow_invoicing::InvoiceStatus;
use crewflow_jobs::{JobStatus, MilestoneStatus};
use crewflow_leads::{ContactInfo, Lead, LeadStatus};

type Engine = WorkflowEngine<Arc<InMemoryWorkflowStore>, Arc<InMemoryTransitionBus<TransitionEvent>>>;

struct Harness {
    engine: Engine,
    store: Arc<InMemoryWorkflowStore>,
    events: Subscription<TransitionEvent>,
    tenant_id: TenantId,
    cancel: CancelToken,
}

fn setup() -> Harness {
    let store = Arc::new(InMemoryWorkflowStore::new());
    let bus = Arc::new(InMemoryTransitionBus::new());
    let events = bus.subscribe();
    let engine = WorkflowEngine::new(Arc::clone(&store), bus);
    Harness {
        engine,
        store,
        events,
        tenant_id: TenantId::new(),
        cancel: CancelToken::new(),
    }
}

fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn drain(events: &Subscription<TransitionEvent>) -> Vec<TransitionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn labor_and_tax() -> Vec<LineSpec> {
    vec![
        LineSpec::billable("Labor", d("2"), d("100.00")),
        LineSpec::tax("Sales tax", d("8.25")),
    ]
}

fn schedule(start: DateTime<Utc>) -> JobSchedule {
    JobSchedule {
        start_at: start,
        estimated_end_at: start + Duration::days(5),
        milestone_titles: None,
    }
}

impl Harness {
    fn new_lead(&self) -> Lead {
        self.engine
            .create_lead(
                self.tenant_id,
                NewLead {
                    name: "Kitchen remodel - Harper".to_string(),
                    contact: ContactInfo::default(),
                },
                &self.cancel,
            )
            .unwrap()
    }

    fn draft_estimate(&self, lead: &Lead) -> Estimate {
        self.engine
            .create_estimate(
                self.tenant_id,
                NewEstimate {
                    lead_id: lead.id_typed(),
                    description: "Kitchen remodel".to_string(),
                    lines: labor_and_tax(),
                },
                Utc::now(),
                &self.cancel,
            )
            .unwrap()
    }

    fn sent_estimate(&self) -> Estimate {
        let lead = self.new_lead();
        let estimate = self.draft_estimate(&lead);
        self.engine
            .send_estimate(self.tenant_id, estimate.id_typed(), Utc::now(), &self.cancel)
            .unwrap()
    }
}

#[test]
fn first_estimate_converts_the_lead_in_the_same_transaction() {
    let h = setup();
    let lead = h.new_lead();
    assert_eq!(lead.status(), LeadStatus::New);
    assert!(drain(&h.events).is_empty(), "creation is not a transition");

    h.draft_estimate(&lead);

    let lead = h.engine.get_lead(h.tenant_id, lead.id_typed()).unwrap();
    assert_eq!(lead.status(), LeadStatus::Converted);

    let events = drain(&h.events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].entity_type(), "crm.lead");
    assert_eq!(events[0].from_state(), "new");
    assert_eq!(events[0].to_state(), "converted");
}

#[test]
fn second_estimate_does_not_retrigger_conversion() {
    let h = setup();
    let lead = h.new_lead();
    h.draft_estimate(&lead);
    drain(&h.events);

    h.draft_estimate(&lead);

    let lead = h.engine.get_lead(h.tenant_id, lead.id_typed()).unwrap();
    assert_eq!(lead.status(), LeadStatus::Converted);
    assert!(drain(&h.events).is_empty());
}

#[test]
fn lost_lead_rejects_new_estimates() {
    let h = setup();
    let lead = h.new_lead();
    h.engine
        .update_lead_status(
            h.tenant_id,
            lead.id_typed(),
            LeadStatus::Lost,
            Utc::now(),
            &h.cancel,
        )
        .unwrap();

    let err = h
        .engine
        .create_estimate(
            h.tenant_id,
            NewEstimate {
                lead_id: lead.id_typed(),
                description: "Kitchen remodel".to_string(),
                lines: labor_and_tax(),
            },
            Utc::now(),
            &h.cancel,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[test]
fn deleted_lead_is_invisible() {
    let h = setup();
    let lead = h.new_lead();
    h.engine
        .delete_lead(h.tenant_id, lead.id_typed(), &h.cancel)
        .unwrap();

    let err = h.engine.get_lead(h.tenant_id, lead.id_typed()).unwrap_err();
    assert!(matches!(err, EngineError::NotFound));

    let err = h
        .engine
        .create_estimate(
            h.tenant_id,
            NewEstimate {
                lead_id: lead.id_typed(),
                description: "Kitchen remodel".to_string(),
                lines: labor_and_tax(),
            },
            Utc::now(),
            &h.cancel,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound));
}

#[test]
fn same_state_update_is_a_quiet_noop() {
    let h = setup();
    let lead = h.new_lead();

    let updated = h
        .engine
        .update_lead_status(
            h.tenant_id,
            lead.id_typed(),
            LeadStatus::New,
            Utc::now(),
            &h.cancel,
        )
        .unwrap();
    assert_eq!(updated.status(), LeadStatus::New);
    assert!(drain(&h.events).is_empty());
}

#[test]
fn acceptance_fans_out_job_invoice_and_derived_milestones() {
    let h = setup();
    let estimate = h.sent_estimate();
    drain(&h.events);

    let start = Utc::now();
    let accepted_at = Utc::now();
    let accepted = h
        .engine
        .accept_estimate(
            h.tenant_id,
            estimate.id_typed(),
            schedule(start),
            accepted_at,
            &h.cancel,
        )
        .unwrap();

    assert_eq!(accepted.estimate.status(), EstimateStatus::Accepted);
    assert_eq!(accepted.estimate.accepted_at(), Some(accepted_at));

    // Job references the lead and the estimate, scheduled as requested.
    assert_eq!(accepted.job.status(), JobStatus::Scheduled);
    assert_eq!(accepted.job.lead_id(), estimate.lead_id());
    assert_eq!(accepted.job.estimate_id(), Some(estimate.id_typed()));
    assert_eq!(accepted.job.start_at(), start);

    // Invoice lines derive from the estimate lines, same totals.
    assert_eq!(accepted.invoice.status(), InvoiceStatus::Draft);
    assert_eq!(accepted.invoice.job_id(), accepted.job.id_typed());
    assert_eq!(accepted.invoice.amount(), d("216.50"));
    assert_eq!(accepted.invoice.line_items().len(), 2);
    assert!(accepted.invoice.line_items()[1].is_tax_line);

    // One milestone per non-tax estimate line, dated at job start.
    let milestones = accepted.job.milestones();
    assert_eq!(milestones.len(), 1);
    assert_eq!(milestones[0].title, "Labor");
    assert_eq!(milestones[0].status, MilestoneStatus::Pending);
    assert_eq!(milestones[0].occurs_at, start);
    assert_eq!(milestones[0].sort_order, 0);

    // Everything is persisted.
    let job = h.engine.get_job(h.tenant_id, accepted.job.id_typed()).unwrap();
    assert_eq!(job.milestones().len(), 1);
    let invoice = h
        .engine
        .get_invoice(h.tenant_id, accepted.invoice.id_typed())
        .unwrap();
    assert_eq!(invoice.amount(), d("216.50"));

    // Only the estimate's transition is an event; the creations are not.
    let events = drain(&h.events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].entity_type(), "estimating.estimate");
    assert_eq!(events[0].from_state(), "sent");
    assert_eq!(events[0].to_state(), "accepted");
}

#[test]
fn acceptance_uses_caller_milestones_when_supplied() {
    let h = setup();
    let estimate = h.sent_estimate();

    let start = Utc::now();
    let accepted = h
        .engine
        .accept_estimate(
            h.tenant_id,
            estimate.id_typed(),
            JobSchedule {
                start_at: start,
                estimated_end_at: start + Duration::days(5),
                milestone_titles: Some(vec![
                    "  Demo  ".to_string(),
                    "   ".to_string(),
                    "Final walkthrough".to_string(),
                ]),
            },
            Utc::now(),
            &h.cancel,
        )
        .unwrap();

    let titles: Vec<&str> = accepted
        .job
        .milestones()
        .iter()
        .map(|m| m.title.as_str())
        .collect();
    assert_eq!(titles, vec!["Demo", "Final walkthrough"]);
    let orders: Vec<u32> = accepted.job.milestones().iter().map(|m| m.sort_order).collect();
    assert_eq!(orders, vec![0, 1]);
}

#[test]
fn acceptance_of_a_lineless_estimate_bills_a_synthesized_line() {
    let h = setup();
    let lead = h.new_lead();
    let estimate = h
        .engine
        .create_estimate(
            h.tenant_id,
            NewEstimate {
                lead_id: lead.id_typed(),
                description: "Fence repair".to_string(),
                lines: Vec::new(),
            },
            Utc::now(),
            &h.cancel,
        )
        .unwrap();
    let estimate = h
        .engine
        .send_estimate(h.tenant_id, estimate.id_typed(), Utc::now(), &h.cancel)
        .unwrap();

    let accepted = h
        .engine
        .accept_estimate(
            h.tenant_id,
            estimate.id_typed(),
            schedule(Utc::now()),
            Utc::now(),
            &h.cancel,
        )
        .unwrap();

    let lines = accepted.invoice.line_items();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].description, "Fence repair");
    assert!(!lines[0].is_tax_line);
    assert_eq!(accepted.invoice.amount(), estimate.amount());
    assert!(accepted.job.milestones().is_empty());
}

#[test]
fn acceptance_rejects_end_before_start() {
    let h = setup();
    let estimate = h.sent_estimate();
    drain(&h.events);

    let start = Utc::now();
    let err = h
        .engine
        .accept_estimate(
            h.tenant_id,
            estimate.id_typed(),
            JobSchedule {
                start_at: start,
                estimated_end_at: start - Duration::hours(1),
                milestone_titles: None,
            },
            Utc::now(),
            &h.cancel,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    // The estimate is untouched and nothing was emitted.
    let estimate = h.engine.get_estimate(h.tenant_id, estimate.id_typed()).unwrap();
    assert_eq!(estimate.status(), EstimateStatus::Sent);
    assert!(estimate.accepted_at().is_none());
    assert!(drain(&h.events).is_empty());
}

#[test]
fn acceptance_of_a_draft_estimate_is_a_conflict() {
    let h = setup();
    let lead = h.new_lead();
    let estimate = h.draft_estimate(&lead);

    let err = h
        .engine
        .accept_estimate(
            h.tenant_id,
            estimate.id_typed(),
            schedule(Utc::now()),
            Utc::now(),
            &h.cancel,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[test]
fn rejecting_a_draft_estimate_is_a_conflict() {
    let h = setup();
    let lead = h.new_lead();
    let estimate = h.draft_estimate(&lead);

    let err = h
        .engine
        .reject_estimate(h.tenant_id, estimate.id_typed(), Utc::now(), &h.cancel)
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    let estimate = h.engine.get_estimate(h.tenant_id, estimate.id_typed()).unwrap();
    assert_eq!(estimate.status(), EstimateStatus::Draft);
    assert!(estimate.rejected_at().is_none());
}

#[test]
fn acceptance_is_atomic_under_an_injected_fault() {
    let h = setup();
    let estimate = h.sent_estimate();
    drain(&h.events);

    // Job insert will succeed, invoice insert will fail: the whole
    // transaction must vanish.
    h.store.fail_at(FailPoint::PutInvoice);

    let err = h
        .engine
        .accept_estimate(
            h.tenant_id,
            estimate.id_typed(),
            schedule(Utc::now()),
            Utc::now(),
            &h.cancel,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));

    let reloaded = h.engine.get_estimate(h.tenant_id, estimate.id_typed()).unwrap();
    assert_eq!(reloaded.status(), EstimateStatus::Sent);
    assert!(reloaded.accepted_at().is_none());
    assert!(drain(&h.events).is_empty(), "no event for a rolled-back transition");

    // The failed attempt left nothing behind; a retry goes through cleanly.
    let accepted = h
        .engine
        .accept_estimate(
            h.tenant_id,
            estimate.id_typed(),
            schedule(Utc::now()),
            Utc::now(),
            &h.cancel,
        )
        .unwrap();
    assert_eq!(accepted.estimate.status(), EstimateStatus::Accepted);
    assert_eq!(drain(&h.events).len(), 1);
}

#[test]
fn invoice_issue_requires_a_due_date_and_paying_emits() {
    let h = setup();
    let estimate = h.sent_estimate();
    let accepted = h
        .engine
        .accept_estimate(
            h.tenant_id,
            estimate.id_typed(),
            schedule(Utc::now()),
            Utc::now(),
            &h.cancel,
        )
        .unwrap();
    let invoice_id = accepted.invoice.id_typed();
    drain(&h.events);

    let err = h
        .engine
        .issue_invoice(h.tenant_id, invoice_id, None, Utc::now(), &h.cancel)
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let due = Utc::now() + Duration::days(30);
    let invoice = h
        .engine
        .issue_invoice(h.tenant_id, invoice_id, Some(due), Utc::now(), &h.cancel)
        .unwrap();
    assert_eq!(invoice.status(), InvoiceStatus::Issued);
    assert_eq!(invoice.due_at(), Some(due));

    let invoice = h
        .engine
        .mark_invoice_paid(h.tenant_id, invoice_id, Utc::now(), &h.cancel)
        .unwrap();
    assert_eq!(invoice.status(), InvoiceStatus::Paid);

    let states: Vec<(String, String)> = drain(&h.events)
        .iter()
        .map(|e| (e.from_state().to_string(), e.to_state().to_string()))
        .collect();
    assert_eq!(
        states,
        vec![
            ("draft".to_string(), "issued".to_string()),
            ("issued".to_string(), "paid".to_string()),
        ]
    );
}

#[test]
fn overdue_sweep_flips_only_past_due_issued_invoices() {
    let h = setup();
    let now = Utc::now();

    // Two accepted estimates, two invoices: one due yesterday, one next month.
    let first = h.sent_estimate();
    let first = h
        .engine
        .accept_estimate(h.tenant_id, first.id_typed(), schedule(now), now, &h.cancel)
        .unwrap();
    h.engine
        .issue_invoice(
            h.tenant_id,
            first.invoice.id_typed(),
            Some(now - Duration::days(1)),
            now,
            &h.cancel,
        )
        .unwrap();

    let second = h.sent_estimate();
    let second = h
        .engine
        .accept_estimate(h.tenant_id, second.id_typed(), schedule(now), now, &h.cancel)
        .unwrap();
    h.engine
        .issue_invoice(
            h.tenant_id,
            second.invoice.id_typed(),
            Some(now + Duration::days(30)),
            now,
            &h.cancel,
        )
        .unwrap();
    drain(&h.events);

    let flipped = h.engine.sweep_overdue(h.tenant_id, now, &h.cancel).unwrap();
    assert_eq!(flipped.len(), 1);
    assert_eq!(flipped[0].id_typed(), first.invoice.id_typed());
    assert_eq!(flipped[0].status(), InvoiceStatus::Overdue);

    let events = drain(&h.events);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].entity_type(), "billing.invoice");
    assert_eq!(events[0].to_state(), "overdue");

    // Untouched invoice still issued; a second sweep finds nothing.
    let other = h
        .engine
        .get_invoice(h.tenant_id, second.invoice.id_typed())
        .unwrap();
    assert_eq!(other.status(), InvoiceStatus::Issued);
    assert!(h.engine.sweep_overdue(h.tenant_id, now, &h.cancel).unwrap().is_empty());
    assert!(drain(&h.events).is_empty());

    // An overdue invoice can still be paid.
    let paid = h
        .engine
        .mark_invoice_paid(h.tenant_id, first.invoice.id_typed(), now, &h.cancel)
        .unwrap();
    assert_eq!(paid.status(), InvoiceStatus::Paid);
}

#[test]
fn cancellation_before_commit_leaves_no_partial_state() {
    let h = setup();
    let estimate = h.sent_estimate();
    drain(&h.events);

    let cancelled = CancelToken::new();
    cancelled.cancel();

    let err = h
        .engine
        .accept_estimate(
            h.tenant_id,
            estimate.id_typed(),
            schedule(Utc::now()),
            Utc::now(),
            &cancelled,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Cancelled));

    let estimate = h.engine.get_estimate(h.tenant_id, estimate.id_typed()).unwrap();
    assert_eq!(estimate.status(), EstimateStatus::Sent);
    assert!(drain(&h.events).is_empty());
}

#[test]
fn reads_are_tenant_scoped() {
    let h = setup();
    let lead = h.new_lead();
    let estimate = h.draft_estimate(&lead);

    let other_tenant = TenantId::new();
    assert!(matches!(
        h.engine.get_lead(other_tenant, lead.id_typed()),
        Err(EngineError::NotFound)
    ));
    assert!(matches!(
        h.engine.get_estimate(other_tenant, estimate.id_typed()),
        Err(EngineError::NotFound)
    ));
}
