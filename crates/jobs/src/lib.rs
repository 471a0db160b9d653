//! Scheduled work: jobs, their milestones and expenses.
//!
//! A job is created in `Scheduled` state (normally by estimate acceptance)
//! with a validated schedule window. It owns an ordered milestone collection
//! with explicit sort keys and a flat expense list; neither child collection
//! participates in the job's state machine.

pub mod job;

pub use job::{Expense, Job, JobId, JobStatus, Milestone, MilestoneId, MilestoneStatus};
