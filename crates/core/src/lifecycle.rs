//! Lifecycle primitives: fixed legal-transition graphs and transition records.
//!
//! Every workflow entity carries a status field governed by a small, fixed
//! graph (4-6 states). Entities are mutated only through their own
//! `transition` method, which delegates to [`apply_transition`] and then
//! stamps its reached-at timestamps. Status fields are never overwritten from
//! outside the entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A validated, timestamped change of an entity's status field.
///
/// Transient value: returned by every non-no-op transition and handed to the
/// event emitter after the owning transaction commits. Not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition<S> {
    pub from: S,
    pub to: S,
    pub occurred_at: DateTime<Utc>,
}

/// A status enumeration governed by a fixed legal-transition graph.
pub trait WorkflowState: Copy + Eq + core::fmt::Debug + 'static {
    /// Stable lowercase name used in transition events and error messages.
    fn name(self) -> &'static str;

    /// Whether `self -> to` is an edge of the lifecycle graph.
    ///
    /// Self-loops are handled by [`apply_transition`] before this is
    /// consulted; implementations only encode the real edges.
    fn can_transition_to(self, to: Self) -> bool;
}

/// Shared transition algorithm used by every entity's validator.
///
/// - Target equal to the current state is a no-op: `Ok(None)`, nothing
///   mutated, no timestamp stamped, no event emitted.
/// - An edge outside the graph fails with `Conflict` and leaves `current`
///   untouched. The message names both states so a stale client view is
///   distinguishable from not-found and from validation failures.
/// - A legal edge mutates `current` and returns the transition record for
///   the caller to stamp timestamps (first arrival only) and emit
///   post-commit.
pub fn apply_transition<S: WorkflowState>(
    current: &mut S,
    to: S,
    occurred_at: DateTime<Utc>,
) -> DomainResult<Option<StateTransition<S>>> {
    let from = *current;
    if from == to {
        return Ok(None);
    }
    if !from.can_transition_to(to) {
        return Err(DomainError::conflict(format!(
            "invalid transition: {} -> {}",
            from.name(),
            to.name()
        )));
    }
    *current = to;
    Ok(Some(StateTransition {
        from,
        to,
        occurred_at,
    }))
}
