//! Transition events and their pub/sub plumbing.
//!
//! The engine notifies observers that "entity X moved from A to B at time T".
//! Emission is fire-and-notify: the engine never depends on an observer's
//! side effects, and events are published strictly **after** the owning
//! transaction commits (an event must never describe a transition that is
//! later rolled back).

pub mod bus;
pub mod event;
pub mod in_memory_bus;
pub mod tenant;

pub use bus::{Subscription, TransitionBus};
pub use event::TransitionEvent;
pub use in_memory_bus::{InMemoryBusError, InMemoryTransitionBus};
pub use tenant::TenantScoped;
