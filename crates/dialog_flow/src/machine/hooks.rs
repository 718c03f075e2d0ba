//! Hook contracts - ordered collaborators around each state evaluation.
//!
//! All three hook lists execute strictly sequentially, front to back, in
//! the order they appear in the machine configuration. Ordering is part of
//! the contract: a directive-writing hook placed before a persistence hook
//! always runs before it. Hook N+1 never starts before hook N's future
//! settles.

use async_trait::async_trait;
use dialog_core::{Event, FlowError, Reply, Transition};

use super::State;

/// Runs before a state is evaluated, once per evaluation step.
/// An error aborts the turn and propagates to the caller.
#[async_trait]
pub trait BeforeStateHook: Send + Sync {
    async fn on_before_state_changed(
        &self,
        event: &dyn Event,
        reply: &mut dyn Reply,
        state: &State,
    ) -> Result<(), FlowError>;
}

/// Runs after a state evaluation produced a transition, with its
/// destination already defaulted. Acts purely through side effects on
/// `reply` and `transition` (attaching rendered content, enqueuing
/// directives, forcing termination); non-error return values are
/// discarded.
#[async_trait]
pub trait AfterStateHook: Send + Sync {
    async fn on_after_state_changed(
        &self,
        event: &dyn Event,
        reply: &mut dyn Reply,
        transition: &mut Transition,
    ) -> Result<(), FlowError>;
}

/// Consulted when no state produced a transition for the event, after the
/// entry fallback. Every registered hook runs; the last one returning
/// `Some` supplies the fallback transition. If all return `None` the turn
/// fails with [`FlowError::UnhandledState`].
#[async_trait]
pub trait UnhandledStateHook: Send + Sync {
    async fn on_unhandled_state(
        &self,
        event: &dyn Event,
        state_name: &str,
    ) -> Result<Option<Transition>, FlowError>;
}
