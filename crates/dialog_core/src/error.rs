//! Fatal error taxonomy of the flow engine.

use thiserror::Error;

/// Errors produced while driving a conversational turn.
///
/// Every variant is fatal for the current turn; the engine never retries
/// and never swallows errors raised by handlers or hooks.
#[derive(Error, Debug)]
pub enum FlowError {
    /// A transition named a destination absent from both the active
    /// platform's and core's state tables. Configuration defect.
    #[error("Unknown state: {0}")]
    UnknownState(String),

    /// The active state produced no transition for the event's intent and
    /// no unhandled-state hook supplied a fallback.
    #[error("State '{state}' has no transition for intent '{intent}'")]
    UnhandledState { state: String, intent: String },

    /// A continue-flow chain exceeded the hop budget. The state graph
    /// contains a continue cycle.
    #[error("Continue chain starting at '{start}' exceeded {hops} hops")]
    ContinueLoop { start: String, hops: usize },

    /// Error raised inside a user handler or hook, propagated unmodified.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}
