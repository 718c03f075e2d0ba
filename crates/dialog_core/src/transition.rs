//! Transition payload - the result of evaluating a state for an event.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Turn-ending behavior of a transition.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    /// Hand off silently to the next state within the same turn.
    Continue,
    /// End the turn and return control to the user.
    Terminate,
}

/// The loosely-shaped result of evaluating a state.
///
/// `to` and `flow` drive the orchestrator's next move; every other key is
/// opaque payload (content to render, directive requests) consumed by
/// downstream collaborators and carried through untouched.
///
/// A `Transition` handed out of the engine is always an independent owned
/// value, never a reference into shared state configuration.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct Transition {
    /// Destination state name. Defaults to `"die"` during normalization.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    /// Explicit flow directive. Derived from `to` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<FlowControl>,

    /// Opaque payload keys, preserved verbatim.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Transition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transition to a named destination state.
    pub fn to(state: impl Into<String>) -> Self {
        Self {
            to: Some(state.into()),
            ..Self::default()
        }
    }

    /// Transition that ends the turn without naming a destination.
    pub fn terminate() -> Self {
        Self {
            flow: Some(FlowControl::Terminate),
            ..Self::default()
        }
    }

    pub fn with_flow(mut self, flow: FlowControl) -> Self {
        self.flow = Some(flow);
        self
    }

    /// Attach an opaque payload value.
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.payload.insert(key.into(), value);
        self
    }
}
