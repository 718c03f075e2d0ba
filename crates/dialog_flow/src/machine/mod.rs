//! State machine module
//!
//! Contains the state unit, transition normalization and the turn
//! orchestrator for the conversational flow engine.

mod hooks;
mod states;
mod transitions;

pub use hooks::{AfterStateHook, BeforeStateHook, UnhandledStateHook};
pub use states::{State, StateHandler, TransitionTarget};
pub use transitions::{
    ResolvedTransition, StateMachine, StateMachineBuilder, StateMachineConfig, SystemTransition,
    MAX_CONTINUE_HOPS,
};

/// Name of the state every machine must declare under the core platform.
/// Also the generic handler key for states with per-intent enter functions.
pub const ENTRY_STATE: &str = "entry";

/// Name of the terminal state. Synthesized at construction when not
/// declared; transitions default to it when they name no destination.
pub const DIE_STATE: &str = "die";
