//! dialog_flow - State machine and turn orchestration
//!
//! The decision core of a multi-platform conversational framework: given a
//! normalized event (intent name plus platform tag) and a conversation
//! position (a state name), it computes what happens next and produces a
//! resolved transition describing the destination state and turn-ending
//! behavior.
//!
//! The engine performs no I/O of its own. Intent recognition, template
//! rendering, session persistence and the serverless entry points are
//! external collaborators wired in through the [`machine`] hook traits.

pub mod machine;

// Re-export commonly used types
pub use machine::{
    AfterStateHook, BeforeStateHook, ResolvedTransition, State, StateHandler, StateMachine,
    StateMachineBuilder, StateMachineConfig, SystemTransition, TransitionTarget,
    UnhandledStateHook, DIE_STATE, ENTRY_STATE, MAX_CONTINUE_HOPS,
};
