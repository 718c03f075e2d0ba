//! dialog_core - Core contracts and types for the dialog flow engine
//!
//! This crate provides the vocabulary shared between the flow engine and
//! its collaborators:
//! - `event` - the normalized input contract for one conversational turn
//! - `reply` - the mutable response contract for one conversational turn
//! - `transition` - the payload bag produced by evaluating a state
//! - `error` - the fatal error taxonomy of the engine

pub mod error;
pub mod event;
pub mod reply;
pub mod transition;

// Re-export commonly used types
pub use error::FlowError;
pub use event::{BasicEvent, Event, CORE_PLATFORM};
pub use reply::{BasicReply, Reply};
pub use transition::{FlowControl, Transition};
